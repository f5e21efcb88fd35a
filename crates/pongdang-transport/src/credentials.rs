//! Credential hooks injected into the transport.
//!
//! The transport never reaches into global auth state. Whoever builds the
//! client hands it a [`TokenProvider`] (the bearer token attached to the
//! upgrade request, the STOMP `CONNECT` frame and every `SEND`) and an
//! [`IdentityProvider`] (the signed-in user, sent as the STOMP `login`
//! header and used by the room layer to decide whose turn it is).
//!
//! Providers are asked again on every reconnect and every publish, so a
//! refreshed token is picked up without rebuilding the client.

use std::fmt;
use std::sync::Arc;

/// Supplies the current bearer token, if any.
pub trait TokenProvider: Send + Sync + 'static {
    /// Returns the raw token (without the `Bearer ` prefix).
    fn token(&self) -> Option<String>;
}

/// Supplies the signed-in user's id, if any.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Returns the user id the server knows this client by.
    fn user_id(&self) -> Option<i64>;
}

/// A fixed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// A fixed user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticIdentity(pub i64);

impl IdentityProvider for StaticIdentity {
    fn user_id(&self) -> Option<i64> {
        Some(self.0)
    }
}

/// No token and no identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl TokenProvider for Anonymous {
    fn token(&self) -> Option<String> {
        None
    }
}

impl IdentityProvider for Anonymous {
    fn user_id(&self) -> Option<i64> {
        None
    }
}

impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }
}

impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    fn user_id(&self) -> Option<i64> {
        (**self).user_id()
    }
}

/// The pair of providers handed to the transport.
#[derive(Clone)]
pub struct Credentials {
    token: Arc<dyn TokenProvider>,
    identity: Arc<dyn IdentityProvider>,
}

impl Credentials {
    /// Builds credentials from a token provider and an identity provider.
    pub fn new(
        token: impl TokenProvider,
        identity: impl IdentityProvider,
    ) -> Self {
        Self {
            token: Arc::new(token),
            identity: Arc::new(identity),
        }
    }

    /// Credentials with neither a token nor an identity.
    pub fn anonymous() -> Self {
        Self::new(Anonymous, Anonymous)
    }

    /// The `Authorization` header value, e.g. `Bearer abc`.
    pub fn bearer(&self) -> Option<String> {
        self.token
            .token()
            .filter(|t| !t.is_empty())
            .map(|t| format!("Bearer {t}"))
    }

    /// The signed-in user's id.
    pub fn user_id(&self) -> Option<i64> {
        self.identity.user_id()
    }

    /// The token provider, for connectors that authenticate the upgrade.
    pub fn token_provider(&self) -> Arc<dyn TokenProvider> {
        Arc::clone(&self.token)
    }

    /// The identity provider, for layers that need it directly.
    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.identity)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the token itself.
        f.debug_struct("Credentials")
            .field("has_token", &self.token.token().is_some())
            .field("user_id", &self.identity.user_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_formats_token() {
        let creds = Credentials::new(StaticToken("abc".into()), Anonymous);
        assert_eq!(creds.bearer().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_bearer_empty_token_is_none() {
        let creds = Credentials::new(StaticToken(String::new()), Anonymous);
        assert_eq!(creds.bearer(), None);
    }

    #[test]
    fn test_anonymous_has_no_identity() {
        let creds = Credentials::anonymous();
        assert_eq!(creds.bearer(), None);
        assert_eq!(creds.user_id(), None);
    }

    #[test]
    fn test_shared_providers_delegate() {
        let token: Arc<dyn TokenProvider> = Arc::new(StaticToken("t".into()));
        let creds = Credentials::new(token, Arc::new(StaticIdentity(9)));
        assert_eq!(creds.bearer().as_deref(), Some("Bearer t"));
        assert_eq!(creds.user_id(), Some(9));
        assert_eq!(creds.token_provider().token().as_deref(), Some("t"));
    }

    #[test]
    fn test_debug_hides_token() {
        let creds =
            Credentials::new(StaticToken("secret".into()), StaticIdentity(3));
        let printed = format!("{creds:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("user_id: Some(3)"));
    }
}
