//! Forced exit handling.
//!
//! The server can evict the client at any time. The room actor reacts at
//! most once per room visit, guarded by [`ForceExitGuard`], and hands the
//! destination to a [`Navigator`] supplied by the embedding application.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// Moves the application somewhere else when a room is left involuntarily.
pub trait Navigator: Send + Sync + 'static {
    /// Goes to `route` (a path or absolute URL).
    fn navigate(&self, route: &str);
}

/// A navigator that only logs the route.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        info!(%route, "navigating away from room");
    }
}

/// Lets a forced exit fire once.
#[derive(Debug, Default)]
pub struct ForceExitGuard {
    fired: AtomicBool,
}

impl ForceExitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the first caller only.
    pub fn fire(&self) -> bool {
        !self.fired.swap(true, Ordering::AcqRel)
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}
