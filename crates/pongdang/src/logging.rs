//! Process-wide `tracing` setup.
//!
//! The filter comes from `RUST_LOG` and defaults to `info`. `LOG_FORMAT=json`
//! switches from compact lines to one JSON object per event.

use tracing_subscriber::EnvFilter;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// Reads `LOG_FORMAT`. Anything but `json` is compact.
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Installs the global subscriber using [`LogFormat::from_env`].
///
/// Returns `false` if a subscriber was already installed.
pub fn init() -> bool {
    init_with(LogFormat::from_env())
}

/// Installs the global subscriber with an explicit format.
pub fn init_with(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .try_init()
            .is_ok(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
            .is_ok(),
    };

    if installed {
        std::panic::set_hook(Box::new(|info| {
            let backtrace = std::backtrace::Backtrace::capture();
            tracing::error!(%info, ?backtrace, "panic");
        }));
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_any_case() {
        assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("JSON")), LogFormat::Json);
    }

    #[test]
    fn test_parse_other_is_compact() {
        assert_eq!(LogFormat::parse(None), LogFormat::Compact);
        assert_eq!(LogFormat::parse(Some("pretty")), LogFormat::Compact);
    }
}
