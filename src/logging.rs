//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Logs go to stderr so stdout carries only the JSON response envelope.
//!
//! # Log Levels
//!
//! - `error`: internal failures folded into a 500 response
//! - `warn`: denied access, counter drift
//! - `info`: committed writes, applied migrations
//! - `debug`: transaction rollbacks

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Variable holding the filter directive, e.g. `quorum=debug`.
pub const LOG_ENV_VAR: &str = "QUORUM_LOG";

/// Filter used when neither `QUORUM_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_DIRECTIVE: &str = "quorum=warn";

/// Builds the filter from `QUORUM_LOG`, then `RUST_LOG`, then the default.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs the global subscriber.
///
/// Returns `false` and keeps the existing subscriber if one is already
/// installed.
pub fn init_logging() -> bool {
    match tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "keeping existing tracing subscriber");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn default_filter_applies_without_env() {
        unsafe {
            std::env::remove_var(LOG_ENV_VAR);
            std::env::remove_var("RUST_LOG");
        }

        assert_eq!(
            env_filter().to_string(),
            EnvFilter::new(DEFAULT_DIRECTIVE).to_string()
        );
    }

    #[test]
    #[serial]
    fn quorum_log_takes_precedence() {
        unsafe {
            std::env::set_var(LOG_ENV_VAR, "quorum=debug");
            std::env::set_var("RUST_LOG", "trace");
        }

        assert_eq!(
            env_filter().to_string(),
            EnvFilter::new("quorum=debug").to_string()
        );

        unsafe {
            std::env::remove_var(LOG_ENV_VAR);
            std::env::remove_var("RUST_LOG");
        }
    }

    #[test]
    fn second_init_keeps_the_first_subscriber() {
        init_logging();

        assert!(!init_logging(), "a subscriber is already installed");
    }
}
