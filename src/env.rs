//! Environment variable names used by this crate for convenient
//! configuration from services.
//!
//! These are purely helpers; [`Options`] itself never touches the
//! environment unless [`Options::from_env`] is called.

use crate::options::Options;

/// Ingestion key.
pub const LOG_INGEST_KEY_ENV: &str = "LOG_INGEST_KEY";

/// Full ingestion URL, e.g. `https://logs.logdna.com/logs/ingest`.
pub const LOG_INGEST_URL_ENV: &str = "LOG_INGEST_URL";

/// Hostname reported with every payload.
pub const LOG_INGEST_HOSTNAME_ENV: &str = "LOG_INGEST_HOSTNAME";

/// Default app name for records.
pub const LOG_INGEST_APP_ENV: &str = "LOG_INGEST_APP";

/// Default environment name for records.
pub const LOG_INGEST_ENV_ENV: &str = "LOG_INGEST_ENV";

/// Comma-separated tags reported with every payload.
pub const LOG_INGEST_TAGS_ENV: &str = "LOG_INGEST_TAGS";

/// Value sent as the `user-agent` header.
pub const USER_AGENT_ENV: &str = "USERAGENT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// The ingestion key from [`LOG_INGEST_KEY_ENV`], if set.
pub fn ingest_key() -> Option<String> {
    std::env::var(LOG_INGEST_KEY_ENV).ok()
}

/// `user-agent` header value: [`USER_AGENT_ENV`] or this crate's name and
/// version.
pub fn user_agent() -> String {
    env_or(
        USER_AGENT_ENV,
        concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
    )
}

impl Options {
    /// Options with identity and endpoint read from the environment. Unset
    /// variables are left empty and pick up defaults later.
    pub fn from_env() -> Self {
        Options {
            ingest_url: env_or(LOG_INGEST_URL_ENV, ""),
            hostname: env_or(LOG_INGEST_HOSTNAME_ENV, ""),
            app: env_or(LOG_INGEST_APP_ENV, ""),
            env: env_or(LOG_INGEST_ENV_ENV, ""),
            tags: env_or(LOG_INGEST_TAGS_ENV, ""),
            ..Options::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_when_unset() {
        assert_eq!(env_or("INGEST_LOG_SINK_SURELY_UNSET", "fallback"), "fallback");
    }

    #[test]
    fn user_agent_is_never_empty() {
        assert!(!user_agent().is_empty());
    }
}
