//! Runtime configuration
//!
//! Loaded once at startup from environment variables (a `.env` file is read
//! first when present).

use serde::Serialize;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/submissions".to_string()),
            max_connections: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)), // 10 minutes
            max_lifetime: Some(Duration::from_secs(1800)), // 30 minutes
        }
    }
}

/// Behavioural switches for the intake and security services.
#[derive(Debug, Clone, Serialize)]
pub struct CoreConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Fire the search reindex signal after a successful ingest.
    pub reindex_on_ingest: bool,
    /// Refuse apply/patch requests naming unknown or end-dated rules.
    pub reject_inactive_rules: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            reindex_on_ingest: true,
            reject_inactive_rules: true,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            log_filter: std::env::var("SUBMISSION_LOG").unwrap_or(defaults.log_filter),
            reindex_on_ingest: env_bool("SUBMISSION_REINDEX_ON_INGEST", defaults.reindex_on_ingest),
            reject_inactive_rules: env_bool(
                "SUBMISSION_REJECT_INACTIVE_RULES",
                defaults.reject_inactive_rules,
            ),
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" on "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("No"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn core_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.log_filter, "info");
        assert!(config.reindex_on_ingest);
        assert!(config.reject_inactive_rules);
    }

    #[test]
    fn env_bool_falls_back_on_garbage() {
        std::env::set_var("SUBMISSION_TEST_FLAG_GARBAGE", "sometimes");
        assert!(env_bool("SUBMISSION_TEST_FLAG_GARBAGE", true));
        assert!(!env_bool("SUBMISSION_TEST_FLAG_UNSET_XYZ", false));
    }
}
