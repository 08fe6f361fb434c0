//! Application configuration from environment variables.
//!
//! Load configuration using `Config::from_env()` after calling `dotenvy::dotenv()`.

use crate::core::LayoutConfig;
use crate::core::import::SqlDialect;

/// Model name used when none is configured
pub const DEFAULT_MODEL_NAME: &str = "Untitled model";

/// Log filter used when none is configured
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Dialect used to parse DDL input
    /// Example: SCHEMAVIEW_SQL_DIALECT=postgresql
    pub sql_dialect: SqlDialect,

    /// Name written into exported model documents
    pub model_name: String,

    /// `tracing` filter directive, overridden by RUST_LOG
    pub log_filter: String,

    /// Connector geometry constants
    pub layout: LayoutConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` before this to load from `.env` file.
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let sql_dialect = lookup("SCHEMAVIEW_SQL_DIALECT")
            .and_then(|raw| match raw.parse::<SqlDialect>() {
                Ok(dialect) => Some(dialect),
                Err(e) => {
                    tracing::warn!("Ignoring SCHEMAVIEW_SQL_DIALECT: {}", e);
                    None
                }
            })
            .unwrap_or_default();

        Self {
            sql_dialect,
            model_name: lookup("SCHEMAVIEW_MODEL_NAME")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            log_filter: lookup("SCHEMAVIEW_LOG")
                .filter(|filter| !filter.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            layout: LayoutConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
