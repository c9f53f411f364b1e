//! Structured logging setup.

use crate::error::CredentialError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the default log filter.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
/// Environment variable selecting output format; `json` enables JSON lines.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name attached to startup logs.
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Whether to output JSON format.
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            log_level: "info".to_string(),
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Defaults overridden by `LOG_LEVEL` and `LOG_FORMAT`, read after `.env`
    /// is loaded.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Some(level) = std::env::var(LOG_LEVEL_ENV).ok().filter(|v| !v.trim().is_empty()) {
            config = config.with_log_level(level);
        }
        if std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
            config = config.with_json_output();
        }
        config
    }

    /// Override the default filter.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON output.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// # Errors
///
/// Returns [`CredentialError::Internal`] if a global subscriber is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<(), CredentialError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let result = if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    result.map_err(|e| CredentialError::internal(format!("Tracing already initialized: {}", e)))
}
