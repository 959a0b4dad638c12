use crate::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io;
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Output shape of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human readable output
    #[default]
    Compact,
    /// Multi-line output with source locations
    Pretty,
    /// One JSON object per event, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue {
                field: "log_format".to_string(),
                reason: format!("unknown format '{}' (expected compact, pretty or json)", other),
            }),
        }
    }
}

/// Tracing configuration for dockinfo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracingConfig {
    pub log_level: String,
    pub format: LogFormat,
}

impl TracingConfig {
    /// Install the global subscriber. `RUST_LOG` takes precedence over
    /// `log_level` when set.
    pub fn init_tracing(&self) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        match self.format {
            LogFormat::Json => {
                let json_layer = fmt::layer()
                    .with_target(true)
                    .with_writer(io::stdout)
                    .json()
                    .flatten_event(true)
                    .with_current_span(true);

                Registry::default()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init()?;
            }
            LogFormat::Pretty => {
                let pretty_layer = fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(io::stdout)
                    .pretty()
                    .with_ansi(true);

                Registry::default()
                    .with(env_filter)
                    .with(pretty_layer)
                    .try_init()?;
            }
            LogFormat::Compact => {
                let simple_layer = fmt::layer().with_target(false).compact();

                Registry::default()
                    .with(env_filter)
                    .with(simple_layer)
                    .try_init()?;
            }
        }

        Ok(())
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log one served API request
pub fn log_api_request(method: &str, path: &str, status_code: u16, duration_ms: f64) {
    if status_code >= 500 {
        tracing::warn!(
            method = %method,
            path = %path,
            status_code = %status_code,
            duration_ms = %duration_ms,
            "API request"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            status_code = %status_code,
            duration_ms = %duration_ms,
            "API request"
        );
    }
}
