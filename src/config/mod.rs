//! Runtime settings.
//!
//! Values are layered: command-line flags and their environment variables
//! (merged by clap) override an optional TOML file, which overrides the
//! built-in defaults.

use crate::cors::{DEFAULT_CORS_ORIGIN, OriginPolicy};
use crate::error::{ConfigError, DockinfoError, Result};
use crate::labels::{DEFAULT_LABEL_PREFIX, LabelNamespace};
use crate::monitoring::{LogFormat, TracingConfig};
use crate::runtime::ConnectionTarget;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SELF_NAME: &str = "dockinfo";

/// Optional TOML configuration file
///
/// ```toml
/// [server]
/// host = "0.0.0.0"
/// port = 8080
///
/// [docker]
/// socket = "/run/user/1000/docker.sock"
///
/// [labels]
/// prefix = "package-info"
///
/// [cors]
/// origins = ["https://*.example.com", "https://example.com"]
///
/// [logging]
/// level = "debug"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerSection,
    pub docker: DockerSection,
    pub labels: LabelsSection,
    pub cors: CorsSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub self_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerSection {
    pub host: Option<String>,
    pub socket: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelsSection {
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsSection {
    pub enabled: Option<bool>,
    pub origins: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)?;
        let config: FileConfig = toml::from_str(&content)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub docker_host: Option<String>,
    pub docker_socket: Option<String>,
    pub label_prefix: Option<String>,
    pub cors_origins: Option<String>,
    pub disable_cors: bool,
    pub self_name: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub verbose: bool,
}

/// Fully resolved settings the service runs with
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: SocketAddr,
    pub connection: ConnectionTarget,
    pub labels: LabelNamespace,
    /// `None` when CORS handling is disabled
    pub cors: Option<OriginPolicy>,
    pub self_name: String,
    pub tracing: TracingConfig,
}

impl Settings {
    /// Read the optional file at `config_path` and layer `overrides` on top.
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> anyhow::Result<Self> {
        let file = match config_path {
            Some(path) => FileConfig::load(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(file, overrides)?)
    }

    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        let host = overrides
            .host
            .or(file.server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = overrides.port.or(file.server.port).unwrap_or(DEFAULT_PORT);
        let ip: IpAddr = host.trim().parse().map_err(|e| invalid("host", e))?;

        let connection = ConnectionTarget::resolve(
            overrides.docker_host.or(file.docker.host).as_deref(),
            overrides.docker_socket.or(file.docker.socket).as_deref(),
        );

        let labels = LabelNamespace::new(
            overrides
                .label_prefix
                .or(file.labels.prefix)
                .unwrap_or_else(|| DEFAULT_LABEL_PREFIX.to_string()),
        )?;

        let cors_enabled = !overrides.disable_cors && file.cors.enabled.unwrap_or(true);
        let cors = cors_enabled.then(|| match (overrides.cors_origins, file.cors.origins) {
            (Some(list), _) => OriginPolicy::from_list(&list),
            (None, Some(origins)) => OriginPolicy::new(origins),
            (None, None) => OriginPolicy::from_list(DEFAULT_CORS_ORIGIN),
        });

        let self_name = overrides
            .self_name
            .or(file.server.self_name)
            .filter(|n| !n.trim().is_empty())
            .or_else(os_hostname)
            .unwrap_or_else(|| DEFAULT_SELF_NAME.to_string());

        let format = match overrides.log_format {
            Some(raw) => raw.parse()?,
            None => file.logging.format.unwrap_or_default(),
        };
        let level = if overrides.verbose {
            "debug".to_string()
        } else {
            overrides
                .log_level
                .or(file.logging.level)
                .unwrap_or_else(|| "info".to_string())
        };

        Ok(Self {
            bind: SocketAddr::new(ip, port),
            connection,
            labels,
            cors,
            self_name,
            tracing: TracingConfig {
                log_level: level,
                format,
            },
        })
    }
}

fn os_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().to_string())
        .filter(|h| !h.is_empty())
}

fn invalid(field: &str, reason: impl ToString) -> DockinfoError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
