//! Access to the Docker daemon.
//!
//! [`RuntimeClient`] owns the single process-wide connection. It is built
//! once at startup, shared behind an `Arc`, and connects on first use: the
//! construct-and-ping sequence runs at most once at a time, a failed attempt
//! is not remembered, and a successful one is kept for the process lifetime.

mod bridge;
#[cfg(test)]
pub(crate) mod fake;

pub use bridge::{BollardBridge, DEFAULT_TIMEOUT_SECS, DockerBridge};

use crate::error::{DockinfoError, ObjectKind, Result};
use bollard::errors::Error as DockerError;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

pub const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Where the daemon is reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// Explicit endpoint such as `unix:///run/docker.sock` or `tcp://10.0.0.2:2375`
    Url(String),
    /// Custom unix socket path
    Socket(PathBuf),
    /// Bollard's platform defaults (honours `DOCKER_HOST`, else the default socket)
    LocalDefaults,
}

impl ConnectionTarget {
    /// Explicit URL wins, then a socket path that differs from the default,
    /// then the platform defaults.
    pub fn resolve(docker_host: Option<&str>, docker_socket: Option<&str>) -> Self {
        if let Some(url) = docker_host.map(str::trim).filter(|u| !u.is_empty()) {
            return ConnectionTarget::Url(url.to_string());
        }
        match docker_socket.map(str::trim).filter(|s| !s.is_empty()) {
            Some(socket) if socket != DEFAULT_DOCKER_SOCKET => {
                ConnectionTarget::Socket(PathBuf::from(socket))
            }
            _ => ConnectionTarget::LocalDefaults,
        }
    }
}

impl std::fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionTarget::Url(url) => write!(f, "{}", url),
            ConnectionTarget::Socket(path) => write!(f, "unix://{}", path.display()),
            ConnectionTarget::LocalDefaults => write!(f, "local defaults"),
        }
    }
}

type Connector =
    Box<dyn Fn(&ConnectionTarget) -> Result<Arc<dyn DockerBridge>, DockerError> + Send + Sync>;

/// Lazily connected, memoized Docker client
pub struct RuntimeClient {
    target: ConnectionTarget,
    connector: Connector,
    bridge: OnceCell<Arc<dyn DockerBridge>>,
}

impl RuntimeClient {
    /// Client that connects through bollard.
    pub fn new(target: ConnectionTarget) -> Self {
        Self::with_connector(target, BollardBridge::connect)
    }

    /// Client with a custom way of building the bridge.
    pub fn with_connector<F>(target: ConnectionTarget, connector: F) -> Self
    where
        F: Fn(&ConnectionTarget) -> Result<Arc<dyn DockerBridge>, DockerError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            target,
            connector: Box::new(connector),
            bridge: OnceCell::new(),
        }
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Whether a verified connection is already held.
    pub fn is_connected(&self) -> bool {
        self.bridge.initialized()
    }

    /// The shared bridge, connecting and pinging on first use.
    pub async fn get(&self) -> Result<Arc<dyn DockerBridge>> {
        self.bridge
            .get_or_try_init(|| self.initialize())
            .await
            .cloned()
    }

    async fn initialize(&self) -> Result<Arc<dyn DockerBridge>> {
        let bridge = (self.connector)(&self.target).map_err(|e| {
            error!(target = %self.target, error = %e, "Failed to initialize Docker client");
            DockinfoError::unavailable(e)
        })?;

        if let Err(e) = bridge.ping().await {
            error!(target = %self.target, error = %e, "Failed to initialize Docker client");
            return Err(DockinfoError::unavailable(e));
        }

        info!(target = %self.target, "🐳 Docker client initialized successfully");
        Ok(bridge)
    }
}

/// Map a daemon error onto the dockinfo taxonomy for a lookup of `name`.
pub fn classify(err: DockerError, kind: ObjectKind, name: &str) -> DockinfoError {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => DockinfoError::not_found(kind, name),
        other => classify_listing(other),
    }
}

/// Map a daemon error from a call that targets no single object.
///
/// Only failures to reach the daemon count as unavailability. A daemon that
/// answered with an error or with a body that cannot be decoded is
/// `Unexpected`.
pub fn classify_listing(err: DockerError) -> DockinfoError {
    match err {
        DockerError::DockerResponseServerError { message, .. } => {
            DockinfoError::Unexpected(message)
        }
        e @ (DockerError::JsonDataError { .. }
        | DockerError::JsonSerdeError { .. }
        | DockerError::APIVersionParseError { .. }
        | DockerError::StrParseError { .. }) => DockinfoError::Unexpected(e.to_string()),
        other => DockinfoError::unavailable(other),
    }
}
