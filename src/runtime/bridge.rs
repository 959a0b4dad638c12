use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerInspectResponse, ContainerSummary, ImageInspect};
use bollard::{API_DEFAULT_VERSION, Docker};
use std::sync::Arc;
use tracing::debug;

use super::ConnectionTarget;

/// Seconds before a daemon request gives up. Matches bollard's own default.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// The slice of the Docker Engine API dockinfo reads from
#[async_trait]
pub trait DockerBridge: Send + Sync {
    async fn ping(&self) -> Result<(), DockerError>;

    /// Look a container up by exact name or id.
    async fn inspect_container(&self, name: &str) -> Result<ContainerInspectResponse, DockerError>;

    /// Look an image up by reference (`nginx:latest`) or id.
    async fn inspect_image(&self, name: &str) -> Result<ImageInspect, DockerError>;

    /// Every container the daemon knows, running and stopped when `all`.
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, DockerError>;
}

#[derive(Clone)]
pub struct BollardBridge {
    docker: Docker,
}

impl BollardBridge {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Build a client for `target`. Bollard connects lazily, so this only
    /// fails for malformed addresses; reachability is checked by `ping`.
    pub fn connect(target: &ConnectionTarget) -> Result<Arc<dyn DockerBridge>, DockerError> {
        let docker = match target {
            ConnectionTarget::Url(url) if url.starts_with("unix://") || url.starts_with("npipe://") => {
                Docker::connect_with_socket(url, DEFAULT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            ConnectionTarget::Url(url) => {
                Docker::connect_with_http(url, DEFAULT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            ConnectionTarget::Socket(path) => Docker::connect_with_socket(
                &path.to_string_lossy(),
                DEFAULT_TIMEOUT_SECS,
                API_DEFAULT_VERSION,
            )?,
            ConnectionTarget::LocalDefaults => Docker::connect_with_local_defaults()?,
        };
        debug!(target = %target, "Docker client constructed");
        Ok(Arc::new(Self::new(docker)))
    }
}

#[async_trait]
impl DockerBridge for BollardBridge {
    async fn ping(&self) -> Result<(), DockerError> {
        self.docker.ping().await.map(|_| ())
    }

    async fn inspect_container(&self, name: &str) -> Result<ContainerInspectResponse, DockerError> {
        self.docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
    }

    async fn inspect_image(&self, name: &str) -> Result<ImageInspect, DockerError> {
        self.docker.inspect_image(name).await
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, DockerError> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };
        self.docker.list_containers(Some(options)).await
    }
}
