use super::DockerBridge;
use async_trait::async_trait;
use bollard::errors::Error as DockerError;
use bollard::models::{
    ContainerConfig, ContainerInspectResponse, ContainerState, ContainerStateStatusEnum,
    ContainerSummary, ImageInspect,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    unreachable: bool,
    containers: Vec<ContainerInspectResponse>,
    images: Vec<ImageInspect>,
    broken_images: HashSet<String>,
}

/// In-memory daemon for unit tests
#[derive(Clone, Default)]
pub(crate) struct FakeDaemon {
    inner: Arc<Mutex<Inner>>,
}

impl FakeDaemon {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_reachable(&self, reachable: bool) {
        self.inner.lock().unwrap().unreachable = !reachable;
    }

    pub(crate) fn add_container(&self, name: &str, image_id: &str, labels: &[(&str, &str)]) {
        let hex: String = name.bytes().map(|b| format!("{:02x}", b)).collect();
        let id: String = format!("{:0<64}", hex).chars().take(64).collect();
        self.push_container(Some(id), Some(format!("/{}", name)), image_id, labels);
    }

    /// A container as a listing may report it: `name` is the raw Docker name
    /// (`Some("")` lists as `[""]`) and either field may be absent.
    pub(crate) fn add_raw_container(
        &self,
        id: Option<&str>,
        name: Option<&str>,
        image_id: &str,
        labels: &[(&str, &str)],
    ) {
        self.push_container(id.map(str::to_string), name.map(str::to_string), image_id, labels);
    }

    fn push_container(
        &self,
        id: Option<String>,
        name: Option<String>,
        image_id: &str,
        labels: &[(&str, &str)],
    ) {
        let labels: HashMap<String, String> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let container = ContainerInspectResponse {
            id,
            name,
            image: Some(image_id.to_string()),
            created: Some("2024-05-01T10:00:00.000000000Z".to_string()),
            state: Some(ContainerState {
                status: Some(ContainerStateStatusEnum::RUNNING),
                ..Default::default()
            }),
            config: Some(ContainerConfig {
                labels: Some(labels),
                env: Some(vec!["PATH=/usr/bin".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.inner.lock().unwrap().containers.push(container);
    }

    pub(crate) fn add_image(&self, id: &str, tags: &[&str]) {
        let image = ImageInspect {
            id: Some(id.to_string()),
            repo_tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            size: Some(1024),
            architecture: Some("amd64".to_string()),
            os: Some("linux".to_string()),
            ..Default::default()
        };
        self.inner.lock().unwrap().images.push(image);
    }

    /// Make every lookup of image `id` fail with a server error.
    pub(crate) fn break_image(&self, id: &str) {
        self.inner.lock().unwrap().broken_images.insert(id.to_string());
    }

    fn check_reachable(&self) -> Result<(), DockerError> {
        if self.inner.lock().unwrap().unreachable {
            return Err(DockerError::SocketNotFoundError(
                "/var/run/docker.sock".to_string(),
            ));
        }
        Ok(())
    }
}

fn not_found(what: &str) -> DockerError {
    DockerError::DockerResponseServerError {
        status_code: 404,
        message: format!("No such {}", what),
    }
}

#[async_trait]
impl DockerBridge for FakeDaemon {
    async fn ping(&self) -> Result<(), DockerError> {
        self.check_reachable()
    }

    async fn inspect_container(&self, name: &str) -> Result<ContainerInspectResponse, DockerError> {
        self.check_reachable()?;
        let inner = self.inner.lock().unwrap();
        inner
            .containers
            .iter()
            .find(|c| {
                c.name.as_deref().map(|n| n.trim_start_matches('/')) == Some(name)
                    || c.id.as_deref() == Some(name)
            })
            .cloned()
            .ok_or_else(|| not_found(&format!("container: {}", name)))
    }

    async fn inspect_image(&self, name: &str) -> Result<ImageInspect, DockerError> {
        self.check_reachable()?;
        let inner = self.inner.lock().unwrap();
        if inner.broken_images.contains(name) {
            return Err(DockerError::DockerResponseServerError {
                status_code: 500,
                message: "layer store corrupted".to_string(),
            });
        }
        inner
            .images
            .iter()
            .find(|i| {
                i.id.as_deref() == Some(name)
                    || i.repo_tags
                        .as_ref()
                        .is_some_and(|tags| tags.iter().any(|t| t == name))
            })
            .cloned()
            .ok_or_else(|| not_found(&format!("image: {}", name)))
    }

    async fn list_containers(&self, _all: bool) -> Result<Vec<ContainerSummary>, DockerError> {
        self.check_reachable()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .containers
            .iter()
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                names: c.name.clone().map(|n| vec![n]),
                image_id: c.image.clone(),
                state: c
                    .state
                    .as_ref()
                    .and_then(|s| s.status)
                    .map(|s| s.to_string()),
                labels: c.config.as_ref().and_then(|cfg| cfg.labels.clone()),
                ..Default::default()
            })
            .collect())
    }
}
