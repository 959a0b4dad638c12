#![allow(dead_code)]

use async_trait::async_trait;
use bollard::errors::Error as DockerError;
use bollard::models::{
    ContainerConfig, ContainerInspectResponse, ContainerState, ContainerStateStatusEnum,
    ContainerSummary, ImageInspect, NetworkSettings, PortBinding,
};
use dockinfo::cors::OriginPolicy;
use dockinfo::labels::LabelNamespace;
use dockinfo::runtime::{ConnectionTarget, DockerBridge, RuntimeClient};
use dockinfo::server::{AppState, routes};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use warp::{Filter, Reply};

pub const NGINX_ID: &str = "sha256:4a7e1c3f9d2b8e6a0c5f1d3e";
pub const API_ID: &str = "sha256:77d0a9b1c2e3f4a5b6c7d8e9";

#[derive(Default)]
struct State {
    unreachable: bool,
    containers: Vec<ContainerInspectResponse>,
    images: Vec<ImageInspect>,
    broken_containers: Vec<String>,
}

/// Docker daemon double shared between a test and the server under test
#[derive(Clone, Default)]
pub struct TestDaemon {
    state: Arc<Mutex<State>>,
    connects: Arc<AtomicUsize>,
}

impl TestDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().unreachable = !reachable;
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn add_image(&self, id: &str, tags: &[&str]) {
        self.state.lock().unwrap().images.push(ImageInspect {
            id: Some(id.to_string()),
            repo_tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            created: Some("2024-04-01T08:00:00Z".to_string()),
            size: Some(187_000_000),
            architecture: Some("amd64".to_string()),
            os: Some("linux".to_string()),
            ..Default::default()
        });
    }

    pub fn add_container(&self, name: &str, image_id: &str, labels: &[(&str, &str)]) {
        let index = self.state.lock().unwrap().containers.len();
        let id = format!("{:02}{}", index, "a1b2c3d4e5f6".repeat(5));
        let ports = HashMap::from([
            (
                "80/tcp".to_string(),
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some("8081".to_string()),
                }]),
            ),
            ("9000/tcp".to_string(), None),
        ]);
        let container = ContainerInspectResponse {
            id: Some(id),
            name: Some(format!("/{}", name)),
            image: Some(image_id.to_string()),
            created: Some("2024-05-01T10:00:00Z".to_string()),
            state: Some(ContainerState {
                status: Some(ContainerStateStatusEnum::RUNNING),
                ..Default::default()
            }),
            config: Some(ContainerConfig {
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                env: Some(vec!["PATH=/usr/local/bin:/usr/bin".to_string()]),
                ..Default::default()
            }),
            network_settings: Some(NetworkSettings {
                ports: Some(ports),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.state.lock().unwrap().containers.push(container);
    }

    /// Publish container port `port` (`"8443/tcp"`) on `host_port`, or expose
    /// it unpublished when `host_port` is `None`.
    pub fn publish(&self, name: &str, port: &str, host_port: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        let container = state
            .containers
            .iter_mut()
            .find(|c| c.name.as_deref().map(|n| n.trim_start_matches('/')) == Some(name))
            .unwrap();
        let ports = container
            .network_settings
            .get_or_insert_with(Default::default)
            .ports
            .get_or_insert_with(Default::default);
        ports.insert(
            port.to_string(),
            host_port.map(|p| {
                vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some(p.to_string()),
                }]
            }),
        );
    }

    /// Make inspecting `name` fail the way a daemon-side fault does.
    pub fn break_container(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .broken_containers
            .push(name.to_string());
    }

    fn check(&self) -> Result<(), DockerError> {
        if self.state.lock().unwrap().unreachable {
            return Err(DockerError::SocketNotFoundError(
                "/var/run/docker.sock".to_string(),
            ));
        }
        Ok(())
    }
}

fn missing(what: &str) -> DockerError {
    DockerError::DockerResponseServerError {
        status_code: 404,
        message: format!("No such {}", what),
    }
}

#[async_trait]
impl DockerBridge for TestDaemon {
    async fn ping(&self) -> Result<(), DockerError> {
        self.check()
    }

    async fn inspect_container(&self, name: &str) -> Result<ContainerInspectResponse, DockerError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        if state.broken_containers.iter().any(|b| b == name) {
            return Err(DockerError::DockerResponseServerError {
                status_code: 500,
                message: format!("container {} has a corrupted rootfs", name),
            });
        }
        let mut container = state
            .containers
            .iter()
            .find(|c| c.name.as_deref().map(|n| n.trim_start_matches('/')) == Some(name))
            .cloned()
            .ok_or_else(|| missing(&format!("container: {}", name)))?;

        // Every real inspect decodes fresh maps, each with its own hasher.
        if let Some(config) = container.config.as_mut() {
            config.labels = config.labels.take().map(|l| l.into_iter().collect());
        }
        if let Some(network) = container.network_settings.as_mut() {
            network.ports = network.ports.take().map(|p| p.into_iter().collect());
        }
        Ok(container)
    }

    async fn inspect_image(&self, name: &str) -> Result<ImageInspect, DockerError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        state
            .images
            .iter()
            .find(|i| {
                i.id.as_deref() == Some(name)
                    || i.repo_tags.iter().flatten().any(|t| t == name)
            })
            .cloned()
            .ok_or_else(|| missing(&format!("image: {}", name)))
    }

    async fn list_containers(&self, _all: bool) -> Result<Vec<ContainerSummary>, DockerError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .iter()
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                names: c.name.clone().map(|n| vec![n]),
                image_id: c.image.clone(),
                state: Some("running".to_string()),
                labels: c.config.as_ref().and_then(|cfg| cfg.labels.clone()),
                ..Default::default()
            })
            .collect())
    }
}

/// A client whose connector hands out `daemon`, counting connection attempts.
pub fn client_for(daemon: &TestDaemon) -> Arc<RuntimeClient> {
    let daemon = daemon.clone();
    Arc::new(RuntimeClient::with_connector(
        ConnectionTarget::LocalDefaults,
        move |_| {
            daemon.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(daemon.clone()) as Arc<dyn DockerBridge>)
        },
    ))
}

/// The complete filter tree over `daemon` with label prefix `svc`.
pub fn api(
    daemon: &TestDaemon,
    cors: Option<&str>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone + 'static {
    let labels = LabelNamespace::new("svc").unwrap();
    let state = Arc::new(AppState::new(client_for(daemon), labels, "web1".to_string()));
    routes(state, cors.map(|list| Arc::new(OriginPolicy::from_list(list))))
}

/// `web1` is an enabled, fully labelled nginx; `api` carries labels but is
/// not enabled; `worker` has no labels at all.
pub fn populated() -> TestDaemon {
    let daemon = TestDaemon::new();
    daemon.add_image(NGINX_ID, &["nginx:latest", "library/nginx:1.27"]);
    daemon.add_image(API_ID, &["ghcr.io/acme/api:1.0"]);
    daemon.add_container(
        "web1",
        NGINX_ID,
        &[
            ("svc.enable", "true"),
            ("svc.name", "Website"),
            ("svc.url", "https://x"),
        ],
    );
    daemon.add_container(
        "api",
        API_ID,
        &[
            ("svc.name", "API"),
            ("svc.description", "Public API"),
            ("tier", "back=end"),
        ],
    );
    daemon.add_container("worker", API_ID, &[]);
    daemon
}

pub fn body_json(response: &warp::http::Response<warp::hyper::body::Bytes>) -> serde_json::Value {
    serde_json::from_slice(response.body()).unwrap()
}
