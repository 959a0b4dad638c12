//! Single-object lookups: one container or one image, projected into the
//! descriptor shapes served over HTTP.

use crate::error::{ObjectKind, Result};
use crate::labels::LabelNamespace;
use crate::runtime::{RuntimeClient, classify};
use crate::types::{
    ContainerDescriptor, HostBinding, ImageDescriptor, PortTable, ServiceDescriptor,
    clean_container_name, short_id,
};
use bollard::models::{ContainerInspectResponse, ImageInspect, PortMap};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Tag Docker reports for untagged images.
const UNTAGGED: &str = "<none>:<none>";

pub struct Resolver {
    client: Arc<RuntimeClient>,
    labels: LabelNamespace,
}

impl Resolver {
    pub fn new(client: Arc<RuntimeClient>, labels: LabelNamespace) -> Self {
        Self { client, labels }
    }

    /// Full runtime description of the container `name`.
    pub async fn resolve_full(&self, name: &str) -> Result<ContainerDescriptor> {
        let container = self.inspect_container(name).await?;

        let image = match container.image.as_deref() {
            Some(image_id) => {
                let bridge = self.client.get().await?;
                match bridge.inspect_image(image_id).await {
                    Ok(image) => Some(image),
                    Err(e) => {
                        warn!(container = %name, image = %image_id, error = %e, "Image lookup failed, reporting image id");
                        None
                    }
                }
            }
            None => None,
        };

        Ok(container_descriptor(container, image.as_ref()))
    }

    /// Label-only service description of the container `name`.
    pub async fn resolve_labels_only(&self, name: &str) -> Result<ServiceDescriptor> {
        let container = self.inspect_container(name).await?;
        let labels = container
            .config
            .and_then(|c| c.labels)
            .unwrap_or_default();
        let runtime_name = container
            .name
            .as_deref()
            .map(clean_container_name)
            .unwrap_or_else(|| name.to_string());

        Ok(self.labels.service_descriptor(&labels, &runtime_name))
    }

    /// Image metadata for `name`, which may be a reference like
    /// `ghcr.io/org/app:1.2` or an image id.
    pub async fn resolve_image(&self, name: &str) -> Result<ImageDescriptor> {
        let bridge = self.client.get().await?;
        let image = bridge.inspect_image(name).await.map_err(|e| {
            let err = classify(e, ObjectKind::Image, name);
            error!(image = %name, error = %err, "Error getting image info");
            err
        })?;
        debug!(image = %name, "Image resolved");
        Ok(image_descriptor(image))
    }

    async fn inspect_container(&self, name: &str) -> Result<ContainerInspectResponse> {
        let bridge = self.client.get().await?;
        bridge.inspect_container(name).await.map_err(|e| {
            let err = classify(e, ObjectKind::Container, name);
            error!(container = %name, error = %err, "Error getting container info");
            err
        })
    }
}

/// Tags with Docker's `<none>:<none>` placeholder removed.
pub(crate) fn image_tags(image: &ImageInspect) -> Vec<String> {
    image
        .repo_tags
        .iter()
        .flatten()
        .filter(|t| t.as_str() != UNTAGGED)
        .cloned()
        .collect()
}

pub(crate) fn container_descriptor(
    container: ContainerInspectResponse,
    image: Option<&ImageInspect>,
) -> ContainerDescriptor {
    let image_id = container
        .image
        .clone()
        .or_else(|| image.and_then(|i| i.id.clone()))
        .unwrap_or_default();
    let image_name = image
        .and_then(|i| image_tags(i).into_iter().next())
        .unwrap_or_else(|| image_id.clone());

    let (labels, environment) = match container.config {
        Some(config) => (
            config.labels.unwrap_or_default().into_iter().collect(),
            config.env.unwrap_or_default(),
        ),
        None => Default::default(),
    };

    ContainerDescriptor {
        name: container
            .name
            .as_deref()
            .map(clean_container_name)
            .unwrap_or_default(),
        id: container.id.as_deref().map(short_id).unwrap_or_default(),
        image: image_name,
        image_id,
        status: container
            .state
            .and_then(|s| s.status)
            .map(|s| s.to_string())
            .unwrap_or_default(),
        labels,
        created: container.created,
        ports: port_table(container.network_settings.and_then(|n| n.ports)),
        environment,
    }
}

fn port_table(ports: Option<PortMap>) -> PortTable {
    ports
        .unwrap_or_default()
        .into_iter()
        .map(|(port, bindings)| {
            let bindings = bindings.map(|list| {
                list.into_iter()
                    .map(|b| HostBinding {
                        host_ip: b.host_ip.unwrap_or_default(),
                        host_port: b.host_port.unwrap_or_default(),
                    })
                    .collect()
            });
            (port, bindings)
        })
        .collect()
}

pub(crate) fn image_descriptor(image: ImageInspect) -> ImageDescriptor {
    ImageDescriptor {
        tags: image_tags(&image),
        id: image.id.unwrap_or_default(),
        created: image.created,
        size: image.size,
        architecture: image.architecture,
        os: image.os,
    }
}
