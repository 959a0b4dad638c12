//! Directory scans over every container on the host.
//!
//! Each container is projected independently; a container that cannot be
//! projected is skipped with a warning and never fails the scan.

use crate::error::{DockinfoError, Result};
use crate::labels::{LabelFilter, LabelNamespace};
use crate::resolver::image_tags;
use crate::runtime::{DockerBridge, RuntimeClient, classify_listing};
use crate::types::{ContainerSummary, ServiceDescriptor, clean_container_name, short_id};
use bollard::models::ContainerSummary as RawContainer;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Longest image id prefix shown when an image has no tags (`sha256:` + 12).
const IMAGE_ID_DISPLAY_LEN: usize = 19;

/// What a scan does when the daemon cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Report an empty directory
    Lenient,
    /// Fail with `RuntimeUnavailable`
    Strict,
}

pub struct Directory {
    client: Arc<RuntimeClient>,
    labels: LabelNamespace,
}

impl Directory {
    pub fn new(client: Arc<RuntimeClient>, labels: LabelNamespace) -> Self {
        Self { client, labels }
    }

    /// Every container with name, short id, image and status.
    pub async fn list_all(&self, mode: ScanMode) -> Result<Vec<ContainerSummary>> {
        let Some((bridge, containers)) = self.scan(mode).await? else {
            return Ok(Vec::new());
        };

        let mut summaries = Vec::with_capacity(containers.len());
        for container in containers {
            match summarize(bridge.as_ref(), &container).await {
                Some(summary) => summaries.push(summary),
                None => warn!(id = ?container.id, "Skipping container that could not be processed"),
            }
        }
        Ok(summaries)
    }

    /// Services whose `<ns>.enable` label is `true`.
    pub async fn list_enabled(&self, mode: ScanMode) -> Result<Vec<ServiceDescriptor>> {
        self.list_services(mode, |labels| self.labels.is_enabled(labels))
            .await
    }

    /// Services carrying exactly the label in `filter`.
    pub async fn list_by_label(
        &self,
        filter: &LabelFilter,
        mode: ScanMode,
    ) -> Result<Vec<ServiceDescriptor>> {
        self.list_services(mode, |labels| filter.matches(labels))
            .await
    }

    async fn list_services<P>(&self, mode: ScanMode, predicate: P) -> Result<Vec<ServiceDescriptor>>
    where
        P: Fn(&HashMap<String, String>) -> bool,
    {
        let Some((_, containers)) = self.scan(mode).await? else {
            return Ok(Vec::new());
        };

        let empty = HashMap::new();
        let services = containers
            .iter()
            .filter(|c| predicate(c.labels.as_ref().unwrap_or(&empty)))
            .filter_map(|c| {
                let service = self.service(c);
                if service.is_none() {
                    warn!(id = ?c.id, "Skipping matching container without a usable name");
                }
                service
            })
            .collect();
        Ok(services)
    }

    fn service(&self, container: &RawContainer) -> Option<ServiceDescriptor> {
        let empty = HashMap::new();
        let labels = container.labels.as_ref().unwrap_or(&empty);
        let runtime_name = primary_name(container).unwrap_or_default();
        let service = self.labels.service_descriptor(labels, &runtime_name);
        (!service.name.is_empty()).then_some(service)
    }

    /// One listing call; `None` means the daemon is down and `mode` is lenient.
    async fn scan(
        &self,
        mode: ScanMode,
    ) -> Result<Option<(Arc<dyn DockerBridge>, Vec<RawContainer>)>> {
        let listing = match self.client.get().await {
            Ok(bridge) => bridge
                .list_containers(true)
                .await
                .map(|containers| (bridge, containers))
                .map_err(classify_listing),
            Err(e) => Err(e),
        };

        match listing {
            Ok((bridge, containers)) => {
                debug!(count = containers.len(), "Containers listed");
                Ok(Some((bridge, containers)))
            }
            Err(e @ DockinfoError::RuntimeUnavailable { .. }) if mode == ScanMode::Lenient => {
                error!(error = %e, "Docker connection error, reporting empty directory");
                Ok(None)
            }
            Err(e) => {
                error!(error = %e, "Error listing containers");
                Err(e)
            }
        }
    }
}

fn primary_name(container: &RawContainer) -> Option<String> {
    container
        .names
        .as_ref()?
        .first()
        .map(|n| clean_container_name(n))
        .filter(|n| !n.is_empty())
}

async fn summarize(bridge: &dyn DockerBridge, container: &RawContainer) -> Option<ContainerSummary> {
    let id = container.id.as_deref()?;
    let name = primary_name(container)?;

    Some(ContainerSummary {
        image: image_label(bridge, container).await,
        id: short_id(id),
        status: container.state.clone().unwrap_or_default(),
        name,
    })
}

/// First tag of the container's image, else a shortened image id, else
/// `unknown` when the image cannot be looked up.
async fn image_label(bridge: &dyn DockerBridge, container: &RawContainer) -> String {
    let Some(image_id) = container.image_id.as_deref() else {
        return "unknown".to_string();
    };
    match bridge.inspect_image(image_id).await {
        Ok(image) => image_tags(&image)
            .into_iter()
            .next()
            .unwrap_or_else(|| image_id.chars().take(IMAGE_ID_DISPLAY_LEN).collect()),
        Err(e) => {
            warn!(image = %image_id, error = %e, "Image lookup failed during scan");
            "unknown".to_string()
        }
    }
}
