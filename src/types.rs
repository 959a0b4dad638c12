use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label-derived view of a container, as published to sibling services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub url: String,
    pub description: String,
}

/// Host side of a published port, in the Docker Engine wire shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostBinding {
    #[serde(rename = "HostIp")]
    pub host_ip: String,
    #[serde(rename = "HostPort")]
    pub host_port: String,
}

/// Container port (`"80/tcp"`) to its host bindings; `None` when unpublished.
/// Ordered so repeated responses serialize identically.
pub type PortTable = BTreeMap<String, Option<Vec<HostBinding>>>;

/// Full runtime description of one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub name: String,
    pub id: String,
    pub image: String,
    pub image_id: String,
    pub status: String,
    pub labels: BTreeMap<String, String>,
    pub created: Option<String>,
    pub ports: PortTable,
    pub environment: Vec<String>,
}

/// Listing row produced by a directory scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub name: String,
    pub id: String,
    pub image: String,
    pub status: String,
}

/// Image metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub id: String,
    pub tags: Vec<String>,
    pub created: Option<String>,
    pub size: Option<i64>,
    pub architecture: Option<String>,
    pub os: Option<String>,
}

/// Body returned for every failed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageList {
    pub count: usize,
    pub packages: Vec<ServiceDescriptor>,
}

impl From<Vec<ServiceDescriptor>> for PackageList {
    fn from(packages: Vec<ServiceDescriptor>) -> Self {
        Self {
            count: packages.len(),
            packages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredPackageList {
    pub filter: String,
    pub count: usize,
    pub packages: Vec<ServiceDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerList {
    pub count: usize,
    pub containers: Vec<ContainerSummary>,
}

impl From<Vec<ContainerSummary>> for ContainerList {
    fn from(containers: Vec<ContainerSummary>) -> Self {
        Self {
            count: containers.len(),
            containers,
        }
    }
}

/// Docker reports names with a leading slash (`/web1`).
pub fn clean_container_name(name: &str) -> String {
    name.trim_start_matches('/').to_string()
}

/// First 12 characters of a container id, the form `docker ps` prints.
pub fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}
