//! dockinfo - read-only HTTP directory over the Docker daemon
//!
//! Resolves containers, images and label-described services through the
//! Docker Engine API and serves them as JSON for sibling services.

pub mod config;
pub mod cors;
pub mod directory;
pub mod error;
pub mod labels;
pub mod monitoring;
pub mod resolver;
pub mod runtime;
pub mod server;
pub mod types;

pub use config::Settings;
pub use error::{DockinfoError, Result};

pub use types::{ContainerDescriptor, ContainerSummary, ImageDescriptor, ServiceDescriptor};

/// Re-exports for easier API usage
pub mod api {
    pub use crate::cors::OriginPolicy;
    pub use crate::directory::{Directory, ScanMode};
    pub use crate::labels::{LabelFilter, LabelNamespace};
    pub use crate::resolver::Resolver;
    pub use crate::runtime::{ConnectionTarget, DockerBridge, RuntimeClient};
    pub use crate::server::{ApiServer, AppState};
}
