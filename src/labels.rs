//! Label conventions used for service discovery.
//!
//! Every discovery label lives under one configurable prefix, e.g. with the
//! default prefix `dockinfo` a container publishes itself through
//! `dockinfo.enable`, `dockinfo.name`, `dockinfo.service.url` and friends.

use crate::error::{DockinfoError, Result};
use crate::types::ServiceDescriptor;
use std::collections::HashMap;

pub const DEFAULT_LABEL_PREFIX: &str = "dockinfo";

/// Configurable label prefix and the keys derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelNamespace {
    prefix: String,
}

impl LabelNamespace {
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into().trim().trim_end_matches('.').to_string();
        if prefix.is_empty() {
            return Err(DockinfoError::Config(
                crate::error::ConfigError::InvalidValue {
                    field: "label_prefix".to_string(),
                    reason: "must not be empty".to_string(),
                },
            ));
        }
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Fully qualified key for `suffix`, e.g. `key("service.url")`.
    pub fn key(&self, suffix: &str) -> String {
        format!("{}.{}", self.prefix, suffix)
    }

    pub fn enable_key(&self) -> String {
        self.key("enable")
    }

    /// `<ns>.enable` equals `true`, ignoring case.
    pub fn is_enabled(&self, labels: &HashMap<String, String>) -> bool {
        labels
            .get(&self.enable_key())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Project labels into a service descriptor, falling back to the runtime
    /// container name when no name label is set.
    pub fn service_descriptor(
        &self,
        labels: &HashMap<String, String>,
        container_name: &str,
    ) -> ServiceDescriptor {
        let name = self
            .first_non_empty(labels, &["name", "service.name"])
            .unwrap_or(container_name)
            .to_string();
        let url = self
            .first_non_empty(labels, &["service.url", "url"])
            .unwrap_or_default()
            .to_string();
        let description = self
            .first_non_empty(labels, &["description"])
            .unwrap_or_default()
            .to_string();

        ServiceDescriptor {
            name,
            url,
            description,
        }
    }

    fn first_non_empty<'a>(
        &self,
        labels: &'a HashMap<String, String>,
        suffixes: &[&str],
    ) -> Option<&'a str> {
        suffixes
            .iter()
            .filter_map(|suffix| labels.get(&self.key(suffix)))
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }
}

impl Default for LabelNamespace {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_LABEL_PREFIX.to_string(),
        }
    }
}

/// Exact-match `key=value` label predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter {
    pub key: String,
    pub value: String,
}

impl LabelFilter {
    /// Split at the first `=`; the value may itself contain `=`.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split_once('=') {
            Some((key, value)) => Ok(Self {
                key: key.to_string(),
                value: value.to_string(),
            }),
            None => Err(DockinfoError::invalid_request(
                "Label filter must be in format key=value",
            )),
        }
    }

    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        labels.get(&self.key).is_some_and(|v| *v == self.value)
    }
}

impl std::fmt::Display for LabelFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
