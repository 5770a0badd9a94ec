//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{SharedError, SharedResult};

/// Key-value pair for process environment properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse a `key=value` string. Only the first `=` separates, so values may
    /// contain `=` themselves.
    pub fn parse(input: &str) -> SharedResult<Self> {
        match input.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Self::new(key.trim(), value)),
            _ => Err(SharedError::InvalidProperty {
                input: input.to_string(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for KeyValuePair {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

/// Extra properties supplied per test on top of an instance's defaults
pub type ExtraProperties = Vec<KeyValuePair>;

/// Coordinates of a packaged, versioned service artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactCoordinates {
    pub group: String,
    pub name: String,
    pub classifier: Option<String>,
    pub version: String,
}

impl ArtifactCoordinates {
    /// Classifier under which bootable service jars are published
    pub const SERVICE_BOOT: &'static str = "service-boot";

    /// Coordinates for a bootable service jar in `group`
    pub fn service(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            classifier: Some(Self::SERVICE_BOOT.to_string()),
            version: version.into(),
        }
    }

    pub fn with_classifier(mut self, classifier: Option<String>) -> Self {
        self.classifier = classifier;
        self
    }
}

impl fmt::Display for ArtifactCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(classifier) => write!(f, "{}:{}:{}:{}", self.group, self.name, classifier, self.version),
            None => write!(f, "{}:{}:{}", self.group, self.name, self.version),
        }
    }
}

/// One registered instance as reported by the discovery registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstanceRecord {
    pub application: String,
    pub instance_id: String,
    pub host_name: String,
    pub port: u16,
    pub status: String,
}

impl ServiceInstanceRecord {
    pub fn is_up(&self) -> bool {
        self.status.eq_ignore_ascii_case("UP")
    }
}
