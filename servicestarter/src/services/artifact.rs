//! Local artifact repository locator
//!
//! Resolves coordinates against a Maven-layout repository on disk:
//! `<root>/<group as path>/<name>/<version>/<name>-<version>[-<classifier>].jar`.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use shared::{instance_debug, ArtifactCoordinates};

use crate::error::{StarterError, StarterResult};
use crate::traits::ArtifactLocator;

/// Locator for artifacts already present in a local repository
pub struct LocalRepositoryLocator {
    /// Repository root directory
    root: PathBuf,
}

impl LocalRepositoryLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Where `coordinates` live inside the repository, whether present or not
    pub fn artifact_path(&self, coordinates: &ArtifactCoordinates) -> PathBuf {
        let mut path = self.root.clone();
        for segment in coordinates.group.split('.').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(&coordinates.name);
        path.push(&coordinates.version);

        let file_name = match &coordinates.classifier {
            Some(classifier) => format!("{}-{}-{}.jar", coordinates.name, coordinates.version, classifier),
            None => format!("{}-{}.jar", coordinates.name, coordinates.version),
        };
        path.push(file_name);
        path
    }
}

#[async_trait]
impl ArtifactLocator for LocalRepositoryLocator {
    async fn resolve(&self, coordinates: &ArtifactCoordinates) -> StarterResult<PathBuf> {
        let path = self.artifact_path(coordinates);

        let metadata = fs::metadata(&path).await.map_err(|e| StarterError::ArtifactResolution {
            coordinates: coordinates.to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;

        if !metadata.is_file() {
            return Err(StarterError::ArtifactResolution {
                coordinates: coordinates.to_string(),
                reason: format!("{} is not a file", path.display()),
            });
        }

        let resolved = fs::canonicalize(&path).await?;
        instance_debug!(coordinates.name, "Resolved {} to {}", coordinates, resolved.display());
        Ok(resolved)
    }
}
