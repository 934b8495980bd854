//! Cluster executor
//!
//! Installs chart archives into a cluster. Only an in-memory recording
//! implementation ships; it backs tests and dry runs.

use async_trait::async_trait;
use chartwright_core::{ChartArchive, ValueDocument};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("release '{name}' already exists in namespace '{namespace}'")]
    ReleaseExists { name: String, namespace: String },

    #[error("release '{name}' not found in namespace '{namespace}'")]
    ReleaseNotFound { name: String, namespace: String },

    #[error("cluster error: {message}")]
    Cluster { message: String },
}

pub type Result<T> = std::result::Result<T, ExecutorError>;

/// Installs and removes releases
#[async_trait]
pub trait ClusterExecutor: Send + Sync {
    async fn install(
        &self,
        archive: &ChartArchive,
        release_name: &str,
        namespace: &str,
        overrides: &ValueDocument,
    ) -> Result<()>;

    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<()>;
}

/// Random release name, `chartwright-` plus 8 hex digits
pub fn generate_release_name() -> String {
    format!("chartwright-{:08x}", rand::random::<u32>())
}

/// A release held by the recording executor
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledRelease {
    pub name: String,
    pub namespace: String,
    pub archive: String,
    pub overrides: ValueDocument,
}

/// In-memory executor recording every install
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    /// (namespace, name) -> release
    releases: Arc<RwLock<HashMap<(String, String), InstalledRelease>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str, namespace: &str) -> Option<InstalledRelease> {
        self.releases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.releases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ClusterExecutor for RecordingExecutor {
    async fn install(
        &self,
        archive: &ChartArchive,
        release_name: &str,
        namespace: &str,
        overrides: &ValueDocument,
    ) -> Result<()> {
        let mut releases = self.releases.write().unwrap_or_else(PoisonError::into_inner);
        let key = (namespace.to_string(), release_name.to_string());
        if releases.contains_key(&key) {
            return Err(ExecutorError::ReleaseExists {
                name: release_name.to_string(),
                namespace: namespace.to_string(),
            });
        }

        tracing::debug!(release = %release_name, namespace = %namespace, archive = %archive.name, "recorded install");
        releases.insert(
            key,
            InstalledRelease {
                name: release_name.to_string(),
                namespace: namespace.to_string(),
                archive: archive.name.clone(),
                overrides: overrides.clone(),
            },
        );
        Ok(())
    }

    async fn uninstall(&self, release_name: &str, namespace: &str) -> Result<()> {
        let removed = self
            .releases
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(namespace.to_string(), release_name.to_string()));

        match removed {
            Some(_) => Ok(()),
            None => Err(ExecutorError::ReleaseNotFound {
                name: release_name.to_string(),
                namespace: namespace.to_string(),
            }),
        }
    }
}
