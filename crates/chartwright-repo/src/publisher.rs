//! Publishing charts into a repository
//!
//! A publish uploads three objects under the repository directory:
//!
//! ```text
//! <repo>/<name>-<version>.tgz
//! <repo>/index.yaml
//! <repo>/<name>-<version>-values.yaml
//! ```
//!
//! The index read-modify-write is serialized per repository directory within
//! this process. Separate processes publishing into the same store can still
//! race on `index.yaml`.

use chartwright_core::ParentPackage;
use chartwright_core::projector;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::clock::Clock;
use crate::error::{RepoError, Result};
use crate::fetcher::DependencyFetcher;
use crate::index::{IndexDocument, compute_digest};
use crate::store::{ObjectStore, object_path};

/// Name of the repository index object
pub const INDEX_FILE: &str = "index.yaml";

/// Objects written by a successful publish
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedChart {
    pub archive_path: String,
    pub index_path: String,
    pub values_path: String,
    pub digest: String,
}

/// Repository index manager
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    fetcher: Arc<dyn DependencyFetcher>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
        fetcher: Arc<dyn DependencyFetcher>,
    ) -> Self {
        Self {
            store,
            clock,
            fetcher,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn fetcher(&self) -> &Arc<dyn DependencyFetcher> {
        &self.fetcher
    }

    fn repo_lock(&self, repo_dir: &str) -> RepoLock<'_> {
        let key = repo_dir.trim_matches('/').to_string();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let mutex = locks.entry(key.clone()).or_default().clone();
        RepoLock {
            publisher: self,
            key,
            mutex,
        }
    }

    /// Archive a chart with its external dependencies
    pub async fn archive(&self, parent: &mut ParentPackage) -> Result<chartwright_core::ChartArchive> {
        let resolved = self
            .fetcher
            .fetch_all(parent.external_dependencies())
            .await?;
        Ok(parent.archive(&resolved)?)
    }

    /// Publish a chart into `repo_dir`
    pub async fn publish(&self, parent: &mut ParentPackage, repo_dir: &str) -> Result<PublishedChart> {
        let archive = self.archive(parent).await?;
        let digest = compute_digest(&archive.data);

        let archive_path = object_path(repo_dir, &archive.name);
        self.store
            .upload(&archive_path, archive.data)
            .await
            .map_err(RepoError::at_step("upload archive"))?;

        let index_path = object_path(repo_dir, INDEX_FILE);
        {
            let lock = self.repo_lock(repo_dir);
            let _guard = lock.mutex.lock().await;

            let mut index = self
                .load_index(&index_path)
                .await
                .map_err(RepoError::at_step("load index"))?;

            index.add(parent.metadata(), &archive.name, &digest, self.clock.now());

            let yaml = index.to_yaml().map_err(RepoError::at_step("upload index"))?;
            self.store
                .upload(&index_path, yaml.into_bytes())
                .await
                .map_err(RepoError::at_step("upload index"))?;
        }

        let values_path = object_path(
            repo_dir,
            &format!("{}-{}-values.yaml", parent.name(), parent.version()),
        );
        let values = projector::parent_client_facing_values(parent)
            .and_then(|v| v.to_yaml())
            .map_err(|e| RepoError::at_step("upload values")(e.into()))?;
        self.store
            .upload(&values_path, values.into_bytes())
            .await
            .map_err(RepoError::at_step("upload values"))?;

        tracing::info!(
            chart = %parent.name(),
            version = %parent.version(),
            repository = %repo_dir,
            digest = %digest,
            "published chart"
        );

        Ok(PublishedChart {
            archive_path,
            index_path,
            values_path,
            digest,
        })
    }

    /// Current index of a repository, or a fresh one
    pub async fn load_index(&self, index_path: &str) -> Result<IndexDocument> {
        if !self.store.exists(index_path).await? {
            return Ok(IndexDocument::new(self.clock.now()));
        }

        let data = self.store.read_all(index_path).await?;
        IndexDocument::from_bytes(&data)
    }
}

/// Handle on a repository directory's index lock
///
/// Entries only live while some publish holds a handle; the last one out
/// removes the directory from the map.
struct RepoLock<'a> {
    publisher: &'a Publisher,
    key: String,
    mutex: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for RepoLock<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .publisher
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Handles are only cloned under the map lock: map plus self means idle
        if locks
            .get(&self.key)
            .is_some_and(|m| Arc::ptr_eq(m, &self.mutex) && Arc::strong_count(m) == 2)
        {
            locks.remove(&self.key);
        }
    }
}
