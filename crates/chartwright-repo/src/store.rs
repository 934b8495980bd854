//! Object stores holding published repositories
//!
//! Paths are `/`-joined and relative to the store root:
//! - **Memory**: a shared map, for tests and dry runs
//! - **File**: a directory on the local filesystem

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{RepoError, Result};

/// Blob storage backing a chart repository
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create or replace the object at `path`
    async fn upload(&self, path: &str, data: Vec<u8>) -> Result<()>;

    /// Whether an object exists at `path`
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Read the whole object at `path`
    async fn read_all(&self, path: &str) -> Result<Vec<u8>>;
}

/// Join repository-relative path segments
pub fn object_path(repo_dir: &str, file: &str) -> String {
    let repo_dir = repo_dir.trim_matches('/');
    if repo_dir.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", repo_dir, file)
    }
}

/// In-memory object store
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upload to `path` fail
    pub fn fail_uploads_to(&self, path: impl Into<String>) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into());
    }

    /// Object contents, if present
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// All stored paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(&self, path: &str, data: Vec<u8>) -> Result<()> {
        if self
            .failing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
        {
            return Err(RepoError::Store {
                path: path.to_string(),
                message: "upload rejected".to_string(),
            });
        }

        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), data);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path))
    }

    async fn read_all(&self, path: &str) -> Result<Vec<u8>> {
        self.get(path).ok_or_else(|| RepoError::ObjectNotFound {
            path: path.to_string(),
        })
    }
}

/// Filesystem-backed object store
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object path below the root, rejecting escapes
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(RepoError::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn upload(&self, path: &str, data: Vec<u8>) -> Result<()> {
        let target = self.resolve(path)?;
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        tokio::fs::create_dir_all(&dir).await?;

        // Staged per writer; readers never observe a half-written object
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut staged = tempfile::NamedTempFile::new_in(&dir)?;
            staged.write_all(&data)?;
            staged.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&target).await?)
    }

    async fn read_all(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RepoError::ObjectNotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
