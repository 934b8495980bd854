//! External dependency fetching
//!
//! Resolves the archives of charts a parent depends on so they can be
//! embedded under `charts/`:
//! - `http(s)://` repositories through their `index.yaml`
//! - `file://` repositories laid out the same way on disk
//! - `oci://` registries are not supported

use async_trait::async_trait;
use chartwright_core::{ChartArchive, ExternalDependency};
use futures::future::try_join_all;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{RepoError, Result};
use crate::index::{IndexDocument, IndexEntry, compute_digest, digest_matches};

/// Fetches the archives of external dependencies
#[async_trait]
pub trait DependencyFetcher: Send + Sync {
    /// Fetch the archive satisfying one dependency
    async fn fetch(&self, dep: &ExternalDependency) -> Result<ChartArchive>;

    /// Fetch every dependency concurrently, preserving order
    async fn fetch_all(&self, deps: &[ExternalDependency]) -> Result<Vec<ChartArchive>> {
        try_join_all(deps.iter().map(|dep| self.fetch(dep))).await
    }
}

/// Fetcher for Helm-style `index.yaml` repositories
#[derive(Debug, Clone)]
pub struct RepositoryFetcher {
    client: reqwest::Client,
}

impl RepositoryFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chartwright/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, base: &Url, dep: &ExternalDependency) -> Result<ChartArchive> {
        let index_url = base.join("index.yaml")?;
        tracing::debug!(url = %index_url, "fetching repository index");

        let index = self.get_bytes(&index_url).await?;
        let index = IndexDocument::from_bytes(&index)?;
        let entry = best_match(&index, dep)?;

        let archive_url = base.join(download_url(entry, dep)?)?;
        tracing::debug!(url = %archive_url, version = %entry.version, "downloading dependency");

        let data = self.get_bytes(&archive_url).await?;
        verify(entry, &data)?;

        Ok(ChartArchive {
            name: archive_name(&archive_url, entry),
            data,
        })
    }

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RepoError::HttpError {
                status: status.as_u16(),
                message: format!("GET {}", url),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_file(&self, base: &Url, dep: &ExternalDependency) -> Result<ChartArchive> {
        let root = file_path(base)?;

        let index = tokio::fs::read(root.join("index.yaml")).await?;
        let index = IndexDocument::from_bytes(&index)?;
        let entry = best_match(&index, dep)?;

        let archive_url = base.join(download_url(entry, dep)?)?;
        let data = tokio::fs::read(file_path(&archive_url)?).await?;
        verify(entry, &data)?;

        Ok(ChartArchive {
            name: archive_name(&archive_url, entry),
            data,
        })
    }
}

#[async_trait]
impl DependencyFetcher for RepositoryFetcher {
    async fn fetch(&self, dep: &ExternalDependency) -> Result<ChartArchive> {
        let base = repository_base(&dep.repository_url)?;

        match base.scheme() {
            "http" | "https" => self.fetch_http(&base, dep).await,
            "file" => self.fetch_file(&base, dep).await,
            _ => Err(RepoError::UnsupportedRepository {
                url: dep.repository_url.clone(),
            }),
        }
    }
}

/// Parse a repository URL, making sure it ends with `/` so joins stay below it
fn repository_base(url: &str) -> Result<Url> {
    let with_slash = if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    };
    Url::parse(&with_slash).map_err(|e| RepoError::InvalidRepositoryUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn file_path(url: &Url) -> Result<PathBuf> {
    url.to_file_path()
        .map_err(|_| RepoError::InvalidRepositoryUrl {
            url: url.to_string(),
            reason: "not a local path".to_string(),
        })
}

fn best_match<'a>(index: &'a IndexDocument, dep: &ExternalDependency) -> Result<&'a IndexEntry> {
    index
        .find_best_match(&dep.name, &dep.version)
        .map_err(|e| match e {
            RepoError::ChartNotFound { name, .. } => RepoError::ChartNotFound {
                name,
                repo: dep.repository_url.clone(),
            },
            other => other,
        })
}

fn download_url<'a>(entry: &'a IndexEntry, dep: &ExternalDependency) -> Result<&'a str> {
    entry.download_url().ok_or_else(|| RepoError::ChartNotFound {
        name: format!("{}@{}", entry.name, entry.version),
        repo: dep.repository_url.clone(),
    })
}

fn verify(entry: &IndexEntry, data: &[u8]) -> Result<()> {
    if entry.digest.is_empty() {
        return Ok(());
    }

    let actual = compute_digest(data);
    if !digest_matches(&entry.digest, &actual) {
        return Err(RepoError::IntegrityCheckFailed {
            name: entry.name.clone(),
            expected: entry.digest.clone(),
            actual,
        });
    }
    Ok(())
}

fn archive_name(url: &Url, entry: &IndexEntry) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}-{}.tgz", entry.name, entry.version))
}
