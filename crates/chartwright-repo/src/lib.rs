//! Chartwright Repository Management
//!
//! This crate publishes compiled charts into Helm-style repositories:
//!
//! - **Object stores**: where repositories live (memory, local directory)
//! - **Index management**: `index.yaml` read-modify-write, newest first
//! - **Dependency fetching**: external charts from `http(s)://` and `file://` repositories
//!
//! ## Example
//!
//! ```rust,no_run
//! use chartwright_core::{ChartParams, ParentPackage};
//! use chartwright_repo::{FileStore, Publisher, RepositoryFetcher, SystemClock};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(params: ChartParams) -> Result<(), Box<dyn std::error::Error>> {
//! let publisher = Publisher::new(
//!     Arc::new(FileStore::new("/srv/charts")),
//!     Arc::new(SystemClock),
//!     Arc::new(RepositoryFetcher::new(Duration::from_secs(30))?),
//! );
//!
//! let mut chart = ParentPackage::compile(&params)?;
//! let published = publisher.publish(&mut chart, "stable").await?;
//! println!("{}", published.archive_path);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod fetcher;
pub mod index;
pub mod publisher;
pub mod store;

// Re-exports for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{RepoError, Result};
pub use fetcher::{DependencyFetcher, RepositoryFetcher};
pub use index::{IndexDocument, IndexEntry, compute_digest, digest_matches, normalize_constraint};
pub use publisher::{INDEX_FILE, PublishedChart, Publisher};
pub use store::{FileStore, MemoryStore, ObjectStore, object_path};
