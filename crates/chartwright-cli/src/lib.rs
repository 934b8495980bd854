//! Chartwright - compile deployment parameters into Helm charts
//!
//! The library half of the `chartwright` binary:
//! - `service`: `ChartService`, the publish / validate / generate operations
//! - `executor`: the cluster executor seam and its in-memory recorder
//! - `config`: the service configuration file

pub mod config;
pub mod executor;
pub mod service;

pub use config::{ConfigError, ConfigOverrides, ServiceConfig};
pub use executor::{ClusterExecutor, ExecutorError, RecordingExecutor, generate_release_name};
pub use service::{ChartService, Code, InstallResponse, ServiceError, ValidateChartResponse};
