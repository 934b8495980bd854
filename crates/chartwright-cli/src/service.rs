//! Chart service
//!
//! The operations the CLI exposes: publish, validate, generate, and the
//! install round trip through a [`ClusterExecutor`]. Failures carry a status
//! [`Code`] in the manner of RPC status codes.

use chartwright_core::{ChartArchive, ChartParams, CoreError, ParentPackage, ValidationErrorInfo, ValueDocument};
use chartwright_repo::{
    FileStore, IndexDocument, INDEX_FILE, PublishedChart, Publisher, RepoError, RepositoryFetcher,
    SystemClock, object_path,
};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::executor::{ClusterExecutor, ExecutorError, generate_release_name};

/// Status code of a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    InvalidArgument,
    FailedPrecondition,
    Internal,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ServiceError {
    #[error("{message}")]
    #[diagnostic(code(chartwright::invalid_argument))]
    InvalidArgument { message: String },

    #[error("chart validation failed with {} error(s)", .errors.len())]
    #[diagnostic(
        code(chartwright::validation),
        help("run `chartwright validate` to list every violation")
    )]
    ChartValidation { errors: Vec<ValidationErrorInfo> },

    #[error("{message}")]
    #[diagnostic(code(chartwright::failed_precondition))]
    FailedPrecondition { message: String },

    #[error("{message}")]
    #[diagnostic(code(chartwright::internal))]
    Internal { message: String },
}

impl ServiceError {
    pub fn code(&self) -> Code {
        match self {
            ServiceError::InvalidArgument { .. } => Code::InvalidArgument,
            ServiceError::ChartValidation { .. } | ServiceError::FailedPrecondition { .. } => {
                Code::FailedPrecondition
            }
            ServiceError::Internal { .. } => Code::Internal,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { errors } => ServiceError::ChartValidation { errors },
            CoreError::DuplicateServiceName { .. }
            | CoreError::DuplicateDependency { .. }
            | CoreError::InvalidName { .. }
            | CoreError::OverrideConflict { .. }
            | CoreError::InvalidVersion { .. } => ServiceError::invalid_argument(err.to_string()),
            other => ServiceError::internal(other.to_string()),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Core(core) => core.into(),
            RepoError::InvalidPath { .. } => ServiceError::invalid_argument(err.to_string()),
            other => ServiceError::internal(other.to_string()),
        }
    }
}

impl From<ExecutorError> for ServiceError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::ReleaseNotFound { .. } => ServiceError::FailedPrecondition {
                message: err.to_string(),
            },
            other => ServiceError::internal(format!("failed to install chart: {}", other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Outcome of `validate_chart`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateChartResponse {
    pub valid: bool,
    pub errors: Vec<ValidationErrorInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallResponse {
    pub release_name: String,
    pub namespace: String,
}

pub struct ChartService {
    publisher: Publisher,
    executor: Option<Arc<dyn ClusterExecutor>>,
    namespace: String,
}

impl ChartService {
    pub fn new(publisher: Publisher, namespace: impl Into<String>) -> Self {
        Self {
            publisher,
            executor: None,
            namespace: namespace.into(),
        }
    }

    /// Service over the configured local store
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let fetcher = RepositoryFetcher::new(config.dependency_timeout())?;
        let publisher = Publisher::new(
            Arc::new(FileStore::new(&config.store_root)),
            Arc::new(SystemClock),
            Arc::new(fetcher),
        );
        Ok(Self::new(publisher, &config.namespace))
    }

    pub fn with_executor(mut self, executor: Arc<dyn ClusterExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Compile, validate and publish a chart into `repository_directory`
    pub async fn publish_chart(
        &self,
        chart: &ChartParams,
        repository_directory: &str,
    ) -> Result<PublishedChart> {
        require_services(chart)?;
        if repository_directory.trim_matches('/').is_empty() {
            return Err(ServiceError::invalid_argument("repository directory is required"));
        }

        let mut parent = compile_valid(chart)?;
        Ok(self.publisher.publish(&mut parent, repository_directory).await?)
    }

    /// Check a chart's values; schema violations are reported, not raised
    pub async fn validate_chart(&self, chart: &ChartParams) -> Result<ValidateChartResponse> {
        let outcome = ParentPackage::compile(chart).and_then(|parent| parent.validate());

        match outcome {
            Ok(result) => Ok(ValidateChartResponse {
                valid: result.is_valid,
                errors: result.errors,
            }),
            Err(CoreError::Validation { errors }) => Ok(ValidateChartResponse {
                valid: false,
                errors,
            }),
            Err(e) => Err(ServiceError::internal(format!("failed to validate chart: {}", e))),
        }
    }

    /// Compile, validate and archive a chart without publishing it
    pub async fn generate_chart(&self, chart: &ChartParams) -> Result<ChartArchive> {
        require_services(chart)?;

        let mut parent = compile_valid(chart)?;
        Ok(self.publisher.archive(&mut parent).await?)
    }

    /// Generate a chart and install it under a fresh release name
    pub async fn generate_and_install(
        &self,
        chart: &ChartParams,
        namespace: Option<&str>,
    ) -> Result<InstallResponse> {
        let executor = self.executor()?;
        let archive = self.generate_chart(chart).await?;

        let namespace = namespace.unwrap_or(&self.namespace);
        let release_name = generate_release_name();
        executor
            .install(&archive, &release_name, namespace, &ValueDocument::new())
            .await?;

        tracing::info!(release = %release_name, namespace = %namespace, chart = %archive.name, "installed chart");

        Ok(InstallResponse {
            release_name,
            namespace: namespace.to_string(),
        })
    }

    pub async fn uninstall(&self, release_name: &str, namespace: Option<&str>) -> Result<()> {
        let executor = self.executor()?;
        if release_name.is_empty() {
            return Err(ServiceError::invalid_argument("release name is required"));
        }

        let namespace = namespace.unwrap_or(&self.namespace);
        executor.uninstall(release_name, namespace).await?;
        tracing::info!(release = %release_name, namespace = %namespace, "uninstalled release");
        Ok(())
    }

    /// Current index of a repository directory
    pub async fn repository_index(&self, repository_directory: &str) -> Result<IndexDocument> {
        let path = object_path(repository_directory, INDEX_FILE);
        Ok(self.publisher.load_index(&path).await?)
    }

    fn executor(&self) -> Result<&Arc<dyn ClusterExecutor>> {
        self.executor
            .as_ref()
            .ok_or_else(|| ServiceError::FailedPrecondition {
                message: "no cluster executor configured".to_string(),
            })
    }
}

fn require_services(chart: &ChartParams) -> Result<()> {
    if chart.services.is_empty() {
        return Err(ServiceError::invalid_argument("services are required"));
    }
    Ok(())
}

fn compile_valid(chart: &ChartParams) -> Result<ParentPackage> {
    let parent = ParentPackage::compile(chart)?;
    parent.validate()?.into_result()?;
    Ok(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordingExecutor;
    use chartwright_repo::{FixedClock, MemoryStore};
    use std::time::Duration;

    fn service(store: &MemoryStore) -> ChartService {
        let publisher = Publisher::new(
            Arc::new(store.clone()),
            Arc::new(FixedClock::at("2024-03-01T00:00:00Z").unwrap()),
            Arc::new(RepositoryFetcher::new(Duration::from_secs(5)).unwrap()),
        );
        ChartService::new(publisher, "apps")
    }

    fn chart(replicas: i32) -> ChartParams {
        ChartParams::from_yaml(&format!(
            r#"
name: shop
version: 1.0.0
services:
  - name: api
    replicaCount: {replicas}
    image:
      name: acme/api
      tag: v1
"#
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_publish_requires_services() {
        let store = MemoryStore::new();
        let mut params = chart(1);
        params.services.clear();

        let err = service(&store).publish_chart(&params, "repo").await.unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(err.to_string(), "services are required");
    }

    #[tokio::test]
    async fn test_publish_rejects_invalid_values_before_upload() {
        let store = MemoryStore::new();

        let err = service(&store).publish_chart(&chart(-1), "repo").await.unwrap_err();
        assert!(matches!(&err, ServiceError::ChartValidation { errors } if errors[0].path == "api/replicaCount"));
        assert_eq!(err.code(), Code::FailedPrecondition);
        assert!(store.paths().is_empty());
    }

    #[tokio::test]
    async fn test_publish_reports_failed_step() {
        let store = MemoryStore::new();
        store.fail_uploads_to("repo/shop-1.0.0.tgz");

        let err = service(&store).publish_chart(&chart(1), "repo").await.unwrap_err();
        assert_eq!(err.code(), Code::Internal);
        assert!(err.to_string().starts_with("failed to upload archive"));
    }

    #[tokio::test]
    async fn test_unsafe_names_are_invalid_arguments() {
        let store = MemoryStore::new();
        let service = service(&store);

        let mut params = chart(1);
        params.services[0].name = "../../../tmp/api".into();
        let err = service.publish_chart(&params, "repo").await.unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);

        let mut params = chart(1);
        params.name = String::new();
        let err = service.generate_chart(&params).await.unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert!(store.paths().is_empty());
    }

    #[tokio::test]
    async fn test_publish_and_read_index() {
        let store = MemoryStore::new();
        let service = service(&store);

        let published = service.publish_chart(&chart(2), "repo").await.unwrap();
        assert_eq!(published.index_path, "repo/index.yaml");

        let index = service.repository_index("repo").await.unwrap();
        assert_eq!(index.get("shop").unwrap()[0].digest, published.digest);
    }

    #[tokio::test]
    async fn test_validate_reports_violations() {
        let store = MemoryStore::new();

        let response = service(&store).validate_chart(&chart(-1)).await.unwrap();
        assert!(!response.valid);
        assert_eq!(response.errors[0].path, "api/replicaCount");

        let response = service(&store).validate_chart(&chart(3)).await.unwrap();
        assert!(response.valid);
        assert!(response.errors.is_empty());
    }

    #[tokio::test]
    async fn test_validate_empty_chart_is_valid() {
        let store = MemoryStore::new();
        let mut params = chart(1);
        params.services.clear();

        assert!(service(&store).validate_chart(&params).await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_validate_other_failures_are_internal() {
        let store = MemoryStore::new();
        let mut params = chart(1);
        params.services.push(params.services[0].clone());

        let err = service(&store).validate_chart(&params).await.unwrap_err();
        assert_eq!(err.code(), Code::Internal);
        assert!(err.to_string().starts_with("failed to validate chart"));
    }

    #[tokio::test]
    async fn test_generate_chart() {
        let store = MemoryStore::new();

        let archive = service(&store).generate_chart(&chart(1)).await.unwrap();
        assert_eq!(archive.name, "shop-1.0.0.tgz");
        assert!(!archive.data.is_empty());
        assert!(store.paths().is_empty());
    }

    #[tokio::test]
    async fn test_install_needs_executor() {
        let store = MemoryStore::new();

        let err = service(&store)
            .generate_and_install(&chart(1), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::FailedPrecondition);
    }

    #[tokio::test]
    async fn test_install_round_trip() {
        let store = MemoryStore::new();
        let executor = RecordingExecutor::new();
        let service = service(&store).with_executor(Arc::new(executor.clone()));

        let installed = service.generate_and_install(&chart(1), None).await.unwrap();
        assert!(installed.release_name.starts_with("chartwright-"));
        assert_eq!(installed.namespace, "apps");

        let release = executor.get(&installed.release_name, "apps").unwrap();
        assert_eq!(release.archive, "shop-1.0.0.tgz");

        service.uninstall(&installed.release_name, None).await.unwrap();
        assert!(executor.is_empty());

        let err = service.uninstall(&installed.release_name, None).await.unwrap_err();
        assert_eq!(err.code(), Code::FailedPrecondition);
    }
}
