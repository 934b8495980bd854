//! Chart packages
//!
//! A [`ParentPackage`] is the installable unit. It embeds one
//! [`ServicePackage`] per service and references externally hosted charts
//! through [`ExternalDependency`] records. Both kinds share a [`ChartBase`]
//! holding the Helm metadata, template files and values document.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::archive;
use crate::canonical::{Canonical, SERVICE_VALUES_SCHEMA};
use crate::error::{CoreError, Result};
use crate::params::{ChartParams, ClientFacing, DependencyParams, Params, ToValues};
use crate::schema::{SchemaValidator, ValidationResult};
use crate::values::{Override, ValueDocument};

static DNS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

/// Chart, service and dependency names double as archive directories
pub fn check_name(kind: &'static str, name: &str) -> Result<()> {
    if name.len() > 63 || !DNS_LABEL.is_match(name) {
        return Err(CoreError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Helm `Chart.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub api_version: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ChartDependency>,
}

/// Entry of `Chart.yaml` `dependencies`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDependency {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ChartDependency {
    /// Embedded sub-charts carry no repository
    pub fn is_embedded(&self) -> bool {
        self.repository.as_deref().is_none_or(str::is_empty)
    }
}

/// A file shipped inside a chart, relative to the chart root
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFile {
    pub path: String,
    pub data: Vec<u8>,
}

impl ChartFile {
    pub fn new(path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }
}

/// Archived chart bytes
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArchive {
    pub name: String,
    pub data: Vec<u8>,
}

/// State shared by parent and service packages
#[derive(Debug, Clone)]
pub struct ChartBase {
    name: String,
    version: String,
    metadata: ChartMetadata,
    files: Vec<ChartFile>,
    values: ValueDocument,
}

impl ChartBase {
    fn from_canonical(canonical: Canonical, name: &str, version: &str) -> Result<Self> {
        let kind = match canonical {
            Canonical::Parent => "chart",
            Canonical::Service => "service",
        };
        check_name(kind, name)?;

        let template = canonical.load()?;
        let mut base = Self {
            name: name.to_string(),
            version: version.to_string(),
            metadata: template.metadata,
            files: template.files,
            values: template.values,
        };
        base.sync_metadata();
        Ok(base)
    }

    fn sync_metadata(&mut self) {
        self.metadata.name = self.name.clone();
        self.metadata.version = self.version.clone();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn metadata(&self) -> &ChartMetadata {
        &self.metadata
    }

    pub fn files(&self) -> &[ChartFile] {
        &self.files
    }

    pub fn values(&self) -> &ValueDocument {
        &self.values
    }

    /// `<name>-<version>.tgz`
    pub fn archive_name(&self) -> String {
        format!("{}-{}.tgz", self.name, self.version)
    }
}

/// A single-service sub-chart
#[derive(Debug, Clone)]
pub struct ServicePackage {
    base: ChartBase,
    params: Option<Params>,
    parent: Option<String>,
}

impl ServicePackage {
    /// Build a service chart from the canonical template and synthesize its values
    pub fn new(name: &str, version: &str, params: Params) -> Result<Self> {
        let mut service = Self {
            base: ChartBase::from_canonical(Canonical::Service, name, version)?,
            params: Some(params),
            parent: None,
        };
        service.sync_values();
        Ok(service)
    }

    /// A service known only by name and version, with empty values
    pub fn placeholder(name: &str, version: &str) -> Result<Self> {
        let mut service = Self {
            base: ChartBase::from_canonical(Canonical::Service, name, version)?,
            params: None,
            parent: None,
        };
        service.sync_values();
        Ok(service)
    }

    pub fn base(&self) -> &ChartBase {
        &self.base
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    /// Name of the parent chart this service is attached to
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn sync_values(&mut self) {
        self.base.sync_metadata();
        self.base.values = self
            .params
            .as_ref()
            .map(ToValues::to_values)
            .unwrap_or_default();
    }

    pub fn client_facing_values(&self) -> ValueDocument {
        self.params
            .as_ref()
            .map(ClientFacing::client_facing_values)
            .unwrap_or_default()
    }

    /// Check synthesized values against the service values schema
    pub fn validate(&self, validator: &SchemaValidator) -> ValidationResult {
        if self.params.is_none() {
            return ValidationResult::success();
        }
        validator.validate(self.name(), self.base.values())
    }
}

/// Reference to a chart hosted in an external repository
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalDependency {
    pub name: String,
    pub version: String,
    pub repository_url: String,
    /// Overrides with paths already prefixed by the values alias
    pub overrides: Vec<Override>,
}

impl ExternalDependency {
    pub fn from_params(params: &DependencyParams) -> Self {
        let alias = params.values_alias();
        Self {
            name: params.name.clone(),
            version: params.version.clone(),
            repository_url: params.repository_url.clone(),
            overrides: params.overrides.iter().map(|o| o.prefixed(alias)).collect(),
        }
    }
}

/// The installable chart
#[derive(Debug, Clone)]
pub struct ParentPackage {
    base: ChartBase,
    services: Vec<ServicePackage>,
    external_deps: Vec<ExternalDependency>,
}

impl ParentPackage {
    /// Empty parent chart from the canonical template
    pub fn new(name: &str, version: &str) -> Result<Self> {
        let mut parent = Self {
            base: ChartBase::from_canonical(Canonical::Parent, name, version)?,
            services: Vec::new(),
            external_deps: Vec::new(),
        };
        parent.sync_values()?;
        Ok(parent)
    }

    /// Compile request parameters into a parent chart with its services
    pub fn compile(params: &ChartParams) -> Result<Self> {
        semver::Version::parse(&params.version).map_err(|source| CoreError::InvalidVersion {
            version: params.version.clone(),
            source,
        })?;

        let mut parent = Self::new(&params.name, &params.version)?;

        for service in &params.services {
            let package = ServicePackage::new(&service.name, &params.version, service.params.clone())?;
            parent.add_service(package)?;
        }

        for dep in &params.dependencies {
            parent.add_external_dependency(dep)?;
        }

        tracing::debug!(
            chart = %params.name,
            version = %params.version,
            services = parent.services.len(),
            dependencies = parent.external_deps.len(),
            "compiled chart"
        );

        Ok(parent)
    }

    pub fn base(&self) -> &ChartBase {
        &self.base
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn version(&self) -> &str {
        self.base.version()
    }

    pub fn metadata(&self) -> &ChartMetadata {
        self.base.metadata()
    }

    pub fn services(&self) -> &[ServicePackage] {
        &self.services
    }

    pub fn external_dependencies(&self) -> &[ExternalDependency] {
        &self.external_deps
    }

    /// Attach a service sub-chart
    pub fn add_service(&mut self, mut service: ServicePackage) -> Result<()> {
        if self.services.iter().any(|s| s.name() == service.name()) {
            return Err(CoreError::DuplicateServiceName {
                name: service.name().to_string(),
            });
        }
        self.check_undeclared(service.name())?;

        service.parent = Some(self.name().to_string());
        self.base.metadata.dependencies.push(ChartDependency {
            name: service.name().to_string(),
            version: service.base.version().to_string(),
            repository: None,
            alias: None,
        });
        self.services.push(service);

        self.sync_values()
    }

    /// Reference an external chart; its overrides land under the values alias
    pub fn add_external_dependency(&mut self, params: &DependencyParams) -> Result<()> {
        if let Some(alias) = params.values_alias.as_deref().filter(|a| !a.is_empty()) {
            check_name("values alias", alias)?;
        }
        self.attach_external(ExternalDependency::from_params(params))
    }

    fn attach_external(&mut self, dep: ExternalDependency) -> Result<()> {
        check_name("dependency", &dep.name)?;
        self.check_undeclared(&dep.name)?;

        self.base.metadata.dependencies.push(ChartDependency {
            name: dep.name.clone(),
            version: dep.version.clone(),
            repository: Some(dep.repository_url.clone()),
            alias: None,
        });
        self.external_deps.push(dep);

        self.sync_values()
    }

    /// Every `Chart.yaml` dependency owns `charts/<name>/`
    fn check_undeclared(&self, name: &str) -> Result<()> {
        if self.base.metadata.dependencies.iter().any(|d| d.name == name) {
            return Err(CoreError::DuplicateDependency {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Parent values: an empty namespace per service, then dependency overrides
    pub fn values(&self) -> Result<ValueDocument> {
        let mut values = ValueDocument::new();
        for service in &self.services {
            if values.contains_key(service.name()) {
                return Err(CoreError::DuplicateServiceName {
                    name: service.name().to_string(),
                });
            }
            values.insert(service.name(), ValueDocument::new());
        }

        for dep in &self.external_deps {
            for o in &dep.overrides {
                values.apply_override(o)?;
            }
        }

        Ok(values)
    }

    /// Re-sync metadata and values bottom-up
    pub fn sync_values(&mut self) -> Result<()> {
        for service in &mut self.services {
            service.sync_values();
        }

        self.base.sync_metadata();
        self.base.values = self.values()?;
        Ok(())
    }

    /// Validate every service against the service values schema
    pub fn validate(&self) -> Result<ValidationResult> {
        let validator = SchemaValidator::from_json(SERVICE_VALUES_SCHEMA)?;

        let mut result = ValidationResult::success();
        for service in &self.services {
            result.merge(service.validate(&validator));
        }
        Ok(result)
    }

    /// Write the chart into one deterministic `.tgz`
    ///
    /// `resolved` holds the fetched archives of every external dependency.
    pub fn archive(&mut self, resolved: &[ChartArchive]) -> Result<ChartArchive> {
        self.sync_values()?;
        archive::archive(self, resolved)
    }

    /// Rebuild a parent chart from its archive
    ///
    /// Embedded sub-charts come back as placeholders with empty values and
    /// external dependencies without their overrides.
    pub fn load_from_archive(chart: &ChartArchive) -> Result<Self> {
        let entries = archive::read_entries(&chart.data)?;

        let root = entries
            .keys()
            .find_map(|path| {
                path.strip_suffix("/Chart.yaml")
                    .filter(|dir| !dir.contains('/'))
            })
            .ok_or_else(|| CoreError::InvalidArchive {
                message: format!("{} has no top-level Chart.yaml", chart.name),
            })?
            .to_string();

        let prefix = format!("{}/", root);
        let mut metadata: Option<ChartMetadata> = None;
        let mut values = ValueDocument::new();
        let mut files = Vec::new();

        for (path, data) in &entries {
            let Some(rel) = path.strip_prefix(&prefix) else {
                continue;
            };
            match rel {
                "Chart.yaml" => metadata = Some(serde_yaml::from_slice(data)?),
                "values.yaml" => {
                    values = ValueDocument::from_yaml(&String::from_utf8_lossy(data))?;
                }
                // Sub-chart directories are rebuilt from the dependency list
                _ if is_unpacked_subchart(rel) => {}
                _ => files.push(ChartFile::new(rel, data.clone())),
            }
        }

        let mut metadata = metadata.ok_or_else(|| CoreError::InvalidArchive {
            message: format!("{} has no {}/Chart.yaml", chart.name, root),
        })?;
        check_name("chart", &metadata.name)?;
        let declared = std::mem::take(&mut metadata.dependencies);

        let mut parent = Self {
            base: ChartBase {
                name: metadata.name.clone(),
                version: metadata.version.clone(),
                metadata,
                files,
                values,
            },
            services: Vec::new(),
            external_deps: Vec::new(),
        };

        for dep in declared {
            if dep.is_embedded() {
                parent.add_service(ServicePackage::placeholder(&dep.name, &dep.version)?)?;
            } else {
                parent.attach_external(ExternalDependency {
                    name: dep.name,
                    version: dep.version,
                    repository_url: dep.repository.unwrap_or_default(),
                    overrides: Vec::new(),
                })?;
            }
        }

        Ok(parent)
    }
}

/// `charts/<dir>/...` entries; packed `charts/*.tgz` stay as files
fn is_unpacked_subchart(rel: &str) -> bool {
    rel.strip_prefix("charts/")
        .is_some_and(|rest| rest.contains('/'))
}

/// Either kind of package
#[derive(Debug, Clone)]
pub enum Package {
    Parent(ParentPackage),
    Service(ServicePackage),
}

impl Package {
    pub fn base(&self) -> &ChartBase {
        match self {
            Package::Parent(p) => p.base(),
            Package::Service(s) => s.base(),
        }
    }

    pub fn name(&self) -> &str {
        self.base().name()
    }

    pub fn version(&self) -> &str {
        self.base().version()
    }
}

impl From<ParentPackage> for Package {
    fn from(parent: ParentPackage) -> Self {
        Package::Parent(parent)
    }
}

impl From<ServicePackage> for Package {
    fn from(service: ServicePackage) -> Self {
        Package::Service(service)
    }
}
