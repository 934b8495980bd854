//! Typed deployment parameters and their values synthesis
//!
//! [`ChartParams`] is the request shape: a chart name and version, the
//! services to embed and the external charts to depend on. Every typed
//! parameter knows how to turn itself into a [`ValueDocument`] fragment
//! through [`ToValues`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::values::{Override, Value, ValueDocument};

/// Env var carrying the Helm release name inside service pods
pub const HELM_RELEASE_NAME_ENV_KEY: &str = "HELM_RELEASE_NAME";
/// Env var carrying the Helm release namespace inside service pods
pub const HELM_NAMESPACE_ENV_KEY: &str = "HELM_NAMESPACE";

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Conversion of a typed parameter into a values fragment
pub trait ToValues {
    fn to_values(&self) -> ValueDocument;
}

/// Redacted projection handed to end users
pub trait ClientFacing {
    fn client_facing_values(&self) -> ValueDocument;
}

/// Convert a list of typed parameters into a list value
pub fn list_to_values<T: ToValues>(items: &[T]) -> Value {
    Value::List(items.iter().map(|i| Value::Map(i.to_values())).collect())
}

/// Full chart request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartParams {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub services: Vec<ServiceParams>,
    #[serde(default)]
    pub dependencies: Vec<DependencyParams>,
}

impl ChartParams {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One embedded service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceParams {
    pub name: String,
    #[serde(flatten)]
    pub params: Params,
}

/// An externally hosted chart the parent depends on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyParams {
    pub name: String,
    pub version: String,
    pub repository_url: String,
    /// Key the dependency's values live under in the parent (defaults to its name)
    #[serde(default)]
    pub values_alias: Option<String>,
    #[serde(default)]
    pub overrides: Vec<Override>,
}

impl DependencyParams {
    pub fn values_alias(&self) -> &str {
        self.values_alias
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Per-service deployment parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Params {
    pub image: Image,
    pub replica_count: i32,
    pub resources: Resources,
    pub environment: BTreeMap<String, String>,
    pub secrets: Vec<Secret>,
    pub endpoints: Vec<Endpoint>,
    pub init_config: InitConfig,
    pub persistent_volume_claims: Vec<PersistentVolumeClaim>,
    pub ingress: IngressConfig,
    pub meta_environment_fields_enabled: bool,
}

impl Params {
    fn meta_environment_fields(&self) -> ValueDocument {
        if !self.meta_environment_fields_enabled {
            return ValueDocument::new().with("enabled", false);
        }

        let fields = vec![
            ValueDocument::new()
                .with("name", HELM_RELEASE_NAME_ENV_KEY)
                .with("fieldPath", "metadata.labels['app.kubernetes.io/instance']"),
            ValueDocument::new()
                .with("name", HELM_NAMESPACE_ENV_KEY)
                .with("fieldPath", "metadata.namespace"),
        ];

        ValueDocument::new()
            .with("enabled", true)
            .with("fields", fields)
    }

    fn environment_values(&self) -> ValueDocument {
        self.environment
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect()
    }

    /// Name of the pull secret generated for private images
    pub fn image_pull_secret_name(&self) -> Option<String> {
        self.image
            .credential
            .as_ref()
            .map(|_| format!("registry-credentials-{}", self.image.name.replace('/', "-")))
    }
}

impl ToValues for Params {
    fn to_values(&self) -> ValueDocument {
        let mut values = ValueDocument::new()
            .with("replicaCount", self.replica_count)
            .with("image", self.image.to_values())
            .with("environment", self.environment_values())
            .with("secrets", list_to_values(&self.secrets))
            .with("resources", self.resources.to_values())
            .with("initConfig", self.init_config.to_values())
            .with(
                "persistentVolumeClaims",
                list_to_values(&self.persistent_volume_claims),
            )
            .with("ingress", self.ingress.to_values())
            .with("services", list_to_values(&self.endpoints))
            .with("serviceAccount", ValueDocument::new().with("create", false))
            .with("metaEnvironmentFields", self.meta_environment_fields());

        if let Some(name) = self.image_pull_secret_name() {
            values.insert(
                "imagePullSecrets",
                vec![ValueDocument::new().with("name", name)],
            );
        }

        values.compacted()
    }
}

impl ClientFacing for Params {
    fn client_facing_values(&self) -> ValueDocument {
        let secrets: ValueDocument = self
            .secrets
            .iter()
            .map(|s| (s.name.clone(), Value::Map(s.client_facing_values())))
            .collect();

        ValueDocument::new()
            .with("secrets", secrets)
            .with("ingress", self.ingress.client_facing_values())
            .compacted()
    }
}

/// Image pull policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullPolicy {
    Always,
    IfNotPresent,
    Never,
}

impl PullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Always => "Always",
            PullPolicy::IfNotPresent => "IfNotPresent",
            PullPolicy::Never => "Never",
        }
    }
}

/// Kind of private registry an image is pulled from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryType {
    #[default]
    Docker,
    Github,
    Gitlab,
}

impl RegistryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryType::Docker => "docker",
            RegistryType::Github => "github",
            RegistryType::Gitlab => "gitlab",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCredential {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub registry: RegistryType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Image {
    pub name: String,
    pub tag: String,
    pub pull_policy: Option<PullPolicy>,
    pub credential: Option<ImageCredential>,
}

impl ToValues for Image {
    fn to_values(&self) -> ValueDocument {
        let mut values = ValueDocument::new()
            .with("repository", self.name.as_str())
            .with("tag", self.tag.as_str());

        if let Some(policy) = self.pull_policy {
            values.insert("pullPolicy", policy.as_str());
        }

        if let Some(credential) = &self.credential {
            values.insert("registry", credential.registry.as_str());
            values.insert(
                "credential",
                ValueDocument::new()
                    .with("username", credential.username.as_str())
                    .with("password", credential.password.as_str()),
            );
        }

        values
    }
}

/// CPU in cores, memory in bytes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Resources {
    pub cpu_cores_requested: f64,
    pub cpu_cores_limit: f64,
    pub memory_bytes_requested: u64,
    pub memory_bytes_limit: u64,
}

fn millicores(cores: f64) -> String {
    format!("{}m", (cores * 1000.0).round() as i64)
}

impl ToValues for Resources {
    fn to_values(&self) -> ValueDocument {
        ValueDocument::new()
            .with(
                "limits",
                ValueDocument::new()
                    .with("cpu", millicores(self.cpu_cores_limit))
                    .with("memory", self.memory_bytes_limit.to_string()),
            )
            .with(
                "requests",
                ValueDocument::new()
                    .with("cpu", millicores(self.cpu_cores_requested))
                    .with("memory", self.memory_bytes_requested.to_string()),
            )
    }
}

/// Secret injected as an environment variable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    pub name: String,
    pub environment_key: String,
}

impl ToValues for Secret {
    fn to_values(&self) -> ValueDocument {
        ValueDocument::new()
            .with("name", self.name.as_str())
            .with("environmentKey", self.environment_key.as_str())
            .with("value", "")
    }
}

impl ClientFacing for Secret {
    fn client_facing_values(&self) -> ValueDocument {
        self.to_values()
    }
}

/// Exposed container port
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub port: u16,
}

impl Endpoint {
    /// Kubernetes service name for this port
    pub fn service_name(&self) -> String {
        format!("service-{}", self.port)
    }
}

impl ToValues for Endpoint {
    fn to_values(&self) -> ValueDocument {
        ValueDocument::new().with("port", self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitConfig {
    /// Shell commands run in order before the main container starts
    pub init_commands: Vec<String>,
}

impl ToValues for InitConfig {
    fn to_values(&self) -> ValueDocument {
        let commands: Vec<Value> = self
            .init_commands
            .iter()
            .enumerate()
            .map(|(i, cmd)| {
                Value::Map(
                    ValueDocument::new()
                        .with("name", format!("init-command-{}", i))
                        .with("command", vec!["/bin/sh", "-c", cmd.as_str()]),
                )
            })
            .collect();

        ValueDocument::new().with("initCommands", Value::List(commands))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaim {
    pub name: String,
    pub size_bytes: u64,
    pub path: String,
}

impl PersistentVolumeClaim {
    /// Claim size in whole GiB, rounded up
    pub fn size_gib(&self) -> u64 {
        (self.size_bytes as f64 / GIB).ceil() as u64
    }
}

impl ToValues for PersistentVolumeClaim {
    fn to_values(&self) -> ValueDocument {
        ValueDocument::new()
            .with("name", self.name.as_str())
            .with("size", self.size_gib())
            .with("path", self.path.as_str())
    }
}

/// Which ingress controller class should expose the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngressPreference {
    Internal,
    #[default]
    External,
}

impl IngressPreference {
    pub fn scheme(&self) -> &'static str {
        match self {
            IngressPreference::Internal => "internal",
            IngressPreference::External => "external",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngressConfig {
    pub enabled: bool,
    pub preference: IngressPreference,
    pub port: u16,
}

/// Host placeholder written into client-facing values
pub const INGRESS_HOST_PLACEHOLDER: &str = "TODO: Replace this with the domain name where you will host the service. Note, this field has no effect if the ingress is internal.";

impl ToValues for IngressConfig {
    fn to_values(&self) -> ValueDocument {
        if !self.enabled {
            return ValueDocument::new().with("enabled", false);
        }

        ValueDocument::new()
            .with("enabled", true)
            .with("scheme", self.preference.scheme())
            .with("port", self.port)
    }
}

impl ClientFacing for IngressConfig {
    fn client_facing_values(&self) -> ValueDocument {
        if !self.enabled {
            return ValueDocument::new();
        }

        self.to_values().with(
            "external",
            ValueDocument::new().with("host", INGRESS_HOST_PLACEHOLDER),
        )
    }
}
