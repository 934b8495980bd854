//! Chartwright Core - compiling deployment parameters into Helm charts
//!
//! This crate provides the chart side of Chartwright:
//! - `ValueDocument`: nested configuration values with insert-only overrides
//! - `ChartParams`: typed service parameters and their values synthesis
//! - `ParentPackage`: the parent chart with embedded service sub-charts
//! - `archive`: deterministic `.tgz` archives in the Helm layout
//! - `projector`: the redacted values view handed to end users

pub mod archive;
pub mod canonical;
pub mod error;
pub mod package;
pub mod params;
pub mod projector;
pub mod schema;
pub mod values;

pub use error::{CoreError, Result, ValidationErrorInfo};
pub use package::{
    ChartArchive, ChartBase, ChartDependency, ChartFile, ChartMetadata, ExternalDependency,
    Package, ParentPackage, ServicePackage,
};
pub use params::{
    ChartParams, ClientFacing, DependencyParams, Endpoint, Image, ImageCredential, IngressConfig,
    IngressPreference, InitConfig, Params, PersistentVolumeClaim, PullPolicy, RegistryType,
    Resources, Secret, ServiceParams, ToValues, list_to_values,
};
pub use projector::{client_facing_values, parent_client_facing_values};
pub use schema::{SchemaValidator, ValidationResult};
pub use values::{Override, Value, ValueDocument};
