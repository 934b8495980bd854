//! Client-facing values
//!
//! The values file published next to every chart only carries what an end
//! user is expected to fill in: secret placeholders and the ingress host.

use crate::error::{CoreError, Result};
use crate::package::{Package, ParentPackage};
use crate::values::ValueDocument;

/// Project a package into its redacted values view
pub fn client_facing_values(package: &Package) -> Result<ValueDocument> {
    match package {
        Package::Service(service) => Ok(service.client_facing_values()),
        Package::Parent(parent) => parent_client_facing_values(parent),
    }
}

/// Redacted values of every service, nested under the service name
pub fn parent_client_facing_values(parent: &ParentPackage) -> Result<ValueDocument> {
    let mut values = ValueDocument::new();
    for service in parent.services() {
        if values.contains_key(service.name()) {
            return Err(CoreError::DuplicateServiceName {
                name: service.name().to_string(),
            });
        }
        values.insert(service.name(), service.client_facing_values());
    }
    Ok(values)
}
