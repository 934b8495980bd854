//! Canonical chart templates compiled into the binary
//!
//! Every generated chart starts from one of two embedded templates: the
//! parent chart that aggregates services, and the service chart that runs a
//! single container. Template files are shipped verbatim and never rendered.

use crate::error::{CoreError, Result};
use crate::package::{ChartFile, ChartMetadata};
use crate::values::ValueDocument;

const PARENT: &[(&str, &str)] = &[
    ("Chart.yaml", include_str!("../templates/parent/Chart.yaml")),
    ("values.yaml", include_str!("../templates/parent/values.yaml")),
    (
        "templates/NOTES.txt",
        include_str!("../templates/parent/templates/NOTES.txt"),
    ),
];

const SERVICE: &[(&str, &str)] = &[
    ("Chart.yaml", include_str!("../templates/service/Chart.yaml")),
    ("values.yaml", include_str!("../templates/service/values.yaml")),
    (
        "values.schema.json",
        include_str!("../templates/service/values.schema.json"),
    ),
    (
        "templates/_helpers.tpl",
        include_str!("../templates/service/templates/_helpers.tpl"),
    ),
    (
        "templates/deployment.yaml",
        include_str!("../templates/service/templates/deployment.yaml"),
    ),
    (
        "templates/service.yaml",
        include_str!("../templates/service/templates/service.yaml"),
    ),
    (
        "templates/secret.yaml",
        include_str!("../templates/service/templates/secret.yaml"),
    ),
    (
        "templates/ingress.yaml",
        include_str!("../templates/service/templates/ingress.yaml"),
    ),
    (
        "templates/pvc.yaml",
        include_str!("../templates/service/templates/pvc.yaml"),
    ),
    (
        "templates/imagepullsecret.yaml",
        include_str!("../templates/service/templates/imagepullsecret.yaml"),
    ),
    (
        "templates/serviceaccount.yaml",
        include_str!("../templates/service/templates/serviceaccount.yaml"),
    ),
];

/// Values schema of the service template
pub const SERVICE_VALUES_SCHEMA: &str = include_str!("../templates/service/values.schema.json");

/// Which embedded template to start from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canonical {
    Parent,
    Service,
}

/// A canonical template split into its parts
#[derive(Debug, Clone)]
pub struct Template {
    pub metadata: ChartMetadata,
    pub values: ValueDocument,
    pub files: Vec<ChartFile>,
}

impl Canonical {
    fn sources(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Canonical::Parent => PARENT,
            Canonical::Service => SERVICE,
        }
    }

    /// Load the template, parsing `Chart.yaml` and `values.yaml`
    pub fn load(self) -> Result<Template> {
        let mut metadata = None;
        let mut values = ValueDocument::new();
        let mut files = Vec::new();

        for (path, content) in self.sources() {
            match *path {
                "Chart.yaml" => {
                    metadata = Some(serde_yaml::from_str::<ChartMetadata>(content).map_err(
                        |e| CoreError::InvalidTemplate {
                            message: format!("{:?} Chart.yaml: {}", self, e),
                        },
                    )?);
                }
                "values.yaml" => values = ValueDocument::from_yaml(content)?,
                _ => files.push(ChartFile::new(*path, content.as_bytes().to_vec())),
            }
        }

        let metadata = metadata.ok_or_else(|| CoreError::InvalidTemplate {
            message: format!("{:?} template has no Chart.yaml", self),
        })?;

        Ok(Template {
            metadata,
            values,
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaValidator;

    #[test]
    fn test_parent_template_loads() {
        let template = Canonical::Parent.load().unwrap();
        assert_eq!(template.metadata.api_version, "v2");
        assert!(template.metadata.dependencies.is_empty());
        assert!(template.values.is_empty());
    }

    #[test]
    fn test_service_template_ships_schema() {
        let template = Canonical::Service.load().unwrap();
        assert!(template.files.iter().any(|f| f.path == "values.schema.json"));
        assert!(template.files.iter().any(|f| f.path == "templates/deployment.yaml"));
        assert!(SchemaValidator::from_json(SERVICE_VALUES_SCHEMA).is_ok());
    }
}
