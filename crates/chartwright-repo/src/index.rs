//! Repository index types
//!
//! Helm-compatible `index.yaml`: one list of chart versions per chart name,
//! kept sorted newest first.

use chartwright_core::{ChartDependency, ChartMetadata};
use chrono::{DateTime, Utc};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{RepoError, Result};

/// Repository index (Helm-compatible)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Chart versions indexed by name
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<IndexEntry>>,

    /// When this index was generated; the epoch when absent
    #[serde(default = "unix_epoch")]
    pub generated: DateTime<Utc>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

impl IndexDocument {
    /// Empty index generated at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            api_version: default_api_version(),
            entries: BTreeMap::new(),
            generated: now,
        }
    }

    /// Parse index from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RepoError::IndexParseError {
            message: e.to_string(),
        })
    }

    /// Parse index from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let yaml = std::str::from_utf8(bytes).map_err(|e| RepoError::IndexParseError {
            message: format!("Invalid UTF-8: {}", e),
        })?;
        Self::from_yaml(yaml)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// All versions of a chart, newest first
    pub fn get(&self, name: &str) -> Option<&[IndexEntry]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Record a published archive
    ///
    /// Existing entries for the same version are kept; `generated` moves to
    /// `created`.
    pub fn add(
        &mut self,
        metadata: &ChartMetadata,
        filename: &str,
        digest: &str,
        created: DateTime<Utc>,
    ) {
        let entry = IndexEntry {
            api_version: metadata.api_version.clone(),
            name: metadata.name.clone(),
            version: metadata.version.clone(),
            description: metadata.description.clone(),
            chart_type: metadata.chart_type.clone(),
            app_version: metadata.app_version.clone(),
            dependencies: metadata.dependencies.clone(),
            urls: vec![filename.to_string()],
            digest: digest.to_string(),
            created: Some(created),
        };

        self.entries
            .entry(entry.name.clone())
            .or_default()
            .push(entry);
        self.generated = created;
        self.sort_entries();
    }

    /// Sort every chart's versions newest first; equal versions by `created`
    pub fn sort_entries(&mut self) {
        for versions in self.entries.values_mut() {
            versions.sort_by(|a, b| compare_versions(b, a).then_with(|| b.created.cmp(&a.created)));
        }
    }

    /// Highest version matching a constraint
    pub fn find_best_match(&self, name: &str, constraint: &str) -> Result<&IndexEntry> {
        let entries = self.entries.get(name).ok_or_else(|| RepoError::ChartNotFound {
            name: name.to_string(),
            repo: "index".to_string(),
        })?;

        let normalized = normalize_constraint(constraint);
        let req = VersionReq::parse(&normalized).map_err(|e| RepoError::UnsatisfiableConstraint {
            name: name.to_string(),
            constraint: constraint.to_string(),
            available: format!("invalid constraint: {}", e),
        })?;

        entries
            .iter()
            .filter(|e| e.parsed_version().is_some_and(|v| req.matches(&v)))
            .max_by(|a, b| compare_versions(a, b))
            .ok_or_else(|| RepoError::UnsatisfiableConstraint {
                name: name.to_string(),
                constraint: constraint.to_string(),
                available: entries
                    .iter()
                    .map(|e| e.version.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Chart version entry in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    #[serde(default = "default_chart_api_version")]
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

    /// Archive locations, relative to the repository or absolute
    #[serde(default)]
    pub urls: Vec<String>,

    /// SHA256 digest of the archive (hex)
    #[serde(default)]
    pub digest: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

fn default_chart_api_version() -> String {
    "v2".to_string()
}

impl IndexEntry {
    /// Get the primary download URL
    pub fn download_url(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    /// Parse version as semver
    pub fn parsed_version(&self) -> Option<Version> {
        Version::parse(self.version.trim_start_matches('v')).ok()
    }
}

/// Semver order; unparsable versions sort below every valid one
fn compare_versions(a: &IndexEntry, b: &IndexEntry) -> Ordering {
    match (a.parsed_version(), b.parsed_version()) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.version.cmp(&b.version),
    }
}

/// Translate Helm-style constraints into `semver` requirements
///
/// `16.x.x` becomes `16.*`, a bare `1.2.3` pins exactly, empty means any.
pub fn normalize_constraint(constraint: &str) -> String {
    let c = constraint.trim();
    if c.is_empty() || c == "*" || c.eq_ignore_ascii_case("latest") {
        return "*".to_string();
    }

    if !c.starts_with(|ch: char| ch.is_ascii_digit() || ch == 'v') {
        return c.to_string();
    }

    let c = c.trim_start_matches('v');
    let parts: Vec<&str> = c.split('.').collect();
    if let Some(pos) = parts
        .iter()
        .position(|p| p.eq_ignore_ascii_case("x") || *p == "*")
    {
        if pos == 0 {
            return "*".to_string();
        }
        return format!("{}.*", parts[..pos].join("."));
    }

    if Version::parse(c).is_ok() {
        format!("={}", c)
    } else {
        c.to_string()
    }
}

/// SHA256 of the data, hex encoded
pub fn compute_digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Check if two digests match (with or without a `sha256:` prefix)
pub fn digest_matches(expected: &str, actual: &str) -> bool {
    let normalize = |d: &str| {
        d.trim()
            .to_lowercase()
            .replace("sha256:", "")
            .replace("sha256-", "")
    };
    normalize(expected) == normalize(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(name: &str, version: &str) -> ChartMetadata {
        ChartMetadata {
            api_version: "v2".into(),
            name: name.into(),
            version: version.into(),
            description: None,
            chart_type: Some("application".into()),
            app_version: None,
            dependencies: vec![],
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn sample_index() -> IndexDocument {
        let yaml = r#"
apiVersion: v1
generated: "2024-01-01T00:00:00Z"
entries:
  postgresql:
    - name: postgresql
      version: "16.2.1"
      urls:
        - https://charts.example.com/postgresql-16.2.1.tgz
      digest: "abc123"
    - name: postgresql
      version: "16.0.0"
      urls:
        - postgresql-16.0.0.tgz
    - name: postgresql
      version: "15.5.0"
      urls:
        - postgresql-15.5.0.tgz
"#;
        IndexDocument::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_add_sorts_newest_first() {
        let mut index = IndexDocument::new(at("2024-01-01T00:00:00Z"));
        index.add(&metadata("x", "0.9.0"), "x-0.9.0.tgz", "aa", at("2024-01-02T00:00:00Z"));
        index.add(&metadata("x", "1.0.0"), "x-1.0.0.tgz", "bb", at("2024-01-03T00:00:00Z"));

        let versions: Vec<&str> = index.get("x").unwrap().iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, vec!["1.0.0", "0.9.0"]);
        assert_eq!(index.generated, at("2024-01-03T00:00:00Z"));
        assert_eq!(index.get("x").unwrap()[0].urls, vec!["x-1.0.0.tgz"]);
    }

    #[test]
    fn test_missing_generated_defaults_to_epoch() {
        let index = IndexDocument::from_yaml("apiVersion: v1\nentries: {}\n").unwrap();
        assert_eq!(index.generated, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_duplicate_versions_keep_history() {
        let mut index = IndexDocument::new(at("2024-01-01T00:00:00Z"));
        index.add(&metadata("x", "1.0.0"), "x-1.0.0.tgz", "old", at("2024-01-02T00:00:00Z"));
        index.add(&metadata("x", "1.0.0"), "x-1.0.0.tgz", "new", at("2024-01-05T00:00:00Z"));

        let entries = index.get("x").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].digest, "new");
        assert_eq!(entries[1].digest, "old");
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut index = IndexDocument::new(at("2024-01-01T00:00:00Z"));
        index.add(&metadata("x", "1.0.0"), "x-1.0.0.tgz", "bb", at("2024-01-03T00:00:00Z"));

        let parsed = IndexDocument::from_yaml(&index.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, index);
    }

    #[test]
    fn test_find_best_match_wildcard() {
        let index = sample_index();
        assert_eq!(index.find_best_match("postgresql", "16.x.x").unwrap().version, "16.2.1");
        assert_eq!(index.find_best_match("postgresql", "15.x.x").unwrap().version, "15.5.0");
        assert_eq!(index.find_best_match("postgresql", "").unwrap().version, "16.2.1");
    }

    #[test]
    fn test_find_best_match_exact() {
        let index = sample_index();
        assert_eq!(index.find_best_match("postgresql", "16.0.0").unwrap().version, "16.0.0");
        assert_eq!(index.find_best_match("postgresql", "^15.0.0").unwrap().version, "15.5.0");
    }

    #[test]
    fn test_find_best_match_errors() {
        let index = sample_index();
        assert!(matches!(
            index.find_best_match("redis", "1.0.0"),
            Err(RepoError::ChartNotFound { .. })
        ));
        assert!(matches!(
            index.find_best_match("postgresql", "17.x.x"),
            Err(RepoError::UnsatisfiableConstraint { .. })
        ));
    }

    #[test]
    fn test_normalize_constraint() {
        assert_eq!(normalize_constraint("16.x.x"), "16.*");
        assert_eq!(normalize_constraint("16.2.x"), "16.2.*");
        assert_eq!(normalize_constraint("1.2.3"), "=1.2.3");
        assert_eq!(normalize_constraint(">=1.0.0, <2.0.0"), ">=1.0.0, <2.0.0");
        assert_eq!(normalize_constraint(""), "*");
    }

    #[test]
    fn test_compute_digest() {
        let digest = compute_digest(b"hello world");
        assert_eq!(digest.len(), 64);
        assert!(digest_matches(&format!("sha256:{}", digest.to_uppercase()), &digest));
        assert!(!digest_matches("sha256:xyz789", &digest));
    }
}
