//! Integration tests for CLI commands

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Get the fixtures path
fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name)
}

/// Isolated store and config for one test
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "").unwrap();
        Self { dir }
    }

    fn store(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_chartwright"))
            .args(args)
            .arg("--config")
            .arg(self.dir.path().join("config.yaml"))
            .arg("--store-root")
            .arg(self.store())
            .env_remove("CHARTWRIGHT_REPOSITORY")
            .env("CHARTWRIGHT_LOG", "error")
            .output()
            .expect("Failed to execute chartwright")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

mod validate_command {
    use super::*;

    #[test]
    fn test_validate_valid_chart() {
        let ws = Workspace::new();
        let output = ws.run(&["validate", fixture("shop.yaml").to_str().unwrap()]);

        assert!(output.status.success(), "Expected success for valid chart");
        assert!(stdout(&output).contains("Validation passed"));
    }

    #[test]
    fn test_validate_invalid_chart() {
        let ws = Workspace::new();
        let output = ws.run(&["validate", fixture("invalid.yaml").to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(2));
        let out = stdout(&output);
        assert!(out.contains("api"));
        assert!(out.contains("/replicaCount"));
    }

    #[test]
    fn test_validate_json_output() {
        let ws = Workspace::new();
        let output = ws.run(&["validate", fixture("invalid.yaml").to_str().unwrap(), "--json"]);

        let json: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");
        assert_eq!(json["valid"], false);
        assert_eq!(json["chart"]["name"], "broken");
        assert_eq!(json["errors"][0]["path"], "api/replicaCount");
    }

    #[test]
    fn test_validate_json_params() {
        let ws = Workspace::new();
        let output = ws.run(&["validate", fixture("shop.json").to_str().unwrap(), "--json"]);

        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["errors"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_validate_missing_file() {
        let ws = Workspace::new();
        let output = ws.run(&["validate", "does-not-exist.yaml"]);

        assert_eq!(output.status.code(), Some(5));
    }
}

mod generate_command {
    use super::*;

    #[test]
    fn test_generate_writes_archive() {
        let ws = Workspace::new();
        let out = ws.dir.path().join("out/shop.tgz");
        let output = ws.run(&[
            "generate",
            fixture("shop.yaml").to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("sha256:"));

        let data = std::fs::read(&out).unwrap();
        let entries = chartwright_core::archive::read_entries(&data).unwrap();
        assert!(entries.contains_key("shop/Chart.yaml"));
        assert!(entries.contains_key("shop/charts/api/values.yaml"));
        assert!(entries.contains_key("shop/charts/web/templates/ingress.yaml"));
    }

    #[test]
    fn test_generate_requires_services() {
        let ws = Workspace::new();
        let output = ws.run(&["generate", fixture("no-services.yaml").to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(3));
        assert!(String::from_utf8_lossy(&output.stderr).contains("services are required"));
    }
}

mod publish_command {
    use super::*;

    #[test]
    fn test_publish_and_index() {
        let ws = Workspace::new();
        let output = ws.run(&["publish", fixture("shop.yaml").to_str().unwrap(), "--repo", "stable"]);
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

        let repo = ws.store().join("stable");
        assert!(repo.join("index.yaml").is_file());
        assert!(repo.join("shop-1.2.0.tgz").is_file());
        assert!(repo.join("shop-1.2.0-values.yaml").is_file());

        let output = ws.run(&["index", "stable"]);
        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("shop"));
        assert!(out.contains("1.2.0"));

        let output = ws.run(&["index", "stable", "--yaml"]);
        let index: serde_yaml::Value = serde_yaml::from_str(&stdout(&output)).unwrap();
        assert_eq!(index["entries"]["shop"][0]["version"], "1.2.0");
    }

    #[test]
    fn test_publish_invalid_chart_uploads_nothing() {
        let ws = Workspace::new();
        let output = ws.run(&["publish", fixture("invalid.yaml").to_str().unwrap(), "--repo", "stable"]);

        assert_eq!(output.status.code(), Some(2));
        assert!(!ws.store().join("stable").exists());
    }

    #[test]
    fn test_publish_requires_repository() {
        let ws = Workspace::new();
        let output = ws.run(&["publish", fixture("shop.yaml").to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(64));
    }
}

#[test]
fn test_empty_index() {
    let ws = Workspace::new();
    let output = ws.run(&["index", "nothing-here"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("No charts published"));
}
