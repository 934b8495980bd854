//! Publishing into object stores

use chartwright_core::archive::read_file;
use chartwright_core::{ChartParams, ParentPackage, Value, ValueDocument};
use chartwright_repo::{
    FileStore, FixedClock, IndexDocument, MemoryStore, ObjectStore, Publisher, RepositoryFetcher,
    compute_digest,
};
use std::sync::Arc;
use std::time::Duration;

fn publisher(store: Arc<dyn ObjectStore>) -> Publisher {
    Publisher::new(
        store,
        Arc::new(FixedClock::at("2024-06-01T08:30:00Z").unwrap()),
        Arc::new(RepositoryFetcher::new(Duration::from_secs(5)).unwrap()),
    )
}

fn test_chart(version: &str) -> ParentPackage {
    let params = ChartParams::from_yaml(&format!(
        r#"
name: test-chart
version: {version}
services:
  - name: test-service
    image:
      name: nginx
      tag: alpine
    initConfig:
      initCommands:
        - ls
"#
    ))
    .unwrap();
    ParentPackage::compile(&params).unwrap()
}

#[tokio::test]
async fn test_end_to_end_publish() {
    let store = MemoryStore::new();
    let publisher = publisher(Arc::new(store.clone()));

    let mut chart = test_chart("1.0.0");
    publisher.publish(&mut chart, "test-repo").await.unwrap();

    assert_eq!(
        store.paths(),
        vec![
            "test-repo/index.yaml",
            "test-repo/test-chart-1.0.0-values.yaml",
            "test-repo/test-chart-1.0.0.tgz",
        ]
    );

    let archive = store.get("test-repo/test-chart-1.0.0.tgz").unwrap();
    let values = read_file(&archive, "test-chart/charts/test-service/values.yaml").unwrap();
    let values = ValueDocument::from_yaml(std::str::from_utf8(&values).unwrap()).unwrap();

    let first = &values
        .get_path("initConfig.initCommands")
        .and_then(Value::as_list)
        .unwrap()[0];
    let expected = ValueDocument::new()
        .with("name", "init-command-0")
        .with("command", vec!["/bin/sh", "-c", "ls"]);
    assert_eq!(first, &Value::Map(expected));

    let index = IndexDocument::from_bytes(&store.get("test-repo/index.yaml").unwrap()).unwrap();
    let entry = &index.get("test-chart").unwrap()[0];
    assert_eq!(entry.version, "1.0.0");
    assert_eq!(entry.digest, compute_digest(&archive));
    assert_eq!(entry.created.unwrap().to_rfc3339(), "2024-06-01T08:30:00+00:00");
}

#[tokio::test]
async fn test_published_values_are_client_facing() {
    let store = MemoryStore::new();
    let publisher = publisher(Arc::new(store.clone()));

    let params = ChartParams::from_yaml(
        r#"
name: shop
version: 0.3.0
services:
  - name: api
    image:
      name: acme/api
      tag: "1"
    secrets:
      - name: db-password
        environmentKey: DB_PASSWORD
    environment:
      LOG_LEVEL: debug
"#,
    )
    .unwrap();
    let mut chart = ParentPackage::compile(&params).unwrap();
    publisher.publish(&mut chart, "stable").await.unwrap();

    let yaml = String::from_utf8(store.get("stable/shop-0.3.0-values.yaml").unwrap()).unwrap();
    let values = ValueDocument::from_yaml(&yaml).unwrap();

    assert_eq!(
        values.get_path("api.secrets.db-password.environmentKey"),
        Some(&Value::from("DB_PASSWORD"))
    );
    assert_eq!(values.get_path("api.secrets.db-password.value"), Some(&Value::from("")));
    assert!(values.get_path("api.environment").is_none());
    assert!(values.get_path("api.image").is_none());
}

#[tokio::test]
async fn test_repositories_are_independent() {
    let store = MemoryStore::new();
    let publisher = publisher(Arc::new(store.clone()));

    publisher.publish(&mut test_chart("1.0.0"), "alpha").await.unwrap();
    publisher.publish(&mut test_chart("2.0.0"), "beta").await.unwrap();

    let alpha = IndexDocument::from_bytes(&store.get("alpha/index.yaml").unwrap()).unwrap();
    let beta = IndexDocument::from_bytes(&store.get("beta/index.yaml").unwrap()).unwrap();
    assert_eq!(alpha.get("test-chart").unwrap().len(), 1);
    assert_eq!(beta.get("test-chart").unwrap()[0].version, "2.0.0");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publishes_all_land_in_index() {
    const N: u64 = 16;

    let store = MemoryStore::new();
    let publisher = Arc::new(publisher(Arc::new(store.clone())));

    let tasks: Vec<_> = (0..N)
        .map(|i| {
            let publisher = publisher.clone();
            tokio::spawn(async move {
                let mut chart = test_chart(&format!("1.{}.0", i));
                publisher.publish(&mut chart, "test-repo").await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let index = IndexDocument::from_bytes(&store.get("test-repo/index.yaml").unwrap()).unwrap();
    let versions: Vec<String> = index
        .get("test-chart")
        .unwrap()
        .iter()
        .map(|e| e.version.clone())
        .collect();

    let expected: Vec<String> = (0..N).rev().map(|i| format!("1.{}.0", i)).collect();
    assert_eq!(versions, expected);
}

#[tokio::test]
async fn test_publish_to_file_store() {
    let temp = tempfile::tempdir().unwrap();
    let publisher = publisher(Arc::new(FileStore::new(temp.path())));

    publisher.publish(&mut test_chart("0.9.0"), "charts").await.unwrap();
    publisher.publish(&mut test_chart("1.0.0"), "charts").await.unwrap();

    let repo = temp.path().join("charts");
    assert!(repo.join("test-chart-0.9.0.tgz").is_file());
    assert!(repo.join("test-chart-1.0.0-values.yaml").is_file());

    let index = IndexDocument::from_bytes(&std::fs::read(repo.join("index.yaml")).unwrap()).unwrap();
    let versions: Vec<&str> = index
        .get("test-chart")
        .unwrap()
        .iter()
        .map(|e| e.version.as_str())
        .collect();
    assert_eq!(versions, vec!["1.0.0", "0.9.0"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_republish_to_file_store() {
    let temp = tempfile::tempdir().unwrap();
    let publisher = Arc::new(publisher(Arc::new(FileStore::new(temp.path()))));

    for _ in 0..5 {
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let publisher = publisher.clone();
                tokio::spawn(async move { publisher.publish(&mut test_chart("1.0.0"), "repo").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
    }

    let index = IndexDocument::from_bytes(&std::fs::read(temp.path().join("repo/index.yaml")).unwrap()).unwrap();
    assert_eq!(index.get("test-chart").unwrap().len(), 40);
    assert!(temp.path().join("repo/test-chart-1.0.0.tgz").is_file());
}

#[test]
fn test_invalid_chart_version_is_rejected() {
    let params = ChartParams::from_yaml("name: broken\nversion: one\n").unwrap();
    assert!(ParentPackage::compile(&params).is_err());
}
