//! Publish command - compile a chart and add it to a repository

use chartwright::{ChartService, ServiceConfig};
use console::style;
use std::path::Path;

use super::load_params;
use crate::display::truncate_hash;
use crate::error::{CliError, Result};

pub async fn run(
    service: &ChartService,
    config: &ServiceConfig,
    params_path: &Path,
    repo: Option<&str>,
) -> Result<()> {
    let params = load_params(params_path)?;

    let repo = repo
        .or(config.default_repository.as_deref())
        .ok_or_else(|| {
            CliError::usage_with_help(
                "no repository directory given",
                "pass --repo or set defaultRepository in the config file",
            )
        })?;

    println!(
        "{} {} v{} to {}",
        style("Publishing").cyan().bold(),
        params.name,
        params.version,
        style(repo).bold()
    );

    let published = service.publish_chart(&params, repo).await?;

    let root = config.store_root.display();
    println!("  {} {}/{}", style("Archive").green().bold(), root, published.archive_path);
    println!("  {} {}/{}", style("Index").green().bold(), root, published.index_path);
    println!("  {} {}/{}", style("Values").green().bold(), root, published.values_path);
    println!();
    println!(
        "{}: sha256:{}",
        style("Digest").bold(),
        truncate_hash(&published.digest, 16)
    );

    Ok(())
}
