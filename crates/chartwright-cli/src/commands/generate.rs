//! Generate command - write a chart archive without publishing it

use chartwright::ChartService;
use chartwright_repo::compute_digest;
use console::style;
use std::path::Path;

use super::load_params;
use crate::display::{format_size, truncate_hash};
use crate::error::Result;

pub async fn run(service: &ChartService, params_path: &Path, output: Option<&Path>) -> Result<()> {
    let params = load_params(params_path)?;

    println!(
        "{} {} v{}",
        style("Generating").cyan().bold(),
        params.name,
        params.version
    );

    let archive = service.generate_chart(&params).await?;

    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => Path::new(".").join(&archive.name),
    };
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output_path, &archive.data)?;

    println!(
        "  {} {}",
        style("Created").green().bold(),
        output_path.display()
    );
    println!("  {} {}", style("Size").dim(), format_size(archive.data.len() as u64));
    println!();
    println!(
        "{}: sha256:{}",
        style("Digest").bold(),
        truncate_hash(&compute_digest(&archive.data), 16)
    );

    Ok(())
}
