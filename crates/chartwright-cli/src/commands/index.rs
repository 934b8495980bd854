//! Index command - show what a repository holds

use chartwright::ChartService;

use crate::display::display_index;
use crate::error::{CliError, Result};

pub async fn run(service: &ChartService, repo: &str, yaml: bool) -> Result<()> {
    let index = service.repository_index(repo).await?;

    if yaml {
        let rendered = index.to_yaml().map_err(|e| CliError::internal(e.to_string()))?;
        print!("{}", rendered);
    } else {
        display_index(&index);
    }

    Ok(())
}
