//! Validate command - check chart values against the service schema

use chartwright::ChartService;
use console::style;
use std::path::Path;

use super::load_params;
use crate::display::{display_validation_errors, pluralize};
use crate::error::{CliError, Result};

pub async fn run(service: &ChartService, params_path: &Path, json_output: bool) -> Result<()> {
    let params = load_params(params_path)?;

    if !json_output {
        println!(
            "{} Validating {} v{} ({})",
            style("→").blue(),
            params.name,
            params.version,
            pluralize(params.services.len(), "service", "services")
        );
    }

    let response = service.validate_chart(&params).await?;

    if json_output {
        let output = serde_json::json!({
            "valid": response.valid,
            "chart": {
                "name": params.name,
                "version": params.version,
            },
            "errors": response.errors,
        });
        let rendered = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::internal(e.to_string()))?;
        println!("{}", rendered);
    } else if response.valid {
        println!();
        println!("{} Validation passed!", style("✓").green().bold());
    } else {
        display_validation_errors(&response.errors);
        println!();
        println!(
            "{} Validation failed: {}",
            style("✗").red().bold(),
            pluralize(response.errors.len(), "error", "errors")
        );
    }

    if !response.valid {
        return Err(CliError::Validation {
            message: pluralize(response.errors.len(), "error", "errors"),
            help: None,
        });
    }

    Ok(())
}
