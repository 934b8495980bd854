//! CLI commands

pub mod generate;
pub mod index;
pub mod publish;
pub mod validate;

use chartwright_core::ChartParams;
use std::path::Path;

use crate::error::{CliError, Result};

/// Read chart parameters from a YAML or JSON (`.json`) file
pub fn load_params(path: &Path) -> Result<ChartParams> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError::Io {
        message: format!("{}: {}", path.display(), e),
    })?;

    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => ChartParams::from_json(&content),
        _ => ChartParams::from_yaml(&content),
    };

    parsed.map_err(|e| CliError::chart(format!("invalid parameters in {}: {}", path.display(), e)))
}
