use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::debug;

use crate::model::ExecCatalog;

/// File name the host engine writes its command catalog to.
pub const CATALOG_FILE: &str = "executes.json";

/// Parse an `executes.json` document.
///
/// The file is expected to hold a top-level array of commands:
///   • `name`  – the name used after `#`
///   • `args`  – `{ name, type, require, presets? }` entries
///
/// Unknown argument types are accepted and never checked.
pub fn load_catalog(json: &str) -> Result<ExecCatalog> {
    // Look at the raw shape first so the error says more than "expected a sequence".
    let root: Value = serde_json::from_str(json)?;
    let entries = root
        .as_array()
        .ok_or_else(|| anyhow!("catalog must be a JSON array of commands"))?;

    for (i, entry) in entries.iter().enumerate() {
        if entry.get("name").and_then(Value::as_str).is_none() {
            return Err(anyhow!("command {i} missing `name` field"));
        }
    }

    let catalog: ExecCatalog = serde_json::from_value(root)?;
    debug!(commands = catalog.commands.len(), "catalog loaded");
    Ok(catalog)
}

pub fn load_catalog_file(path: &Path) -> Result<ExecCatalog> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Reading {}", path.display()))?;
    load_catalog(&json).with_context(|| format!("Parsing {}", path.display()))
}

/// `executes.json` next to the script.
pub fn default_catalog_path(script: &Path) -> PathBuf {
    script
        .parent()
        .map_or_else(|| PathBuf::from(CATALOG_FILE), |dir| dir.join(CATALOG_FILE))
}
