//! Migration plan files: an ordered list of units to migrate.

use std::path::Path;

use crate::error::{MigrationError, Result};
use crate::types::MigrationUnit;

/// Load an ordered migration plan from a YAML or JSON file.
///
/// Order is preserved; an empty plan is an error since running it would
/// silently do nothing.
pub fn load_plan(path: &Path) -> Result<Vec<MigrationUnit>> {
    let raw = std::fs::read_to_string(path)?;

    let units: Vec<MigrationUnit> = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&raw)?
    } else {
        serde_yaml::from_str(&raw)?
    };

    if units.is_empty() {
        return Err(MigrationError::ValidationError(format!(
            "migration plan '{}' contains no units",
            path.display()
        )));
    }
    for (index, unit) in units.iter().enumerate() {
        if unit.project.trim().is_empty() || unit.repo.trim().is_empty() {
            return Err(MigrationError::ValidationError(format!(
                "plan entry {} is missing a project or repo name",
                index + 1
            )));
        }
    }
    Ok(units)
}
