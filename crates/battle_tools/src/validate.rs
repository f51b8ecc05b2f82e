//! Data validation utilities.

use std::path::Path;

use battle_core::data::BattleSetup;
use battle_core::provider::UnitTypeRegistry;

use crate::error::{Result, ToolError};

/// Unit data file expected at the root of a data directory.
pub const UNIT_FILE: &str = "units.ron";

/// Directory of battle setups inside a data directory.
pub const BATTLE_DIR: &str = "battles";

/// What a validation run looked at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Unit types loaded.
    pub unit_types: usize,
    /// Battle setups that built.
    pub battles: usize,
}

/// Check that `setup` builds against `registry`, including every summon and
/// transformation template its units may need.
///
/// # Errors
///
/// Returns the first problem found.
pub fn validate_setup(setup: &BattleSetup, registry: &UnitTypeRegistry) -> battle_core::error::Result<()> {
    let field = setup.build_field(registry)?;
    for (_, unit) in field.units() {
        for attack in unit.unit_type().attacks() {
            battle_core::attack::template_for(attack, registry)?;
        }
    }
    Ok(())
}

/// Validate the unit data and every battle setup in a data directory.
///
/// # Errors
///
/// Returns an error if the unit file is missing or invalid, or any setup
/// fails to parse or build.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport> {
    let unit_file = path.join(UNIT_FILE);
    if !unit_file.is_file() {
        return Err(ToolError::MissingUnitFile {
            dir: path.display().to_string(),
            file: UNIT_FILE,
        });
    }
    let registry = UnitTypeRegistry::load(&unit_file)?;
    let mut report = ValidationReport {
        unit_types: registry.len(),
        battles: 0,
    };

    let battle_dir = path.join(BATTLE_DIR);
    if !battle_dir.is_dir() {
        return Ok(report);
    }
    let mut files: Vec<_> = std::fs::read_dir(&battle_dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();

    for file in files {
        let setup_error = |source| ToolError::Setup {
            path: file.display().to_string(),
            source,
        };
        let setup = BattleSetup::load(&file).map_err(setup_error)?;
        validate_setup(&setup, &registry).map_err(setup_error)?;
        tracing::debug!(path = %file.display(), "Battle setup valid");
        report.battles += 1;
    }
    Ok(report)
}
