//! Unit type lookup.
//!
//! The battle never parses resources itself. It asks a [`UnitTypeProvider`]
//! for already-parsed unit types; [`UnitTypeRegistry`] is the in-memory
//! provider, filled by hand or from RON unit data files.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::data::UnitDataFile;
use crate::error::{BattleError, Result};
use crate::unit::{UnitType, UnitTypeId};

/// Read-only source of unit types.
pub trait UnitTypeProvider {
    /// Look up a unit type.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::ResourceMissing`] if the id is unknown.
    fn unit_type(&self, id: &UnitTypeId) -> Result<Arc<UnitType>>;
}

/// In-memory unit type store.
#[derive(Debug, Clone, Default)]
pub struct UnitTypeRegistry {
    types: HashMap<UnitTypeId, Arc<UnitType>>,
}

impl UnitTypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a unit type.
    pub fn insert(&mut self, unit_type: impl Into<Arc<UnitType>>) {
        let unit_type = unit_type.into();
        self.types.insert(unit_type.id.clone(), unit_type);
    }

    /// Build a registry from a validated data file.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidData`] listing every validation problem.
    pub fn from_data_file(file: UnitDataFile) -> Result<Self> {
        let errors = file.validate();
        if !errors.is_empty() {
            return Err(BattleError::InvalidData(errors));
        }
        let mut registry = Self::new();
        for unit_type in file.units {
            registry.insert(unit_type);
        }
        Ok(registry)
    }

    /// Parse and validate a RON data file.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or fails validation.
    pub fn from_ron(text: &str) -> Result<Self> {
        let file = UnitDataFile::from_ron(text).map_err(|e| BattleError::DataParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        Self::from_data_file(file)
    }

    /// Load and validate a RON data file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let file = UnitDataFile::from_ron(&text).map_err(|e| BattleError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let registry = Self::from_data_file(file)?;
        tracing::info!(path = %path.display(), unit_types = registry.len(), "Loaded unit data");
        Ok(registry)
    }

    /// Number of registered unit types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no unit type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered ids in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<&UnitTypeId> {
        let mut ids: Vec<_> = self.types.keys().collect();
        ids.sort();
        ids
    }
}

impl UnitTypeProvider for UnitTypeRegistry {
    fn unit_type(&self, id: &UnitTypeId) -> Result<Arc<UnitType>> {
        self.types
            .get(id)
            .cloned()
            .ok_or_else(|| BattleError::ResourceMissing(id.clone()))
    }
}
