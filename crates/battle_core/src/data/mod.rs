//! Data files: unit type definitions and battle setups, both in RON.

mod setup;
mod unit_data;

pub use setup::{BattleSetup, Controller, SquadSetup, UnitSetup};
pub use unit_data::UnitDataFile;
