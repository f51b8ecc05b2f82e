//! Tool errors.

use thiserror::Error;

use battle_core::error::BattleError;

/// Errors reported by the development tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The battle engine rejected something.
    #[error(transparent)]
    Battle(#[from] BattleError),

    /// A battle setup failed to load or build.
    #[error("{path}: {source}")]
    Setup {
        /// File that failed.
        path: String,
        /// Why it failed.
        #[source]
        source: BattleError,
    },

    /// A data directory has no unit data file.
    #[error("no {file} in {dir}")]
    MissingUnitFile {
        /// Directory searched.
        dir: String,
        /// File name expected.
        file: &'static str,
    },

    /// A replay did not reproduce its recorded result.
    #[error("replay {0} diverged from its recording")]
    ReplayDiverged(String),

    /// File system error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;
