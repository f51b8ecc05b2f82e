//! Error types for the battle simulation.

use thiserror::Error;

use crate::battle::BattleState;
use crate::unit::{UnitId, UnitTypeId};

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Why a command was refused by the legality checks.
///
/// Rejections are recoverable: the battle stays in the state it was in and
/// the caller may issue another command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRejection {
    /// The acting unit is not the unit whose turn it is.
    NotCurrentUnit,
    /// The target unit does not take part in this battle.
    UnknownTarget,
    /// The attack may only target allies but an enemy was chosen, or the
    /// other way around.
    WrongSide,
    /// The attack may only target the attacker itself.
    SelfOnly,
    /// The target is dead, retreated or dissipated.
    TargetInactive,
    /// Revive needs a dead target.
    TargetNotDead,
    /// The attacker stands in the back line behind a friendly front line.
    AttackerBlocked,
    /// The target stands in the back line behind its own front line.
    TargetCovered,
    /// The target is out of reach across the flanks.
    FlankBlocked,
    /// No free cell is left for the unit the attack would create.
    SquadFull,
    /// The unit type to take on does not fit the unit's cells.
    SizeMismatch,
    /// The unit already waited this round.
    AlreadyWaited,
    /// Waiting is only possible before the unit's first action of the turn.
    AlreadyActed,
}

impl std::fmt::Display for CommandRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NotCurrentUnit => "it is not this unit's turn",
            Self::UnknownTarget => "target is not part of the battle",
            Self::WrongSide => "attack cannot target that side",
            Self::SelfOnly => "attack can only target the attacker",
            Self::TargetInactive => "target is no longer in the battle",
            Self::TargetNotDead => "target is not dead",
            Self::AttackerBlocked => "attacker is blocked by its own front line",
            Self::TargetCovered => "target is covered by its front line",
            Self::FlankBlocked => "target is out of reach across the flanks",
            Self::SquadFull => "squad has no free cell",
            Self::SizeMismatch => "unit type does not fit the unit's cells",
            Self::AlreadyWaited => "unit already waited this round",
            Self::AlreadyActed => "unit already acted this turn",
        };
        f.write_str(text)
    }
}

/// Top-level error type for all battle errors.
#[derive(Debug, Error)]
pub enum BattleError {
    /// A command failed the legality checks.
    #[error("Invalid command: {0}")]
    InvalidCommand(CommandRejection),

    /// A referenced unit type is not known to the provider.
    #[error("Unit type not found: {0}")]
    ResourceMissing(UnitTypeId),

    /// Invalid unit identifier.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// A mutation would break a squad or unit invariant.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// An operation was called in a state that does not accept it.
    #[error("Invalid battle state: expected {expected:?}, was {actual:?}")]
    InvalidState {
        /// State the operation needs.
        expected: BattleState,
        /// State the battle was in.
        actual: BattleState,
    },

    /// The presentation layer acknowledged events out of order.
    #[error("Out-of-order acknowledgement: expected event {expected}, received {received}")]
    OutOfOrderAcknowledgement {
        /// Sequence number of the event in flight.
        expected: u64,
        /// Sequence number that was acknowledged.
        received: u64,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParse {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Data validation failed.
    #[error("Invalid data: {0:?}")]
    InvalidData(Vec<String>),

    /// File system error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<CommandRejection> for BattleError {
    fn from(rejection: CommandRejection) -> Self {
        Self::InvalidCommand(rejection)
    }
}
