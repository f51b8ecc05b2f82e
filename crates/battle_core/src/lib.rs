//! # Battle Core
//!
//! Deterministic turn-based squad battle engine.
//!
//! Two squads of up to six units stand on a two-line, three-flank grid and
//! take turns in initiative order. This crate contains **only** the rules:
//! - No rendering
//! - No audio
//! - No system randomness (every roll goes through an injected [`rng::BattleRng`])
//! - No resource parsing inside the battle (unit types come from a [`provider::UnitTypeProvider`])
//!
//! A presentation layer drives a [`battle::Battle`] by acknowledging the
//! events it queues and by submitting commands for human-controlled units.
//!
//! ## Crate Structure
//!
//! - [`unit`] - Unit types, attacks and unit instances
//! - [`squad`] - Squad grid and occupancy
//! - [`attack`] - Attack legality and resolution
//! - [`effects`] - Timed battle effects
//! - [`battle`] - Turn sequencer and event queue
//! - [`ai`] - Computer-controlled squads
//! - [`outcome`] - Results, experience and levelling
//! - [`replay`] - Deterministic replays

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod attack;
pub mod battle;
pub mod config;
pub mod data;
pub mod effects;
pub mod error;
pub mod events;
pub mod field;
pub mod math;
pub mod outcome;
pub mod position;
pub mod provider;
pub mod replay;
pub mod rng;
pub mod squad;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::attack::{can_attack, check_attack, AttackProcessorContext, AttackResolver};
    pub use crate::battle::{Battle, BattleCommand, BattleState, RecordedCommand};
    pub use crate::config::BattleConfig;
    pub use crate::data::{BattleSetup, Controller, SquadSetup, UnitDataFile, UnitSetup};
    pub use crate::effects::{BattleEffect, BattleEffectType};
    pub use crate::error::{BattleError, CommandRejection, Result};
    pub use crate::events::{ImmediateSink, PresentationSink, UnitActionEvent, UnitActionType};
    pub use crate::field::Battlefield;
    pub use crate::outcome::{BattleOutcome, BattleResult, UnitFate, UnitOutcome};
    pub use crate::position::{Flank, Line, UnitPosition, UnitSize};
    pub use crate::provider::{UnitTypeProvider, UnitTypeRegistry};
    pub use crate::replay::BattleReplay;
    pub use crate::rng::{BattleRng, SeededRng};
    pub use crate::squad::{Squad, SquadSide};
    pub use crate::unit::{
        AttackClass, AttackSource, PlayerId, Protection, ProtectionCategory, ProtectionKind, Reach,
        Unit, UnitAttack, UnitId, UnitType, UnitTypeId,
    };
}
