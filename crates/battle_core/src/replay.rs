//! Replay recording and verification.
//!
//! A battle is fully determined by its setup (which carries the seed) and
//! the commands given to human-controlled units. A replay stores exactly
//! that, plus a state hash to check the rerun against.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::battle::{Battle, BattleState, RecordedCommand};
use crate::data::BattleSetup;
use crate::error::{BattleError, Result};
use crate::events::ImmediateSink;
use crate::outcome::BattleResult;
use crate::provider::UnitTypeProvider;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Everything needed to play a battle again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReplay {
    /// Replay format version.
    pub version: u32,
    /// Setup the battle started from.
    pub setup: BattleSetup,
    /// Human commands in the order they were accepted.
    pub commands: Vec<RecordedCommand>,
    /// How the battle ended, if it had when recorded.
    pub result: Option<BattleResult>,
    /// State hash to verify against.
    pub final_hash: u64,
}

impl BattleReplay {
    /// Capture a battle.
    ///
    /// Completed battles are captured as they stood on completion, so
    /// recording before or after [`Battle::finish`] gives the same replay.
    #[must_use]
    pub fn record(battle: &Battle) -> Self {
        Self {
            version: REPLAY_VERSION,
            setup: battle.setup().clone(),
            commands: battle.commands().to_vec(),
            result: battle.result().filter(|r| *r != BattleResult::Aborted),
            final_hash: reference_hash(battle),
        }
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_bytes()?)?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or decoded, or was
    /// written by another format version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    /// Encode with bincode.
    ///
    /// # Errors
    /// Returns [`BattleError::Serialization`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| BattleError::Serialization(format!("Failed to serialize replay: {e}")))
    }

    /// Decode from bincode.
    ///
    /// # Errors
    /// Returns [`BattleError::Serialization`] if the bytes do not decode or
    /// the version does not match [`REPLAY_VERSION`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| BattleError::Serialization(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(BattleError::Serialization(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }
        Ok(replay)
    }

    /// Rerun the battle, feeding the recorded commands whenever a human
    /// unit is up.
    ///
    /// # Errors
    /// Returns an error if the battle cannot be built or a recorded command
    /// is rejected, or [`BattleError::InvariantViolation`] if commands are
    /// left over once the battle stops asking for them.
    pub fn play(&self, provider: Arc<dyn UnitTypeProvider>) -> Result<Battle> {
        let mut battle = Battle::new(self.setup.clone(), provider)?;
        let mut sink = ImmediateSink;
        let mut commands = self.commands.iter();
        loop {
            battle.drive(&mut sink)?;
            if battle.state() != BattleState::WaitPlayerTurn {
                break;
            }
            let Some(recorded) = commands.next() else {
                break;
            };
            battle.submit_command(recorded.unit, recorded.command)?;
        }
        let left = commands.count();
        if left > 0 {
            return Err(BattleError::InvariantViolation(format!(
                "{left} recorded commands were never requested"
            )));
        }
        Ok(battle)
    }

    /// Rerun the battle and compare it to the recording.
    ///
    /// # Errors
    /// Same as [`BattleReplay::play`].
    pub fn verify(&self, provider: Arc<dyn UnitTypeProvider>) -> Result<bool> {
        let battle = self.play(provider)?;
        let hash = reference_hash(&battle);
        let matches = hash == self.final_hash && battle.result() == self.result;
        if matches {
            tracing::info!(commands = self.commands.len(), hash, "Replay verified");
        } else {
            tracing::warn!(expected = self.final_hash, actual = hash, "Replay diverged");
        }
        Ok(matches)
    }
}

fn reference_hash(battle: &Battle) -> u64 {
    battle
        .completion_hash()
        .unwrap_or_else(|| battle.state_hash())
}
