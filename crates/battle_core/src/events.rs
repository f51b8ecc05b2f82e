//! Unit action events handed to the presentation layer.
//!
//! Every visible or audible consequence of a command becomes one
//! [`UnitActionEvent`]. The battle queues them in presentation order and
//! waits for each to be acknowledged before releasing the next.

use serde::{Deserialize, Serialize};

use crate::effects::BattleEffectType;
use crate::unit::UnitId;

/// What happened to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitActionType {
    /// The unit performs its attack animation.
    Attacking,
    /// The attack missed the unit.
    Miss,
    /// A ward charge absorbed the attack.
    Ward,
    /// The unit is immune to the attack.
    Immunity,
    /// The unit lost hit points.
    Damaged,
    /// The attacker regained hit points from a drain.
    Drained,
    /// The unit regained hit points.
    Healed,
    /// The unit died.
    Died,
    /// The unit came back to life.
    Revived,
    /// Harmful effects were removed from the unit.
    Cured,
    /// The unit was paralyzed.
    Paralyzed,
    /// The unit was turned to stone.
    Petrified,
    /// The unit was frightened off the field.
    Frightened,
    /// The unit was poisoned.
    Poisoned,
    /// The unit was frostbitten.
    Frostbitten,
    /// The unit was blistered.
    Blistered,
    /// The unit's damage was raised.
    DamageBoosted,
    /// The unit's damage was lowered.
    DamageLowered,
    /// The unit's initiative was lowered.
    InitiativeLowered,
    /// The unit received a ward.
    WardGranted,
    /// The unit changed into another unit type.
    Transformed,
    /// The unit returned to its own unit type.
    Untransformed,
    /// The unit was summoned onto the field.
    Summoned,
    /// The unit defends this round.
    Defending,
    /// The unit waits for the end of the round.
    Waiting,
    /// The unit started to retreat.
    Retreating,
    /// The unit left the battle.
    Retreated,
    /// The illusion ran out of turns and vanished.
    Dissipated,
    /// The unit lost its turn.
    TurnSkipped,
    /// An effect dealt damage at turn start.
    EffectDamage(BattleEffectType),
    /// An effect ran out.
    EffectExpired(BattleEffectType),
}

/// One event of the presentation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitActionEvent {
    /// Position of the event in the battle-wide event stream.
    pub sequence: u64,
    /// Affected unit.
    pub unit: UnitId,
    /// What happened.
    pub action: UnitActionType,
    /// Amount of damage, healing or effect power.
    pub power: Option<u32>,
    /// Rounds an applied effect lasts.
    pub duration: Option<u8>,
}

/// Ordered collection of events produced while resolving one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<UnitActionEvent>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event without numeric payload.
    pub fn push(&mut self, unit: UnitId, action: UnitActionType) {
        self.push_full(unit, action, None, None);
    }

    /// Append an event carrying an amount.
    pub fn push_with_power(&mut self, unit: UnitId, action: UnitActionType, power: u32) {
        self.push_full(unit, action, Some(power), None);
    }

    /// Append an event carrying an amount and a duration.
    pub fn push_full(
        &mut self,
        unit: UnitId,
        action: UnitActionType,
        power: Option<u32>,
        duration: Option<u8>,
    ) {
        let sequence = self.events.len() as u64;
        self.events.push(UnitActionEvent {
            sequence,
            unit,
            action,
            power,
            duration,
        });
    }

    /// Events in the order they were logged.
    #[must_use]
    pub fn events(&self) -> &[UnitActionEvent] {
        &self.events
    }

    /// Number of logged events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether any event of `action` was logged for `unit`.
    #[must_use]
    pub fn contains(&self, unit: UnitId, action: UnitActionType) -> bool {
        self.events
            .iter()
            .any(|event| event.unit == unit && event.action == action)
    }

    /// Move the logged events out, leaving the log empty.
    pub fn drain(&mut self) -> std::vec::Drain<'_, UnitActionEvent> {
        self.events.drain(..)
    }
}

/// Receives events from [`Battle::drive`](crate::battle::Battle::drive).
///
/// `present` returns once the event's animation and sound have finished;
/// the battle treats the return as the acknowledgement.
pub trait PresentationSink {
    /// Present one event.
    fn present(&mut self, event: &UnitActionEvent);
}

/// Sink that acknowledges everything immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateSink;

impl PresentationSink for ImmediateSink {
    fn present(&mut self, event: &UnitActionEvent) {
        tracing::trace!(sequence = event.sequence, unit = %event.unit, action = ?event.action, "Event presented");
    }
}
