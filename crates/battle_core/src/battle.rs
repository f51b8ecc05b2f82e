//! Battle sequencer.
//!
//! [`Battle`] owns the battlefield and walks it through rounds and turns.
//! Every consequence of a turn is queued as a [`UnitActionEvent`]; the
//! battle does not move on until the presentation layer acknowledged each
//! of them in order, either one at a time through
//! [`Battle::complete_event`] or all at once through [`Battle::drive`].
//!
//! Computer-controlled units act as soon as their turn comes up. For
//! human-controlled units the battle stops in
//! [`BattleState::WaitPlayerTurn`] until [`Battle::submit_command`] is
//! called.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ai;
use crate::attack::{template_for, AttackProcessorContext, AttackResolver};
use crate::config::BattleConfig;
use crate::data::{BattleSetup, Controller};
use crate::effects::{process_resumed_turn, process_turn_start, BattleEffect, BattleEffectType};
use crate::error::{BattleError, CommandRejection, Result};
use crate::events::{EventLog, PresentationSink, UnitActionEvent, UnitActionType};
use crate::field::Battlefield;
use crate::math::scale;
use crate::outcome::{finalize, BattleOutcome, BattleResult};
use crate::provider::UnitTypeProvider;
use crate::rng::{BattleRng, SeededRng};
use crate::squad::SquadSide;
use crate::unit::{Unit, UnitId};

// ============================================================================
// Public types
// ============================================================================

/// Where the battle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleState {
    /// The current unit is human-controlled and waits for a command.
    WaitPlayerTurn,
    /// A command was accepted and is being resolved.
    BeginUnitAction,
    /// Events are queued and wait for acknowledgement.
    ProcessingUnitAction,
    /// The last action is fully presented.
    CompletedUnitAction,
    /// One side won or the battle ended in a draw.
    CompletedBattle,
    /// The outcome was handed out; nothing more happens.
    WaitExit,
}

/// What a unit does with its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleCommand {
    /// Use the main attack on `target`.
    Attack {
        /// Unit the attack is aimed at.
        target: UnitId,
    },
    /// Raise armor until the unit's next turn.
    Defend,
    /// Act again at the end of the round.
    Wait,
    /// Leave the battle at the unit's next turn.
    Retreat,
}

/// A human command accepted by the battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedCommand {
    /// Round the command was given in.
    pub round: u32,
    /// Unit that was commanded.
    pub unit: UnitId,
    /// The command.
    pub command: BattleCommand,
}

// ============================================================================
// Internal bookkeeping
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueuedTurn {
    unit: UnitId,
    /// Second half of a turn the unit gave up by waiting.
    resumed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    NextUnit,
    TurnStarted { can_act: bool },
    AwaitCommand,
    ActionDone,
}

/// Order in which the active units act this round.
///
/// Higher effective initiative acts first. With a non-zero
/// `initiative_spread` each unit adds a random bonus of up to that many
/// percent of its initiative. Ties go to the attacker, then to the lower id.
pub fn turn_order(field: &Battlefield, initiative_spread: u32, rng: &mut dyn BattleRng) -> Vec<UnitId> {
    let spread = i32::try_from(initiative_spread).unwrap_or(i32::MAX);
    let mut entries: Vec<(u32, SquadSide, UnitId)> = field
        .units()
        .filter(|(_, unit)| unit.is_active())
        .map(|(side, unit)| {
            let base = unit.initiative();
            let bonus = if spread == 0 {
                0
            } else {
                rng.roll(scale(base, spread).saturating_add(1))
            };
            (base.saturating_add(bonus), side, unit.id())
        })
        .collect();
    entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
    entries.into_iter().map(|(_, _, id)| id).collect()
}

// ============================================================================
// Battle
// ============================================================================

/// One running battle.
pub struct Battle {
    setup: BattleSetup,
    field: Battlefield,
    provider: Arc<dyn UnitTypeProvider>,
    rng: Box<dyn BattleRng>,
    state: BattleState,
    step: Step,
    round: u32,
    queue: VecDeque<QueuedTurn>,
    current: Option<UnitId>,
    actions_left: u8,
    acted: bool,
    pending: VecDeque<UnitActionEvent>,
    next_sequence: u64,
    result: Option<BattleResult>,
    completion_hash: Option<u64>,
    outcome: Option<BattleOutcome>,
    commands: Vec<RecordedCommand>,
}

impl fmt::Debug for Battle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Battle")
            .field("state", &self.state)
            .field("round", &self.round)
            .field("current", &self.current)
            .field("pending", &self.pending.len())
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl Battle {
    /// Start a battle rolling with a generator seeded from `setup.seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if a unit type or attack template is missing, or
    /// the squads do not fit the grid.
    pub fn new(setup: BattleSetup, provider: Arc<dyn UnitTypeProvider>) -> Result<Self> {
        let rng = Box::new(SeededRng::new(setup.seed));
        Self::with_rng(setup, provider, rng)
    }

    /// Start a battle with an explicit random source.
    ///
    /// Runs every computer turn up to the first event or human turn.
    ///
    /// # Errors
    ///
    /// Same as [`Battle::new`].
    pub fn with_rng(
        setup: BattleSetup,
        provider: Arc<dyn UnitTypeProvider>,
        rng: Box<dyn BattleRng>,
    ) -> Result<Self> {
        let field = setup.build_field(provider.as_ref())?;
        for (_, unit) in field.units() {
            for attack in unit.unit_type().attacks() {
                template_for(attack, provider.as_ref())?;
            }
        }

        tracing::info!(
            seed = setup.seed,
            attackers = field.squad(SquadSide::Attacker).len(),
            defenders = field.squad(SquadSide::Defender).len(),
            "Battle started"
        );

        let mut battle = Self {
            setup,
            field,
            provider,
            rng,
            state: BattleState::CompletedUnitAction,
            step: Step::NextUnit,
            round: 0,
            queue: VecDeque::new(),
            current: None,
            actions_left: 0,
            acted: false,
            pending: VecDeque::new(),
            next_sequence: 0,
            result: None,
            completion_hash: None,
            outcome: None,
            commands: Vec::new(),
        };
        battle.advance()?;
        Ok(battle)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> BattleState {
        self.state
    }

    /// Current round, starting at 1. Zero before the first turn.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Unit whose turn it is.
    #[must_use]
    pub const fn current_unit(&self) -> Option<UnitId> {
        self.current
    }

    /// Both squads.
    #[must_use]
    pub const fn field(&self) -> &Battlefield {
        &self.field
    }

    /// Look up a unit on either side.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.field.unit(id)
    }

    /// Rules of this battle.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.setup.config
    }

    /// Setup the battle was started from.
    #[must_use]
    pub const fn setup(&self) -> &BattleSetup {
        &self.setup
    }

    /// Human commands accepted so far.
    #[must_use]
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// How the battle ended, once it has.
    #[must_use]
    pub const fn result(&self) -> Option<BattleResult> {
        self.result
    }

    /// Final outcome, after [`Battle::finish`] or [`Battle::abort`].
    #[must_use]
    pub const fn outcome(&self) -> Option<&BattleOutcome> {
        self.outcome.as_ref()
    }

    /// Whether no further turns will be played.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        matches!(self.state, BattleState::CompletedBattle | BattleState::WaitExit)
    }

    /// Event waiting for acknowledgement.
    #[must_use]
    pub fn current_event(&self) -> Option<&UnitActionEvent> {
        self.pending.front()
    }

    /// Number of events waiting for acknowledgement.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Hash of the battle state as it stood when the battle completed.
    #[must_use]
    pub const fn completion_hash(&self) -> Option<u64> {
        self.completion_hash
    }

    // ------------------------------------------------------------------------
    // Queries for the current unit
    // ------------------------------------------------------------------------

    /// Check whether the current unit may aim its main attack at `target`.
    ///
    /// # Errors
    ///
    /// Returns the reason the attack would be rejected.
    pub fn check_attack(&self, target: UnitId) -> std::result::Result<(), CommandRejection> {
        let unit = self.current.ok_or(CommandRejection::NotCurrentUnit)?;
        let attacker = self.field.unit(unit).ok_or(CommandRejection::NotCurrentUnit)?;
        let attack = &attacker.unit_type().primary_attack;
        let template = template_for(attack, self.provider.as_ref()).ok().flatten();
        let ctx = AttackProcessorContext::new(&self.field, unit, target, attack)
            .map_err(|_| CommandRejection::UnknownTarget)?
            .with_template(template.as_deref());
        crate::attack::check_attack(&ctx)
    }

    /// Whether the current unit may aim its main attack at `target`.
    #[must_use]
    pub fn can_attack(&self, target: UnitId) -> bool {
        self.check_attack(target).is_ok()
    }

    /// Check a command for the current unit without executing it.
    ///
    /// # Errors
    ///
    /// Returns the reason the command would be rejected.
    pub fn check_command(&self, command: BattleCommand) -> std::result::Result<(), CommandRejection> {
        let unit = self.current.ok_or(CommandRejection::NotCurrentUnit)?;
        match command {
            BattleCommand::Attack { target } => self.check_attack(target),
            BattleCommand::Wait => self.check_wait(unit),
            BattleCommand::Defend | BattleCommand::Retreat => Ok(()),
        }
    }

    /// Every unit the current unit may attack.
    #[must_use]
    pub fn legal_targets(&self) -> Vec<UnitId> {
        self.current.map_or_else(Vec::new, |unit| {
            ai::legal_targets(&self.field, unit, self.provider.as_ref())
        })
    }

    // ------------------------------------------------------------------------
    // Driving the battle
    // ------------------------------------------------------------------------

    /// Give a command to the human-controlled unit whose turn it is.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] outside
    /// [`BattleState::WaitPlayerTurn`] and [`BattleError::InvalidCommand`] if
    /// the command is not allowed. A rejected command changes nothing.
    pub fn submit_command(&mut self, unit: UnitId, command: BattleCommand) -> Result<()> {
        if self.state != BattleState::WaitPlayerTurn {
            return Err(BattleError::InvalidState {
                expected: BattleState::WaitPlayerTurn,
                actual: self.state,
            });
        }
        if self.current != Some(unit) {
            return Err(CommandRejection::NotCurrentUnit.into());
        }
        self.execute(unit, command)?;
        self.commands.push(RecordedCommand {
            round: self.round,
            unit,
            command,
        });
        self.advance()
    }

    /// Acknowledge that the event with `sequence` finished playing.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] when no event is pending and
    /// [`BattleError::OutOfOrderAcknowledgement`] if `sequence` is not the
    /// oldest pending event.
    pub fn complete_event(&mut self, sequence: u64) -> Result<()> {
        if self.state != BattleState::ProcessingUnitAction {
            return Err(BattleError::InvalidState {
                expected: BattleState::ProcessingUnitAction,
                actual: self.state,
            });
        }
        let Some(front) = self.pending.front() else {
            return Err(BattleError::InvalidState {
                expected: BattleState::ProcessingUnitAction,
                actual: self.state,
            });
        };
        if front.sequence != sequence {
            return Err(BattleError::OutOfOrderAcknowledgement {
                expected: front.sequence,
                received: sequence,
            });
        }
        self.pending.pop_front();
        if self.pending.is_empty() {
            self.advance()?;
        }
        Ok(())
    }

    /// Present and acknowledge events until the battle needs a human
    /// command or ends.
    ///
    /// # Errors
    ///
    /// Propagates engine errors raised while advancing.
    pub fn drive(&mut self, sink: &mut dyn PresentationSink) -> Result<()> {
        while self.state == BattleState::ProcessingUnitAction {
            let Some(event) = self.pending.front().copied() else {
                break;
            };
            sink.present(&event);
            self.complete_event(event.sequence)?;
        }
        Ok(())
    }

    /// Wrap up a completed battle: revert transforms, drop illusions and
    /// award experience.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] unless the battle is in
    /// [`BattleState::CompletedBattle`].
    pub fn finish(&mut self) -> Result<&BattleOutcome> {
        if self.state != BattleState::CompletedBattle {
            return Err(BattleError::InvalidState {
                expected: BattleState::CompletedBattle,
                actual: self.state,
            });
        }
        let result = self.result.unwrap_or(BattleResult::Draw);
        let outcome = finalize(&mut self.field, result, self.round);
        tracing::info!(?result, rounds = self.round, "Battle finished");
        self.state = BattleState::WaitExit;
        let outcome: &BattleOutcome = self.outcome.insert(outcome);
        Ok(outcome)
    }

    /// Call the battle off. Pending events are dropped and no experience is
    /// awarded. Aborting a battle that already exited returns its outcome.
    pub fn abort(&mut self) -> &BattleOutcome {
        if self.state != BattleState::WaitExit || self.outcome.is_none() {
            let dropped = self.pending.len();
            self.pending.clear();
            self.queue.clear();
            self.current = None;
            self.result = Some(BattleResult::Aborted);
            let outcome = finalize(&mut self.field, BattleResult::Aborted, self.round);
            tracing::info!(round = self.round, dropped, "Battle aborted");
            self.state = BattleState::WaitExit;
            self.outcome = Some(outcome);
        }
        let rounds = self.round;
        self.outcome.get_or_insert_with(|| BattleOutcome {
            result: BattleResult::Aborted,
            rounds,
            units: Vec::new(),
        })
    }

    /// Deterministic hash of the battle state.
    ///
    /// Two battles started from the same setup and fed the same commands
    /// hash the same.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.round.hash(&mut hasher);
        self.state.hash(&mut hasher);
        self.current.hash(&mut hasher);

        let mut units: Vec<(SquadSide, &Unit)> = self.field.units().collect();
        units.sort_by_key(|(_, unit)| unit.id());
        units.len().hash(&mut hasher);
        for (side, unit) in units {
            side.hash(&mut hasher);
            unit.id().hash(&mut hasher);
            unit.unit_type().id.hash(&mut hasher);
            unit.base_type().id.hash(&mut hasher);
            unit.position().hash(&mut hasher);
            unit.hit_points().hash(&mut hasher);
            unit.level().hash(&mut hasher);
            unit.experience().hash(&mut hasher);
            unit.effects().hash(&mut hasher);
            unit.wards().hash(&mut hasher);
            unit.retreat_state().hash(&mut hasher);
            unit.illusion_turns().hash(&mut hasher);
            unit.is_dissipated().hash(&mut hasher);
            unit.has_waited().hash(&mut hasher);
        }
        hasher.finish()
    }

    // ------------------------------------------------------------------------
    // Sequencing
    // ------------------------------------------------------------------------

    /// Run the state machine until it needs outside input.
    fn advance(&mut self) -> Result<()> {
        loop {
            if self.is_over() {
                return Ok(());
            }
            if !self.pending.is_empty() {
                self.state = BattleState::ProcessingUnitAction;
                return Ok(());
            }
            match self.step {
                Step::ActionDone => {
                    self.state = BattleState::CompletedUnitAction;
                    #[cfg(feature = "debug-validation")]
                    self.validate_invariants();
                    #[cfg(debug_assertions)]
                    tracing::trace!(round = self.round, state_hash = self.state_hash(), "Action completed");
                    if self.check_battle_end() {
                        return Ok(());
                    }
                    self.step = if self.can_act_again() {
                        Step::AwaitCommand
                    } else {
                        Step::NextUnit
                    };
                }
                Step::TurnStarted { can_act } => {
                    if self.check_battle_end() {
                        return Ok(());
                    }
                    self.step = if can_act { Step::AwaitCommand } else { Step::NextUnit };
                }
                Step::NextUnit => {
                    if self.check_battle_end() {
                        return Ok(());
                    }
                    match self.next_turn() {
                        Some(turn) => self.begin_turn(turn),
                        None => {
                            if !self.start_round() {
                                return Ok(());
                            }
                        }
                    }
                }
                Step::AwaitCommand => {
                    self.state = BattleState::WaitPlayerTurn;
                    let Some(unit) = self.current else {
                        self.step = Step::NextUnit;
                        continue;
                    };
                    if self.controller_of(unit) == Controller::Human {
                        return Ok(());
                    }
                    self.run_ai_turn(unit)?;
                }
            }
        }
    }

    /// Begin the next round. Returns `false` if the battle ended instead.
    fn start_round(&mut self) -> bool {
        if self.setup.config.is_round_limit_exceeded(self.round + 1) {
            tracing::info!(rounds = self.round, "Round limit reached");
            self.complete(BattleResult::Draw);
            return false;
        }
        self.round += 1;

        let ids: Vec<UnitId> = self.field.units().map(|(_, unit)| unit.id()).collect();
        for id in ids {
            if let Some(unit) = self.field.unit_mut(id) {
                unit.set_waited(false);
            }
        }

        let order = turn_order(&self.field, self.setup.config.initiative_spread, self.rng.as_mut());
        tracing::debug!(round = self.round, units = order.len(), "Round started");
        if order.is_empty() {
            self.complete(BattleResult::Draw);
            return false;
        }
        self.queue = order
            .into_iter()
            .map(|unit| QueuedTurn {
                unit,
                resumed: false,
            })
            .collect();
        true
    }

    /// Pop queued turns until one belongs to a unit that can still act.
    fn next_turn(&mut self) -> Option<QueuedTurn> {
        while let Some(turn) = self.queue.pop_front() {
            if self.field.unit(turn.unit).is_some_and(Unit::is_active) {
                return Some(turn);
            }
            tracing::trace!(unit = %turn.unit, "Skipping turn of inactive unit");
        }
        None
    }

    fn begin_turn(&mut self, turn: QueuedTurn) {
        self.current = Some(turn.unit);
        self.acted = false;
        self.state = BattleState::CompletedUnitAction;
        let Some(unit) = self.field.unit_mut(turn.unit) else {
            self.step = Step::NextUnit;
            return;
        };
        self.actions_left = unit.unit_type().attacks_per_turn.max(1);

        let mut log = EventLog::new();
        let can_act = if unit.is_retreating() {
            unit.complete_retreat();
            log.push(turn.unit, UnitActionType::Retreated);
            false
        } else if turn.resumed {
            tracing::debug!(round = self.round, unit = %turn.unit, "Waiting unit resumes");
            process_resumed_turn(unit, &mut log).can_act()
        } else if !unit.spend_illusion_turn() {
            log.push(turn.unit, UnitActionType::Dissipated);
            false
        } else {
            process_turn_start(unit, &self.setup.config, self.rng.as_mut(), &mut log).can_act()
        };
        tracing::debug!(round = self.round, unit = %turn.unit, can_act, "Turn started");
        self.enqueue(log);
        self.step = Step::TurnStarted { can_act };
    }

    fn run_ai_turn(&mut self, unit: UnitId) -> Result<()> {
        let command = ai::choose_command(&self.field, unit, self.provider.as_ref(), self.rng.as_mut());
        match self.execute(unit, command) {
            Err(BattleError::InvalidCommand(reason)) => {
                let fallback = if self.check_wait(unit).is_ok() {
                    BattleCommand::Wait
                } else {
                    BattleCommand::Defend
                };
                tracing::warn!(%unit, ?command, %reason, ?fallback, "AI command rejected");
                self.execute(unit, fallback)
            }
            other => other,
        }
    }

    /// Carry out `command` for `unit`. A rejected command leaves the battle
    /// exactly as it was.
    fn execute(&mut self, unit: UnitId, command: BattleCommand) -> Result<()> {
        let mut log = EventLog::new();
        match command {
            BattleCommand::Attack { target } => {
                self.state = BattleState::BeginUnitAction;
                let mut resolver =
                    AttackResolver::new(self.rng.as_mut(), &self.setup.config, self.provider.as_ref());
                match resolver.resolve(&mut self.field, unit, target, &mut log) {
                    Ok(()) => self.actions_left = self.actions_left.saturating_sub(1),
                    Err(BattleError::InvalidCommand(reason)) => {
                        self.state = BattleState::WaitPlayerTurn;
                        return Err(reason.into());
                    }
                    Err(error) => {
                        tracing::warn!(%unit, %target, %error, "Attack failed, falling back");
                        if self.check_wait(unit).is_ok() {
                            self.wait(unit, &mut log)?;
                        } else {
                            self.defend(unit, &mut log)?;
                        }
                    }
                }
            }
            BattleCommand::Defend => {
                self.state = BattleState::BeginUnitAction;
                self.defend(unit, &mut log)?;
            }
            BattleCommand::Wait => {
                self.check_wait(unit)?;
                self.state = BattleState::BeginUnitAction;
                self.wait(unit, &mut log)?;
            }
            BattleCommand::Retreat => {
                self.state = BattleState::BeginUnitAction;
                self.field.require_mut(unit)?.begin_retreat();
                self.actions_left = 0;
                log.push(unit, UnitActionType::Retreating);
            }
        }
        tracing::debug!(round = self.round, %unit, ?command, events = log.len(), "Command executed");
        self.acted = true;
        self.enqueue(log);
        self.step = Step::ActionDone;
        Ok(())
    }

    fn wait(&mut self, unit: UnitId, log: &mut EventLog) -> Result<()> {
        self.field.require_mut(unit)?.set_waited(true);
        self.queue.push_back(QueuedTurn { unit, resumed: true });
        self.actions_left = 0;
        log.push(unit, UnitActionType::Waiting);
        Ok(())
    }

    fn defend(&mut self, unit: UnitId, log: &mut EventLog) -> Result<()> {
        self.field
            .require_mut(unit)?
            .add_effect(BattleEffect::with_default_duration(BattleEffectType::Defend, 0));
        self.actions_left = 0;
        log.push(unit, UnitActionType::Defending);
        Ok(())
    }

    fn check_wait(&self, unit: UnitId) -> std::result::Result<(), CommandRejection> {
        if self.acted {
            return Err(CommandRejection::AlreadyActed);
        }
        if self.field.unit(unit).is_some_and(Unit::has_waited) {
            return Err(CommandRejection::AlreadyWaited);
        }
        Ok(())
    }

    fn can_act_again(&self) -> bool {
        self.actions_left > 0
            && self
                .current
                .and_then(|id| self.field.unit(id))
                .is_some_and(|unit| unit.is_active() && !unit.is_retreating())
    }

    fn controller_of(&self, unit: UnitId) -> Controller {
        self.field
            .side_of(unit)
            .map_or(Controller::Computer, |side| self.setup.squad(side).controller)
    }

    /// Move queued events into the pending queue with battle-wide numbers.
    fn enqueue(&mut self, mut log: EventLog) {
        for mut event in log.drain() {
            event.sequence = self.next_sequence;
            self.next_sequence += 1;
            self.pending.push_back(event);
        }
    }

    fn check_battle_end(&mut self) -> bool {
        let result = match self.field.defeated_side() {
            None => return false,
            Some(Some(loser)) => BattleResult::Victory(loser.opponent()),
            Some(None) => BattleResult::Draw,
        };
        self.complete(result);
        true
    }

    fn complete(&mut self, result: BattleResult) {
        self.state = BattleState::CompletedBattle;
        self.result = Some(result);
        self.queue.clear();
        self.current = None;
        self.completion_hash = Some(self.state_hash());
        tracing::info!(?result, rounds = self.round, "Battle completed");
    }

    #[cfg(feature = "debug-validation")]
    fn validate_invariants(&self) {
        for (side, unit) in self.field.units() {
            if unit.hit_points() > unit.max_hit_points() {
                tracing::error!(?side, unit = %unit.id(), hp = unit.hit_points(), "Hit points above maximum");
            }
            if unit.is_dead() && !unit.effects().is_empty() {
                tracing::error!(?side, unit = %unit.id(), "Dead unit still carries effects");
            }
        }
        for side in SquadSide::BOTH {
            let placed: Vec<&Unit> = self.field.squad(side).placed_units().collect();
            for (i, a) in placed.iter().enumerate() {
                for b in placed.iter().skip(i + 1) {
                    if a.position().overlaps(&b.position()) {
                        tracing::error!(?side, a = %a.id(), b = %b.id(), "Units share a cell");
                    }
                }
            }
        }
    }
}
