//! The battlefield: owner of all match state.
//!
//! [`Battlefield`] wires the rules together. It owns the grid, the
//! units, the health registry, the validators, the damage calculator,
//! the event broadcaster, the win checker and the impact scheduler, and
//! exposes the player-facing operations (spawn, move, attack, end turn,
//! tick).
//!
//! # Action flow
//!
//! 1. An action is validated against a read-only [`BattlefieldView`].
//! 2. Costs are paid (move or action points, attack counters).
//! 3. Effects are applied now, or at the impact keyframe
//!    `impact_delay_ticks` later through the [`Scheduler`].
//! 4. Events are queued on the broadcaster and dispatched by [`Battlefield::tick`].
//!
//! Everything is deterministic for a given configuration seed and
//! action sequence; [`Battlefield::state_hash`] fingerprints the state.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::components::{TeamId, Unit, UnitId};
use crate::config::{AttackRules, DamageConfig, MovementRules, RulesConfig};
use crate::damage::{CacheStats, Combatant, DamageCalculationResult, DamageCalculator, RngState};
use crate::data::{TeamData, UnitTemplate};
use crate::error::{Result, TacticsError};
use crate::events::{EventBroadcaster, EventKind, EventSink, GameEvent};
use crate::grid::{Facing, Grid, GridCoordinate, Obstacle, TerrainKind};
use crate::health::{DamageOutcome, HealthManager};
use crate::scheduler::{Scheduler, TaskId};
use crate::validation::{
    AttackValidationResult, AttackValidator, BattlefieldView, MovementValidationResult,
    MovementValidator,
};
use crate::victory::{MatchOutcome, WinConditionChecker};

/// Damage waiting for its impact keyframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingImpact {
    /// Attacking unit.
    pub attacker: UnitId,
    /// Target unit.
    pub target: UnitId,
    /// Damage computed when the attack was made.
    pub damage: DamageCalculationResult,
}

/// When an attack's damage lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impact {
    /// Damage was applied immediately.
    Applied(DamageOutcome),
    /// Damage will land when the task fires.
    Scheduled(TaskId),
}

/// Result of a successful attack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackReport {
    /// The computed damage.
    pub damage: DamageCalculationResult,
    /// Whether it already landed.
    pub impact: Impact,
}

/// Events dispatched during one tick.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Tick that was just simulated.
    pub tick: u64,
    /// Impacts that landed this tick, with their outcome.
    pub impacts: Vec<(PendingImpact, DamageOutcome)>,
    /// Events handed to the sinks, in dispatch order.
    pub dispatched: Vec<GameEvent>,
}

/// Serializable battlefield state.
///
/// The damage RNG position travels with the snapshot, so a restored
/// battlefield rolls the same numbers the original would have. The event
/// queue and damage cache do not: a restored battlefield starts with both
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattlefieldSnapshot {
    /// Rules in force.
    pub config: RulesConfig,
    /// Participating teams.
    pub teams: Vec<TeamData>,
    /// Tiles.
    pub grid: Grid,
    /// Units, dead ones included.
    pub units: BTreeMap<UnitId, Unit>,
    /// Health registry.
    pub health: HealthManager,
    /// Announcements made so far.
    pub win: WinConditionChecker,
    /// Impacts still in flight.
    pub pending: Scheduler<PendingImpact>,
    /// Current tick.
    pub tick: u64,
    /// Turn counter.
    pub turn: u32,
    /// Index into `teams` of the acting team.
    pub active_team_index: usize,
    /// Next id handed out by `spawn_unit`.
    pub next_unit_id: UnitId,
    /// Damage RNG position. `None` seeds from `config.damage.seed`.
    pub damage_rng: Option<RngState>,
}

/// A running match.
#[derive(Debug)]
pub struct Battlefield {
    config: RulesConfig,
    teams: Vec<TeamData>,
    grid: Grid,
    units: BTreeMap<UnitId, Unit>,
    health: HealthManager,
    movement: MovementValidator,
    attack: AttackValidator,
    damage: DamageCalculator,
    broadcaster: EventBroadcaster,
    win: WinConditionChecker,
    pending: Scheduler<PendingImpact>,
    tick: u64,
    turn: u32,
    active_team_index: usize,
    next_unit_id: UnitId,
}

impl Battlefield {
    /// Create an empty battlefield. The first team starts turn 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no team is given.
    pub fn new(config: RulesConfig, teams: Vec<TeamData>) -> Result<Self> {
        config.validate()?;
        if teams.is_empty() {
            return Err(TacticsError::InvalidConfig(
                "a battlefield needs at least one team".to_string(),
            ));
        }
        if let Some(problem) = TeamData::validate_all(&teams).into_iter().next() {
            return Err(TacticsError::InvalidConfig(problem));
        }

        let mut battlefield = Self::assemble(BattlefieldSnapshot {
            grid: Grid::new(config.grid.width, config.grid.height),
            units: BTreeMap::new(),
            health: HealthManager::new(config.health.regeneration.clone()),
            win: WinConditionChecker::new(),
            pending: Scheduler::new(),
            tick: 0,
            turn: 1,
            active_team_index: 0,
            next_unit_id: 1,
            damage_rng: None,
            teams,
            config,
        });
        let first = battlefield.teams[0].id;
        battlefield.publish(EventKind::TurnStarted {
            team: first,
            turn: 1,
        });
        tracing::debug!(teams = battlefield.teams.len(), "Battlefield created");
        Ok(battlefield)
    }

    fn assemble(snapshot: BattlefieldSnapshot) -> Self {
        let config = snapshot.config;
        let mut damage = DamageCalculator::new(config.damage.clone());
        if let Some(state) = snapshot.damage_rng {
            damage.set_rng_state(state);
        }
        Self {
            movement: MovementValidator::new(config.movement.clone()),
            attack: AttackValidator::new(config.attack.clone()),
            damage,
            broadcaster: EventBroadcaster::new(config.events.clone()),
            config,
            teams: snapshot.teams,
            grid: snapshot.grid,
            units: snapshot.units,
            health: snapshot.health,
            win: snapshot.win,
            pending: snapshot.pending,
            tick: snapshot.tick,
            turn: snapshot.turn,
            active_team_index: snapshot.active_team_index,
            next_unit_id: snapshot.next_unit_id,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Rules in force.
    #[must_use]
    pub const fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Current tick.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Turn counter, starting at 1.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Team whose turn it is.
    #[must_use]
    pub fn active_team(&self) -> TeamId {
        self.teams[self.active_team_index].id
    }

    /// Participating teams.
    #[must_use]
    pub fn teams(&self) -> &[TeamData] {
        &self.teams
    }

    /// Battlefield tiles.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// All units, dead ones included.
    #[must_use]
    pub const fn units(&self) -> &BTreeMap<UnitId, Unit> {
        &self.units
    }

    /// One unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Living units of a team, in id order.
    pub fn living_units(&self, team: TeamId) -> impl Iterator<Item = &Unit> {
        self.units
            .values()
            .filter(move |u| u.alive && u.team == team)
    }

    /// Health registry.
    #[must_use]
    pub const fn health(&self) -> &HealthManager {
        &self.health
    }

    /// Event broadcaster, for attaching sinks and reading counters.
    pub fn broadcaster_mut(&mut self) -> &mut EventBroadcaster {
        &mut self.broadcaster
    }

    /// Event broadcaster.
    #[must_use]
    pub const fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    /// Impacts waiting for their keyframe.
    #[must_use]
    pub const fn pending_impacts(&self) -> &Scheduler<PendingImpact> {
        &self.pending
    }

    /// Damage cache counters.
    #[must_use]
    pub const fn damage_cache_stats(&self) -> CacheStats {
        self.damage.cache_stats()
    }

    /// Match state.
    #[must_use]
    pub const fn outcome(&self) -> MatchOutcome {
        self.win.outcome()
    }

    /// Read-only view handed to validators.
    #[must_use]
    pub fn view(&self) -> BattlefieldView<'_> {
        BattlefieldView {
            grid: &self.grid,
            units: &self.units,
            health: &self.health,
            active_team: self
                .config
                .turns
                .enforce_turns
                .then(|| self.active_team()),
            tick: self.tick,
        }
    }

    fn publish(&mut self, kind: EventKind) {
        self.broadcaster.publish(GameEvent::new(kind, self.tick));
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Place a unit built from `template`.
    ///
    /// The unit faces the centre of the battlefield.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown team, a cell outside the grid, or
    /// a cell that is blocked or already occupied.
    pub fn spawn_unit(
        &mut self,
        template: &UnitTemplate,
        team: TeamId,
        position: GridCoordinate,
    ) -> Result<UnitId> {
        if !self.teams.iter().any(|t| t.id == team) {
            return Err(TacticsError::UnknownTeam(team));
        }
        if !self.grid.contains(position) {
            return Err(TacticsError::OutOfBounds(position));
        }
        if self.grid.blocks_movement(position) || self.view().unit_at(position).is_some() {
            return Err(TacticsError::TileUnavailable(position));
        }

        let id = self.next_unit_id;
        self.next_unit_id += 1;

        let centre = GridCoordinate::new(self.grid.width() / 2, self.grid.height() / 2);
        let unit = Unit {
            id,
            name: template.name.clone(),
            team,
            position,
            facing: Facing::towards(position, centre).unwrap_or_default(),
            action_points: template.action_points(),
            alive: true,
            attack: template.attack.as_ref().map(|a| a.to_capability()),
        };
        self.units.insert(id, unit);
        self.health.register(id, template.max_health);

        tracing::debug!(unit = id, %team, %position, template = %template.name, "Unit spawned");
        Ok(id)
    }

    /// Spawn one unit from `template` on every team starting position.
    ///
    /// # Errors
    ///
    /// Fails on the first position that cannot hold a unit.
    pub fn populate(&mut self, template: &UnitTemplate) -> Result<Vec<UnitId>> {
        let placements: Vec<(TeamId, GridCoordinate)> = self
            .teams
            .iter()
            .flat_map(|t| t.starting_positions.iter().map(move |p| (t.id, *p)))
            .collect();
        placements
            .into_iter()
            .map(|(team, position)| self.spawn_unit(template, team, position))
            .collect()
    }

    /// Place or clear an obstacle.
    ///
    /// # Errors
    ///
    /// Fails outside the grid or when a blocking obstacle would be placed
    /// on a living unit.
    pub fn set_obstacle(&mut self, position: GridCoordinate, obstacle: Option<Obstacle>) -> Result<()> {
        if obstacle.is_some_and(|o| o.blocks_movement) && self.view().unit_at(position).is_some() {
            return Err(TacticsError::TileUnavailable(position));
        }
        self.grid.set_obstacle(position, obstacle)
    }

    /// Change a tile's terrain.
    ///
    /// # Errors
    ///
    /// Fails outside the grid.
    pub fn set_terrain(&mut self, position: GridCoordinate, terrain: TerrainKind) -> Result<()> {
        self.grid.set_terrain(position, terrain)
    }

    /// Change a tile's elevation.
    ///
    /// # Errors
    ///
    /// Fails outside the grid.
    pub fn set_elevation(&mut self, position: GridCoordinate, elevation: i32) -> Result<()> {
        self.grid.set_elevation(position, elevation)
    }

    /// Swap the movement rules mid-match.
    pub fn set_movement_rules(&mut self, rules: MovementRules) {
        self.config.movement = rules.clone();
        self.movement.set_rules(rules);
    }

    /// Swap the attack rules mid-match.
    pub fn set_attack_rules(&mut self, rules: AttackRules) {
        self.config.attack = rules.clone();
        self.attack.set_rules(rules);
    }

    /// Swap the damage configuration mid-match. Clears the damage cache.
    pub fn set_damage_config(&mut self, config: DamageConfig) {
        self.config.damage = config.clone();
        self.damage.set_config(config);
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    /// Check a move without performing it.
    #[must_use]
    pub fn validate_move(&self, unit: UnitId, destination: GridCoordinate) -> MovementValidationResult {
        self.movement.validate(&self.view(), unit, destination)
    }

    /// Every cell `unit` could legally move to right now.
    #[must_use]
    pub fn legal_moves(&self, unit: UnitId) -> Vec<GridCoordinate> {
        let view = self.view();
        self.grid
            .coordinates()
            .filter(|c| self.movement.validate(&view, unit, *c).is_ok())
            .collect()
    }

    /// Move a unit.
    ///
    /// # Errors
    ///
    /// Returns [`TacticsError::MoveRejected`] with the reason if the move
    /// is illegal.
    pub fn move_unit(&mut self, unit: UnitId, destination: GridCoordinate) -> Result<()> {
        self.validate_move(unit, destination)?;

        let mover = self
            .units
            .get_mut(&unit)
            .ok_or(TacticsError::UnknownUnit(unit))?;
        let from = mover.position;
        mover.position = destination;
        mover.facing = Facing::towards(from, destination).unwrap_or(mover.facing);
        mover.action_points.spend_move();

        self.damage.invalidate_unit(unit);
        self.publish(EventKind::UnitMoved {
            unit,
            from,
            to: destination,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    /// Check an attack without performing it.
    #[must_use]
    pub fn validate_attack(&self, attacker: UnitId, target: UnitId) -> AttackValidationResult {
        self.attack.validate(&self.view(), attacker, target)
    }

    /// Every unit `attacker` could legally attack right now.
    #[must_use]
    pub fn legal_targets(&self, attacker: UnitId) -> Vec<UnitId> {
        let view = self.view();
        self.units
            .keys()
            .copied()
            .filter(|target| self.attack.validate(&view, attacker, *target).is_ok())
            .collect()
    }

    /// Preview the damage of an attack without performing it.
    ///
    /// The preview is cached, so attacking right after previewing deals
    /// the previewed damage.
    ///
    /// # Errors
    ///
    /// Fails if either unit does not exist.
    pub fn preview_damage(&mut self, attacker: UnitId, target: UnitId) -> Result<DamageCalculationResult> {
        let (source, victim, base) = self.combatants(attacker, target)?;
        Ok(self
            .damage
            .compute(base, &source, &victim, &self.grid, self.tick))
    }

    fn combatants(&self, attacker: UnitId, target: UnitId) -> Result<(Combatant, Combatant, u32)> {
        let source = self
            .units
            .get(&attacker)
            .ok_or(TacticsError::UnknownUnit(attacker))?;
        let victim = self
            .units
            .get(&target)
            .ok_or(TacticsError::UnknownUnit(target))?;
        let base = source.attack.as_ref().map_or(0, |a| a.damage);
        Ok((combatant(source), combatant(victim), base))
    }

    /// Attack a unit.
    ///
    /// Damage is computed immediately. With a zero impact delay it is
    /// applied at once, otherwise it lands when the scheduled impact
    /// fires during a later [`tick`](Self::tick).
    ///
    /// # Errors
    ///
    /// Returns [`TacticsError::AttackRejected`] with the reason if the
    /// attack is illegal.
    pub fn attack(&mut self, attacker: UnitId, target: UnitId) -> Result<AttackReport> {
        self.validate_attack(attacker, target)?;

        let (source, victim, base) = self.combatants(attacker, target)?;
        let damage = self
            .damage
            .compute(base, &source, &victim, &self.grid, self.tick);

        let tick = self.tick;
        let unit = self
            .units
            .get_mut(&attacker)
            .ok_or(TacticsError::UnknownUnit(attacker))?;
        unit.action_points.spend_act();
        unit.facing = Facing::towards(source.position, victim.position).unwrap_or(unit.facing);
        if let Some(capability) = unit.attack.as_mut() {
            capability.record_attack(tick);
        }
        // Facing changed, so cached flank results involving the attacker are stale.
        self.damage.invalidate_unit(attacker);

        let impact = PendingImpact {
            attacker,
            target,
            damage: damage.clone(),
        };
        let delay = self.config.attack.impact_delay_ticks;
        let impact = if delay == 0 {
            Impact::Applied(self.land(&impact)?)
        } else {
            let id = self.pending.schedule(delay, impact);
            tracing::debug!(attacker, target, delay, "Impact scheduled");
            Impact::Scheduled(id)
        };

        Ok(AttackReport { damage, impact })
    }

    /// Cancel an impact that has not landed yet.
    ///
    /// Nothing already applied is rolled back: attack counters and action
    /// points stay spent. Returns false if the impact already fired or
    /// never existed.
    pub fn cancel_pending(&mut self, task: TaskId) -> bool {
        let cancelled = self.pending.cancel(task);
        if let Some(impact) = &cancelled {
            tracing::debug!(attacker = impact.attacker, target = impact.target, "Impact cancelled");
        }
        cancelled.is_some()
    }

    fn land(&mut self, impact: &PendingImpact) -> Result<DamageOutcome> {
        let outcome = self.health.apply_damage(
            impact.target,
            impact.damage.final_damage,
            Some(impact.attacker),
            impact.damage.critical,
            self.tick,
            &mut self.broadcaster,
        )?;
        self.damage.invalidate_unit(impact.target);
        if outcome.died {
            self.on_death(impact.target);
        }
        Ok(outcome)
    }

    fn on_death(&mut self, unit: UnitId) {
        if let Some(dead) = self.units.get_mut(&unit) {
            dead.alive = false;
        }
        self.damage.invalidate_unit(unit);
        self.win
            .evaluate(&self.units, self.tick, &mut self.broadcaster);
    }

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    /// Heal a living unit. Returns the health actually restored.
    ///
    /// # Errors
    ///
    /// Fails if the unit does not exist.
    pub fn heal_unit(&mut self, unit: UnitId, amount: u32) -> Result<u32> {
        if !self.units.contains_key(&unit) {
            return Err(TacticsError::UnknownUnit(unit));
        }
        let healed = self
            .health
            .heal(unit, amount, self.tick, &mut self.broadcaster)?;
        if healed > 0 {
            self.damage.invalidate_unit(unit);
        }
        Ok(healed)
    }

    /// Bring a dead unit back with `health` points.
    ///
    /// Returns false if the unit was not dead.
    ///
    /// # Errors
    ///
    /// Fails if the unit does not exist or another unit now stands on its cell.
    pub fn revive_unit(&mut self, unit: UnitId, health: u32) -> Result<bool> {
        let position = self
            .units
            .get(&unit)
            .map(|u| u.position)
            .ok_or(TacticsError::UnknownUnit(unit))?;
        if !self.health.get(unit).is_some_and(|h| h.is_dead()) {
            return Ok(false);
        }
        if self.view().unit_at(position).is_some() {
            return Err(TacticsError::TileUnavailable(position));
        }

        let revived = self
            .health
            .revive(unit, health, self.tick, &mut self.broadcaster)?;
        if revived {
            if let Some(u) = self.units.get_mut(&unit) {
                u.alive = true;
            }
            self.damage.invalidate_unit(unit);
        }
        Ok(revived)
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Pass the turn to the next team that still has living units, or
    /// simply to the next team when nobody is alive.
    ///
    /// Budgets of the new team's units are restored.
    pub fn end_turn(&mut self) -> TeamId {
        let count = self.teams.len();
        let mut next = (self.active_team_index + 1) % count;
        for step in 1..=count {
            let candidate = (self.active_team_index + step) % count;
            if self.living_units(self.teams[candidate].id).next().is_some() {
                next = candidate;
                break;
            }
        }
        self.active_team_index = next;
        self.turn += 1;

        let team = self.active_team();
        for unit in self.units.values_mut().filter(|u| u.team == team) {
            unit.reset_turn();
        }
        tracing::debug!(%team, turn = self.turn, "Turn started");
        self.publish(EventKind::TurnStarted {
            team,
            turn: self.turn,
        });
        team
    }

    /// Advance one tick: land due impacts, regenerate health and
    /// dispatch queued events.
    pub fn tick(&mut self) -> TickEvents {
        self.tick += 1;
        let mut events = TickEvents {
            tick: self.tick,
            ..TickEvents::default()
        };

        for (_, impact) in self.pending.advance(self.tick) {
            if !self.units.get(&impact.target).is_some_and(|u| u.alive) {
                tracing::debug!(target = impact.target, "Impact fizzled on a dead target");
                continue;
            }
            match self.land(&impact) {
                Ok(outcome) => events.impacts.push((impact, outcome)),
                Err(error) => tracing::warn!(%error, "Impact could not be applied"),
            }
        }

        self.health
            .tick_regeneration(self.tick, &mut self.broadcaster);

        events.dispatched = self.broadcaster.process(self.tick);
        events
    }

    /// Dispatch every queued event without advancing time.
    pub fn flush_events(&mut self) -> Vec<GameEvent> {
        self.broadcaster.flush(self.tick)
    }

    // ------------------------------------------------------------------
    // Determinism
    // ------------------------------------------------------------------

    /// Fingerprint of the match state.
    ///
    /// Two battlefields fed the same configuration and actions hash
    /// identically.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.turn.hash(&mut hasher);
        self.active_team_index.hash(&mut hasher);
        self.grid.revision().hash(&mut hasher);

        // BTreeMap iterates in id order.
        self.units.len().hash(&mut hasher);
        for (id, unit) in &self.units {
            id.hash(&mut hasher);
            unit.team.hash(&mut hasher);
            unit.position.hash(&mut hasher);
            unit.facing.hash(&mut hasher);
            unit.alive.hash(&mut hasher);
            unit.action_points.hash(&mut hasher);
            if let Some(attack) = &unit.attack {
                attack.attacks_used.hash(&mut hasher);
                attack.last_attack_tick.hash(&mut hasher);
            }
            if let Some(health) = self.health.get(*id) {
                health.current().hash(&mut hasher);
                health.max().hash(&mut hasher);
                health.is_dead().hash(&mut hasher);
            }
        }

        for (task, due, impact) in self.pending.iter() {
            task.hash(&mut hasher);
            due.hash(&mut hasher);
            impact.target.hash(&mut hasher);
            impact.damage.final_damage.hash(&mut hasher);
        }

        self.win.outcome().hash(&mut hasher);
        hasher.finish()
    }

    /// Capture the serializable state.
    #[must_use]
    pub fn snapshot(&self) -> BattlefieldSnapshot {
        BattlefieldSnapshot {
            config: self.config.clone(),
            teams: self.teams.clone(),
            grid: self.grid.clone(),
            units: self.units.clone(),
            health: self.health.clone(),
            win: self.win.clone(),
            pending: self.pending.clone(),
            tick: self.tick,
            turn: self.turn,
            active_team_index: self.active_team_index,
            next_unit_id: self.next_unit_id,
            damage_rng: Some(self.damage.rng_state()),
        }
    }

    /// Rebuild a battlefield from a snapshot.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot's configuration or teams are inconsistent.
    pub fn restore(snapshot: BattlefieldSnapshot) -> Result<Self> {
        snapshot.config.validate()?;
        if snapshot.active_team_index >= snapshot.teams.len() {
            return Err(TacticsError::InvalidConfig(
                "snapshot active team out of range".to_string(),
            ));
        }
        Ok(Self::assemble(snapshot))
    }

    /// Serialize the state for replays or save games.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.snapshot())
            .map_err(|e| TacticsError::Serialization(format!("Failed to serialize battlefield: {e}")))
    }

    /// Deserialize state produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid snapshot.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let snapshot: BattlefieldSnapshot = bincode::deserialize(data).map_err(|e| {
            TacticsError::Serialization(format!("Failed to deserialize battlefield: {e}"))
        })?;
        Self::restore(snapshot)
    }
}

fn combatant(unit: &Unit) -> Combatant {
    Combatant {
        id: unit.id,
        team: unit.team,
        position: unit.position,
        facing: unit.facing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;
    use crate::validation::{AttackRejection, MoveRejection};

    fn quiet_config() -> RulesConfig {
        RulesConfig {
            damage: DamageConfig::disabled(),
            ..RulesConfig::default()
        }
    }

    fn duel() -> (Battlefield, UnitId, UnitId) {
        let mut field = Battlefield::new(quiet_config(), TeamData::default_pair()).unwrap();
        let soldier = UnitTemplate::soldier();
        let blue = field
            .spawn_unit(&soldier, TeamId(0), GridCoordinate::new(1, 1))
            .unwrap();
        let red = field
            .spawn_unit(&soldier, TeamId(1), GridCoordinate::new(1, 2))
            .unwrap();
        (field, blue, red)
    }

    fn dispatched_types(field: &mut Battlefield) -> Vec<EventType> {
        field.flush_events().iter().map(GameEvent::event_type).collect()
    }

    #[test]
    fn test_new_battlefield_starts_turn_one() {
        let mut field = Battlefield::new(quiet_config(), TeamData::default_pair()).unwrap();
        assert_eq!(field.turn(), 1);
        assert_eq!(field.active_team(), TeamId(0));
        assert_eq!(dispatched_types(&mut field), vec![EventType::TurnStarted]);
    }

    #[test]
    fn test_rejects_empty_team_list() {
        assert!(matches!(
            Battlefield::new(quiet_config(), Vec::new()),
            Err(TacticsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_spawn_checks() {
        let (mut field, _, _) = duel();
        let soldier = UnitTemplate::soldier();
        assert!(matches!(
            field.spawn_unit(&soldier, TeamId(9), GridCoordinate::new(0, 0)),
            Err(TacticsError::UnknownTeam(TeamId(9)))
        ));
        assert!(matches!(
            field.spawn_unit(&soldier, TeamId(0), GridCoordinate::new(4, 0)),
            Err(TacticsError::OutOfBounds(_))
        ));
        assert!(matches!(
            field.spawn_unit(&soldier, TeamId(0), GridCoordinate::new(1, 1)),
            Err(TacticsError::TileUnavailable(_))
        ));
    }

    #[test]
    fn test_move_updates_position_and_budget() {
        let (mut field, blue, _) = duel();
        field.move_unit(blue, GridCoordinate::new(0, 1)).unwrap();
        let unit = field.unit(blue).unwrap();
        assert_eq!(unit.position, GridCoordinate::new(0, 1));
        assert_eq!(unit.facing, Facing::West);
        assert!(matches!(
            field.move_unit(blue, GridCoordinate::new(0, 0)),
            Err(TacticsError::MoveRejected(MoveRejection::NoMovesRemaining))
        ));
    }

    #[test]
    fn test_turn_enforcement() {
        let (mut field, _, red) = duel();
        assert!(matches!(
            field.move_unit(red, GridCoordinate::new(2, 2)),
            Err(TacticsError::MoveRejected(MoveRejection::NotYourTurn(_)))
        ));
        field.end_turn();
        assert_eq!(field.active_team(), TeamId(1));
        assert!(field.move_unit(red, GridCoordinate::new(2, 2)).is_ok());
    }

    #[test]
    fn test_rule_swaps_reach_validators() {
        let (mut field, blue, red) = duel();
        let far = GridCoordinate::new(1, 3);
        assert!(matches!(
            field.validate_move(blue, far),
            Err(MoveRejection::TooFar { distance: 2, max: 1 })
        ));
        field.set_movement_rules(MovementRules {
            max_move_distance: 2,
            ..MovementRules::default()
        });
        assert_eq!(field.validate_move(blue, far), Ok(()));
        assert_eq!(field.config().movement.max_move_distance, 2);

        assert_eq!(field.validate_attack(blue, red), Ok(()));
        field.set_attack_rules(AttackRules {
            max_range_percent: 50,
            ..AttackRules::default()
        });
        assert!(matches!(
            field.validate_attack(blue, red),
            Err(AttackRejection::OutOfRange { .. })
        ));
        assert_eq!(field.config().attack.max_range_percent, 50);
    }

    #[test]
    fn test_attack_applies_damage_immediately() {
        let (mut field, blue, red) = duel();
        let report = field.attack(blue, red).unwrap();
        assert_eq!(report.damage.final_damage, 1);
        assert!(matches!(report.impact, Impact::Applied(outcome) if outcome.remaining == 2));
        assert_eq!(field.health().get(red).unwrap().current(), 2);
        assert!(matches!(
            field.attack(blue, red),
            Err(TacticsError::AttackRejected(AttackRejection::NoAttacksRemaining))
        ));
    }

    #[test]
    fn test_kill_deactivates_and_decides_match() {
        let (mut field, blue, red) = duel();
        for _ in 0..3 {
            field.attack(blue, red).unwrap();
            field.end_turn();
            field.end_turn();
        }
        let dead = field.unit(red).unwrap();
        assert!(!dead.alive);
        assert_eq!(field.outcome(), MatchOutcome::Victory(TeamId(0)));
        // Dead units free their tile.
        assert!(field.view().unit_at(GridCoordinate::new(1, 2)).is_none());

        let types = dispatched_types(&mut field);
        let deaths = types.iter().filter(|t| **t == EventType::UnitDied).count();
        assert_eq!(deaths, 1);
        assert!(types.contains(&EventType::TeamEliminated));
        assert!(types.contains(&EventType::MatchEnded));
    }

    #[test]
    fn test_end_turn_skips_eliminated_teams() {
        let mut teams = TeamData::default_pair();
        teams.push(TeamData {
            id: TeamId(2),
            name: "Green".to_string(),
            color: (0, 200, 0),
            starting_positions: Vec::new(),
            controller: crate::data::Controller::Ai,
        });
        let mut field = Battlefield::new(quiet_config(), teams).unwrap();
        let soldier = UnitTemplate::soldier();
        field.populate(&soldier).unwrap();
        assert_eq!(field.end_turn(), TeamId(1));
        assert_eq!(field.end_turn(), TeamId(0));
        assert_eq!(field.turn(), 3);
    }

    #[test]
    fn test_delayed_impact_and_cancel() {
        let mut config = quiet_config();
        config.attack.impact_delay_ticks = 2;
        let mut field = Battlefield::new(config, TeamData::default_pair()).unwrap();
        let mut archer = UnitTemplate::soldier();
        if let Some(attack) = archer.attack.as_mut() {
            attack.attacks_per_turn = 2;
        }
        archer.act_budget = 2;
        let blue = field
            .spawn_unit(&archer, TeamId(0), GridCoordinate::new(1, 1))
            .unwrap();
        let red = field
            .spawn_unit(&archer, TeamId(1), GridCoordinate::new(1, 2))
            .unwrap();

        let first = field.attack(blue, red).unwrap();
        let second = field.attack(blue, red).unwrap();
        let Impact::Scheduled(cancel_me) = second.impact else {
            panic!("expected a scheduled impact");
        };
        assert!(matches!(first.impact, Impact::Scheduled(_)));
        assert_eq!(field.health().get(red).unwrap().current(), 3);

        assert!(field.cancel_pending(cancel_me));
        assert!(!field.cancel_pending(cancel_me));

        assert!(field.tick().impacts.is_empty());
        let events = field.tick();
        assert_eq!(events.impacts.len(), 1);
        assert_eq!(field.health().get(red).unwrap().current(), 2);
        // Cancelling does not refund the attack.
        assert!(!field.unit(blue).unwrap().attack.unwrap().has_attacks_remaining());
    }

    #[test]
    fn test_heal_and_revive() {
        let (mut field, blue, red) = duel();
        field.attack(blue, red).unwrap();
        assert_eq!(field.heal_unit(red, 5).unwrap(), 1);
        assert!(matches!(field.heal_unit(99, 1), Err(TacticsError::UnknownUnit(99))));

        assert!(!field.revive_unit(red, 1).unwrap());
        for _ in 0..3 {
            field.end_turn();
            field.end_turn();
            field.attack(blue, red).unwrap();
        }
        assert!(!field.unit(red).unwrap().alive);
        assert!(field.revive_unit(red, 2).unwrap());
        assert!(field.unit(red).unwrap().alive);
        assert_eq!(field.health().get(red).unwrap().current(), 2);
    }

    #[test]
    fn test_revive_blocked_by_occupant() {
        let (mut field, blue, red) = duel();
        for _ in 0..3 {
            field.attack(blue, red).unwrap();
            field.end_turn();
            field.end_turn();
        }
        field.move_unit(blue, GridCoordinate::new(1, 2)).unwrap();
        assert!(matches!(
            field.revive_unit(red, 1),
            Err(TacticsError::TileUnavailable(_))
        ));
    }

    #[test]
    fn test_legal_moves_and_targets() {
        let (field, blue, red) = duel();
        let moves = field.legal_moves(blue);
        assert_eq!(
            moves,
            vec![
                GridCoordinate::new(1, 0),
                GridCoordinate::new(0, 1),
                GridCoordinate::new(2, 1),
            ]
        );
        assert_eq!(field.legal_targets(blue), vec![red]);
        assert!(field.legal_targets(red).is_empty());
    }

    #[test]
    fn test_snapshot_round_trip_preserves_hash() {
        let (mut field, blue, red) = duel();
        field.attack(blue, red).unwrap();
        field.tick();
        let bytes = field.to_bytes().unwrap();
        let restored = Battlefield::from_bytes(&bytes).unwrap();
        assert_eq!(restored.state_hash(), field.state_hash());
        assert_eq!(restored.health().get(red).unwrap().current(), 2);
    }

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(matches!(
            Battlefield::from_bytes(&[1, 2, 3]),
            Err(TacticsError::Serialization(_))
        ));
    }

    #[test]
    fn test_hash_changes_with_state() {
        let (mut field, blue, _) = duel();
        let before = field.state_hash();
        field.move_unit(blue, GridCoordinate::new(0, 1)).unwrap();
        assert_ne!(before, field.state_hash());
    }

    #[test]
    fn test_blocking_obstacle_cannot_land_on_unit() {
        let (mut field, _, _) = duel();
        assert!(matches!(
            field.set_obstacle(GridCoordinate::new(1, 1), Some(Obstacle::WALL)),
            Err(TacticsError::TileUnavailable(_))
        ));
        assert!(field
            .set_obstacle(GridCoordinate::new(2, 2), Some(Obstacle::WALL))
            .is_ok());
    }
}
