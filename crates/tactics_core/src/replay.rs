//! Player actions and replays.
//!
//! Every state change a player (or AI) can request is an [`Action`].
//! A [`Replay`] stores the initial battlefield plus the action stream,
//! which is enough to recreate the match bit for bit.

use serde::{Deserialize, Serialize};

use crate::battlefield::{AttackReport, Battlefield, TickEvents};
use crate::components::{TeamId, UnitId};
use crate::error::{Result, TacticsError};
use crate::grid::GridCoordinate;
use crate::scheduler::TaskId;

/// A request to change the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Move a unit to a cell.
    Move {
        /// Unit to move.
        unit: UnitId,
        /// Destination.
        to: GridCoordinate,
    },
    /// Attack a unit.
    Attack {
        /// Attacking unit.
        attacker: UnitId,
        /// Target unit.
        target: UnitId,
    },
    /// Pass the turn.
    EndTurn,
    /// Let time pass.
    Wait {
        /// Ticks to simulate.
        ticks: u32,
    },
    /// Cancel an impact that has not landed yet.
    Cancel {
        /// Scheduled impact.
        task: TaskId,
    },
    /// Heal a unit.
    Heal {
        /// Unit to heal.
        unit: UnitId,
        /// Health to restore.
        amount: u32,
    },
    /// Revive a dead unit.
    Revive {
        /// Unit to revive.
        unit: UnitId,
        /// Health after revival.
        health: u32,
    },
}

/// What an applied action did.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// The unit moved.
    Moved,
    /// The attack was made.
    Attacked(AttackReport),
    /// The turn passed to this team.
    TurnPassed(TeamId),
    /// Time passed; one entry per tick.
    Waited(Vec<TickEvents>),
    /// Whether a pending impact was removed.
    Cancelled(bool),
    /// Health restored.
    Healed(u32),
    /// Whether the unit came back.
    Revived(bool),
}

impl Battlefield {
    /// Apply one action.
    ///
    /// # Errors
    ///
    /// Returns the rejection or lookup error of the underlying operation.
    pub fn apply(&mut self, action: &Action) -> Result<ActionOutcome> {
        Ok(match *action {
            Action::Move { unit, to } => {
                self.move_unit(unit, to)?;
                ActionOutcome::Moved
            }
            Action::Attack { attacker, target } => {
                ActionOutcome::Attacked(self.attack(attacker, target)?)
            }
            Action::EndTurn => ActionOutcome::TurnPassed(self.end_turn()),
            Action::Wait { ticks } => ActionOutcome::Waited((0..ticks).map(|_| self.tick()).collect()),
            Action::Cancel { task } => ActionOutcome::Cancelled(self.cancel_pending(task)),
            Action::Heal { unit, amount } => ActionOutcome::Healed(self.heal_unit(unit, amount)?),
            Action::Revive { unit, health } => ActionOutcome::Revived(self.revive_unit(unit, health)?),
        })
    }
}

/// A single action record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Battlefield tick when the action was applied.
    pub tick: u64,
    /// The action.
    pub action: Action,
}

/// Replay format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario identifier or name.
    pub scenario_id: String,
    /// Serialized initial battlefield.
    pub initial_state: Vec<u8>,
    /// Actions in the order they were applied, rejected ones included.
    pub actions: Vec<ActionRecord>,
    /// Final tick.
    pub final_tick: u64,
    /// Final state hash for verification.
    pub final_hash: u64,
}

impl Replay {
    /// Start a replay from the current state of a battlefield.
    ///
    /// # Errors
    ///
    /// Returns an error if the battlefield cannot be serialized.
    pub fn new(scenario_id: impl Into<String>, initial_state: &Battlefield) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            scenario_id: scenario_id.into(),
            initial_state: initial_state.to_bytes()?,
            actions: Vec::new(),
            final_tick: initial_state.tick_count(),
            final_hash: initial_state.state_hash(),
        })
    }

    /// Record an action.
    pub fn record(&mut self, tick: u64, action: Action) {
        self.actions.push(ActionRecord { tick, action });
    }

    /// Finalize the replay with the end state.
    pub fn finalize(&mut self, battlefield: &Battlefield) {
        self.final_tick = battlefield.tick_count();
        self.final_hash = battlefield.state_hash();
    }

    /// Restore the initial battlefield.
    ///
    /// # Errors
    ///
    /// Returns an error if state deserialization fails.
    pub fn restore_initial_state(&self) -> Result<Battlefield> {
        Battlefield::from_bytes(&self.initial_state)
    }

    /// Re-run every action from the initial state.
    ///
    /// Rejected actions are re-applied too; they must be rejected again.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial state cannot be restored.
    pub fn play(&self) -> Result<Battlefield> {
        let mut battlefield = self.restore_initial_state()?;
        for record in &self.actions {
            if let Err(error) = battlefield.apply(&record.action) {
                tracing::trace!(%error, tick = record.tick, "Replayed action rejected");
            }
        }
        Ok(battlefield)
    }

    /// True if replaying reproduces the recorded final hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial state cannot be restored.
    pub fn verify(&self) -> Result<bool> {
        let battlefield = self.play()?;
        let matches = battlefield.state_hash() == self.final_hash;
        if !matches {
            tracing::warn!(
                scenario = %self.scenario_id,
                expected = self.final_hash,
                actual = battlefield.state_hash(),
                "Replay diverged"
            );
        }
        Ok(matches)
    }

    /// Serialize the replay.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| TacticsError::Serialization(format!("Failed to serialize replay: {e}")))
    }

    /// Deserialize a replay, checking the format version.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed bytes or a version mismatch.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(data)
            .map_err(|e| TacticsError::Serialization(format!("Failed to deserialize replay: {e}")))?;
        if replay.version != REPLAY_VERSION {
            return Err(TacticsError::Serialization(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }
        Ok(replay)
    }

    /// Number of recorded actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::data::{TeamData, UnitTemplate};

    fn recorded_match(seed: u64) -> Replay {
        let mut config = RulesConfig::default();
        config.damage.seed = seed;
        let mut field = Battlefield::new(config, TeamData::default_pair()).unwrap();
        let soldier = UnitTemplate::soldier();
        let blue = field
            .spawn_unit(&soldier, TeamId(0), GridCoordinate::new(1, 1))
            .unwrap();
        let red = field
            .spawn_unit(&soldier, TeamId(1), GridCoordinate::new(1, 2))
            .unwrap();

        let mut replay = Replay::new("duel", &field).unwrap();
        let script = [
            Action::Attack {
                attacker: blue,
                target: red,
            },
            Action::Wait { ticks: 2 },
            Action::EndTurn,
            Action::Attack {
                attacker: red,
                target: blue,
            },
            // Rejected: red already attacked.
            Action::Attack {
                attacker: red,
                target: blue,
            },
            Action::EndTurn,
            Action::Move {
                unit: blue,
                to: GridCoordinate::new(0, 1),
            },
            Action::Wait { ticks: 3 },
        ];
        for action in script {
            replay.record(field.tick_count(), action.clone());
            let _ = field.apply(&action);
        }
        replay.finalize(&field);
        replay
    }

    #[test]
    fn test_replay_reproduces_final_hash() {
        let replay = recorded_match(7);
        assert_eq!(replay.action_count(), 8);
        assert!(replay.verify().unwrap());
    }

    #[test]
    fn test_replay_round_trip() {
        let replay = recorded_match(3);
        let restored = Replay::from_bytes(&replay.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, replay);
        assert!(restored.verify().unwrap());
    }

    #[test]
    fn test_tampered_replay_diverges() {
        let mut replay = recorded_match(11);
        replay.actions.retain(|r| !matches!(r.action, Action::Move { .. }));
        assert!(!replay.verify().unwrap());
    }

    #[test]
    fn test_version_mismatch() {
        let mut replay = recorded_match(1);
        replay.version = 99;
        let bytes = replay.to_bytes().unwrap();
        assert!(matches!(
            Replay::from_bytes(&bytes),
            Err(TacticsError::Serialization(_))
        ));
    }

    #[test]
    fn test_apply_reports_outcomes() {
        let mut field = Battlefield::new(RulesConfig::default(), TeamData::default_pair()).unwrap();
        assert!(matches!(
            field.apply(&Action::EndTurn).unwrap(),
            ActionOutcome::TurnPassed(TeamId(1))
        ));
        match field.apply(&Action::Wait { ticks: 2 }).unwrap() {
            ActionOutcome::Waited(ticks) => assert_eq!(ticks.len(), 2),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(field
            .apply(&Action::Heal {
                unit: 42,
                amount: 1
            })
            .is_err());
    }
}
