//! Team elimination and match outcome.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::{TeamId, Unit, UnitId};
use crate::events::{EventKind, EventSink, GameEvent};

/// State of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MatchOutcome {
    /// More than one team still has living units.
    #[default]
    InProgress,
    /// Exactly one team has living units.
    Victory(TeamId),
    /// No team has living units.
    Draw,
}

impl MatchOutcome {
    /// True once the match is decided.
    #[must_use]
    pub const fn is_over(self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Winning team, if any.
    #[must_use]
    pub const fn winner(self) -> Option<TeamId> {
        match self {
            Self::Victory(team) => Some(team),
            _ => None,
        }
    }
}

/// Watches living units per team and announces eliminations.
///
/// Every announcement is made at most once per match: a team that is
/// eliminated and later revived is not eliminated a second time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinConditionChecker {
    eliminated: BTreeSet<TeamId>,
    last_standing: BTreeSet<TeamId>,
    outcome: MatchOutcome,
}

impl WinConditionChecker {
    /// Create a checker with nothing announced.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest outcome.
    #[must_use]
    pub const fn outcome(&self) -> MatchOutcome {
        self.outcome
    }

    /// Teams announced as eliminated.
    pub fn eliminated(&self) -> impl Iterator<Item = TeamId> + '_ {
        self.eliminated.iter().copied()
    }

    /// Living units of every team that has ever fielded a unit.
    #[must_use]
    pub fn living_per_team(units: &BTreeMap<UnitId, Unit>) -> BTreeMap<TeamId, Vec<UnitId>> {
        let mut living: BTreeMap<TeamId, Vec<UnitId>> = BTreeMap::new();
        for unit in units.values() {
            let entry = living.entry(unit.team).or_default();
            if unit.alive {
                entry.push(unit.id);
            }
        }
        living
    }

    /// Re-evaluate after a change, publishing any new announcements.
    pub fn evaluate(
        &mut self,
        units: &BTreeMap<UnitId, Unit>,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> MatchOutcome {
        if self.outcome.is_over() {
            return self.outcome;
        }

        let living = Self::living_per_team(units);
        for (team, alive) in &living {
            let roster = units.values().filter(|u| u.team == *team).count();

            match alive.as_slice() {
                [] => {
                    if self.eliminated.insert(*team) {
                        tracing::debug!(%team, tick, "Team eliminated");
                        sink.publish(GameEvent::new(EventKind::TeamEliminated { team: *team }, tick));
                    }
                }
                [unit] if roster > 1 => {
                    if self.last_standing.insert(*team) {
                        sink.publish(GameEvent::new(
                            EventKind::LastUnitStanding {
                                team: *team,
                                unit: *unit,
                            },
                            tick,
                        ));
                    }
                }
                _ => {}
            }
        }

        let mut standing = living
            .iter()
            .filter(|(_, alive)| !alive.is_empty())
            .map(|(team, _)| *team);
        let outcome = match (standing.next(), standing.next()) {
            (None, _) if !living.is_empty() => MatchOutcome::Draw,
            (Some(team), None) if living.len() > 1 => MatchOutcome::Victory(team),
            _ => MatchOutcome::InProgress,
        };

        if outcome.is_over() {
            tracing::info!(?outcome, tick, "Match decided");
            sink.publish(GameEvent::new(
                EventKind::MatchEnded {
                    winner: outcome.winner(),
                },
                tick,
            ));
        }
        self.outcome = outcome;
        outcome
    }

    /// Forget all announcements.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
