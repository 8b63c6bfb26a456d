//! Greedy AI for headless skirmishes.
//!
//! The AI only looks one action ahead: attack the weakest unit in reach,
//! otherwise step towards the nearest enemy, otherwise pass the turn.
//! It reads legality from the battlefield's validators, so it can never
//! choose an illegal action.

use serde::{Deserialize, Serialize};
use tactics_core::battlefield::Battlefield;
use tactics_core::components::{TeamId, UnitId};
use tactics_core::grid::GridCoordinate;
use tactics_core::replay::{Action, Replay};
use tactics_core::victory::MatchOutcome;

/// Living units of one team at the end of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survivors {
    /// Team.
    pub team: TeamId,
    /// Living units.
    pub units: usize,
}

/// Summary of one AI-versus-AI match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Damage seed.
    pub seed: u64,
    /// How the match ended.
    pub outcome: MatchOutcome,
    /// Turn counter when play stopped.
    pub turns: u32,
    /// Ticks simulated.
    pub ticks: u64,
    /// Actions applied.
    pub actions: usize,
    /// Living units per team.
    pub survivors: Vec<Survivors>,
    /// Final state hash.
    pub state_hash: u64,
}

/// One-ply greedy decision maker.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyAi;

impl GreedyAi {
    /// Choose the next action for the active team.
    pub fn next_action(&self, field: &Battlefield) -> Action {
        let team = field.active_team();
        let ours: Vec<UnitId> = field.living_units(team).map(|u| u.id).collect();

        for &unit in &ours {
            let weakest = field
                .legal_targets(unit)
                .into_iter()
                .min_by_key(|t| (field.health().get(*t).map_or(u32::MAX, |h| h.current()), *t));
            if let Some(target) = weakest {
                return Action::Attack {
                    attacker: unit,
                    target,
                };
            }
        }

        let enemies: Vec<GridCoordinate> = field
            .units()
            .values()
            .filter(|u| u.alive && u.team != team)
            .map(|u| u.position)
            .collect();
        let nearest = |cell: GridCoordinate| enemies.iter().map(|e| cell.manhattan_distance(*e)).min();

        for &unit in &ours {
            let Some(position) = field.unit(unit).map(|u| u.position) else {
                continue;
            };
            let Some(current) = nearest(position) else {
                break;
            };
            let best = field
                .legal_moves(unit)
                .into_iter()
                .filter_map(|cell| nearest(cell).map(|d| (d, cell)))
                .min();
            if let Some((distance, to)) = best {
                if distance < current {
                    return Action::Move { unit, to };
                }
            }
        }

        Action::EndTurn
    }

    /// Play until the match is decided or `max_turns` have started.
    ///
    /// One tick passes after every action so scheduled impacts land and
    /// events are dispatched. Every applied action, ticks included, is
    /// recorded into `replay` when given.
    pub fn play_match(
        &self,
        field: &mut Battlefield,
        max_turns: u32,
        mut replay: Option<&mut Replay>,
    ) -> MatchSummary {
        let mut actions = 0;
        let tick = Action::Wait { ticks: 1 };

        while !field.outcome().is_over() && field.turn() <= max_turns {
            let mut action = self.next_action(field);
            if let Err(error) = field.apply(&action) {
                tracing::warn!(%error, ?action, "AI chose a rejected action; passing the turn");
                action = Action::EndTurn;
                apply_logged(field, &action);
            }
            apply_logged(field, &tick);
            if let Some(replay) = replay.as_deref_mut() {
                let at = field.tick_count().saturating_sub(1);
                replay.record(at, action);
                replay.record(at, tick.clone());
            }
            actions += 1;
        }

        // Let impacts still in flight land.
        let delay = field.config().attack.impact_delay_ticks;
        if delay > 0 && field.pending_impacts().pending() > 0 {
            let drain = Action::Wait {
                ticks: u32::try_from(delay).unwrap_or(u32::MAX),
            };
            if let Some(replay) = replay.as_deref_mut() {
                replay.record(field.tick_count(), drain.clone());
            }
            apply_logged(field, &drain);
        }
        if let Some(replay) = replay {
            replay.finalize(field);
        }

        let summary = MatchSummary {
            seed: field.config().damage.seed,
            outcome: field.outcome(),
            turns: field.turn(),
            ticks: field.tick_count(),
            actions,
            survivors: field
                .teams()
                .iter()
                .map(|t| Survivors {
                    team: t.id,
                    units: field.living_units(t.id).count(),
                })
                .collect(),
            state_hash: field.state_hash(),
        };
        tracing::info!(
            seed = summary.seed,
            outcome = ?summary.outcome,
            turns = summary.turns,
            "Match finished"
        );
        summary
    }
}

/// Apply an action that should never be rejected, logging if it is.
fn apply_logged(field: &mut Battlefield, action: &Action) -> bool {
    match field.apply(action) {
        Ok(_) => true,
        Err(error) => {
            tracing::warn!(%error, ?action, "Housekeeping action rejected");
            false
        }
    }
}
