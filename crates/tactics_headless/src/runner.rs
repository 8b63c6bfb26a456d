//! Scripted scenario runner.
//!
//! Applies a scenario's action script to a fresh battlefield and writes
//! one JSON object per line to the output: every dispatched event, every
//! rejected action, and a final report.

use std::io::Write;

use serde::Serialize;
use tactics_core::events::GameEvent;
use tactics_core::replay::{Action, ActionOutcome, Replay};
use tactics_core::victory::MatchOutcome;

use crate::scenario::{Scenario, ScenarioError};

/// A line of runner output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputLine<'a> {
    /// An event handed to the sinks.
    Event(&'a GameEvent),
    /// A scripted action was refused.
    Rejected {
        /// Index in the script.
        index: usize,
        /// The action.
        action: &'a Action,
        /// Why it was refused.
        reason: String,
    },
    /// Final state.
    Report(&'a RunReport),
}

/// Final state after a scripted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Damage seed.
    pub seed: u64,
    /// Actions that were applied.
    pub applied: usize,
    /// Actions that were refused.
    pub rejected: usize,
    /// Final tick.
    pub tick: u64,
    /// Final turn counter.
    pub turn: u32,
    /// Match outcome.
    pub outcome: MatchOutcome,
    /// Final state hash.
    pub state_hash: u64,
}

/// Runner configuration.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Damage seed.
    pub seed: u64,
    /// Print dispatched events.
    pub emit_events: bool,
}

/// Runs a scenario script and streams its output.
#[derive(Debug)]
pub struct ScenarioRunner {
    scenario: Scenario,
    config: RunConfig,
}

impl ScenarioRunner {
    /// Create a runner.
    pub fn new(scenario: Scenario, config: RunConfig) -> Self {
        Self { scenario, config }
    }

    /// Run the script, writing JSON lines to `out`.
    ///
    /// Returns the final report and the recorded replay.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<(RunReport, Replay), ScenarioError> {
        let mut field = self.scenario.build(self.config.seed)?;
        let mut replay = Replay::new(self.scenario.name.clone(), &field)?;
        let mut applied = 0;
        let mut rejected = 0;

        for (index, action) in self.scenario.script.iter().enumerate() {
            replay.record(field.tick_count(), action.clone());
            match field.apply(action) {
                Ok(ActionOutcome::Waited(ticks)) => {
                    applied += 1;
                    if self.config.emit_events {
                        for event in ticks.iter().flat_map(|t| &t.dispatched) {
                            write_line(out, &OutputLine::Event(event))?;
                        }
                    }
                }
                Ok(_) => applied += 1,
                Err(error) => {
                    rejected += 1;
                    tracing::debug!(index, %error, "Scripted action rejected");
                    write_line(
                        out,
                        &OutputLine::Rejected {
                            index,
                            action,
                            reason: error.to_string(),
                        },
                    )?;
                }
            }
        }

        // Anything not dispatched by a Wait goes out now.
        let remaining = field.flush_events();
        if self.config.emit_events {
            for event in &remaining {
                write_line(out, &OutputLine::Event(event))?;
            }
        }
        replay.finalize(&field);

        let report = RunReport {
            scenario: self.scenario.name.clone(),
            seed: self.config.seed,
            applied,
            rejected,
            tick: field.tick_count(),
            turn: field.turn(),
            outcome: field.outcome(),
            state_hash: field.state_hash(),
        };
        write_line(out, &OutputLine::Report(&report))?;
        tracing::info!(
            scenario = %report.scenario,
            applied,
            rejected,
            outcome = ?report.outcome,
            "Scenario finished"
        );
        Ok((report, replay))
    }
}

fn write_line<W: Write>(out: &mut W, line: &OutputLine<'_>) -> Result<(), ScenarioError> {
    let json = serde_json::to_string(line).map_err(std::io::Error::other)?;
    writeln!(out, "{json}")?;
    Ok(())
}
