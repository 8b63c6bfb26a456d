//! Scenario loading and configuration.
//!
//! Scenarios define the starting battlefield for headless runs: rules,
//! teams, unit templates and placements, obstacles, and an optional
//! scripted action list.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tactics_core::battlefield::Battlefield;
use tactics_core::components::TeamId;
use tactics_core::config::RulesConfig;
use tactics_core::data::{TeamData, UnitTemplate};
use tactics_core::error::TacticsError;
use tactics_core::grid::{GridCoordinate, Obstacle};
use tactics_core::replay::Action;
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Reading the scenario or writing output failed.
    #[error("Scenario IO failed: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// A placement names a template the scenario does not define.
    #[error("Unknown unit template: {0}")]
    UnknownTemplate(String),
    /// The rules engine refused the setup.
    #[error("Invalid scenario setup: {0}")]
    Setup(#[from] TacticsError),
}

/// One unit on the starting battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Template name.
    pub template: String,
    /// Owning team.
    pub team: TeamId,
    /// Starting cell.
    pub position: GridCoordinate,
}

impl UnitPlacement {
    /// Create a placement.
    pub fn new(template: &str, team: u8, x: i32, z: i32) -> Self {
        Self {
            template: template.to_string(),
            team: TeamId(team),
            position: GridCoordinate::new(x, z),
        }
    }
}

/// An obstacle on the starting battlefield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstaclePlacement {
    /// Cell.
    pub position: GridCoordinate,
    /// What stands there.
    pub obstacle: Obstacle,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Rules; omitted fields take their defaults.
    #[serde(default)]
    pub rules: RulesConfig,
    /// Participating teams.
    #[serde(default = "TeamData::default_pair")]
    pub teams: Vec<TeamData>,
    /// Unit templates available to placements.
    #[serde(default = "default_templates")]
    pub templates: Vec<UnitTemplate>,
    /// Units on the battlefield. Empty means one soldier per starting position.
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
    /// Obstacles.
    #[serde(default)]
    pub obstacles: Vec<ObstaclePlacement>,
    /// Scripted actions, applied in order by `run`.
    #[serde(default)]
    pub script: Vec<Action>,
}

fn default_templates() -> Vec<UnitTemplate> {
    vec![UnitTemplate::soldier()]
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish_2v2()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// The default 4x4 two-versus-two soldier skirmish.
    #[must_use]
    pub fn skirmish_2v2() -> Self {
        Self {
            name: "Skirmish 2v2".to_string(),
            description: "Two soldiers per side on the default battlefield".to_string(),
            rules: RulesConfig::default(),
            teams: TeamData::default_pair(),
            templates: default_templates(),
            units: Vec::new(),
            obstacles: Vec::new(),
            script: Vec::new(),
        }
    }

    /// Look up a template by name.
    pub fn template(&self, name: &str) -> Option<&UnitTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Build the starting battlefield with the given damage seed.
    pub fn build(&self, seed: u64) -> Result<Battlefield, ScenarioError> {
        let mut rules = self.rules.clone();
        rules.damage.seed = seed;
        let mut field = Battlefield::new(rules, self.teams.clone())?;

        for placement in &self.obstacles {
            field.set_obstacle(placement.position, Some(placement.obstacle))?;
        }

        if self.units.is_empty() {
            let template = self
                .templates
                .first()
                .ok_or_else(|| ScenarioError::UnknownTemplate("<none>".to_string()))?;
            field.populate(template)?;
        } else {
            for placement in &self.units {
                let template = self
                    .template(&placement.template)
                    .ok_or_else(|| ScenarioError::UnknownTemplate(placement.template.clone()))?;
                field.spawn_unit(template, placement.team, placement.position)?;
            }
        }

        tracing::debug!(
            scenario = %self.name,
            seed,
            units = field.units().len(),
            "Scenario built"
        );
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert_eq!(scenario.teams.len(), 2);
        assert!(scenario.template("soldier").is_some());
        let field = scenario.build(0).unwrap();
        assert_eq!(field.units().len(), 4);
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Corridor",
                rules: (
                    grid: (width: 5, height: 3),
                    attack: (impact_delay_ticks: 2),
                ),
                units: [
                    (template: "soldier", team: (0), position: (x: 0, z: 1)),
                    (template: "soldier", team: (1), position: (x: 4, z: 1)),
                ],
                obstacles: [
                    (position: (x: 2, z: 0), obstacle: (cover: Full, blocks_movement: true)),
                ],
                script: [
                    Move(unit: 1, to: (x: 1, z: 1)),
                    EndTurn,
                    Wait(ticks: 3),
                ],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.rules.grid.width, 5);
        assert_eq!(scenario.rules.attack.impact_delay_ticks, 2);
        assert_eq!(scenario.units[1], UnitPlacement::new("soldier", 1, 4, 1));
        assert_eq!(scenario.script.len(), 3);

        let field = scenario.build(1).unwrap();
        assert!(field.grid().blocks_movement(GridCoordinate::new(2, 0)));
    }

    #[test]
    fn test_unknown_template_is_reported() {
        let mut scenario = Scenario::default();
        scenario.units = vec![UnitPlacement::new("dragon", 0, 0, 0)];
        assert!(matches!(
            scenario.build(0),
            Err(ScenarioError::UnknownTemplate(name)) if name == "dragon"
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("does/not/exist.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
