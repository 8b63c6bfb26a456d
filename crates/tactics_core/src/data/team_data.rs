//! Per-team configuration.

use serde::{Deserialize, Serialize};

use crate::components::TeamId;
use crate::error::{Result, TacticsError};
use crate::grid::GridCoordinate;

/// Who issues a team's orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Controller {
    /// A human player.
    #[default]
    Player,
    /// The built-in AI.
    Ai,
}

/// Static configuration of one team, constant for the whole match.
///
/// # Example RON
///
/// ```ron
/// TeamData(
///     id: (0),
///     name: "Blue",
///     color: (40, 90, 220),
///     starting_positions: [(x: 0, z: 0), (x: 1, z: 0)],
///     controller: Player,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamData {
    /// Team identifier.
    pub id: TeamId,

    /// Display name.
    pub name: String,

    /// Team colour, RGB.
    #[serde(default = "default_color")]
    pub color: (u8, u8, u8),

    /// Cells where this team's units are placed, in spawn order.
    #[serde(default)]
    pub starting_positions: Vec<GridCoordinate>,

    /// Player or AI.
    #[serde(default)]
    pub controller: Controller,
}

/// Default colour (grey).
const fn default_color() -> (u8, u8, u8) {
    (128, 128, 128)
}

impl TeamData {
    /// Parse a list of teams from RON text.
    pub fn list_from_ron_str(text: &str) -> Result<Vec<Self>> {
        ron::from_str(text).map_err(|e| TacticsError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// The two-team setup of the default 4x4 battlefield: a player team
    /// on the bottom row and an AI team on the top row.
    #[must_use]
    pub fn default_pair() -> Vec<Self> {
        vec![
            Self {
                id: TeamId(0),
                name: "Blue".to_string(),
                color: (40, 90, 220),
                starting_positions: vec![GridCoordinate::new(0, 0), GridCoordinate::new(1, 0)],
                controller: Controller::Player,
            },
            Self {
                id: TeamId(1),
                name: "Red".to_string(),
                color: (220, 50, 40),
                starting_positions: vec![GridCoordinate::new(3, 3), GridCoordinate::new(2, 3)],
                controller: Controller::Ai,
            },
        ]
    }

    /// Check a team list for duplicate ids and overlapping starts.
    ///
    /// Returns a list of problems; empty means consistent.
    #[must_use]
    pub fn validate_all(teams: &[Self]) -> Vec<String> {
        let mut errors = Vec::new();
        for (i, team) in teams.iter().enumerate() {
            for other in &teams[i + 1..] {
                if team.id == other.id {
                    errors.push(format!("{} is defined twice", team.id));
                }
                for cell in &team.starting_positions {
                    if other.starting_positions.contains(cell) {
                        errors.push(format!(
                            "{} and {} share starting position {cell}",
                            team.id, other.id
                        ));
                    }
                }
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pair_is_consistent() {
        let teams = TeamData::default_pair();
        assert_eq!(teams.len(), 2);
        assert!(TeamData::validate_all(&teams).is_empty());
        assert_eq!(teams[1].controller, Controller::Ai);
    }

    #[test]
    fn test_parse_with_defaults() {
        let teams = TeamData::list_from_ron_str(
            r#"[
                (id: (0), name: "North"),
                (id: (1), name: "South", controller: Ai, starting_positions: [(x: 2, z: 3)]),
            ]"#,
        )
        .unwrap();
        assert_eq!(teams[0].color, (128, 128, 128));
        assert!(teams[0].starting_positions.is_empty());
        assert_eq!(teams[1].starting_positions, vec![GridCoordinate::new(2, 3)]);
    }

    #[test]
    fn test_detects_duplicates() {
        let mut teams = TeamData::default_pair();
        teams[1].id = TeamId(0);
        teams[1].starting_positions = teams[0].starting_positions.clone();
        let errors = TeamData::validate_all(&teams);
        assert_eq!(errors.len(), 3);
    }
}
