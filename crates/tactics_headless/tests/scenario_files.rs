//! Scenario files on disk: loading, running and replaying.

use std::fs;

use tactics_core::prelude::*;
use tactics_headless::runner::{RunConfig, ScenarioRunner};
use tactics_headless::scenario::{Scenario, ScenarioError};
use tactics_test_utils::determinism::verify_script;

const CORRIDOR: &str = r#"
Scenario(
    name: "Corridor",
    description: "Two archers with a half wall between them",
    rules: (
        grid: (width: 6, height: 3),
        attack: (impact_delay_ticks: 1),
        damage: (critical: None),
    ),
    templates: [
        UnitTemplate(
            name: "archer",
            max_health: 4,
            attack: Some(AttackTemplate(damage: 2, range_percent: 300)),
        ),
    ],
    units: [
        (template: "archer", team: (0), position: (x: 0, z: 1)),
        (template: "archer", team: (1), position: (x: 4, z: 1)),
    ],
    obstacles: [
        (position: (x: 2, z: 0), obstacle: (cover: Partial, blocks_movement: true)),
    ],
    script: [
        Move(unit: 1, to: (x: 1, z: 1)),
        Attack(attacker: 1, target: 2),
        Wait(ticks: 2),
        EndTurn,
        Attack(attacker: 2, target: 1),
        Attack(attacker: 2, target: 1),
        Wait(ticks: 2),
    ],
)
"#;

#[test]
fn test_scenario_file_runs_and_replays() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corridor.ron");
    fs::write(&path, CORRIDOR).unwrap();

    let scenario = Scenario::load(&path).unwrap();
    assert_eq!(scenario.name, "Corridor");
    assert_eq!(scenario.templates[0].move_budget, 1);

    let runner = ScenarioRunner::new(
        scenario,
        RunConfig {
            seed: 9,
            emit_events: true,
        },
    );
    let mut out = Vec::new();
    let (report, replay) = runner.run(&mut out).unwrap();
    assert_eq!(report.applied, 6);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.tick, 4);

    let replay_path = dir.path().join("corridor.replay");
    fs::write(&replay_path, replay.to_bytes().unwrap()).unwrap();
    let loaded = Replay::from_bytes(&fs::read(&replay_path).unwrap()).unwrap();
    assert_eq!(loaded.final_hash, report.state_hash);
    assert!(loaded.verify().unwrap());
}

#[test]
fn test_same_seed_same_report() {
    let scenario = Scenario::from_ron_str(CORRIDOR).unwrap();
    let run = |seed| {
        ScenarioRunner::new(scenario.clone(), RunConfig { seed, emit_events: false })
            .run(&mut Vec::<u8>::new())
            .unwrap()
            .0
    };
    assert_eq!(run(3), run(3));
}

#[test]
fn test_script_is_deterministic_through_test_harness() {
    let scenario = Scenario::from_ron_str(CORRIDOR).unwrap();
    verify_script(3, || scenario.build(21).unwrap(), &scenario.script).assert_deterministic();
}

#[test]
fn test_malformed_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    fs::write(&path, "Scenario(name: ").unwrap();
    assert!(matches!(Scenario::load(&path), Err(ScenarioError::ParseError(_))));
}

#[test]
fn test_spawn_on_obstacle_is_a_setup_error() {
    let mut scenario = Scenario::from_ron_str(CORRIDOR).unwrap();
    scenario.units[0].position = GridCoordinate::new(2, 0);
    assert!(matches!(
        scenario.build(0),
        Err(ScenarioError::Setup(TacticsError::TileUnavailable(_)))
    ));
}
