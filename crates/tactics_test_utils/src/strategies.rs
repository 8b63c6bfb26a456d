//! Proptest strategies.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of the rules.

use proptest::prelude::*;
use tactics_core::components::UnitId;
use tactics_core::config::{BroadcasterConfig, RegenerationConfig, VariationConfig};
use tactics_core::events::EventPriority;
use tactics_core::grid::GridCoordinate;
use tactics_core::replay::Action;

/// Any cell of a `width` x `height` grid.
pub fn arb_coordinate(width: i32, height: i32) -> impl Strategy<Value = GridCoordinate> {
    (0..width, 0..height).prop_map(|(x, z)| GridCoordinate::new(x, z))
}

/// A cell that may lie a few cells outside the grid.
pub fn arb_loose_coordinate(width: i32, height: i32) -> impl Strategy<Value = GridCoordinate> {
    (-2..width + 2, -2..height + 2).prop_map(|(x, z)| GridCoordinate::new(x, z))
}

/// Valid variation bounds.
pub fn arb_variation() -> impl Strategy<Value = VariationConfig> {
    (-5i32..=0, 0i32..=5).prop_map(|(min, max)| VariationConfig { min, max })
}

/// Valid regeneration settings.
pub fn arb_regeneration() -> impl Strategy<Value = RegenerationConfig> {
    (1u32..=400, 0u64..20, 1u32..=100).prop_map(|(per_hundred_ticks, delay_ticks, cap_percent)| {
        RegenerationConfig {
            per_hundred_ticks,
            delay_ticks,
            cap_percent,
        }
    })
}

/// Valid broadcaster limits.
pub fn arb_broadcaster_config() -> impl Strategy<Value = BroadcasterConfig> {
    (1usize..32, 1usize..8, 0u64..3).prop_map(|(max_queue, max_per_tick, dedupe_window_ticks)| {
        BroadcasterConfig {
            max_queue,
            max_per_tick,
            dedupe_window_ticks,
        }
    })
}

/// Any event priority.
pub fn arb_priority() -> impl Strategy<Value = EventPriority> {
    prop_oneof![
        Just(EventPriority::Low),
        Just(EventPriority::Normal),
        Just(EventPriority::High),
        Just(EventPriority::Critical),
    ]
}

/// An action against units `1..=max_unit` on a `size` x `size` grid.
pub fn arb_action(max_unit: UnitId, size: i32) -> impl Strategy<Value = Action> {
    let unit = 1..=max_unit;
    prop_oneof![
        4 => (unit.clone(), arb_loose_coordinate(size, size))
            .prop_map(|(unit, to)| Action::Move { unit, to }),
        4 => (unit.clone(), unit.clone())
            .prop_map(|(attacker, target)| Action::Attack { attacker, target }),
        2 => Just(Action::EndTurn),
        1 => (1u32..4).prop_map(|ticks| Action::Wait { ticks }),
        1 => (unit, 1u32..3).prop_map(|(unit, amount)| Action::Heal { unit, amount }),
    ]
}

/// A script of up to `len` actions.
pub fn arb_script(max_unit: UnitId, size: i32, len: usize) -> impl Strategy<Value = Vec<Action>> {
    prop::collection::vec(arb_action(max_unit, size), 0..len)
}
