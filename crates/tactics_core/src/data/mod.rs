//! Static team and unit definitions.
//!
//! Pure data structures that describe who fights and with what. All
//! structs deserialize from RON text.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `tactics_headless`.

mod team_data;
mod unit_template;

pub use team_data::{Controller, TeamData};
pub use unit_template::{AttackTemplate, UnitTemplate};
