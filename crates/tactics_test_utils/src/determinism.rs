//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the rules engine produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and networked matches depend on bit-identical outcomes.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: damage and range use fixed-point via
//!   [`tactics_core::math::Fixed`].
//!
//! - **HashMap iteration order**: units and health live in ordered maps;
//!   the damage cache is never iterated for results.
//!
//! - **Randomness**: damage rolls come from a ChaCha stream seeded by
//!   the configuration.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tactics_core::battlefield::Battlefield;
use tactics_core::replay::Action;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of actions applied per run.
    pub actions: usize,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battlefield is non-deterministic!\n\
                 Runs: {}\n\
                 Actions: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.actions,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Apply `script` to a fresh battlefield `runs` times and compare final hashes.
///
/// Rejected actions are part of the script; they must be rejected the
/// same way on every run.
pub fn verify_script<Setup>(runs: usize, setup: Setup, script: &[Action]) -> DeterminismResult
where
    Setup: Fn() -> Battlefield,
{
    let hashes: Vec<u64> = (0..runs)
        .map(|_| {
            let mut field = setup();
            run_script(&mut field, script);
            field.state_hash()
        })
        .collect();

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        actions: script.len(),
    }
}

/// Apply every action, ignoring rejections. Returns how many were accepted.
pub fn run_script(field: &mut Battlefield, script: &[Action]) -> usize {
    script
        .iter()
        .filter(|action| match field.apply(action) {
            Ok(_) => true,
            Err(error) => {
                tracing::trace!(%error, "Scripted action rejected");
                false
            }
        })
        .count()
}

/// Run two battlefields side by side and report the first action after
/// which their hashes differ.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(index)` of the diverging
/// action otherwise (`Some(0)` means they already differ before any action).
pub fn find_first_divergence<Setup>(setup: Setup, script: &[Action]) -> Option<usize>
where
    Setup: Fn() -> Battlefield,
{
    let mut first = setup();
    let mut second = setup();
    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for (index, action) in script.iter().enumerate() {
        let _ = first.apply(action);
        let _ = second.apply(action);
        if first.state_hash() != second.state_hash() {
            return Some(index + 1);
        }
    }
    None
}

/// Verify that a bincode round-trip preserves the state hash.
pub fn verify_serialization_determinism(field: &Battlefield) -> bool {
    let Ok(bytes) = field.to_bytes() else {
        return false;
    };
    Battlefield::from_bytes(&bytes).is_ok_and(|restored| restored.state_hash() == field.state_hash())
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
