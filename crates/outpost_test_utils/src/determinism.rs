//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the structure simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism include:
//!
//! - **Iteration order**: structures are advanced in store order and the
//!   level uses ordered maps only.
//!
//! - **Randomness**: layout selection and anything else random draws from
//!   the seeded RNG owned by the simulation.
//!
//! - **Host state**: the test world is ordered and has no clock of its own.
//!
//! Every harness here runs a [`Scenario`] so the world is rebuilt along
//! with the simulation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use outpost_core::simulation::Simulation;

use crate::fixtures::Scenario;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Example
///
/// ```ignore
/// use outpost_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     5,
///     100,
///     || base_scenario(),
///     |s| { s.step(); },
///     |s| s.sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..ticks {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a scenario twice with identical setup and compare the final
/// state hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Scenario,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |scenario| {
            scenario.step();
        },
        |scenario| scenario.sim.state_hash(),
    );
    result.is_deterministic
}

/// Compare two scenario runs tick-by-tick, finding the first divergence.
///
/// Returns `None` if the runs agree, `Some(tick)` at the first tick where
/// they differ.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Scenario,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.sim.state_hash() != b.sim.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.step();
        b.step();
        if a.sim.state_hash() != b.sim.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a serialization round trip preserves the simulation state
/// and that both copies stay in step afterwards.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Scenario,
{
    let mut scenario = setup_fn();
    for _ in 0..num_ticks {
        scenario.step();
    }

    let Ok(bytes) = scenario.sim.serialize() else {
        return false;
    };
    let (Ok(first), Ok(second)) = (
        Simulation::deserialize(&bytes),
        Simulation::deserialize(&bytes),
    ) else {
        return false;
    };
    if first.state_hash() != scenario.sim.state_hash() {
        return false;
    }

    // Restored copies reseed their RNG, so they are compared to each other.
    let mut a = Scenario {
        sim: first,
        world: scenario.world.clone(),
    };
    let mut b = Scenario {
        sim: second,
        world: scenario.world,
    };
    for _ in 0..num_ticks {
        a.step();
        b.step();
    }
    a.sim.state_hash() == b.sim.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use outpost_core::archetype::Archetype;
    use outpost_core::layout::LayoutRecord;
    use outpost_core::math::{Vec3, UP};
    use proptest::prelude::*;

    /// Any archetype.
    pub fn arb_archetype() -> impl Strategy<Value = Archetype> {
        proptest::sample::select(Archetype::ALL.to_vec())
    }

    /// A horizontal position on a typical map.
    ///
    /// Range: -4000 to 4000 on both axes, whole units.
    pub fn arb_position() -> impl Strategy<Value = (f32, f32)> {
        (-4000i32..4000i32, -4000i32..4000i32).prop_map(|(x, y)| (x as f32, y as f32))
    }

    /// Health in a reasonable range.
    pub fn arb_health() -> impl Strategy<Value = i32> {
        1i32..1000i32
    }

    /// A damage amount.
    pub fn arb_damage() -> impl Strategy<Value = i32> {
        1i32..300i32
    }

    /// A yaw in whole degrees.
    pub fn arb_yaw() -> impl Strategy<Value = f32> {
        (0i32..360i32).prop_map(|y| y as f32)
    }

    /// A layout record on the floor at height 0.
    pub fn arb_layout_record() -> impl Strategy<Value = LayoutRecord> {
        (arb_archetype(), arb_position(), arb_yaw()).prop_map(|(archetype, (x, y), yaw)| {
            LayoutRecord {
                archetype,
                origin: Vec3::new(x, y, 100.0),
                angles: Vec3::new(0.0, yaw, 0.0),
                normal: UP,
                turret_angles: Vec3::new(0.0, yaw, 0.0),
            }
        })
    }

    /// A layout of up to `max` records.
    pub fn arb_layout(max: usize) -> impl Strategy<Value = Vec<LayoutRecord>> {
        proptest::collection::vec(arb_layout_record(), 0..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_determinism_counter() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 2, |n| *n);
        result.assert_deterministic();
        assert_eq!(result.unique_hashes(), vec![20]);
    }

    #[test]
    fn test_detects_non_determinism() {
        let runs = std::cell::Cell::new(0u64);
        let result = verify_determinism(
            2,
            1,
            || {
                runs.set(runs.get() + 1);
                runs.get()
            },
            |_| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&"reactor"), compute_hash(&"reactor"));
        assert_ne!(compute_hash(&1u32), compute_hash(&2u32));
    }

    #[test]
    fn test_empty_scenario_is_deterministic() {
        assert!(verify_simulation_determinism(|| Scenario::new(4), 20));
        assert_eq!(find_first_divergence(|| Scenario::new(4), 20), None);
    }
}
