//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! command batches and memory given identical inputs.
//!
//! # Sources of non-determinism
//!
//! - **Floating-point math**: geometry uses [`fleet_core::math::Fixed`].
//! - **HashMap iteration order**: all maps are `BTreeMap`, visited by id.
//! - **System randomness**: the engine only uses the `Rng` it is handed,
//!   so every run here seeds a fresh `SmallRng`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use fleet_core::command::CommandBatch;
use fleet_core::engine::{Decision, FleetEngine};
use fleet_core::error::Result;
use fleet_core::memory::EngineMemory;
use fleet_core::snapshot::WorldSnapshot;
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks decided per run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engine is non-deterministic!\n\
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

/// Run a stateful process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute a state hash
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

/// State threaded through a replay of one snapshot.
#[derive(Debug)]
pub struct ReplayState {
    engine: FleetEngine,
    snapshot: WorldSnapshot,
    memory: EngineMemory,
    rng: SmallRng,
    /// Hash of every batch decided so far, in order.
    pub batch_hashes: Vec<u64>,
}

impl ReplayState {
    /// Start a replay with empty memory and a seeded random source.
    #[must_use]
    pub fn new(engine: FleetEngine, snapshot: WorldSnapshot, seed: u64) -> Self {
        Self {
            engine,
            snapshot,
            memory: EngineMemory::new(),
            rng: SmallRng::seed_from_u64(seed),
            batch_hashes: Vec::new(),
        }
    }

    /// Decide one tick on the same snapshot, advancing the tick counter.
    pub fn step(&mut self) -> Result<Decision> {
        let decision = self.engine.decide(&self.snapshot, &self.memory, &mut self.rng)?;
        self.memory = decision.memory.clone();
        self.batch_hashes.push(batch_hash(&decision.batch));
        self.snapshot.tick += 1;
        Ok(decision)
    }

    /// Memory carried into the next tick.
    #[must_use]
    pub fn memory(&self) -> &EngineMemory {
        &self.memory
    }

    /// Hash of every batch and the final memory.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.batch_hashes.hash(&mut hasher);
        format!("{:?}", self.memory).hash(&mut hasher);
        hasher.finish()
    }
}

/// Replay `snapshot` for `ticks` ticks `runs` times and compare the results.
///
/// Engine errors count as a distinct hash so they show up as divergence
/// only if they are themselves non-deterministic.
#[must_use]
pub fn verify_engine_determinism(
    engine: &FleetEngine,
    snapshot: &WorldSnapshot,
    seed: u64,
    runs: usize,
    ticks: u64,
) -> DeterminismResult {
    verify_determinism(
        runs,
        ticks,
        || ReplayState::new(engine.clone(), snapshot.clone(), seed),
        |state| {
            if let Err(error) = state.step() {
                state.batch_hashes.push(compute_hash(&error.to_string()));
            }
        },
        ReplayState::state_hash,
    )
}

/// Compare two replays tick by tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the replays match, `Some(tick)` for the first tick whose
/// batches differ.
#[must_use]
pub fn find_first_divergence(
    engine: &FleetEngine,
    snapshot: &WorldSnapshot,
    seed: u64,
    ticks: u64,
) -> Option<u64> {
    let mut first = ReplayState::new(engine.clone(), snapshot.clone(), seed);
    let mut second = ReplayState::new(engine.clone(), snapshot.clone(), seed);

    for tick in 0..ticks {
        let a = first.step().map(|decision| batch_hash(&decision.batch));
        let b = second.step().map(|decision| batch_hash(&decision.batch));
        match (a, b) {
            (Ok(a), Ok(b)) if a == b => {}
            (Err(a), Err(b)) if a.to_string() == b.to_string() => {}
            _ => return Some(tick),
        }
    }

    None
}

/// Hash a command batch.
///
/// The batch is ordered by unit id, so its debug form is canonical.
#[must_use]
pub fn batch_hash(batch: &CommandBatch) -> u64 {
    compute_hash(&format!("{batch:?}"))
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_skirmish_replays_identically() {
        let engine = FleetEngine::new(fixtures::config()).unwrap();
        let result = verify_engine_determinism(&engine, &fixtures::skirmish(), 42, 3, 20);
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_no_divergence_on_trade_lane() {
        let engine = FleetEngine::new(fixtures::config()).unwrap();
        assert_eq!(find_first_divergence(&engine, &fixtures::trade_lane(), 7, 15), None);
    }

    #[test]
    fn test_divergent_process_is_reported() {
        use std::cell::Cell;
        let counter = Cell::new(0u64);
        let result = verify_determinism(
            3,
            1,
            || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            |_| {},
            |state| *state,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 3);
    }
}
