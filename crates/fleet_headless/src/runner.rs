//! Single-snapshot decisions and directory replays.

use std::io::Write;
use std::path::Path;

use fleet_core::engine::{Decision, FleetEngine};
use fleet_core::memory::EngineMemory;
use fleet_core::transport::{run_tick, TickOutcome};
use rand::Rng;

use crate::error::Result;
use crate::file_transport::{FileTransport, TickLine};
use crate::loader::{load_memory, load_snapshot, save_memory};

/// Totals for a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Ticks whose batch was written.
    pub decided: usize,
    /// Ticks the engine failed on.
    pub skipped: usize,
    /// Ticks lost to transport failures, such as unreadable snapshot files.
    pub transport_errors: usize,
}

/// Decide one snapshot file and write its batch as a JSON line.
///
/// When `memory_path` is given, memory is loaded from it before deciding
/// and the updated memory is written back afterwards.
pub fn decide_file<R, W>(
    engine: &FleetEngine,
    snapshot_path: &Path,
    memory_path: Option<&Path>,
    rng: &mut R,
    out: &mut W,
) -> Result<Decision>
where
    R: Rng + ?Sized,
    W: Write + ?Sized,
{
    let snapshot = load_snapshot(snapshot_path)?;
    let memory = match memory_path {
        Some(path) => load_memory(path)?,
        None => EngineMemory::new(),
    };

    let decision = engine.decide(&snapshot, &memory, rng)?;

    let line = TickLine {
        tick: snapshot.tick,
        commands: &decision.batch,
    };
    serde_json::to_writer(&mut *out, &line)?;
    writeln!(out)?;

    if let Some(path) = memory_path {
        save_memory(path, &decision.memory)?;
    }
    Ok(decision)
}

/// Run every snapshot in `dir` through the engine, threading memory.
///
/// Engine failures and unreadable files are logged and skipped; only a
/// terminal transport error ends the replay early.
pub fn replay_dir<R, W>(engine: &FleetEngine, dir: &Path, rng: &mut R, out: W) -> Result<ReplaySummary>
where
    R: Rng + ?Sized,
    W: Write,
{
    let mut transport = FileTransport::open(dir, out)?;
    let mut memory = EngineMemory::new();
    let mut summary = ReplaySummary::default();

    while transport.remaining() > 0 {
        match run_tick(&mut transport, engine, &mut memory, rng) {
            Ok(TickOutcome::Submitted { .. }) => summary.decided += 1,
            Ok(TickOutcome::Skipped { .. }) => summary.skipped += 1,
            Err(error) if error.is_terminal() => return Err(error.into()),
            Err(error) => {
                tracing::warn!(%error, "Snapshot skipped");
                summary.transport_errors += 1;
            }
        }
    }

    tracing::info!(
        decided = summary.decided,
        skipped = summary.skipped,
        transport_errors = summary.transport_errors,
        "Replay finished"
    );
    Ok(summary)
}
