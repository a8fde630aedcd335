//! Directory-backed transport for replays.
//!
//! Snapshots are read from `*.json` files in lexical order. Every submitted
//! batch is written to the output as one JSON line tagged with its tick.

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};

use fleet_core::command::CommandBatch;
use fleet_core::snapshot::WorldSnapshot;
use fleet_core::transport::{GameTransport, TransportError};
use serde::Serialize;

use crate::error::Result;
use crate::loader::{load_snapshot, snapshot_files};

/// One output line.
#[derive(Debug, Serialize)]
pub struct TickLine<'a> {
    /// Tick the batch was decided for.
    pub tick: u64,
    /// The submitted commands, keyed by unit id.
    pub commands: &'a CommandBatch,
}

/// Replays snapshot files and writes submitted batches as JSON lines.
#[derive(Debug)]
pub struct FileTransport<W: Write> {
    pending: VecDeque<PathBuf>,
    current_tick: u64,
    out: W,
}

impl<W: Write> FileTransport<W> {
    /// Queue every snapshot file in `dir`.
    pub fn open(dir: &Path, out: W) -> Result<Self> {
        let pending: VecDeque<PathBuf> = snapshot_files(dir)?.into();
        tracing::info!(dir = %dir.display(), snapshots = pending.len(), "Replay queued");
        Ok(Self {
            pending,
            current_tick: 0,
            out,
        })
    }

    /// Snapshot files not yet read.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl<W: Write> GameTransport for FileTransport<W> {
    fn fetch_snapshot(&mut self) -> std::result::Result<WorldSnapshot, TransportError> {
        let Some(path) = self.pending.pop_front() else {
            return Err(TransportError::NotAuthenticated);
        };
        let snapshot = load_snapshot(&path)
            .map_err(|e| TransportError::Transient(format!("{}: {e}", path.display())))?;
        self.current_tick = snapshot.tick;
        tracing::debug!(path = %path.display(), tick = snapshot.tick, "Snapshot loaded");
        Ok(snapshot)
    }

    fn submit_commands(&mut self, batch: &CommandBatch) -> std::result::Result<(), TransportError> {
        let line = TickLine {
            tick: self.current_tick,
            commands: batch,
        };
        serde_json::to_writer(&mut self.out, &line)
            .map_err(|e| TransportError::Transient(e.to_string()))?;
        writeln!(self.out).map_err(|e| TransportError::Transient(e.to_string()))?;
        Ok(())
    }

    fn end_tick(&mut self, tick: u64, season: u64) -> std::result::Result<(u64, u64), TransportError> {
        self.out
            .flush()
            .map_err(|e| TransportError::Transient(e.to_string()))?;
        Ok((tick + 1, season))
    }
}
