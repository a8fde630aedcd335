//! In-memory transport that plays back a fixed list of snapshots.

use std::collections::VecDeque;

use fleet_core::command::CommandBatch;
use fleet_core::snapshot::WorldSnapshot;
use fleet_core::transport::{GameTransport, TransportError};

/// Serves queued snapshots and records every submitted batch.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pending: VecDeque<Result<WorldSnapshot, TransportError>>,
    /// Batches received, in submission order.
    pub submitted: Vec<CommandBatch>,
    /// Rejection to return from the next submission, if any.
    pub reject_next: Option<String>,
    /// `(tick, season)` pairs passed to `end_tick`.
    pub ended: Vec<(u64, u64)>,
}

impl ScriptedTransport {
    /// A transport that serves these snapshots in order.
    #[must_use]
    pub fn new(snapshots: impl IntoIterator<Item = WorldSnapshot>) -> Self {
        Self {
            pending: snapshots.into_iter().map(Ok).collect(),
            ..Self::default()
        }
    }

    /// Queue a fetch failure after the current snapshots.
    #[must_use]
    pub fn then_fail(mut self, error: TransportError) -> Self {
        self.pending.push_back(Err(error));
        self
    }

    /// Snapshots not yet fetched.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl GameTransport for ScriptedTransport {
    fn fetch_snapshot(&mut self) -> Result<WorldSnapshot, TransportError> {
        self.pending
            .pop_front()
            .unwrap_or(Err(TransportError::NotAuthenticated))
    }

    fn submit_commands(&mut self, batch: &CommandBatch) -> Result<(), TransportError> {
        self.submitted.push(batch.clone());
        match self.reject_next.take() {
            Some(reason) => Err(TransportError::Rejected(reason)),
            None => Ok(()),
        }
    }

    fn end_tick(&mut self, tick: u64, season: u64) -> Result<(u64, u64), TransportError> {
        self.ended.push((tick, season));
        Ok((tick + 1, season))
    }
}
