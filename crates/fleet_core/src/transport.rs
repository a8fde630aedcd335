//! Boundary to the game server session.
//!
//! The engine never talks to the server itself. A [`GameTransport`] fetches
//! snapshots, submits batches and advances ticks; [`run_tick`] wires one
//! tick of that loop around [`FleetEngine::decide`].
//!
//! [`FleetEngine::decide`]: crate::engine::FleetEngine::decide

use rand::Rng;
use thiserror::Error;

use crate::command::CommandBatch;
use crate::engine::{Decision, FleetEngine};
use crate::error::EngineError;
use crate::memory::EngineMemory;
use crate::snapshot::WorldSnapshot;

/// Errors surfaced by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network hiccup or similar; the tick is skipped.
    #[error("Transient transport failure: {0}")]
    Transient(String),

    /// The session is no longer valid; the caller must log in again.
    #[error("Session is not authenticated")]
    NotAuthenticated,

    /// The server refused the submitted batch.
    #[error("Server rejected commands: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Whether the current session cannot continue.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }
}

/// A source of snapshots and a sink for command batches.
pub trait GameTransport {
    /// Fetch the current world state.
    fn fetch_snapshot(&mut self) -> Result<WorldSnapshot, TransportError>;

    /// Submit this tick's commands. Partial failures are not reported back.
    fn submit_commands(&mut self, batch: &CommandBatch) -> Result<(), TransportError>;

    /// Wait for the next tick, returning the new `(tick, season)`.
    fn end_tick(&mut self, tick: u64, season: u64) -> Result<(u64, u64), TransportError>;
}

/// What happened during one driven tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// The engine decided and the batch was handed to the transport.
    Submitted {
        /// The snapshot tick.
        tick: u64,
        /// The decision, including memory for the next tick.
        decision: Decision,
    },
    /// The engine failed; memory is unchanged and nothing was submitted.
    Skipped {
        /// The snapshot tick.
        tick: u64,
        /// Why the engine failed.
        error: EngineError,
    },
}

/// Fetch, decide, submit and advance once.
///
/// Engine errors skip the tick and leave `memory` untouched. A rejected
/// submission is logged and the new memory is kept, since the decision
/// itself was sound. Fetch and advance failures are returned.
pub fn run_tick<T, R>(
    transport: &mut T,
    engine: &FleetEngine,
    memory: &mut EngineMemory,
    rng: &mut R,
) -> Result<TickOutcome, TransportError>
where
    T: GameTransport + ?Sized,
    R: Rng + ?Sized,
{
    let snapshot = transport.fetch_snapshot()?;
    let tick = snapshot.tick;

    let outcome = match engine.decide(&snapshot, memory, rng) {
        Ok(decision) => {
            match transport.submit_commands(&decision.batch) {
                Ok(()) => {}
                Err(TransportError::Rejected(reason)) => {
                    tracing::warn!(tick, %reason, "Some commands were rejected");
                }
                Err(other) => return Err(other),
            }
            *memory = decision.memory.clone();
            TickOutcome::Submitted { tick, decision }
        }
        Err(error) => {
            tracing::error!(tick, %error, "Decision failed, skipping tick");
            TickOutcome::Skipped { tick, error }
        }
    };

    transport.end_tick(tick, snapshot.season)?;
    Ok(outcome)
}
