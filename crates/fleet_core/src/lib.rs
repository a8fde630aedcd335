//! # Fleet Core
//!
//! Deterministic per-tick decision engine for a turn-based space-trading
//! fleet.
//!
//! Each tick the engine receives a [`WorldSnapshot`](snapshot::WorldSnapshot)
//! and the [`EngineMemory`](memory::EngineMemory) it produced last tick, and
//! returns a [`CommandBatch`](command::CommandBatch) with at most one command
//! per unit plus updated memory.
//!
//! This crate contains **only** decision logic:
//! - No IO (the [`transport`] trait is implemented elsewhere)
//! - No system randomness (an `Rng` is injected)
//! - No floating-point math (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`classify`] - Partition of units into our roles and foreign units
//! - [`spatial`] - Centroid, defense ring, closest enemy, distance cache
//! - [`trade`] - Sell and buy route selection with a per-tick claim ledger
//! - [`steering`] - Flee and reposition directions
//! - [`engagement`] - Combat target selection with a sticky flagship target
//! - [`acquisition`] - Construction under a cash reserve
//! - [`maintenance`] - Repair, stall recovery, defender designation
//! - [`victory`] - End-of-season objective and formation
//! - [`engine`] - Orchestration of every policy
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod acquisition;
pub mod classify;
pub mod command;
pub mod config;
pub mod engagement;
pub mod engine;
pub mod error;
pub mod maintenance;
pub mod math;
pub mod memory;
pub mod snapshot;
pub mod spatial;
pub mod steering;
pub mod trade;
pub mod transport;
pub mod unit_class;
pub mod victory;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::classify::Assets;
    pub use crate::command::{Command, CommandBatch, Destination};
    pub use crate::config::EngineConfig;
    pub use crate::engagement::{EngagementReport, EngagementState};
    pub use crate::engine::{Decision, DecisionSummary, FleetEngine};
    pub use crate::error::{EngineError, Result};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::memory::EngineMemory;
    pub use crate::snapshot::{
        NodeId, PlayerAccount, PlayerId, ResourceId, TradeNode, Unit, UnitId, WorldSnapshot,
    };
    pub use crate::transport::{run_tick, GameTransport, TickOutcome, TransportError};
    pub use crate::unit_class::{ClassCatalog, ClassRole, ClassStats, UnitClass};
}
