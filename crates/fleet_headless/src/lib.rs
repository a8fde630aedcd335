//! Headless runner for the fleet decision engine.
//!
//! Loads an engine configuration from RON, reads world snapshots from JSON
//! files and writes command batches to stdout, one JSON object per line:
//!
//! - **stdout**: `{"tick": N, "commands": {...}}` per decided tick
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Decide one snapshot, carrying memory between invocations
//! cargo run -p fleet_headless -- decide --snapshot tick.json --memory memory.bin
//!
//! # Replay a directory of snapshots in file-name order
//! cargo run -p fleet_headless -- replay --dir snapshots/ --config engine.ron
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod file_transport;
pub mod loader;
pub mod runner;

pub use error::{HeadlessError, Result};
pub use file_transport::FileTransport;
pub use runner::{decide_file, replay_dir, ReplaySummary};
