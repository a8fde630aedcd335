//! Error type for the headless runner.

use std::path::PathBuf;

use fleet_core::error::EngineError;
use fleet_core::transport::TransportError;
use thiserror::Error;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Everything that can stop a headless run.
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// Reading or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot or output line was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file was not valid RON.
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// The engine rejected its configuration or failed to decide.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The transport could not continue.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A replay directory held no snapshot files.
    #[error("No *.json snapshots found in '{}'", .0.display())]
    NoSnapshots(PathBuf),
}
