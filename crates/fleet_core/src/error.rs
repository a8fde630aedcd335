//! Error types for the fleet decision engine.
//!
//! "Nothing worth doing" is never an error: an empty [`CommandBatch`] is a
//! normal outcome. These variants cover broken inputs and internal faults.
//!
//! [`CommandBatch`]: crate::command::CommandBatch

use thiserror::Error;

use crate::snapshot::{NodeId, PlayerId, UnitId};
use crate::unit_class::UnitClass;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for one tick's decision.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A command references a unit that is not in the current snapshot.
    #[error("Command references unit {unit} which is not in the snapshot")]
    StaleReference {
        /// The missing unit.
        unit: UnitId,
    },

    /// A command references a trade node that is not in the current snapshot.
    #[error("Command references trade node {node} which is not in the snapshot")]
    StaleNode {
        /// The missing node.
        node: NodeId,
    },

    /// The snapshot does not contain the agent's own player account.
    #[error("Player {0} is not part of the snapshot")]
    UnknownPlayer(PlayerId),

    /// A unit class has no entry in the class catalog.
    #[error("No catalog entry for unit class {0:?}")]
    UnknownClass(UnitClass),

    /// Failed to parse engine configuration.
    #[error("Failed to parse engine configuration: {0}")]
    ConfigParse(String),

    /// Failed to encode or decode persisted engine memory.
    #[error("Failed to encode or decode engine memory: {0}")]
    MemoryCodec(String),
}
