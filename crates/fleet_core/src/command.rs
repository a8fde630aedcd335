//! Per-unit commands and the per-tick command batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::math::Vec2Fixed;
use crate::snapshot::{NodeId, ResourceId, UnitId, WorldSnapshot};
use crate::unit_class::UnitClass;

/// Where a move command goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// A fixed point on the map.
    Coordinates(Vec2Fixed),
    /// Follow another unit.
    Unit(UnitId),
}

/// A single order for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Move somewhere.
    Move {
        /// Target of the move.
        destination: Destination,
    },
    /// Buy (positive amount) or sell (negative amount) at a trade node.
    Trade {
        /// Trade node.
        target: NodeId,
        /// Resource traded.
        resource: ResourceId,
        /// Signed amount.
        amount: i64,
    },
    /// Construct a new unit at this production node.
    Construct {
        /// Class to build.
        class: UnitClass,
    },
    /// Attack a unit.
    Attack {
        /// Unit to attack.
        target: UnitId,
    },
    /// Repair this unit.
    Repair,
    /// Change the unit's display name.
    Rename {
        /// New name.
        name: String,
    },
}

impl Command {
    /// Move to fixed coordinates.
    #[must_use]
    pub const fn move_to(point: Vec2Fixed) -> Self {
        Self::Move {
            destination: Destination::Coordinates(point),
        }
    }

    /// Short tag for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Trade { .. } => "trade",
            Self::Construct { .. } => "construct",
            Self::Attack { .. } => "attack",
            Self::Repair => "repair",
            Self::Rename { .. } => "rename",
        }
    }

    /// The unit this command targets, if any.
    #[must_use]
    pub const fn target_unit(&self) -> Option<UnitId> {
        match self {
            Self::Attack { target }
            | Self::Move {
                destination: Destination::Unit(target),
            } => Some(*target),
            _ => None,
        }
    }
}

/// Exactly one command per unit for one tick.
///
/// Later writers for the same unit replace earlier ones; the engine runs its
/// policies in a fixed order so the replacement order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandBatch {
    commands: BTreeMap<UnitId, Command>,
}

impl CommandBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the command for a unit, returning the command it replaced.
    pub fn insert(&mut self, unit: UnitId, command: Command) -> Option<Command> {
        let previous = self.commands.insert(unit, command);
        if let Some(previous) = &previous {
            tracing::trace!(unit, replaced = previous.kind(), "Command overwritten");
        }
        previous
    }

    /// Get the command for a unit.
    #[must_use]
    pub fn get(&self, unit: UnitId) -> Option<&Command> {
        self.commands.get(&unit)
    }

    /// Number of commanded units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterate in unit-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &Command)> {
        self.commands.iter()
    }

    /// Check that every unit and node referenced by the batch exists.
    pub fn validate(&self, snapshot: &WorldSnapshot) -> Result<()> {
        for (&unit, command) in &self.commands {
            if snapshot.unit(unit).is_none() {
                return Err(EngineError::StaleReference { unit });
            }
            if let Some(target) = command.target_unit() {
                if snapshot.unit(target).is_none() {
                    return Err(EngineError::StaleReference { unit: target });
                }
            }
            if let Command::Trade { target, .. } = command {
                if snapshot.node(*target).is_none() {
                    return Err(EngineError::StaleNode { node: *target });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{TradeNode, Unit};

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot::new(1, 0)
            .with_unit(Unit::new(10, 1, UnitClass::Fighter, Vec2Fixed::ZERO, 200))
            .with_unit(Unit::new(20, 2, UnitClass::Fighter, Vec2Fixed::ZERO, 200))
            .with_node(TradeNode::new(5, Vec2Fixed::ZERO))
    }

    #[test]
    fn test_last_writer_wins() {
        let mut batch = CommandBatch::new();
        assert!(batch.insert(10, Command::Attack { target: 20 }).is_none());
        let replaced = batch.insert(10, Command::Repair);
        assert_eq!(replaced, Some(Command::Attack { target: 20 }));
        assert_eq!(batch.get(10), Some(&Command::Repair));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_validate_catches_stale_references() {
        let snapshot = snapshot();

        let mut ok = CommandBatch::new();
        ok.insert(10, Command::Attack { target: 20 });
        ok.insert(20, Command::Trade { target: 5, resource: 1, amount: 3 });
        assert!(ok.validate(&snapshot).is_ok());

        let mut missing_target = CommandBatch::new();
        missing_target.insert(10, Command::Attack { target: 99 });
        assert!(matches!(
            missing_target.validate(&snapshot),
            Err(EngineError::StaleReference { unit: 99 })
        ));

        let mut missing_node = CommandBatch::new();
        missing_node.insert(10, Command::Trade { target: 6, resource: 1, amount: -1 });
        assert!(matches!(
            missing_node.validate(&snapshot),
            Err(EngineError::StaleNode { node: 6 })
        ));
    }

    #[test]
    fn test_command_json_shape() {
        let json = serde_json::to_string(&Command::Trade {
            target: 3,
            resource: 4,
            amount: -5,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"trade","target":3,"resource":4,"amount":-5}"#);

        let json = serde_json::to_string(&Command::move_to(Vec2Fixed::from_grid(1, 2))).unwrap();
        assert_eq!(json, r#"{"type":"move","destination":{"coordinates":[1,2]}}"#);
    }
}
