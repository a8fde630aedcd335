//! State carried from one tick to the next.
//!
//! The engine is otherwise a pure function of the snapshot. [`EngineMemory`]
//! holds the flagship's sticky combat target and a short position history
//! per trader, and is passed in and returned explicitly every tick.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::math::Vec2Fixed;
use crate::snapshot::{UnitId, WorldSnapshot};

/// Fixed-length ring of recent positions for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionHistory {
    capacity: usize,
    positions: VecDeque<Vec2Fixed>,
}

impl PositionHistory {
    /// Create an empty history holding up to `capacity` positions.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            positions: VecDeque::with_capacity(capacity),
        }
    }

    /// Record a position, evicting the oldest once full.
    pub fn record(&mut self, position: Vec2Fixed) {
        if self.capacity == 0 {
            return;
        }
        while self.positions.len() >= self.capacity {
            self.positions.pop_front();
        }
        self.positions.push_back(position);
    }

    /// Whether the history is full and every entry equals `position`.
    #[must_use]
    pub fn is_stalled_at(&self, position: Vec2Fixed) -> bool {
        self.capacity > 0
            && self.positions.len() == self.capacity
            && self.positions.iter().all(|&p| p == position)
    }

    /// Number of recorded positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Everything the engine remembers between ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMemory {
    /// The flagship's current combat target.
    pub sticky_target: Option<UnitId>,
    /// Recent positions per trader.
    pub positions: BTreeMap<UnitId, PositionHistory>,
}

impl EngineMemory {
    /// Create empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The sticky target, if it still exists in this snapshot.
    ///
    /// A target that vanished is reported and ignored rather than trusted.
    #[must_use]
    pub fn live_sticky_target(&self, snapshot: &WorldSnapshot) -> Option<UnitId> {
        let target = self.sticky_target?;
        if snapshot.unit(target).is_some() {
            Some(target)
        } else {
            tracing::warn!(target, "Sticky target left the snapshot");
            None
        }
    }

    /// Record this tick's position of a unit.
    pub fn record_position(&mut self, unit: UnitId, position: Vec2Fixed, capacity: usize) {
        self.positions
            .entry(unit)
            .or_insert_with(|| PositionHistory::new(capacity))
            .record(position);
    }

    /// Drop histories of units that are no longer tracked.
    pub fn retain_units<F>(&mut self, mut keep: F)
    where
        F: FnMut(UnitId) -> bool,
    {
        self.positions.retain(|&unit, _| keep(unit));
    }

    /// Serialize to bytes for persistence across restarts.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| EngineError::MemoryCodec(e.to_string()))
    }

    /// Restore from bytes produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| EngineError::MemoryCodec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Unit;
    use crate::unit_class::UnitClass;

    #[test]
    fn test_history_stalls_only_when_full_and_constant() {
        let here = Vec2Fixed::from_grid(5, 5);
        let mut history = PositionHistory::new(3);

        history.record(here);
        history.record(here);
        assert!(!history.is_stalled_at(here));

        history.record(here);
        assert!(history.is_stalled_at(here));
        assert!(!history.is_stalled_at(Vec2Fixed::ZERO));

        history.record(Vec2Fixed::ZERO);
        assert_eq!(history.len(), 3);
        assert!(!history.is_stalled_at(here));
    }

    #[test]
    fn test_zero_capacity_never_stalls() {
        let mut history = PositionHistory::new(0);
        history.record(Vec2Fixed::ZERO);
        assert!(history.is_empty());
        assert!(!history.is_stalled_at(Vec2Fixed::ZERO));
    }

    #[test]
    fn test_live_sticky_target() {
        let snapshot = WorldSnapshot::new(1, 0)
            .with_unit(Unit::new(7, 2, UnitClass::Fighter, Vec2Fixed::ZERO, 100));
        let mut memory = EngineMemory::new();
        assert_eq!(memory.live_sticky_target(&snapshot), None);

        memory.sticky_target = Some(7);
        assert_eq!(memory.live_sticky_target(&snapshot), Some(7));

        memory.sticky_target = Some(8);
        assert_eq!(memory.live_sticky_target(&snapshot), None);
    }

    #[test]
    fn test_retain_units() {
        let mut memory = EngineMemory::new();
        memory.record_position(1, Vec2Fixed::ZERO, 4);
        memory.record_position(2, Vec2Fixed::ZERO, 4);
        memory.retain_units(|id| id == 2);
        assert!(!memory.positions.contains_key(&1));
        assert!(memory.positions.contains_key(&2));
    }

    #[test]
    fn test_bincode_roundtrip() {
        let mut memory = EngineMemory::new();
        memory.sticky_target = Some(42);
        memory.record_position(3, Vec2Fixed::from_grid(-7, 9), 10);

        let bytes = memory.to_bytes().unwrap();
        let restored = EngineMemory::from_bytes(&bytes).unwrap();
        assert_eq!(memory, restored);
    }

    #[test]
    fn test_garbage_bytes_are_a_codec_error() {
        assert!(matches!(
            EngineMemory::from_bytes(&[0xff]),
            Err(EngineError::MemoryCodec(_))
        ));
    }
}
