//! Spatial aggregates shared by every policy in a tick.
//!
//! Computed once, right after classification:
//! - pairwise distances between combat-relevant units (ours and foreign)
//! - the fleet centroid (mean trader position) and its furthest trader
//! - the defense radius around the centroid
//! - the single globally closest qualifying enemy
//! - the center-distance cost used to bias trade routes toward protection

use std::collections::BTreeMap;

use crate::classify::Assets;
use crate::config::SpatialConfig;
use crate::math::{Fixed, Vec2Fixed};
use crate::snapshot::{Unit, UnitId};
use crate::unit_class::ClassRole;

/// Pairwise distance cache keyed by ordered id pairs.
#[derive(Debug, Clone, Default)]
pub struct DistanceCache {
    distances: BTreeMap<(UnitId, UnitId), Fixed>,
}

impl DistanceCache {
    /// Compute all pairwise distances between `units`.
    #[must_use]
    pub fn build(units: &[&Unit]) -> Self {
        let mut distances = BTreeMap::new();
        for (i, a) in units.iter().enumerate() {
            for b in &units[i + 1..] {
                distances.insert(Self::key(a.id, b.id), a.position.distance(b.position));
            }
        }
        Self { distances }
    }

    fn key(a: UnitId, b: UnitId) -> (UnitId, UnitId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Cached distance between two units. A unit is at distance zero from itself.
    #[must_use]
    pub fn get(&self, a: UnitId, b: UnitId) -> Option<Fixed> {
        if a == b {
            return Some(Fixed::ZERO);
        }
        self.distances.get(&Self::key(a, b)).copied()
    }

    /// Number of cached pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Check if no pairs are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}

/// Tick-scoped spatial state.
#[derive(Debug, Clone)]
pub struct SpatialContext {
    /// Distances between our combatants and all foreign units.
    pub distances: DistanceCache,
    /// Mean trader position, `None` when we have no traders.
    pub fleet_centroid: Option<Vec2Fixed>,
    /// Distance from the centroid to the furthest trader.
    pub furthest_trader: Fixed,
    /// Radius around the centroid treated as home.
    pub defense_radius: Fixed,
    /// The single enemy all defenders consider this tick.
    pub closest_enemy: Option<UnitId>,
    /// Route-scoring weight of distance to the protection anchor.
    pub center_cost: Fixed,
}

impl SpatialContext {
    /// Compute every aggregate for this tick.
    ///
    /// `sticky_target` is the flagship's carried target, already checked
    /// against the snapshot.
    #[must_use]
    pub fn compute(assets: &Assets<'_>, sticky_target: Option<UnitId>, config: &SpatialConfig) -> Self {
        let relevant: Vec<&Unit> = assets
            .combatants
            .iter()
            .chain(assets.foreign.iter())
            .copied()
            .collect();
        let distances = DistanceCache::build(&relevant);

        let fleet_centroid = Vec2Fixed::mean(assets.traders.iter().map(|unit| unit.position));
        let center = fleet_centroid.unwrap_or(Vec2Fixed::ZERO);
        let furthest_trader = assets
            .traders
            .iter()
            .map(|unit| unit.position.distance(center))
            .max()
            .unwrap_or(Fixed::ZERO);
        let defense_radius = config
            .defense_radius_floor
            .max(furthest_trader.saturating_mul(config.defense_radius_multiplier));

        let closest_enemy = closest_enemy(assets, center, defense_radius, sticky_target, config);

        let enemy = closest_enemy.and_then(|id| assets.foreign.iter().find(|unit| unit.id == id));
        let center_cost = match (enemy, fleet_centroid) {
            (None, _) => Fixed::ZERO,
            (Some(_), None) => Fixed::from_num(1),
            (Some(enemy), Some(centroid)) => {
                let dist = centroid.distance(enemy.position);
                if dist <= Fixed::from_num(1) {
                    config.center_cost_scale
                } else {
                    config.center_cost_scale / dist
                }
            }
        };

        tracing::trace!(
            pairs = distances.len(),
            defense_radius = %defense_radius,
            center_cost = %center_cost,
            closest_enemy,
            "Spatial aggregates"
        );

        Self {
            distances,
            fleet_centroid,
            furthest_trader,
            defense_radius,
            closest_enemy,
            center_cost,
        }
    }

    /// The fleet centroid, or the map origin when we have no traders.
    #[must_use]
    pub fn centroid(&self) -> Vec2Fixed {
        self.fleet_centroid.unwrap_or(Vec2Fixed::ZERO)
    }

    /// Whether a point lies inside the defense ring.
    #[must_use]
    pub fn in_defense_ring(&self, point: Vec2Fixed) -> bool {
        point.distance(self.centroid()) < self.defense_radius
    }
}

/// Priority-adjusted nearest enemy to `center`.
///
/// The sticky target looks closer than it is and enemy flagships look
/// farther. A plain nearer candidate only replaces the current best when it
/// is in the same class; inside the defense radius an armed class replaces a
/// trader, and strike craft replace the flagship.
fn closest_enemy(
    assets: &Assets<'_>,
    center: Vec2Fixed,
    defense_radius: Fixed,
    sticky_target: Option<UnitId>,
    config: &SpatialConfig,
) -> Option<UnitId> {
    let mut best: Option<(&Unit, Fixed)> = None;

    for &enemy in &assets.foreign {
        let mut dist = enemy.position.distance(center);
        if sticky_target == Some(enemy.id) {
            dist -= config.sticky_bonus;
        } else if enemy.class.is(ClassRole::FLAGSHIP) {
            dist += config.flagship_penalty;
        }

        let replace = match best {
            None => true,
            Some((current, best_dist)) => {
                (enemy.class == current.class && dist < best_dist)
                    || (dist < defense_radius && enemy.class.escalates_over(current.class))
            }
        };
        if replace {
            best = Some((enemy, dist));
        }
    }

    best.map(|(unit, _)| unit.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::snapshot::{PlayerAccount, WorldSnapshot};
    use crate::unit_class::UnitClass;

    fn at(id: UnitId, owner: u64, class: UnitClass, x: i64, y: i64) -> Unit {
        Unit::new(id, owner, class, Vec2Fixed::from_grid(x, y), 100)
    }

    fn base() -> WorldSnapshot {
        WorldSnapshot::new(1, 0).with_player(PlayerAccount::new(1, "us", 0, 0))
    }

    fn context(snapshot: &WorldSnapshot, sticky: Option<UnitId>) -> SpatialContext {
        let config = EngineConfig::default();
        let assets = Assets::classify(snapshot, &config).unwrap();
        SpatialContext::compute(&assets, sticky, &config.spatial)
    }

    #[test]
    fn test_centroid_and_defense_radius() {
        let snapshot = base()
            .with_unit(at(1, 1, UnitClass::LightTrader, 0, 0))
            .with_unit(at(2, 1, UnitClass::LightTrader, 200, 0));
        let ctx = context(&snapshot, None);

        assert_eq!(ctx.fleet_centroid, Some(Vec2Fixed::from_grid(100, 0)));
        assert_eq!(ctx.furthest_trader, Fixed::from_num(100));
        assert_eq!(ctx.defense_radius, Fixed::from_num(250));
        assert_eq!(ctx.center_cost, Fixed::ZERO);
    }

    #[test]
    fn test_defense_radius_floor() {
        let snapshot = base().with_unit(at(1, 1, UnitClass::LightTrader, 5, 5));
        let ctx = context(&snapshot, None);
        assert_eq!(ctx.defense_radius, Fixed::from_num(150));
        assert!(ctx.in_defense_ring(Vec2Fixed::from_grid(100, 5)));
        assert!(!ctx.in_defense_ring(Vec2Fixed::from_grid(200, 5)));
    }

    #[test]
    fn test_no_traders_centroid_is_origin() {
        let snapshot = base().with_unit(at(1, 2, UnitClass::Fighter, 30, 40));
        let ctx = context(&snapshot, None);
        assert_eq!(ctx.fleet_centroid, None);
        assert_eq!(ctx.centroid(), Vec2Fixed::ZERO);
        assert_eq!(ctx.closest_enemy, Some(1));
        // An enemy but no centroid: unit cost.
        assert_eq!(ctx.center_cost, Fixed::from_num(1));
    }

    #[test]
    fn test_center_cost_is_inverse_distance() {
        let snapshot = base()
            .with_unit(at(1, 1, UnitClass::LightTrader, 0, 0))
            .with_unit(at(2, 2, UnitClass::LightTrader, 100, 0));
        let ctx = context(&snapshot, None);
        assert_eq!(ctx.center_cost, Fixed::from_num(5));
    }

    #[test]
    fn test_closest_enemy_escalates_inside_ring() {
        let snapshot = base()
            .with_unit(at(1, 1, UnitClass::LightTrader, 0, 0))
            .with_unit(at(10, 2, UnitClass::LightTrader, 10, 0))
            .with_unit(at(11, 2, UnitClass::Fighter, 100, 0))
            .with_unit(at(12, 2, UnitClass::Bomber, 400, 0));
        let ctx = context(&snapshot, None);
        // The fighter is farther than the trader but armed and inside the ring;
        // the bomber is outside the ring and not the fighter's class.
        assert_eq!(ctx.closest_enemy, Some(11));
    }

    #[test]
    fn test_sticky_bonus_and_flagship_penalty() {
        let snapshot = base()
            .with_unit(at(1, 1, UnitClass::LightTrader, 0, 0))
            .with_unit(at(10, 2, UnitClass::Fighter, 100, 0))
            .with_unit(at(11, 2, UnitClass::Fighter, 120, 0));
        assert_eq!(context(&snapshot, None).closest_enemy, Some(10));
        assert_eq!(context(&snapshot, Some(11)).closest_enemy, Some(11));

        let flagships = base()
            .with_unit(at(1, 1, UnitClass::LightTrader, 0, 0))
            .with_unit(at(10, 2, UnitClass::Flagship, 100, 0))
            .with_unit(at(11, 3, UnitClass::Flagship, 110, 0));
        assert_eq!(context(&flagships, None).closest_enemy, Some(10));
    }

    #[test]
    fn test_distance_cache_is_symmetric() {
        let a = at(1, 1, UnitClass::Fighter, 0, 0);
        let b = at(2, 2, UnitClass::Fighter, 3, 4);
        let cache = DistanceCache::build(&[&a, &b]);
        assert_eq!(cache.get(1, 2), Some(Fixed::from_num(5)));
        assert_eq!(cache.get(2, 1), Some(Fixed::from_num(5)));
        assert_eq!(cache.get(1, 1), Some(Fixed::ZERO));
        assert_eq!(cache.get(1, 3), None);
    }
}
