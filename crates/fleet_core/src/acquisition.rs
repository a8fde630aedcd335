//! Fleet composition purchases.
//!
//! At most one production node constructs per tick. Money above a reserve
//! goes to combat units while an enemy fleet is visible and we are short of
//! escorts, otherwise to traders.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::classify::Assets;
use crate::command::{Command, CommandBatch};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::snapshot::{UnitId, WorldSnapshot};
use crate::unit_class::UnitClass;

/// A construction order placed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purchase {
    /// Production node placing the order.
    pub site: UnitId,
    /// Class being constructed.
    pub class: UnitClass,
}

/// Cash to keep on hand.
///
/// While foreign units are visible the reserve scales with net worth above
/// an offset, with a floor. Otherwise each trader adds a small amount.
#[must_use]
pub fn cash_reserve(assets: &Assets<'_>, config: &EngineConfig) -> i64 {
    let acquisition = &config.acquisition;
    if assets.foreign.is_empty() {
        return i64::try_from(assets.traders.len())
            .unwrap_or(i64::MAX)
            .saturating_mul(acquisition.reserve_per_trader);
    }

    let scaled = (assets.me.net_worth.total - acquisition.reserve_net_worth_offset)
        / acquisition.reserve_net_worth_divisor.max(1);
    acquisition.reserve_floor.max(scaled)
}

/// Decide whether to construct a unit this tick.
///
/// `flagship_busy` disables purchases while the flagship is fighting.
pub fn plan_purchase<R>(
    snapshot: &WorldSnapshot,
    assets: &Assets<'_>,
    config: &EngineConfig,
    flagship_busy: bool,
    rng: &mut R,
    batch: &mut CommandBatch,
) -> Result<Option<Purchase>>
where
    R: Rng + ?Sized,
{
    let acquisition = &config.acquisition;
    if acquisition.odd_ticks_only && snapshot.tick % 2 == 0 {
        return Ok(None);
    }
    if assets.production_nodes.is_empty() || flagship_busy {
        return Ok(None);
    }

    let reserve = cash_reserve(assets, config);
    let money = assets.me.net_worth.money;

    let class = if assets.foreign_fleet_present() {
        let wanted = assets.traders.len() / acquisition.traders_per_fighter.max(1) + 1;
        let have = assets.count_owned(acquisition.combat_class);
        if have < wanted {
            tracing::debug!(have, wanted, "Escorts wanted");
            Some(acquisition.combat_class)
        } else {
            None
        }
    } else {
        None
    };
    let class = class.unwrap_or(if assets.me.net_worth.total > acquisition.wealthy_threshold {
        acquisition.wealthy_trader
    } else {
        acquisition.starter_trader
    });

    let price = config.classes.require(class)?.price;
    if money < price.saturating_add(reserve) {
        tracing::trace!(?class, money, price, reserve, "Cannot afford construction");
        return Ok(None);
    }

    let site = match assets.flagship.filter(|flagship| {
        assets
            .production_nodes
            .iter()
            .any(|node| node.id == flagship.id)
    }) {
        Some(flagship) => flagship.id,
        None => match assets.production_nodes.choose(rng) {
            Some(node) => node.id,
            None => return Ok(None),
        },
    };

    batch.insert(site, Command::Construct { class });
    tracing::info!(site, ?class, money, reserve, "Constructing");
    Ok(Some(Purchase { site, class }))
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::math::Vec2Fixed;
    use crate::snapshot::{PlayerAccount, Unit};

    fn unit(id: UnitId, owner: u64, class: UnitClass) -> Unit {
        Unit::new(id, owner, class, Vec2Fixed::ZERO, 100)
    }

    fn purchase(snapshot: &WorldSnapshot, busy: bool) -> Option<Purchase> {
        let config = EngineConfig::default();
        let assets = Assets::classify(snapshot, &config).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut batch = CommandBatch::new();
        let result = plan_purchase(snapshot, &assets, &config, busy, &mut rng, &mut batch).unwrap();
        if let Some(purchase) = result {
            assert_eq!(
                batch.get(purchase.site),
                Some(&Command::Construct {
                    class: purchase.class
                })
            );
        }
        result
    }

    fn rich_at(tick: u64, money: i64, total: i64) -> WorldSnapshot {
        WorldSnapshot::new(1, tick)
            .with_player(PlayerAccount::new(1, "us", money, total))
            .with_unit(unit(1, 1, UnitClass::Flagship))
            .with_unit(unit(2, 1, UnitClass::ProductionNode))
    }

    #[test]
    fn test_reserve_formula() {
        let config = EngineConfig::default();

        let calm = rich_at(1, 0, 30_000_000).with_unit(unit(3, 1, UnitClass::LightTrader));
        let assets = Assets::classify(&calm, &config).unwrap();
        assert_eq!(cash_reserve(&assets, &config), 5_000);

        let contested = calm.clone().with_unit(unit(9, 2, UnitClass::ProductionNode));
        let assets = Assets::classify(&contested, &config).unwrap();
        assert_eq!(cash_reserve(&assets, &config), 2_800_000);

        let poor = rich_at(1, 0, 2_500_000).with_unit(unit(9, 2, UnitClass::ProductionNode));
        let assets = Assets::classify(&poor, &config).unwrap();
        assert_eq!(cash_reserve(&assets, &config), 1_000_000);
    }

    #[test]
    fn test_even_ticks_and_busy_flagship_skip() {
        assert_eq!(purchase(&rich_at(2, 100_000_000, 100_000_000), false), None);
        assert_eq!(purchase(&rich_at(3, 100_000_000, 100_000_000), true), None);
    }

    #[test]
    fn test_builds_at_flagship_by_wealth() {
        let rich = purchase(&rich_at(3, 100_000_000, 100_000_000), false);
        assert_eq!(
            rich,
            Some(Purchase {
                site: 1,
                class: UnitClass::HeavyTrader
            })
        );

        let modest = purchase(&rich_at(3, 600_000, 1_000_000), false);
        assert_eq!(
            modest,
            Some(Purchase {
                site: 1,
                class: UnitClass::LightTrader
            })
        );
    }

    #[test]
    fn test_enemy_fleet_calls_for_escorts() {
        let snapshot = rich_at(3, 100_000_000, 100_000_000).with_unit(unit(9, 2, UnitClass::LightTrader));
        assert_eq!(purchase(&snapshot, false).map(|p| p.class), Some(UnitClass::Fighter));

        // One fighter covers up to 24 traders.
        let covered = snapshot.with_unit(unit(3, 1, UnitClass::Fighter));
        assert_eq!(purchase(&covered, false).map(|p| p.class), Some(UnitClass::HeavyTrader));
    }

    #[test]
    fn test_escort_shortfall_without_funds_buys_nothing() {
        let snapshot = rich_at(3, 1_500_000, 1_500_000).with_unit(unit(9, 2, UnitClass::Fighter));
        assert_eq!(purchase(&snapshot, false), None);
    }

    #[test]
    fn test_random_shipyard_without_flagship() {
        let snapshot = WorldSnapshot::new(1, 5)
            .with_player(PlayerAccount::new(1, "us", 100_000_000, 1_000_000))
            .with_unit(unit(4, 1, UnitClass::ProductionNode))
            .with_unit(unit(5, 1, UnitClass::ProductionNode));
        let bought = purchase(&snapshot, false).map(|p| p.site);
        assert!(matches!(bought, Some(4 | 5)));
        // Same seed, same choice.
        assert_eq!(purchase(&snapshot, false).map(|p| p.site), bought);
    }
}
