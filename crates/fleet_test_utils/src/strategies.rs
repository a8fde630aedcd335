//! Proptest strategies for world snapshots.
//!
//! Generated snapshots are small but cover the interesting mixes: traders
//! with and without cargo, scarce buy offers, enemies near and far, with and
//! without a flagship.

use fleet_core::math::Vec2Fixed;
use fleet_core::snapshot::{TradeNode, Unit, WorldSnapshot};
use fleet_core::unit_class::{ClassRole, UnitClass};
use proptest::prelude::*;

use crate::fixtures::{full_life, ScenarioBuilder, ME, RAIDERS};

/// Grid coordinate range shared by every strategy.
pub const MAP_EXTENT: i64 = 600;

/// A grid position on the map.
pub fn arb_position() -> impl Strategy<Value = (i64, i64)> {
    (-MAP_EXTENT..MAP_EXTENT, -MAP_EXTENT..MAP_EXTENT)
}

/// One of our mobile classes.
pub fn arb_own_class() -> impl Strategy<Value = UnitClass> {
    prop_oneof![
        Just(UnitClass::LightTrader),
        Just(UnitClass::HeavyTrader),
        Just(UnitClass::Fighter),
        Just(UnitClass::Bomber),
    ]
}

/// Any class an enemy might field.
pub fn arb_enemy_class() -> impl Strategy<Value = UnitClass> {
    prop_oneof![
        Just(UnitClass::LightTrader),
        Just(UnitClass::HeavyTrader),
        Just(UnitClass::Fighter),
        Just(UnitClass::Bomber),
        Just(UnitClass::Flagship),
        Just(UnitClass::ProductionNode),
    ]
}

/// A node with one buy line and one sell line.
///
/// Stock is kept small so that contention between traders is common.
pub fn arb_node_lines() -> impl Strategy<Value = ((i64, i64), u64, i64, i64, u64, i64)> {
    (arb_position(), 1u64..4, 1i64..60, 0i64..40, 1u64..4, 1i64..120)
}

/// Cargo carried by a trader, possibly none.
pub fn arb_cargo() -> impl Strategy<Value = Option<(u64, i64)>> {
    prop::option::of((1u64..4, 1i64..50))
}

/// A full snapshot.
///
/// Unit ids are assigned in generation order; our units come first.
pub fn arb_snapshot() -> impl Strategy<Value = WorldSnapshot> {
    (
        1u64..3600,
        any::<bool>(),
        0i64..20_000_000,
        prop::collection::vec((arb_own_class(), arb_position(), arb_cargo(), 10i64..=100), 0..8),
        prop::collection::vec((arb_enemy_class(), arb_position()), 0..5),
        prop::collection::vec(arb_node_lines(), 0..6),
    )
        .prop_map(|(tick, flagship, money, ours, enemies, nodes)| {
            let mut builder = ScenarioBuilder::new(tick).money(money, money);
            if flagship {
                builder = builder.ours(UnitClass::Flagship, 0, 0);
            }
            for (class, (x, y), cargo, percent) in ours {
                let unit = own_unit(&builder, class, (x, y), cargo, percent);
                builder = builder.with_unit(unit);
            }
            for (class, (x, y)) in enemies {
                builder = builder.unit(RAIDERS, class, x, y);
            }
            for ((x, y), buy_res, buy_price, stock, sell_res, sell_price) in nodes {
                builder = builder.node(x, y, |node: TradeNode| {
                    node.buying_from(buy_res, buy_price, stock)
                        .selling_to(sell_res, sell_price)
                });
            }
            builder.build()
        })
}

fn own_unit(
    builder: &ScenarioBuilder,
    class: UnitClass,
    (x, y): (i64, i64),
    cargo: Option<(u64, i64)>,
    percent: i64,
) -> Unit {
    let id = builder.next_unit_id();
    let life = full_life(class) * percent / 100;
    let mut unit = Unit::new(id, ME, class, Vec2Fixed::from_grid(x, y), life.max(1));
    if class.is(ClassRole::TRADER) {
        if let Some((resource, amount)) = cargo {
            unit = unit.with_cargo(resource, amount);
        }
    }
    unit
}
