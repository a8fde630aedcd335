//! Test fixtures and helpers.
//!
//! Pre-built snapshots and unit configurations for consistent testing.
//! Every unit gets its class's full life unless stated otherwise.

use fleet_core::config::EngineConfig;
use fleet_core::math::Vec2Fixed;
use fleet_core::snapshot::{PlayerAccount, PlayerId, TradeNode, Unit, UnitId, WorldSnapshot};
use fleet_core::unit_class::{ClassCatalog, UnitClass};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// The player every fixture plays as.
pub const ME: PlayerId = 1;

/// The hostile player in every fixture.
pub const RAIDERS: PlayerId = 2;

/// Full life for a class under the default catalog.
#[must_use]
pub fn full_life(class: UnitClass) -> i64 {
    ClassCatalog::default().get(class).map_or(100, |stats| stats.life)
}

/// A unit at grid coordinates with full life.
#[must_use]
pub fn unit_at(id: UnitId, owner: PlayerId, class: UnitClass, x: i64, y: i64) -> Unit {
    Unit::new(id, owner, class, Vec2Fixed::from_grid(x, y), full_life(class))
}

/// Incremental snapshot construction with automatic ids.
///
/// Units get ids from 1 upward and nodes from 1000 upward, so tests can
/// predict them from insertion order.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    snapshot: WorldSnapshot,
    next_unit: UnitId,
    next_node: u64,
}

impl ScenarioBuilder {
    /// Start a scenario at `tick` with us and one hostile player.
    #[must_use]
    pub fn new(tick: u64) -> Self {
        let snapshot = WorldSnapshot::new(ME, tick)
            .with_player(PlayerAccount::new(ME, "us", 0, 0))
            .with_player(PlayerAccount::new(RAIDERS, "raiders", 0, 0));
        Self {
            snapshot,
            next_unit: 1,
            next_node: 1000,
        }
    }

    /// Set our money and net worth.
    #[must_use]
    pub fn money(mut self, money: i64, total: i64) -> Self {
        self.snapshot = self.snapshot.with_player(PlayerAccount::new(ME, "us", money, total));
        self
    }

    /// Set a player's account directly.
    #[must_use]
    pub fn player(mut self, account: PlayerAccount) -> Self {
        self.snapshot = self.snapshot.with_player(account);
        self
    }

    /// Add one of our units.
    #[must_use]
    pub fn ours(self, class: UnitClass, x: i64, y: i64) -> Self {
        self.unit(ME, class, x, y)
    }

    /// Add a hostile unit.
    #[must_use]
    pub fn enemy(self, class: UnitClass, x: i64, y: i64) -> Self {
        self.unit(RAIDERS, class, x, y)
    }

    /// Add a unit for any owner.
    #[must_use]
    pub fn unit(mut self, owner: PlayerId, class: UnitClass, x: i64, y: i64) -> Self {
        let id = self.next_unit;
        self.next_unit += 1;
        self.snapshot = self.snapshot.with_unit(unit_at(id, owner, class, x, y));
        self
    }

    /// The id the next automatically numbered unit will get.
    #[must_use]
    pub fn next_unit_id(&self) -> UnitId {
        self.next_unit
    }

    /// Add a fully specified unit, keeping its id.
    #[must_use]
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.next_unit = self.next_unit.max(unit.id + 1);
        self.snapshot = self.snapshot.with_unit(unit);
        self
    }

    /// Add a trade node shaped by `build`.
    #[must_use]
    pub fn node<F>(mut self, x: i64, y: i64, build: F) -> Self
    where
        F: FnOnce(TradeNode) -> TradeNode,
    {
        let id = self.next_node;
        self.next_node += 1;
        self.snapshot = self
            .snapshot
            .with_node(build(TradeNode::new(id, Vec2Fixed::from_grid(x, y))));
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> WorldSnapshot {
        self.snapshot
    }
}

/// One trader, one buy node, one sell node on a line.
///
/// Resource 1 is bought at node 1000 for 10 and sold at node 1001 for 50.
#[must_use]
pub fn trade_lane() -> WorldSnapshot {
    ScenarioBuilder::new(2)
        .money(10_000_000, 10_000_000)
        .ours(UnitClass::LightTrader, 0, 0)
        .node(20, 0, |node| node.buying_from(1, 10, 1000))
        .node(200, 0, |node| node.selling_to(1, 50))
        .build()
}

/// Several traders competing for one scarce buy offer.
#[must_use]
pub fn contested_market(traders: usize, stock: i64) -> WorldSnapshot {
    let mut builder = ScenarioBuilder::new(2).money(10_000_000, 10_000_000);
    for offset in 0..traders {
        let x = i64::try_from(offset).unwrap_or(0) * 5;
        builder = builder.ours(UnitClass::LightTrader, x, 0);
    }
    builder
        .node(50, 0, |node| node.buying_from(1, 10, stock))
        .node(300, 0, |node| node.selling_to(1, 40))
        .build()
}

/// A flagship with escorts and traders under attack from a raiding party.
#[must_use]
pub fn skirmish() -> WorldSnapshot {
    ScenarioBuilder::new(3)
        .money(20_000_000, 30_000_000)
        .ours(UnitClass::Flagship, 0, 0)
        .ours(UnitClass::Fighter, 10, 10)
        .ours(UnitClass::Fighter, -10, 10)
        .ours(UnitClass::LightTrader, 40, 0)
        .ours(UnitClass::HeavyTrader, -40, 0)
        .enemy(UnitClass::Fighter, 90, 0)
        .enemy(UnitClass::Bomber, 120, 30)
        .enemy(UnitClass::LightTrader, 400, 400)
        .node(60, 0, |node| node.buying_from(1, 10, 500))
        .node(-300, 0, |node| node.selling_to(1, 60))
        .build()
}

/// A large randomized snapshot for benchmarks.
///
/// The same seed always produces the same snapshot.
#[must_use]
pub fn large_world(seed: u64, ours: usize, enemies: usize, nodes: usize) -> WorldSnapshot {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut builder = ScenarioBuilder::new(3).money(50_000_000, 80_000_000);
    builder = builder.ours(UnitClass::Flagship, 0, 0);

    let own_classes = [UnitClass::LightTrader, UnitClass::HeavyTrader, UnitClass::Fighter];
    for index in 0..ours {
        let class = own_classes[index % own_classes.len()];
        builder = builder.ours(class, rng.gen_range(-2000..2000), rng.gen_range(-2000..2000));
    }

    let enemy_classes = [UnitClass::LightTrader, UnitClass::Fighter, UnitClass::Bomber];
    for index in 0..enemies {
        let class = enemy_classes[index % enemy_classes.len()];
        builder = builder.enemy(class, rng.gen_range(-2000..2000), rng.gen_range(-2000..2000));
    }

    for _ in 0..nodes {
        let resource = rng.gen_range(1..6);
        let buy_price = rng.gen_range(5..50);
        let margin = rng.gen_range(1..40);
        let stock = rng.gen_range(10..500);
        let (x, y) = (rng.gen_range(-2000..2000), rng.gen_range(-2000..2000));
        let sells_elsewhere = rng.gen_range(1..6);
        builder = builder.node(x, y, |node| {
            node.buying_from(resource, buy_price, stock)
                .selling_to(sells_elsewhere, buy_price + margin)
        });
    }

    builder.build()
}

/// Default configuration.
#[must_use]
pub fn config() -> EngineConfig {
    EngineConfig::default()
}
