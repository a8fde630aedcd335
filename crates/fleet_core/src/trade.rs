//! Trade route planning for every trader.
//!
//! Traders are processed in unit-id order. Each one either flees a nearby
//! threat, sells its cargo, buys for a profitable local route, or is left
//! alone. Purchases are recorded in a tick-local [`ClaimLedger`] so later
//! traders see reduced stock and two traders never count on the same units
//! of a scarce resource.

use std::collections::{BTreeMap, BTreeSet};

use crate::classify::Assets;
use crate::command::{Command, CommandBatch};
use crate::config::{EngineConfig, TradeConfig};
use crate::error::Result;
use crate::math::{Fixed, Vec2Fixed};
use crate::snapshot::{NodeId, ResourceId, TradeNode, Unit, UnitId, WorldSnapshot};
use crate::spatial::SpatialContext;
use crate::steering::{flee_destination, Protection};
use crate::unit_class::ClassRole;

/// For each buy node and resource, the nearby nodes that pay for it.
#[derive(Debug, Clone, Default)]
pub struct LocalityGraph {
    sell_nodes: BTreeMap<(NodeId, ResourceId), Vec<NodeId>>,
}

impl LocalityGraph {
    /// Build the graph for all nodes, linking nodes closer than `radius`.
    ///
    /// A node is its own neighbor.
    #[must_use]
    pub fn build(nodes: &BTreeMap<NodeId, TradeNode>, radius: Fixed) -> Self {
        let mut sell_nodes: BTreeMap<(NodeId, ResourceId), Vec<NodeId>> = BTreeMap::new();
        for buy in nodes.values() {
            for (&resource, line) in &buy.resources {
                if line.buy_offer().is_none() {
                    continue;
                }
                let neighbors = nodes
                    .values()
                    .filter(|sell| sell.position.distance(buy.position) < radius)
                    .filter(|sell| sell.sell_offer(resource).is_some())
                    .map(|sell| sell.id)
                    .collect();
                sell_nodes.insert((buy.id, resource), neighbors);
            }
        }
        Self { sell_nodes }
    }

    /// Nodes near `buy_node` paying for `resource`, in id order.
    #[must_use]
    pub fn sell_nodes(&self, buy_node: NodeId, resource: ResourceId) -> &[NodeId] {
        self.sell_nodes
            .get(&(buy_node, resource))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Amounts already claimed this tick, per node and resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimLedger {
    claimed: BTreeMap<(NodeId, ResourceId), i64>,
}

impl ClaimLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount claimed so far.
    #[must_use]
    pub fn claimed(&self, node: NodeId, resource: ResourceId) -> i64 {
        self.claimed.get(&(node, resource)).copied().unwrap_or(0)
    }

    /// Stock left after claims, never negative.
    #[must_use]
    pub fn remaining(&self, node: &TradeNode, resource: ResourceId) -> i64 {
        let stock = node.resources.get(&resource).map_or(0, |line| line.amount);
        (stock - self.claimed(node.id, resource)).max(0)
    }

    /// Record a claim.
    pub fn claim(&mut self, node: NodeId, resource: ResourceId, amount: i64) {
        *self.claimed.entry((node, resource)).or_insert(0) += amount;
    }

    /// Iterate over all claims.
    pub fn iter(&self) -> impl Iterator<Item = (&(NodeId, ResourceId), &i64)> {
        self.claimed.iter()
    }
}

/// What the planner decided for one trader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraderPlan {
    /// Dangerous units are close; run.
    Flee(Command),
    /// Sell or buy.
    Trade(Command),
    /// The chosen trade is already in flight.
    Unchanged,
    /// Nothing profitable.
    Idle,
}

/// Gain over effective distance.
///
/// Dividing in fixed point rounds small ratios to zero and merges close
/// ones, so scores compare by cross-multiplying the raw bits in `i128`.
/// `distance` is always positive.
#[derive(Debug, Clone, Copy)]
struct Score {
    gain: Fixed,
    distance: Fixed,
}

impl Score {
    fn is_profitable(self) -> bool {
        self.gain > Fixed::ZERO
    }

    fn beats(self, other: Self) -> bool {
        i128::from(self.gain.to_bits()) * i128::from(other.distance.to_bits())
            > i128::from(other.gain.to_bits()) * i128::from(self.distance.to_bits())
    }

    fn improves(self, best: Option<&Scored>) -> bool {
        self.is_profitable() && best.map_or(true, |best| self.beats(best.score))
    }
}

#[derive(Debug, Clone, Copy)]
struct Scored {
    node: NodeId,
    resource: ResourceId,
    amount: i64,
    score: Score,
}

/// Plans trades for all traders in one tick.
pub struct TradePlanner<'s, 'a> {
    snapshot: &'s WorldSnapshot,
    assets: &'s Assets<'a>,
    spatial: &'s SpatialContext,
    config: &'s EngineConfig,
    protection: Protection,
    graph: LocalityGraph,
    unsafe_nodes: BTreeSet<NodeId>,
    ledger: ClaimLedger,
}

impl<'s, 'a> TradePlanner<'s, 'a> {
    /// Prepare the tick: locality graph, denied nodes and an empty ledger.
    #[must_use]
    pub fn new(
        snapshot: &'s WorldSnapshot,
        assets: &'s Assets<'a>,
        spatial: &'s SpatialContext,
        config: &'s EngineConfig,
    ) -> Self {
        let trade = &config.trade;
        let unsafe_nodes = snapshot
            .nodes
            .values()
            .filter(|node| {
                assets
                    .foreign_near(node.position, trade.node_avoid_radius, ClassRole::NODE_THREAT)
                    .next()
                    .is_some()
            })
            .map(|node| node.id)
            .collect();

        Self {
            snapshot,
            assets,
            spatial,
            config,
            protection: Protection::assess(assets, spatial),
            graph: LocalityGraph::build(&snapshot.nodes, trade.locality_radius),
            unsafe_nodes,
            ledger: ClaimLedger::new(),
        }
    }

    /// Plan every trader, writing commands into `batch`.
    pub fn run(&mut self, batch: &mut CommandBatch) -> Result<BTreeMap<UnitId, TraderPlan>> {
        let assets = self.assets;
        let mut plans = BTreeMap::new();
        for &trader in &assets.traders {
            let plan = self.plan_trader(trader)?;
            match &plan {
                TraderPlan::Flee(command) | TraderPlan::Trade(command) => {
                    batch.insert(trader.id, command.clone());
                }
                TraderPlan::Unchanged | TraderPlan::Idle => {}
            }
            tracing::debug!(unit = trader.id, ?plan, "Trader planned");
            plans.insert(trader.id, plan);
        }
        Ok(plans)
    }

    /// Claims recorded so far this tick.
    #[must_use]
    pub fn ledger(&self) -> &ClaimLedger {
        &self.ledger
    }

    fn trade_config(&self) -> &TradeConfig {
        &self.config.trade
    }

    /// Decide for one trader.
    pub fn plan_trader(&mut self, trader: &Unit) -> Result<TraderPlan> {
        let threat = Vec2Fixed::mean(
            self.assets
                .foreign_near(trader.position, self.trade_config().avoid_radius, ClassRole::DANGEROUS)
                .map(|unit| unit.position),
        );
        if let Some(threat) = threat {
            let destination =
                flee_destination(trader.position, threat, self.protection, &self.config.steering);
            return Ok(TraderPlan::Flee(Command::move_to(destination)));
        }

        let chosen = if let Some(sell) = self.best_sale(trader) {
            Some(Command::Trade {
                target: sell.node,
                resource: sell.resource,
                amount: -sell.amount,
            })
        } else {
            let capacity = self.config.classes.require(trader.class)?.cargo_capacity;
            let spare = capacity - trader.cargo_total();
            self.best_purchase(trader, spare).map(|buy| {
                self.ledger.claim(buy.node, buy.resource, buy.amount);
                Command::Trade {
                    target: buy.node,
                    resource: buy.resource,
                    amount: buy.amount,
                }
            })
        };

        Ok(match chosen {
            None => TraderPlan::Idle,
            Some(command) if trader.command.as_ref() == Some(&command) => TraderPlan::Unchanged,
            Some(command) => TraderPlan::Trade(command),
        })
    }

    /// Distance inflated by how far `points` lie from the protection anchor.
    fn protection_bias(&self, points: &[Vec2Fixed], weight: Fixed) -> Fixed {
        let Some(anchor) = self.protection.anchor() else {
            return Fixed::ZERO;
        };
        points
            .iter()
            .map(|point| point.distance(anchor).saturating_mul(weight))
            .fold(Fixed::ZERO, Fixed::saturating_add)
    }

    fn score(&self, gain: Fixed, distance: Fixed) -> Score {
        if distance == Fixed::ZERO {
            Score {
                gain: gain.saturating_mul(self.trade_config().zero_distance_multiplier),
                distance: Fixed::from_num(1),
            }
        } else {
            Score { gain, distance }
        }
    }

    fn best_sale(&self, trader: &Unit) -> Option<Scored> {
        if !trader.has_cargo() {
            return None;
        }

        let mut best: Option<Scored> = None;
        for node in self.snapshot.nodes.values() {
            if self.unsafe_nodes.contains(&node.id) {
                continue;
            }
            for (&resource, &amount) in &trader.cargo {
                if amount <= 0 {
                    continue;
                }
                let Some(price) = node.sell_offer(resource) else {
                    continue;
                };

                let gain = Fixed::from_num(price).saturating_mul(Fixed::from_num(amount));
                let distance = trader.position.distance(node.position).saturating_add(
                    self.protection_bias(&[node.position], self.spatial.center_cost),
                );
                let score = self.score(gain, distance);
                tracing::trace!(unit = trader.id, node = node.id, resource, ?score, "Sale");

                if score.improves(best.as_ref()) {
                    best = Some(Scored {
                        node: node.id,
                        resource,
                        amount,
                        score,
                    });
                }
            }
        }
        best
    }

    fn best_purchase(&self, trader: &Unit, spare: i64) -> Option<Scored> {
        if spare <= 0 {
            return None;
        }

        let half_cost = self.spatial.center_cost / Fixed::from_num(2);
        let mut best: Option<Scored> = None;
        for buy_node in self.snapshot.nodes.values() {
            if self.unsafe_nodes.contains(&buy_node.id) {
                continue;
            }
            for (&resource, line) in &buy_node.resources {
                let Some(buy_price) = line.buy_offer() else {
                    continue;
                };
                let amount = self.ledger.remaining(buy_node, resource).min(spare);
                if amount <= 0 {
                    continue;
                }

                for &sell_id in self.graph.sell_nodes(buy_node.id, resource) {
                    if self.unsafe_nodes.contains(&sell_id) {
                        continue;
                    }
                    let Some(sell_node) = self.snapshot.node(sell_id) else {
                        continue;
                    };
                    let Some(sell_price) = sell_node.sell_offer(resource) else {
                        continue;
                    };

                    let gain = Fixed::from_num(sell_price - buy_price)
                        .saturating_mul(Fixed::from_num(amount));
                    let distance = trader
                        .position
                        .distance(buy_node.position)
                        .saturating_add(buy_node.position.distance(sell_node.position))
                        .saturating_add(
                            self.protection_bias(&[buy_node.position, sell_node.position], half_cost),
                        );
                    let score = self.score(gain, distance);
                    tracing::trace!(
                        unit = trader.id,
                        buy = buy_node.id,
                        sell = sell_id,
                        resource,
                        ?score,
                        "Route"
                    );

                    if score.improves(best.as_ref()) {
                        best = Some(Scored {
                            node: buy_node.id,
                            resource,
                            amount,
                            score,
                        });
                    }
                }
            }
        }
        best
    }
}
