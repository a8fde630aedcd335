//! Point-in-time world state handed to the engine each tick.
//!
//! A [`WorldSnapshot`] is read-only to the engine. All maps are ordered by
//! id so that every pass over units or nodes visits them in the same order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{EngineError, Result};
use crate::math::Vec2Fixed;
use crate::unit_class::UnitClass;

/// Unique identifier for units.
pub type UnitId = u64;

/// Unique identifier for trade nodes.
pub type NodeId = u64;

/// Unique identifier for players.
pub type PlayerId = u64;

/// Unique identifier for tradeable resources.
pub type ResourceId = u64;

/// A mobile unit or stationary shipyard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unit id.
    pub id: UnitId,
    /// Owning player.
    pub owner: PlayerId,
    /// Unit class.
    pub class: UnitClass,
    /// Current position.
    pub position: Vec2Fixed,
    /// Current life.
    pub life: i64,
    /// Cargo held, by resource.
    #[serde(default)]
    pub cargo: BTreeMap<ResourceId, i64>,
    /// Command the server is currently executing for this unit.
    #[serde(default)]
    pub command: Option<Command>,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

impl Unit {
    /// Create a unit with no cargo, no command, and the given life.
    #[must_use]
    pub fn new(id: UnitId, owner: PlayerId, class: UnitClass, position: Vec2Fixed, life: i64) -> Self {
        Self {
            id,
            owner,
            class,
            position,
            life,
            cargo: BTreeMap::new(),
            command: None,
            name: String::new(),
        }
    }

    /// Add cargo of one resource.
    #[must_use]
    pub fn with_cargo(mut self, resource: ResourceId, amount: i64) -> Self {
        self.cargo.insert(resource, amount);
        self
    }

    /// Set the in-flight command.
    #[must_use]
    pub fn with_command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Total amount of cargo held.
    #[must_use]
    pub fn cargo_total(&self) -> i64 {
        self.cargo.values().sum()
    }

    /// Whether the unit holds any cargo.
    #[must_use]
    pub fn has_cargo(&self) -> bool {
        self.cargo.values().any(|&amount| amount > 0)
    }
}

/// One resource line at a trade node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeResource {
    /// Price the node charges when we buy.
    #[serde(default)]
    pub buy_price: Option<i64>,
    /// Price the node pays when we sell.
    #[serde(default)]
    pub sell_price: Option<i64>,
    /// Stock available to buy.
    #[serde(default)]
    pub amount: i64,
}

impl NodeResource {
    /// Price paid to us when selling here, if the node buys this resource.
    #[must_use]
    pub fn sell_offer(&self) -> Option<i64> {
        self.sell_price.filter(|&price| price != 0)
    }

    /// Price charged when buying here, if the node has stock to sell.
    #[must_use]
    pub fn buy_offer(&self) -> Option<i64> {
        self.buy_price
            .filter(|&price| price != 0)
            .filter(|_| self.amount > 0)
    }
}

/// A stationary trading location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeNode {
    /// Node id.
    pub id: NodeId,
    /// Position.
    pub position: Vec2Fixed,
    /// Resource lines, by resource.
    #[serde(default)]
    pub resources: BTreeMap<ResourceId, NodeResource>,
}

impl TradeNode {
    /// Create a node with no resource lines.
    #[must_use]
    pub fn new(id: NodeId, position: Vec2Fixed) -> Self {
        Self {
            id,
            position,
            resources: BTreeMap::new(),
        }
    }

    /// Add or update a line where the node pays `price` for `resource`.
    #[must_use]
    pub fn selling_to(mut self, resource: ResourceId, price: i64) -> Self {
        self.resources.entry(resource).or_default().sell_price = Some(price);
        self
    }

    /// Add or update a line where the node offers `amount` of `resource` at `price`.
    #[must_use]
    pub fn buying_from(mut self, resource: ResourceId, price: i64, amount: i64) -> Self {
        let line = self.resources.entry(resource).or_default();
        line.buy_price = Some(price);
        line.amount = amount;
        self
    }

    /// Price paid for `resource` here, if any.
    #[must_use]
    pub fn sell_offer(&self, resource: ResourceId) -> Option<i64> {
        self.resources.get(&resource).and_then(NodeResource::sell_offer)
    }
}

/// A player's financial position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetWorth {
    /// Liquid money.
    pub money: i64,
    /// Money plus valuation of all assets.
    pub total: i64,
}

/// A participant in the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAccount {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Net worth.
    pub net_worth: NetWorth,
}

impl PlayerAccount {
    /// Create a player account.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>, money: i64, total: i64) -> Self {
        Self {
            id,
            name: name.into(),
            net_worth: NetWorth { money, total },
        }
    }
}

/// Full world state for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// The player this engine plays as.
    pub player_id: PlayerId,
    /// Current tick.
    pub tick: u64,
    /// Current season.
    #[serde(default)]
    pub season: u64,
    /// All visible units.
    #[serde(default)]
    pub units: BTreeMap<UnitId, Unit>,
    /// All trade nodes.
    #[serde(default)]
    pub nodes: BTreeMap<NodeId, TradeNode>,
    /// All players.
    #[serde(default)]
    pub players: BTreeMap<PlayerId, PlayerAccount>,
}

impl WorldSnapshot {
    /// Create an empty snapshot for a player at a tick.
    #[must_use]
    pub fn new(player_id: PlayerId, tick: u64) -> Self {
        Self {
            player_id,
            tick,
            season: 0,
            units: BTreeMap::new(),
            nodes: BTreeMap::new(),
            players: BTreeMap::new(),
        }
    }

    /// Add a unit.
    #[must_use]
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.units.insert(unit.id, unit);
        self
    }

    /// Add a trade node.
    #[must_use]
    pub fn with_node(mut self, node: TradeNode) -> Self {
        self.nodes.insert(node.id, node);
        self
    }

    /// Add a player.
    #[must_use]
    pub fn with_player(mut self, player: PlayerAccount) -> Self {
        self.players.insert(player.id, player);
        self
    }

    /// Get a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a trade node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TradeNode> {
        self.nodes.get(&id)
    }

    /// The agent's own account.
    pub fn me(&self) -> Result<&PlayerAccount> {
        self.players
            .get(&self.player_id)
            .ok_or(EngineError::UnknownPlayer(self.player_id))
    }

    /// Every account except the agent's own.
    pub fn rivals(&self) -> impl Iterator<Item = &PlayerAccount> {
        self.players
            .values()
            .filter(move |player| player.id != self.player_id)
    }
}
