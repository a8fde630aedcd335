//! Per-tick partition of the snapshot into our assets and foreign units.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::math::{Fixed, Vec2Fixed};
use crate::snapshot::{PlayerAccount, PlayerId, Unit, UnitId, WorldSnapshot};
use crate::unit_class::{ClassRole, UnitClass};

/// Our units sorted into roles, plus every non-allied foreign unit.
///
/// All lists are in unit-id order.
#[derive(Debug, Clone)]
pub struct Assets<'a> {
    /// Our own account.
    pub me: &'a PlayerAccount,
    /// Every unit we own.
    pub owned: Vec<&'a Unit>,
    /// Our cargo carriers.
    pub traders: Vec<&'a Unit>,
    /// Our fighters and bombers.
    pub strike_craft: Vec<&'a Unit>,
    /// Our strike craft plus the flagship.
    pub combatants: Vec<&'a Unit>,
    /// Our flagship, if we still have one.
    pub flagship: Option<&'a Unit>,
    /// Our units that can construct other units.
    pub production_nodes: Vec<&'a Unit>,
    /// Units owned by anyone except us and our allies.
    pub foreign: Vec<&'a Unit>,
}

impl<'a> Assets<'a> {
    /// Classify every unit in the snapshot.
    pub fn classify(snapshot: &'a WorldSnapshot, config: &EngineConfig) -> Result<Self> {
        let me = snapshot.me()?;
        let allies: Vec<PlayerId> = snapshot
            .rivals()
            .filter(|player| config.is_allied(&player.name))
            .map(|player| player.id)
            .collect();

        let mut assets = Self {
            me,
            owned: Vec::new(),
            traders: Vec::new(),
            strike_craft: Vec::new(),
            combatants: Vec::new(),
            flagship: None,
            production_nodes: Vec::new(),
            foreign: Vec::new(),
        };

        for unit in snapshot.units.values() {
            if unit.owner != me.id {
                if !allies.contains(&unit.owner) {
                    assets.foreign.push(unit);
                }
                continue;
            }

            assets.owned.push(unit);
            let class = unit.class;
            if class.is(ClassRole::TRADER) {
                assets.traders.push(unit);
            }
            if class.is(ClassRole::COMBATANT) {
                assets.combatants.push(unit);
                if class.is(ClassRole::FLAGSHIP) {
                    if assets.flagship.is_none() {
                        assets.flagship = Some(unit);
                    }
                } else {
                    assets.strike_craft.push(unit);
                }
            }
            if config.classes.require(class)?.production_node {
                assets.production_nodes.push(unit);
            }
        }

        tracing::debug!(
            owned = assets.owned.len(),
            traders = assets.traders.len(),
            combatants = assets.combatants.len(),
            foreign = assets.foreign.len(),
            "Classified assets"
        );
        Ok(assets)
    }

    /// Whether `unit` is our flagship.
    #[must_use]
    pub fn is_flagship(&self, unit: UnitId) -> bool {
        self.flagship.is_some_and(|flagship| flagship.id == unit)
    }

    /// Foreign units having any of `roles`.
    pub fn foreign_with(&self, roles: ClassRole) -> impl Iterator<Item = &'a Unit> + '_ {
        self.foreign.iter().copied().filter(move |unit| unit.class.is_any(roles))
    }

    /// Foreign units having any of `roles` strictly within `radius` of `point`.
    pub fn foreign_near(
        &self,
        point: Vec2Fixed,
        radius: Fixed,
        roles: ClassRole,
    ) -> impl Iterator<Item = &'a Unit> + '_ {
        self.foreign_with(roles)
            .filter(move |unit| unit.position.distance(point) < radius)
    }

    /// Whether any foreign trader or strike craft is visible.
    ///
    /// Enemy flagships and shipyards alone do not call for more fighters.
    #[must_use]
    pub fn foreign_fleet_present(&self) -> bool {
        self.foreign_with(ClassRole::TRADER | ClassRole::LIGHT_COMBAT | ClassRole::HEAVY_COMBAT)
            .next()
            .is_some()
    }

    /// Number of our units of one class.
    #[must_use]
    pub fn count_owned(&self, class: UnitClass) -> usize {
        self.owned.iter().filter(|unit| unit.class == class).count()
    }
}
