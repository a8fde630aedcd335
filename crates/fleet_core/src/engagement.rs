//! Combat target selection.
//!
//! Every combat unit is evaluated fresh each tick, in unit-id order, into one
//! of four [`EngagementState`]s. The only carried input is the flagship's
//! sticky target, which gives the whole fleet hysteresis: the flagship keeps
//! its target while it stays in range, and defenders rank it ahead of
//! slightly closer alternatives.
//!
//! Units play one of three roles:
//! - the **flagship** anchors the defense ring and owns the sticky target
//! - **defenders** (the default) stay inside the ring
//! - **hunters** (only with `combat.hunting`: strike craft not named as the
//!   home defender, while an enemy fleet is visible) pursue enemy traders
//!   and strike craft anywhere
//!
//! Strike craft do not commit to a light-combat target that enough allies are
//! already closer to. A unit left without a target regroups on the fleet
//! centroid.
//!
//! Before attacking, every unit except the flagship checks for a secondary
//! threat cluster near its path and sidesteps it if the approach would close
//! in on it.

use std::collections::BTreeMap;

use crate::classify::Assets;
use crate::command::{Command, CommandBatch};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::math::{Fixed, Vec2Fixed};
use crate::snapshot::{Unit, UnitId, WorldSnapshot};
use crate::spatial::SpatialContext;
use crate::steering::reposition_destination;
use crate::unit_class::ClassRole;

/// Per-unit combat state for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementState {
    /// No qualifying target; regrouping or idle.
    Unengaged,
    /// Attacking a target outside immediate range.
    Pursuing(UnitId),
    /// Attacking a target inside immediate range.
    Engaged(UnitId),
    /// Sidestepping a threat cluster centered here.
    Fleeing(Vec2Fixed),
}

impl EngagementState {
    /// Whether the unit is doing anything combat-related.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Unengaged)
    }
}

/// Outcome of the engagement pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngagementReport {
    /// The flagship's sticky target after this tick.
    pub sticky_target: Option<UnitId>,
    /// State of every combat unit.
    pub states: BTreeMap<UnitId, EngagementState>,
}

impl EngagementReport {
    /// State of one unit, `Unengaged` if it was not evaluated.
    #[must_use]
    pub fn state(&self, unit: UnitId) -> EngagementState {
        self.states.get(&unit).copied().unwrap_or(EngagementState::Unengaged)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Flagship,
    Defender,
    Hunter,
}

/// Classes escorts intercept inside the defense ring.
const ESCORT_INTERCEPTS: ClassRole = ClassRole::TRADER
    .union(ClassRole::LIGHT_COMBAT)
    .union(ClassRole::HEAVY_COMBAT);

/// Classes the flagship intercepts inside the defense ring.
const FLAGSHIP_INTERCEPTS: ClassRole = ClassRole::FLAGSHIP
    .union(ClassRole::LIGHT_COMBAT)
    .union(ClassRole::HEAVY_COMBAT);

const STRIKE: ClassRole = ClassRole::LIGHT_COMBAT.union(ClassRole::HEAVY_COMBAT);

/// Chooses targets for all combat units in one tick.
pub struct EngagementSelector<'s, 'a> {
    snapshot: &'s WorldSnapshot,
    assets: &'s Assets<'a>,
    spatial: &'s SpatialContext,
    config: &'s EngineConfig,
}

impl<'s, 'a> EngagementSelector<'s, 'a> {
    /// Create a selector for this tick.
    #[must_use]
    pub fn new(
        snapshot: &'s WorldSnapshot,
        assets: &'s Assets<'a>,
        spatial: &'s SpatialContext,
        config: &'s EngineConfig,
    ) -> Self {
        Self {
            snapshot,
            assets,
            spatial,
            config,
        }
    }

    /// Evaluate every combat unit, writing commands into `batch`.
    pub fn run(&self, sticky_target: Option<UnitId>, batch: &mut CommandBatch) -> Result<EngagementReport> {
        let mut report = EngagementReport {
            sticky_target,
            states: BTreeMap::new(),
        };

        for &unit in &self.assets.combatants {
            let state = self.engage(unit, &mut report.sticky_target, batch)?;
            tracing::debug!(unit = unit.id, ?state, "Engagement");
            report.states.insert(unit.id, state);
        }

        if report.sticky_target != sticky_target {
            tracing::debug!(from = ?sticky_target, to = ?report.sticky_target, "Sticky target changed");
        }
        Ok(report)
    }

    fn role(&self, unit: &Unit) -> Role {
        if self.assets.is_flagship(unit.id) {
            Role::Flagship
        } else if self.config.combat.hunting
            && !unit.name.starts_with(&self.config.combat.defender_prefix)
            && self.assets.foreign_fleet_present()
        {
            Role::Hunter
        } else {
            Role::Defender
        }
    }

    fn foreign(&self, id: UnitId) -> Option<&'a Unit> {
        self.assets.foreign.iter().find(|unit| unit.id == id).copied()
    }

    fn distance(&self, a: &Unit, b: &Unit) -> Fixed {
        self.spatial
            .distances
            .get(a.id, b.id)
            .unwrap_or_else(|| a.position.distance(b.position))
    }

    fn engage(
        &self,
        unit: &Unit,
        sticky: &mut Option<UnitId>,
        batch: &mut CommandBatch,
    ) -> Result<EngagementState> {
        let role = self.role(unit);
        let target = match role {
            Role::Hunter => self.hunt(unit),
            Role::Flagship => {
                self.refresh_sticky(unit, sticky);
                self.defend_with(unit, sticky, true)
            }
            Role::Defender => {
                let mut shared = *sticky;
                self.defend_with(unit, &mut shared, false)
            }
        };

        let Some(target) = target else {
            if let Some(centroid) = self.spatial.fleet_centroid {
                batch.insert(unit.id, Command::move_to(centroid));
            }
            return Ok(EngagementState::Unengaged);
        };

        if role != Role::Flagship {
            if let Some(threat) = self.secondary_threat(unit, target)? {
                let toward = (target.position - unit.position).normalize();
                let ahead = unit.position + toward.scale(self.config.combat.approach_lookahead);
                if ahead.distance(threat) < unit.position.distance(threat) {
                    let destination =
                        reposition_destination(unit.position, threat, Some(toward), &self.config.steering);
                    batch.insert(unit.id, Command::move_to(destination));
                    return Ok(EngagementState::Fleeing(threat));
                }
            }
        }

        batch.insert(unit.id, Command::Attack { target: target.id });
        if self.distance(unit, target) < self.config.combat.engagement_range {
            Ok(EngagementState::Engaged(target.id))
        } else {
            Ok(EngagementState::Pursuing(target.id))
        }
    }

    /// Re-scan for a sticky target unless the current one is live strike craft.
    fn refresh_sticky(&self, flagship: &Unit, sticky: &mut Option<UnitId>) {
        let keep = sticky
            .and_then(|id| self.snapshot.unit(id))
            .is_some_and(|current| current.class.is_any(STRIKE));
        if keep {
            return;
        }
        if let Some(found) = self.acquire(flagship) {
            *sticky = Some(found);
        }
    }

    /// Closest enemy strike craft within acquisition radius of the flagship.
    ///
    /// Within one class the nearer wins; heavy strike craft displace light.
    fn acquire(&self, flagship: &Unit) -> Option<UnitId> {
        let radius = self.config.combat.acquisition_radius;
        let mut best: Option<(&Unit, Fixed)> = None;
        for enemy in self.assets.foreign_with(STRIKE) {
            let dist = self.distance(flagship, enemy);
            if dist >= radius {
                continue;
            }
            let replace = match best {
                None => true,
                Some((current, best_dist)) => {
                    (enemy.class == current.class && dist < best_dist)
                        || enemy.class.outranks_in_melee(current.class)
                }
            };
            if replace {
                best = Some((enemy, dist));
            }
        }
        best.map(|(enemy, _)| enemy.id)
    }

    /// Defense-ring target choice shared by the flagship and defenders.
    ///
    /// Only the flagship writes to `sticky`.
    fn defend_with(&self, unit: &Unit, sticky: &mut Option<UnitId>, is_flagship: bool) -> Option<&'a Unit> {
        let range = self.config.combat.engagement_range;

        if let Some(current) = sticky.and_then(|id| self.foreign(id)) {
            if self.distance(unit, current) < range {
                return Some(current);
            }
        }

        if let Some(&adjacent) = self
            .assets
            .foreign
            .iter()
            .find(|enemy| self.distance(unit, enemy) < range)
        {
            if is_flagship {
                *sticky = Some(adjacent.id);
            }
            return Some(adjacent);
        }

        if let Some(enemy) = self.spatial.closest_enemy.and_then(|id| self.foreign(id)) {
            let intercepts = if is_flagship {
                FLAGSHIP_INTERCEPTS
            } else {
                ESCORT_INTERCEPTS
            };
            let dist = self.distance(unit, enemy);
            let in_range = dist < range;
            let near_home = self.spatial.in_defense_ring(enemy.position) && enemy.class.is_any(intercepts);
            if near_home && !in_range && !is_flagship && self.converged_on(unit, enemy, dist) {
                return None;
            }
            if in_range || near_home {
                if is_flagship {
                    *sticky = Some(enemy.id);
                }
                return Some(enemy);
            }
        }

        if is_flagship {
            *sticky = None;
        }
        None
    }

    /// Hunter target choice: enemy traders first, then strike craft.
    fn hunt(&self, unit: &Unit) -> Option<&'a Unit> {
        let combat = &self.config.combat;
        let mut best: Option<(&'a Unit, (u8, Fixed))> = None;

        for &enemy in &self.assets.foreign {
            let is_trader = enemy.class.is(ClassRole::TRADER);
            if !is_trader && !enemy.class.is_any(STRIKE) {
                continue;
            }

            let dist = self.distance(unit, enemy);
            if enemy.class.is(ClassRole::LIGHT_COMBAT) && dist < combat.engagement_range {
                return Some(enemy);
            }
            if is_trader && self.is_guarded(enemy) {
                continue;
            }
            if self.converged_on(unit, enemy, dist) {
                continue;
            }

            let key = (u8::from(!is_trader), dist);
            if best.map_or(true, |(_, best_key)| key < best_key) {
                best = Some((enemy, key));
            }
        }

        best.map(|(enemy, _)| enemy)
    }

    /// Whether enemy strike craft escort a unit.
    fn is_guarded(&self, enemy: &Unit) -> bool {
        let radius = self.config.combat.reposition_radius;
        self.assets
            .foreign_with(STRIKE)
            .any(|guard| guard.id != enemy.id && self.distance(guard, enemy) < radius)
    }

    /// Whether enough of our other combat units are already closer to a
    /// light-combat `enemy` than this unit is.
    fn converged_on(&self, unit: &Unit, enemy: &Unit, dist: Fixed) -> bool {
        if !enemy.class.is(ClassRole::LIGHT_COMBAT) {
            return false;
        }
        let closer = self
            .assets
            .combatants
            .iter()
            .filter(|ally| ally.id != unit.id && self.distance(ally, enemy) < dist)
            .count();
        if closer >= self.config.combat.overkill_limit {
            tracing::trace!(unit = unit.id, target = enemy.id, closer, "Enough allies converging");
            return true;
        }
        false
    }

    /// Centroid of threats that make approaching `target` unsafe.
    ///
    /// The radius grows as the unit loses health. Attacking a trader,
    /// enemy strike craft count at the full radius and capital units at
    /// half of it; attacking strike craft, only capital units count.
    fn secondary_threat(&self, unit: &Unit, target: &Unit) -> Result<Option<Vec2Fixed>> {
        let stats = self.config.classes.require(unit.class)?;
        let health = stats
            .health_fraction(unit.life)
            .clamp(Fixed::ZERO, Fixed::from_num(1));
        let radius = self
            .config
            .combat
            .reposition_radius
            .saturating_mul(Fixed::from_num(2) - health);
        let half = radius / Fixed::from_num(2);
        let capital = ClassRole::FLAGSHIP.union(ClassRole::STATIONARY);

        let counts_strike = target.class.is(ClassRole::TRADER);
        if !counts_strike && !target.class.is_any(STRIKE) {
            return Ok(None);
        }

        let threats = self.assets.foreign.iter().filter(|enemy| {
            let dist = enemy.position.distance(unit.position);
            (counts_strike && enemy.class.is_any(STRIKE) && dist < radius)
                || (enemy.class.is_any(capital) && dist < half)
        });
        Ok(Vec2Fixed::mean(threats.map(|enemy| enemy.position)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::PlayerAccount;
    use crate::unit_class::UnitClass;

    fn at(id: UnitId, owner: u64, class: UnitClass, x: i64, y: i64) -> Unit {
        let life = crate::unit_class::ClassCatalog::default()
            .get(class)
            .map_or(100, |stats| stats.life);
        Unit::new(id, owner, class, Vec2Fixed::from_grid(x, y), life)
    }

    fn world() -> WorldSnapshot {
        WorldSnapshot::new(1, 1)
            .with_player(PlayerAccount::new(1, "us", 0, 0))
            .with_player(PlayerAccount::new(2, "raiders", 0, 0))
    }

    fn run(snapshot: &WorldSnapshot, sticky: Option<UnitId>) -> (CommandBatch, EngagementReport) {
        run_with(&EngineConfig::default(), snapshot, sticky)
    }

    fn hunting() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.combat.hunting = true;
        config
    }

    fn run_with(
        config: &EngineConfig,
        snapshot: &WorldSnapshot,
        sticky: Option<UnitId>,
    ) -> (CommandBatch, EngagementReport) {
        let assets = Assets::classify(snapshot, config).unwrap();
        let spatial = SpatialContext::compute(&assets, sticky, &config.spatial);
        let selector = EngagementSelector::new(snapshot, &assets, &spatial, config);
        let mut batch = CommandBatch::new();
        let report = selector.run(sticky, &mut batch).unwrap();
        (batch, report)
    }

    #[test]
    fn test_flagship_acquires_adjacent_strike_craft() {
        let snapshot = world()
            .with_unit(at(1, 1, UnitClass::Flagship, 0, 0))
            .with_unit(at(20, 2, UnitClass::Fighter, 10, 0))
            .with_unit(at(21, 2, UnitClass::Bomber, 15, 0));
        let (batch, report) = run(&snapshot, None);

        // The bomber outranks the nearer fighter.
        assert_eq!(report.sticky_target, Some(21));
        assert_eq!(batch.get(1), Some(&Command::Attack { target: 21 }));
        assert_eq!(report.state(1), EngagementState::Engaged(21));
    }

    #[test]
    fn test_sticky_target_survives_a_closer_enemy() {
        let snapshot = world()
            .with_unit(at(1, 1, UnitClass::Flagship, 0, 0))
            .with_unit(at(20, 2, UnitClass::Fighter, 5, 0))
            .with_unit(at(21, 2, UnitClass::Fighter, 15, 0));
        let (batch, report) = run(&snapshot, Some(21));
        assert_eq!(report.sticky_target, Some(21));
        assert_eq!(batch.get(1), Some(&Command::Attack { target: 21 }));
    }

    #[test]
    fn test_flagship_regroups_and_forgets_when_nothing_qualifies() {
        let snapshot = world()
            .with_unit(at(1, 1, UnitClass::Flagship, 0, 0))
            .with_unit(at(2, 1, UnitClass::LightTrader, 40, 0))
            .with_unit(at(20, 2, UnitClass::LightTrader, 1000, 0));
        let (batch, report) = run(&snapshot, None);
        assert_eq!(report.sticky_target, None);
        assert_eq!(
            batch.get(1),
            Some(&Command::move_to(Vec2Fixed::from_grid(40, 0)))
        );
        assert_eq!(report.state(1), EngagementState::Unengaged);
    }

    #[test]
    fn test_defender_intercepts_traders_near_home_but_flagship_does_not() {
        let snapshot = world()
            .with_unit(at(1, 1, UnitClass::Flagship, 0, 0))
            .with_unit(at(2, 1, UnitClass::LightTrader, 0, 0))
            .with_unit(at(3, 1, UnitClass::Fighter, 0, 0).with_name("defender_3"))
            .with_unit(at(20, 2, UnitClass::LightTrader, 100, 0));
        let (batch, report) = run(&snapshot, None);

        assert_eq!(batch.get(3), Some(&Command::Attack { target: 20 }));
        assert_eq!(report.state(3), EngagementState::Pursuing(20));
        assert_eq!(batch.get(1), Some(&Command::move_to(Vec2Fixed::ZERO)));
        assert_eq!(report.sticky_target, None);
    }

    #[test]
    fn test_fighters_stay_home_by_default() {
        let snapshot = world()
            .with_unit(at(2, 1, UnitClass::LightTrader, 0, 0))
            .with_unit(at(3, 1, UnitClass::Fighter, 0, 0))
            .with_unit(at(20, 2, UnitClass::LightTrader, 1000, 0));
        let (batch, report) = run(&snapshot, None);
        assert_eq!(batch.get(3), Some(&Command::move_to(Vec2Fixed::ZERO)));
        assert_eq!(report.state(3), EngagementState::Unengaged);
    }

    #[test]
    fn test_defenders_do_not_pile_on_light_incursions() {
        let snapshot = world()
            .with_unit(at(2, 1, UnitClass::LightTrader, 0, 0))
            .with_unit(at(3, 1, UnitClass::Fighter, 90, 0))
            .with_unit(at(4, 1, UnitClass::Fighter, 85, 0))
            .with_unit(at(5, 1, UnitClass::Fighter, 70, 0))
            .with_unit(at(20, 2, UnitClass::Fighter, 100, 0));
        let (batch, report) = run(&snapshot, None);

        assert_eq!(batch.get(3), Some(&Command::Attack { target: 20 }));
        assert_eq!(batch.get(4), Some(&Command::Attack { target: 20 }));
        assert_eq!(report.state(4), EngagementState::Engaged(20));
        // Fighters 3 and 4 are already closer.
        assert_eq!(batch.get(5), Some(&Command::move_to(Vec2Fixed::ZERO)));
        assert_eq!(report.state(5), EngagementState::Unengaged);
    }

    #[test]
    fn test_hunter_prefers_unguarded_traders() {
        let snapshot = world()
            .with_unit(at(3, 1, UnitClass::Fighter, 0, 0))
            .with_unit(at(20, 2, UnitClass::LightTrader, 500, 0))
            .with_unit(at(21, 2, UnitClass::Fighter, 520, 0))
            .with_unit(at(22, 2, UnitClass::HeavyTrader, -900, 0));
        let (batch, report) = run_with(&hunting(), &snapshot, None);
        // Trader 20 is escorted; the far trader is not.
        assert_eq!(batch.get(3), Some(&Command::Attack { target: 22 }));
        assert_eq!(report.state(3), EngagementState::Pursuing(22));
    }

    #[test]
    fn test_hunters_do_not_pile_on_strike_craft() {
        let snapshot = world()
            .with_unit(at(2, 1, UnitClass::LightTrader, 0, 0))
            .with_unit(at(3, 1, UnitClass::Fighter, 300, 0))
            .with_unit(at(4, 1, UnitClass::Fighter, 290, 0))
            .with_unit(at(5, 1, UnitClass::Fighter, 280, 0))
            .with_unit(at(6, 1, UnitClass::Fighter, 0, 0))
            .with_unit(at(21, 2, UnitClass::Fighter, 400, 0));
        let (batch, report) = run_with(&hunting(), &snapshot, None);
        assert_eq!(batch.get(3), Some(&Command::Attack { target: 21 }));
        assert_eq!(batch.get(4), Some(&Command::Attack { target: 21 }));
        // Two allies are already closer than these two, so they regroup.
        assert_eq!(batch.get(5), Some(&Command::move_to(Vec2Fixed::ZERO)));
        assert_eq!(batch.get(6), Some(&Command::move_to(Vec2Fixed::ZERO)));
        assert_eq!(report.state(6), EngagementState::Unengaged);
    }

    #[test]
    fn test_damaged_unit_sidesteps_an_escort() {
        let mut hurt = at(3, 1, UnitClass::Fighter, 0, 0).with_name("defender_3");
        hurt.life = 50;
        let snapshot = world()
            .with_unit(at(2, 1, UnitClass::LightTrader, 0, 0))
            .with_unit(hurt)
            .with_unit(at(20, 2, UnitClass::LightTrader, 100, 0))
            .with_unit(at(21, 2, UnitClass::Flagship, 150, 20));
        let (batch, report) = run(&snapshot, None);

        assert!(matches!(report.state(3), EngagementState::Fleeing(_)));
        assert!(matches!(batch.get(3), Some(Command::Move { .. })));
    }

    #[test]
    fn test_flagship_never_sidesteps() {
        let snapshot = world()
            .with_unit(at(1, 1, UnitClass::Flagship, 0, 0))
            .with_unit(at(20, 2, UnitClass::Fighter, 10, 0))
            .with_unit(at(21, 2, UnitClass::ProductionNode, 30, 0));
        let (batch, _) = run(&snapshot, None);
        assert_eq!(batch.get(1), Some(&Command::Attack { target: 20 }));
    }
}
