//! Repair, stall recovery and home-defender designation.
//!
//! These run after trade and engagement and may overwrite the commands
//! those passes chose.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::classify::Assets;
use crate::command::{Command, CommandBatch};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::math::Vec2Fixed;
use crate::memory::EngineMemory;
use crate::snapshot::{Unit, UnitId, WorldSnapshot};
use crate::unit_class::{ClassRole, UnitClass};

/// Issue repairs for damaged units, overwriting earlier commands.
///
/// Each repair is paid from a running budget so one tick never commits more
/// repairs than we can afford. Returns the repaired unit ids.
pub fn plan_repairs(
    snapshot: &WorldSnapshot,
    assets: &Assets<'_>,
    config: &EngineConfig,
    batch: &mut CommandBatch,
) -> Result<Vec<UnitId>> {
    let maintenance = &config.maintenance;
    let mut budget = assets.me.net_worth.money;
    let mut repaired = Vec::new();

    let mut repair = |unit: &Unit, threshold: i64, batch: &mut CommandBatch| -> Result<()> {
        let stats = config.classes.require(unit.class)?;
        if stats.life_deficit(unit.life) >= threshold && budget >= stats.repair_price {
            budget -= stats.repair_price;
            batch.insert(unit.id, Command::Repair);
            repaired.push(unit.id);
            tracing::debug!(unit = unit.id, life = unit.life, "Repairing");
        }
        Ok(())
    };

    for &unit in &assets.combatants {
        let stats = config.classes.require(unit.class)?;
        if assets.is_flagship(unit.id) {
            repair(unit, stats.repair_life.saturating_mul(maintenance.flagship_repair_multiple), batch)?;
        } else if attacking_non_capital(snapshot, batch, unit.id) {
            repair(unit, stats.repair_life, batch)?;
        }
    }

    if assets.combatants.is_empty() && assets.traders.len() > maintenance.trader_repair_fleet_threshold {
        for &unit in &assets.traders {
            if matches!(batch.get(unit.id), Some(Command::Move { .. })) {
                let threshold = config.classes.require(unit.class)?.repair_life;
                repair(unit, threshold, batch)?;
            }
        }
    }

    Ok(repaired)
}

/// Whether this tick's command for `unit` attacks something other than a flagship.
fn attacking_non_capital(snapshot: &WorldSnapshot, batch: &CommandBatch, unit: UnitId) -> bool {
    match batch.get(unit) {
        Some(Command::Attack { target }) => snapshot
            .unit(*target)
            .is_some_and(|target| !target.class.is(ClassRole::FLAGSHIP)),
        _ => false,
    }
}

/// Send traders that have not moved for a full history back to the origin.
///
/// Reads the history from before this tick; recording happens separately.
pub fn unstick_traders(assets: &Assets<'_>, memory: &EngineMemory, batch: &mut CommandBatch) -> Vec<UnitId> {
    let mut stuck = Vec::new();
    for &trader in &assets.traders {
        let stalled = memory
            .positions
            .get(&trader.id)
            .is_some_and(|history| history.is_stalled_at(trader.position));
        if stalled {
            tracing::debug!(unit = trader.id, "Trader stalled, heading to origin");
            batch.insert(trader.id, Command::move_to(Vec2Fixed::ZERO));
            stuck.push(trader.id);
        }
    }
    stuck
}

/// Record every trader's position and forget units we no longer own.
pub fn record_positions(assets: &Assets<'_>, memory: &mut EngineMemory, config: &EngineConfig) {
    let capacity = config.maintenance.history_len;
    for &trader in &assets.traders {
        memory.record_position(trader.id, trader.position, capacity);
    }
    memory.retain_units(|id| assets.traders.iter().any(|trader| trader.id == id));
}

/// Name one light strike craft as the home defender if none is named.
pub fn designate_defender<R>(
    assets: &Assets<'_>,
    config: &EngineConfig,
    rng: &mut R,
    batch: &mut CommandBatch,
) -> Option<UnitId>
where
    R: Rng + ?Sized,
{
    let prefix = &config.combat.defender_prefix;
    let (defenders, candidates): (Vec<&Unit>, Vec<&Unit>) = assets
        .strike_craft
        .iter()
        .copied()
        .filter(|unit| unit.class == UnitClass::Fighter)
        .partition(|unit| unit.name.starts_with(prefix.as_str()));

    if !defenders.is_empty() {
        return None;
    }
    let chosen = candidates.choose(rng)?;
    let name = format!("{prefix}{}", chosen.id);
    tracing::info!(unit = chosen.id, %name, "Designating home defender");
    batch.insert(chosen.id, Command::Rename { name });
    Some(chosen.id)
}
