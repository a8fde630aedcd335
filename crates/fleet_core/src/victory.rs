//! End-of-season objective check and formation flying.
//!
//! Once no foreign units remain, the season is nearly over, and no rival can
//! catch up at their current rate, trading and fighting stop. The flagship
//! keeps building light traders and every other unit flies a pulsing,
//! slowly spinning heart-shaped ring around the origin.

use crate::classify::Assets;
use crate::command::{Command, CommandBatch};
use crate::config::{EngineConfig, VictoryConfig};
use crate::error::Result;
use crate::math::{fixed_cos, fixed_sin, pi, wrap_angle, Fixed, Vec2Fixed};
use crate::snapshot::WorldSnapshot;
use crate::unit_class::ClassRole;

/// Whether the season objective has been met.
///
/// Each rival's net worth is projected linearly to the end of the season;
/// the objective holds when no projected gain exceeds half our lead.
#[must_use]
pub fn objective_met(snapshot: &WorldSnapshot, assets: &Assets<'_>, config: &VictoryConfig) -> bool {
    if !config.enabled || !assets.foreign.is_empty() {
        return false;
    }
    let tick = snapshot.tick;
    if tick < config.tick_floor || tick == 0 {
        return false;
    }

    let remaining = i128::from(config.season_length.saturating_sub(tick));
    let elapsed = i128::from(tick);
    let ours = i128::from(assets.me.net_worth.total);

    snapshot.rivals().all(|rival| {
        let theirs = i128::from(rival.net_worth.total);
        // (theirs / elapsed) * remaining <= (ours - theirs) / 2
        theirs * remaining * 2 <= (ours - theirs) * elapsed
    })
}

/// Position of slot `index` out of `count` in the formation at `tick`.
#[must_use]
pub fn formation_slot(tick: u64, index: usize, count: usize, config: &VictoryConfig) -> Vec2Fixed {
    let pi = pi();
    let tick = Fixed::from_num(tick);
    let pulse = fixed_sin(pi * tick.saturating_mul(config.pulse_speed)).saturating_mul(config.pulse_amount);
    let rotation_speed = config.pulse_speed / Fixed::from_num(2);
    let rotation = fixed_sin(pi * tick.saturating_mul(rotation_speed)).saturating_mul(config.rotation_amount);

    let share = if count == 0 {
        Fixed::ZERO
    } else {
        Fixed::from_num(index) / Fixed::from_num(count)
    };
    let ring = pi * tick.saturating_mul(config.spin_speed) + pi * Fixed::from_num(2) * share;

    let turned = ring + rotation;
    let wave = if wrap_angle(turned) < pi {
        fixed_sin(-turned * Fixed::from_num(2))
    } else {
        fixed_sin(turned * Fixed::from_num(2))
    };
    let heart = wave.saturating_mul(config.curvature);

    let radius = config.radius + heart + pulse;
    Vec2Fixed::new(fixed_sin(ring) * radius, fixed_cos(ring) * radius)
}

/// Issue formation commands for every unit we own.
///
/// Stationary units are left alone and do not take a slot.
pub fn fly_formation(
    snapshot: &WorldSnapshot,
    assets: &Assets<'_>,
    config: &EngineConfig,
    batch: &mut CommandBatch,
) -> Result<()> {
    let victory = &config.victory;
    let dancers: Vec<_> = assets
        .owned
        .iter()
        .copied()
        .filter(|unit| !assets.is_flagship(unit.id) && !unit.class.is(ClassRole::STATIONARY))
        .collect();

    if let Some(flagship) = assets.flagship {
        let price = config.classes.require(victory.formation_build)?.price;
        let command = if assets.me.net_worth.money >= price {
            Command::Construct {
                class: victory.formation_build,
            }
        } else {
            Command::move_to(Vec2Fixed::ZERO)
        };
        batch.insert(flagship.id, command);
    }

    for (index, unit) in dancers.iter().enumerate() {
        let slot = formation_slot(snapshot.tick, index, dancers.len(), victory);
        batch.insert(unit.id, Command::move_to(slot));
    }

    tracing::info!(tick = snapshot.tick, dancers = dancers.len(), "Objective met, flying formation");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{PlayerAccount, Unit};
    use crate::unit_class::UnitClass;

    fn world(tick: u64, ours: i64, theirs: i64) -> WorldSnapshot {
        WorldSnapshot::new(1, tick)
            .with_player(PlayerAccount::new(1, "us", ours, ours))
            .with_player(PlayerAccount::new(2, "rival", theirs, theirs))
    }

    fn met(snapshot: &WorldSnapshot) -> bool {
        let config = EngineConfig::default();
        let assets = Assets::classify(snapshot, &config).unwrap();
        objective_met(snapshot, &assets, &config.victory)
    }

    #[test]
    fn test_objective_requires_late_tick_and_lead() {
        // Rival earns 1000/tick; 100 ticks left is 100_000 more, half our lead is 450_000.
        assert!(met(&world(3500, 4_400_000, 3_500_000)));
        assert!(!met(&world(3449, 100_000_000, 1)));
        // Lead too thin: 100_000 projected vs 50_000.
        assert!(!met(&world(3500, 3_600_000, 3_500_000)));
    }

    #[test]
    fn test_foreign_units_block_objective() {
        let snapshot = world(3500, 100_000_000, 1)
            .with_unit(Unit::new(9, 2, UnitClass::ProductionNode, Vec2Fixed::ZERO, 1000));
        assert!(!met(&snapshot));
    }

    #[test]
    fn test_formation_slot_geometry() {
        let config = VictoryConfig::default();
        // Tick 0: no pulse, no rotation, ring angle 0 → straight up the y axis.
        let first = formation_slot(0, 0, 4, &config);
        assert!(first.x.abs() < Fixed::from_num(0.1));
        assert!((first.y - Fixed::from_num(150)).abs() < Fixed::from_num(0.1));

        for index in 0..4 {
            let slot = formation_slot(1234, index, 4, &config);
            let dist = slot.length();
            // radius ± curvature ± pulse
            assert!(dist <= Fixed::from_num(208));
            assert!(dist >= Fixed::from_num(92));
        }
    }

    #[test]
    fn test_flagship_builds_and_others_dance() {
        let config = EngineConfig::default();
        let snapshot = world(3500, 1_000_000, 0)
            .with_unit(Unit::new(1, 1, UnitClass::Flagship, Vec2Fixed::ZERO, 1000))
            .with_unit(Unit::new(2, 1, UnitClass::LightTrader, Vec2Fixed::ZERO, 100))
            .with_unit(Unit::new(3, 1, UnitClass::Fighter, Vec2Fixed::ZERO, 200))
            .with_unit(Unit::new(4, 1, UnitClass::ProductionNode, Vec2Fixed::ZERO, 1000));
        let assets = Assets::classify(&snapshot, &config).unwrap();
        let mut batch = CommandBatch::new();
        fly_formation(&snapshot, &assets, &config, &mut batch).unwrap();

        assert_eq!(
            batch.get(1),
            Some(&Command::Construct {
                class: UnitClass::LightTrader
            })
        );
        assert!(matches!(batch.get(2), Some(Command::Move { .. })));
        assert!(matches!(batch.get(3), Some(Command::Move { .. })));
        assert_eq!(batch.get(4), None);
        assert_ne!(batch.get(2), batch.get(3));
    }
}
