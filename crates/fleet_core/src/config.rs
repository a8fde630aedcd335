//! Tunable engine configuration.
//!
//! Several thresholds moved between revisions of the strategy without a
//! recorded rationale, so every one of them lives here rather than in the
//! policies. Defaults reproduce the standard tuning; any subset can be
//! overridden from a RON document, missing fields keep their defaults.
//!
//! # Example RON
//!
//! ```ron
//! (
//!     allied_players: ["ducks"],
//!     trade: (avoid_radius: 75.0),
//!     spatial: (defense_radius_multiplier: 2.2),
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::math::{fixed_serde, Fixed};
use crate::unit_class::{ClassCatalog, UnitClass};

/// Trade planner tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    /// Traders flee from dangerous units within this radius.
    #[serde(with = "fixed_serde")]
    pub avoid_radius: Fixed,
    /// Trade nodes with a node-threat unit within this radius are skipped.
    #[serde(with = "fixed_serde")]
    pub node_avoid_radius: Fixed,
    /// Sell nodes considered for a buy node must lie within this radius.
    #[serde(with = "fixed_serde")]
    pub locality_radius: Fixed,
    /// Gain multiplier used instead of dividing by a zero distance.
    #[serde(with = "fixed_serde")]
    pub zero_distance_multiplier: Fixed,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            avoid_radius: Fixed::from_num(100),
            node_avoid_radius: Fixed::from_num(200),
            locality_radius: Fixed::from_num(400),
            zero_distance_multiplier: Fixed::from_num(1000),
        }
    }
}

/// Spatial aggregate tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Smallest defense radius.
    #[serde(with = "fixed_serde")]
    pub defense_radius_floor: Fixed,
    /// Defense radius as a multiple of the furthest trader's distance.
    #[serde(with = "fixed_serde")]
    pub defense_radius_multiplier: Fixed,
    /// Distance subtracted from the sticky target when ranking enemies.
    #[serde(with = "fixed_serde")]
    pub sticky_bonus: Fixed,
    /// Distance added to enemy flagships when ranking enemies.
    #[serde(with = "fixed_serde")]
    pub flagship_penalty: Fixed,
    /// Numerator of the center-distance cost (`scale / distance`).
    #[serde(with = "fixed_serde")]
    pub center_cost_scale: Fixed,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            defense_radius_floor: Fixed::from_num(150),
            defense_radius_multiplier: Fixed::from_num(2.5),
            sticky_bonus: Fixed::from_num(25),
            flagship_penalty: Fixed::from_num(25),
            center_cost_scale: Fixed::from_num(500),
        }
    }
}

/// Flee-vector composition weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Length of a flee or reposition move.
    #[serde(with = "fixed_serde")]
    pub step: Fixed,
    /// Pull toward our flagship.
    #[serde(with = "fixed_serde")]
    pub flagship_weight: Fixed,
    /// Pull toward (protected) or push away from (unprotected) the fleet centroid.
    #[serde(with = "fixed_serde")]
    pub centroid_weight: Fixed,
    /// Pull toward (protected) or push away from (unprotected) the map origin.
    #[serde(with = "fixed_serde")]
    pub map_center_weight: Fixed,
    /// Weight of the escape direction when blending a lateral sidestep.
    #[serde(with = "fixed_serde")]
    pub lateral_weight: Fixed,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            step: Fixed::from_num(100),
            flagship_weight: Fixed::from_num(0.75),
            centroid_weight: Fixed::from_num(0.5),
            map_center_weight: Fixed::from_num(0.3),
            lateral_weight: Fixed::from_num(0.5),
        }
    }
}

/// Engagement selector tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// The flagship adopts new sticky targets within this radius.
    #[serde(with = "fixed_serde")]
    pub acquisition_radius: Fixed,
    /// Targets within this distance are attacked immediately.
    #[serde(with = "fixed_serde")]
    pub engagement_range: Fixed,
    /// Radius of the secondary-threat check before committing to an attack.
    #[serde(with = "fixed_serde")]
    pub reposition_radius: Fixed,
    /// Distance looked ahead toward the target to see whether it nears the threat.
    #[serde(with = "fixed_serde")]
    pub approach_lookahead: Fixed,
    /// Let strike craft other than the home defender pursue targets outside the ring.
    ///
    /// Off by default: every combat unit then stays inside the defense ring.
    pub hunting: bool,
    /// Pursuit of a light-combat target stops once this many allies are closer.
    pub overkill_limit: usize,
    /// Name prefix marking the designated home defender.
    pub defender_prefix: String,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            acquisition_radius: Fixed::from_num(20),
            engagement_range: Fixed::from_num(20),
            reposition_radius: Fixed::from_num(200),
            approach_lookahead: Fixed::from_num(15),
            hunting: false,
            overkill_limit: 2,
            defender_prefix: "defender_".to_string(),
        }
    }
}

/// Acquisition policy tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Minimum reserve while foreign units are visible.
    pub reserve_floor: i64,
    /// Net worth below which no extra reserve accrues.
    pub reserve_net_worth_offset: i64,
    /// Divisor applied to net worth above the offset.
    pub reserve_net_worth_divisor: i64,
    /// Reserve per trader while no foreign units are visible.
    pub reserve_per_trader: i64,
    /// One combat unit is wanted per this many traders (plus one).
    pub traders_per_fighter: usize,
    /// Net worth at which the wealthy trader class is bought.
    pub wealthy_threshold: i64,
    /// Combat class bought while threatened.
    pub combat_class: UnitClass,
    /// Trader class bought below the wealth threshold.
    pub starter_trader: UnitClass,
    /// Trader class bought at or above the wealth threshold.
    pub wealthy_trader: UnitClass,
    /// Only construct on odd ticks, so a construct already in flight is not doubled.
    pub odd_ticks_only: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            reserve_floor: 1_000_000,
            reserve_net_worth_offset: 2_000_000,
            reserve_net_worth_divisor: 10,
            reserve_per_trader: 5_000,
            traders_per_fighter: 25,
            wealthy_threshold: 5_000_000,
            combat_class: UnitClass::Fighter,
            starter_trader: UnitClass::LightTrader,
            wealthy_trader: UnitClass::HeavyTrader,
            odd_ticks_only: true,
        }
    }
}

/// Repair and stuck-detection tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Length of the per-trader position history.
    pub history_len: usize,
    /// The flagship repairs once its deficit reaches this many repair amounts.
    pub flagship_repair_multiple: i64,
    /// Fleeing traders repair when there are no combat units and more traders than this.
    pub trader_repair_fleet_threshold: usize,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            history_len: 10,
            flagship_repair_multiple: 2,
            trader_repair_fleet_threshold: 8,
        }
    }
}

/// End-of-season objective and formation tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VictoryConfig {
    /// Whether the objective-met behavior is enabled at all.
    pub enabled: bool,
    /// Ticks in a season.
    pub season_length: u64,
    /// The objective can only be met at or after this tick.
    pub tick_floor: u64,
    /// Class the flagship keeps constructing during the formation.
    pub formation_build: UnitClass,
    /// Base ring radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Heart-shape amplitude.
    #[serde(with = "fixed_serde")]
    pub curvature: Fixed,
    /// Ring spin per tick, in half-turns.
    #[serde(with = "fixed_serde")]
    pub spin_speed: Fixed,
    /// Pulse frequency per tick, in half-turns.
    #[serde(with = "fixed_serde")]
    pub pulse_speed: Fixed,
    /// Pulse amplitude.
    #[serde(with = "fixed_serde")]
    pub pulse_amount: Fixed,
    /// Rotation wobble amplitude, in radians.
    #[serde(with = "fixed_serde")]
    pub rotation_amount: Fixed,
}

impl Default for VictoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            season_length: 3600,
            tick_floor: 3450,
            formation_build: UnitClass::LightTrader,
            radius: Fixed::from_num(150),
            curvature: Fixed::from_num(50),
            spin_speed: Fixed::from_num(0.005),
            pulse_speed: Fixed::from_num(0.2),
            pulse_amount: Fixed::from_num(7.5),
            rotation_amount: Fixed::from_num(0.1),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Display names of players whose units are treated as friendly.
    pub allied_players: Vec<String>,
    /// Static per-class attributes.
    pub classes: ClassCatalog,
    /// Trade planner tuning.
    pub trade: TradeConfig,
    /// Spatial aggregate tuning.
    pub spatial: SpatialConfig,
    /// Steering weights.
    pub steering: SteeringConfig,
    /// Engagement tuning.
    pub combat: CombatConfig,
    /// Acquisition tuning.
    pub acquisition: AcquisitionConfig,
    /// Repair and stuck-detection tuning.
    pub maintenance: MaintenanceConfig,
    /// Objective-met behavior.
    pub victory: VictoryConfig,
}

impl EngineConfig {
    /// Parse a RON document and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<()> {
        if let Some(&class) = self.classes.missing().first() {
            return Err(EngineError::UnknownClass(class));
        }
        if self.acquisition.reserve_net_worth_divisor <= 0 {
            return Err(EngineError::ConfigParse(
                "acquisition.reserve_net_worth_divisor must be positive".to_string(),
            ));
        }
        if self.acquisition.traders_per_fighter == 0 {
            return Err(EngineError::ConfigParse(
                "acquisition.traders_per_fighter must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a player display name is allied.
    #[must_use]
    pub fn is_allied(&self, name: &str) -> bool {
        self.allied_players.iter().any(|allied| allied == name)
    }
}
