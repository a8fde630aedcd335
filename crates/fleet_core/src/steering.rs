//! Threat avoidance steering.
//!
//! Traders fleeing a threat and combat units sidestepping a secondary
//! threat both start from the unit vector pointing from the threat centroid
//! to the unit, then blend in biases and re-normalize after each step. The
//! resulting destination is the unit's position plus the direction scaled
//! by a fixed step.

use crate::classify::Assets;
use crate::config::SteeringConfig;
use crate::math::Vec2Fixed;
use crate::spatial::SpatialContext;

/// What a fleeing unit can fall back on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Our flagship is alive at this position.
    Flagship(Vec2Fixed),
    /// No flagship, but strike craft escort the fleet around this centroid.
    Escort(Vec2Fixed),
    /// Nothing armed. The fleet centroid, if any, is where others are.
    Exposed(Option<Vec2Fixed>),
}

impl Protection {
    /// Determine what protection the fleet currently has.
    #[must_use]
    pub fn assess(assets: &Assets<'_>, spatial: &SpatialContext) -> Self {
        if let Some(flagship) = assets.flagship {
            return Self::Flagship(flagship.position);
        }
        if !assets.strike_craft.is_empty() {
            return Self::Escort(spatial.centroid());
        }
        Self::Exposed(spatial.fleet_centroid)
    }

    /// The position trade routes should stay close to, if any.
    #[must_use]
    pub fn anchor(self) -> Option<Vec2Fixed> {
        match self {
            Self::Flagship(anchor) | Self::Escort(anchor) => Some(anchor),
            Self::Exposed(_) => None,
        }
    }

    /// Whether any armed unit can come to the rescue.
    #[must_use]
    pub const fn is_protected(self) -> bool {
        !matches!(self, Self::Exposed(_))
    }
}

/// Direction for a unit at `position` fleeing `threat`.
///
/// Protected units are pulled toward their anchor and the map origin to
/// regroup. Exposed units are pushed away from the other traders and from
/// the origin, scattering pursuers.
#[must_use]
pub fn flee_direction(
    position: Vec2Fixed,
    threat: Vec2Fixed,
    protection: Protection,
    config: &SteeringConfig,
) -> Vec2Fixed {
    let mut direction = (position - threat).normalize();

    direction = match protection {
        Protection::Flagship(anchor) => {
            direction.blend((anchor - position).normalize(), config.flagship_weight)
        }
        Protection::Escort(anchor) => {
            direction.blend((anchor - position).normalize(), config.centroid_weight)
        }
        Protection::Exposed(Some(centroid)) => {
            direction.blend((position - centroid).normalize(), config.centroid_weight)
        }
        Protection::Exposed(None) => direction,
    };

    let outward = position.normalize();
    if protection.is_protected() {
        direction.blend(-outward, config.map_center_weight)
    } else {
        direction.blend(outward, config.map_center_weight)
    }
}

/// Where a unit at `position` should move to flee `threat`.
#[must_use]
pub fn flee_destination(
    position: Vec2Fixed,
    threat: Vec2Fixed,
    protection: Protection,
    config: &SteeringConfig,
) -> Vec2Fixed {
    position + flee_direction(position, threat, protection, config).scale(config.step)
}

/// Sidestep direction for a combat unit approaching a target past a threat.
///
/// Without a target this is a plain retreat. With one, the unit turns a
/// quarter away from the threat on whichever side the target lies, keeping
/// part of the retreat component.
#[must_use]
pub fn lateral_direction(
    position: Vec2Fixed,
    threat: Vec2Fixed,
    toward_target: Option<Vec2Fixed>,
    config: &SteeringConfig,
) -> Vec2Fixed {
    let away = (position - threat).normalize();
    let Some(toward) = toward_target else {
        return away;
    };

    let left = away.perpendicular();
    let right = -left;
    let bias = toward.scale(config.lateral_weight);
    let side = if (left + bias).length() > (right + bias).length() {
        left
    } else {
        right
    };
    side.blend(away, config.lateral_weight)
}

/// Where a combat unit should move to sidestep `threat`.
#[must_use]
pub fn reposition_destination(
    position: Vec2Fixed,
    threat: Vec2Fixed,
    toward_target: Option<Vec2Fixed>,
    config: &SteeringConfig,
) -> Vec2Fixed {
    position + lateral_direction(position, threat, toward_target, config).scale(config.step)
}
