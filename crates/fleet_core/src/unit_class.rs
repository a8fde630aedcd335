//! Unit classes, role flags and the static per-class attribute catalog.
//!
//! This module is the single source of truth for "what kind of unit is
//! this and how should the engine treat it":
//! - [`UnitClass`]: The closed set of unit classes in the game
//! - [`ClassRole`]: Bitflags for fast classification queries
//! - [`ThreatTier`]: Ordered target priority used by the engagement rules
//! - [`ClassCatalog`]: Static attributes (capacity, price, life, repair)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// The class of a unit.
///
/// The game identifies classes by small numeric codes; see
/// [`UnitClass::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    /// The unique mothership: combat anchor and shipyard.
    Flagship,
    /// High-capacity cargo hauler.
    HeavyTrader,
    /// Cheap, low-capacity cargo shipper.
    LightTrader,
    /// Light combat unit.
    Fighter,
    /// Heavy combat unit.
    Bomber,
    /// Stationary shipyard.
    ProductionNode,
}

impl UnitClass {
    /// Every class, in code order.
    pub const ALL: [Self; 6] = [
        Self::Flagship,
        Self::HeavyTrader,
        Self::LightTrader,
        Self::Fighter,
        Self::Bomber,
        Self::ProductionNode,
    ];

    /// Map a numeric game code to a class.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Flagship),
            2 => Some(Self::HeavyTrader),
            3 => Some(Self::LightTrader),
            4 => Some(Self::Fighter),
            5 => Some(Self::Bomber),
            6 => Some(Self::ProductionNode),
            _ => None,
        }
    }

    /// The numeric game code of this class.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Flagship => 1,
            Self::HeavyTrader => 2,
            Self::LightTrader => 3,
            Self::Fighter => 4,
            Self::Bomber => 5,
            Self::ProductionNode => 6,
        }
    }

    /// Role flags for this class. O(1).
    #[must_use]
    pub const fn role(self) -> ClassRole {
        match self {
            Self::Flagship => ClassRole::FLAGSHIP
                .union(ClassRole::COMBATANT)
                .union(ClassRole::DANGEROUS)
                .union(ClassRole::NODE_THREAT),
            Self::HeavyTrader | Self::LightTrader => ClassRole::TRADER,
            Self::Fighter => ClassRole::COMBATANT
                .union(ClassRole::DANGEROUS)
                .union(ClassRole::NODE_THREAT)
                .union(ClassRole::LIGHT_COMBAT),
            Self::Bomber => ClassRole::COMBATANT
                .union(ClassRole::DANGEROUS)
                .union(ClassRole::NODE_THREAT)
                .union(ClassRole::HEAVY_COMBAT),
            Self::ProductionNode => ClassRole::NODE_THREAT.union(ClassRole::STATIONARY),
        }
    }

    /// Shorthand for `self.role().contains(role)`.
    #[inline]
    #[must_use]
    pub const fn is(self, role: ClassRole) -> bool {
        self.role().contains(role)
    }

    /// Shorthand for `self.role().intersects(roles)`.
    #[inline]
    #[must_use]
    pub const fn is_any(self, roles: ClassRole) -> bool {
        self.role().intersects(roles)
    }

    /// Target priority tier used when choosing between enemies.
    #[must_use]
    pub const fn threat_tier(self) -> ThreatTier {
        match self {
            Self::ProductionNode => ThreatTier::Passive,
            Self::HeavyTrader | Self::LightTrader => ThreatTier::Economic,
            Self::Flagship => ThreatTier::Capital,
            Self::Fighter | Self::Bomber => ThreatTier::Strike,
        }
    }

    /// Whether a defensive candidate of class `self` should replace a current
    /// best of class `current` even if it is farther away.
    ///
    /// Only units inside the defense radius escalate: traders give way to any
    /// armed unit, and the flagship gives way to strike craft.
    #[must_use]
    pub fn escalates_over(self, current: Self) -> bool {
        let from = current.threat_tier();
        matches!(from, ThreatTier::Economic | ThreatTier::Capital) && self.threat_tier() > from
    }

    /// Whether the flagship's close-range scan should switch from a tracked
    /// class to this one. Heavy combat outranks light combat.
    #[must_use]
    pub fn outranks_in_melee(self, current: Self) -> bool {
        current.is(ClassRole::LIGHT_COMBAT) && self.is(ClassRole::HEAVY_COMBAT)
    }
}

/// Ordered target priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThreatTier {
    /// Stationary, unarmed (shipyards).
    Passive,
    /// Cargo carriers.
    Economic,
    /// The enemy mothership.
    Capital,
    /// Fighters and bombers.
    Strike,
}

/// Bitflags for fast class queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ClassRole(u16);

impl ClassRole {
    /// Carries and trades cargo.
    pub const TRADER: Self = Self(1 << 0);
    /// Can attack.
    pub const COMBATANT: Self = Self(1 << 1);
    /// The mothership.
    pub const FLAGSHIP: Self = Self(1 << 2);
    /// Traders flee from this class.
    pub const DANGEROUS: Self = Self(1 << 3);
    /// Trade nodes near this class are avoided.
    pub const NODE_THREAT: Self = Self(1 << 4);
    /// Light combat (fighters).
    pub const LIGHT_COMBAT: Self = Self(1 << 5);
    /// Heavy combat (bombers).
    pub const HEAVY_COMBAT: Self = Self(1 << 6);
    /// Never moves.
    pub const STATIONARY: Self = Self(1 << 7);

    /// Empty role (no flags set).
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Check if all flags in `other` are set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any flags in `other` are set in `self`.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Combine two roles (union of flags).
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for ClassRole {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// Static attributes of a unit class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStats {
    /// Display name.
    pub name: String,
    /// Total cargo the unit can hold.
    pub cargo_capacity: i64,
    /// Construction price.
    pub price: i64,
    /// Maximum life.
    pub life: i64,
    /// Cost of one repair.
    pub repair_price: i64,
    /// Life restored by one repair.
    pub repair_life: i64,
    /// Whether the unit can construct other units.
    #[serde(default)]
    pub production_node: bool,
}

impl ClassStats {
    /// Fraction of life remaining, in `[0, 1]` for sane inputs.
    #[must_use]
    pub fn health_fraction(&self, life: i64) -> crate::math::Fixed {
        use crate::math::Fixed;
        if self.life <= 0 {
            return Fixed::from_num(1);
        }
        Fixed::from_num(life) / Fixed::from_num(self.life)
    }

    /// Life missing compared to the class maximum.
    #[must_use]
    pub const fn life_deficit(&self, life: i64) -> i64 {
        self.life - life
    }
}

/// Catalog of static attributes, keyed by class.
///
/// The game publishes these once per season; the defaults mirror the
/// standard ruleset and can be overridden from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassCatalog {
    classes: BTreeMap<UnitClass, ClassStats>,
}

impl Default for ClassCatalog {
    fn default() -> Self {
        let entry = |name: &str, cargo, price, life, repair_price, repair_life, production| {
            ClassStats {
                name: name.to_string(),
                cargo_capacity: cargo,
                price,
                life,
                repair_price,
                repair_life,
                production_node: production,
            }
        };

        let classes = [
            (UnitClass::Flagship, entry("mothership", 0, 0, 1000, 150_000, 100, true)),
            (UnitClass::HeavyTrader, entry("hauler", 300, 1_000_000, 200, 100_000, 50, false)),
            (UnitClass::LightTrader, entry("shipper", 100, 500_000, 100, 50_000, 25, false)),
            (UnitClass::Fighter, entry("fighter", 0, 1_000_000, 200, 100_000, 50, false)),
            (UnitClass::Bomber, entry("bomber", 0, 1_500_000, 300, 150_000, 75, false)),
            (UnitClass::ProductionNode, entry("shipyard", 0, 10_000_000, 1000, 0, 0, true)),
        ]
        .into_iter()
        .collect();

        Self { classes }
    }
}

impl ClassCatalog {
    /// Create a catalog with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            classes: BTreeMap::new(),
        }
    }

    /// Insert or replace the stats for a class.
    pub fn insert(&mut self, class: UnitClass, stats: ClassStats) {
        self.classes.insert(class, stats);
    }

    /// Get stats for a class, if present.
    #[must_use]
    pub fn get(&self, class: UnitClass) -> Option<&ClassStats> {
        self.classes.get(&class)
    }

    /// Get stats for a class, failing with [`EngineError::UnknownClass`].
    pub fn require(&self, class: UnitClass) -> Result<&ClassStats> {
        self.get(class).ok_or(EngineError::UnknownClass(class))
    }

    /// Classes missing from the catalog.
    #[must_use]
    pub fn missing(&self) -> Vec<UnitClass> {
        UnitClass::ALL
            .into_iter()
            .filter(|class| !self.classes.contains_key(class))
            .collect()
    }
}
