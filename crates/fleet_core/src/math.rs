//! Fixed-point math utilities for deterministic decisions.
//!
//! Every distance, score and steering vector the engine computes goes
//! through fixed-point arithmetic, so the same snapshot yields the same
//! command batch on every platform. Floating-point only appears at the
//! serialization boundary.

use fixed::types::I48F16;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed-point number type for all engine math.
///
/// Uses 48 bits for the integer part and 16 bits for the fractional part.
/// Range: approximately -1.4e14 to 1.4e14 (net worth and price × amount
/// products fit comfortably).
/// Precision: approximately 0.000015, so ratios of large values are
/// compared by cross-multiplying rather than dividing.
pub type Fixed = I48F16;

/// Fixed-point 2D vector.
///
/// Serialized as an `[x, y]` pair of integers, matching the game grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Vec2Fixed {
    /// X coordinate.
    pub x: Fixed,
    /// Y coordinate.
    pub y: Fixed,
}

/// Serde support for fixed-point scalars in configuration files.
///
/// Serializes as a plain decimal so RON files stay hand-editable.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("{value} out of fixed-point range")))
    }
}

impl Serialize for Vec2Fixed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (x, y) = self.to_grid();
        [x, y].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Vec2Fixed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [x, y] = <[i64; 2]>::deserialize(deserializer)?;
        let coordinate = |value: i64| {
            Fixed::checked_from_num(value)
                .ok_or_else(|| serde::de::Error::custom(format!("coordinate {value} out of fixed-point range")))
        };
        Ok(Self::new(coordinate(x)?, coordinate(y)?))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector (also the map origin).
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Create a vector from integer grid coordinates.
    #[must_use]
    pub fn from_grid(x: i64, y: i64) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Round to the nearest integer grid coordinates.
    #[must_use]
    pub fn to_grid(self) -> (i64, i64) {
        (
            self.x.round().to_num::<i64>(),
            self.y.round().to_num::<i64>(),
        )
    }

    /// Whether both components are zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == Fixed::ZERO && self.y == Fixed::ZERO
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
    }

    /// Scale both components.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(
            self.x.saturating_mul(factor),
            self.y.saturating_mul(factor),
        )
    }

    /// Rotate a quarter turn counter-clockwise.
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Normalize vector using fixed-point math.
    ///
    /// The zero vector normalizes to itself.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Add `other * weight` and re-normalize.
    ///
    /// This is the building block of every steering blend.
    #[must_use]
    pub fn blend(self, other: Self, weight: Fixed) -> Self {
        (self + other.scale(weight)).normalize()
    }

    /// Mean of a set of points, or `None` when the set is empty.
    #[must_use]
    pub fn mean<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut sum = Self::ZERO;
        let mut count: i64 = 0;
        for point in points {
            sum = sum + point;
            count += 1;
        }

        if count == 0 {
            return None;
        }
        let n = Fixed::from_num(count);
        Some(Self::new(sum.x / n, sum.y / n))
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    // 48 integer + 16 fraction bits: 64 halvings always converge.
    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// π in engine precision.
#[must_use]
pub fn pi() -> Fixed {
    Fixed::from_num(std::f64::consts::PI)
}

/// Wrap an angle into `[0, 2π)`.
#[must_use]
pub fn wrap_angle(angle: Fixed) -> Fixed {
    let tau = pi() * Fixed::from_num(2);
    let turns = (angle / tau).floor();
    let wrapped = angle - turns * tau;
    if wrapped >= tau {
        wrapped - tau
    } else {
        wrapped
    }
}

/// Deterministic sine using range reduction and a Taylor polynomial.
#[must_use]
pub fn fixed_sin(angle: Fixed) -> Fixed {
    let pi = pi();
    let half_pi = pi / Fixed::from_num(2);

    // Reduce into [-π, π), then fold into [-π/2, π/2].
    let mut x = wrap_angle(angle);
    if x >= pi {
        x -= pi * Fixed::from_num(2);
    }
    if x > half_pi {
        x = pi - x;
    } else if x < -half_pi {
        x = -pi - x;
    }

    let x2 = x * x;
    let mut term = x;
    let mut sum = x;
    for k in 1..=6_i32 {
        let denom = Fixed::from_num((2 * k) * (2 * k + 1));
        term = -(term * x2) / denom;
        sum += term;
    }
    sum
}

/// Deterministic cosine, via `sin(x + π/2)`.
#[must_use]
pub fn fixed_cos(angle: Fixed) -> Fixed {
    fixed_sin(angle + pi() / Fixed::from_num(2))
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Fixed, b: Fixed) -> bool {
        (a - b).abs() < Fixed::from_num(1) / Fixed::from_num(1000)
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2Fixed::from_grid(3, 0);
        let b = Vec2Fixed::from_grid(0, 4);
        // 3² + 4² = 25
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
        assert_eq!(a.distance(b), Fixed::from_num(5));
    }

    #[test]
    fn test_sqrt_of_large_values() {
        let root = fixed_sqrt(Fixed::from_num(250_000_000_i64));
        assert!(close(root, Fixed::from_num(15811.388)));
    }

    #[test]
    fn test_vec2_normalize() {
        let norm = Vec2Fixed::from_grid(3, 4).normalize();
        assert!(close(norm.x, Fixed::from_num(0.6)));
        assert!(close(norm.y, Fixed::from_num(0.8)));
        assert_eq!(Vec2Fixed::ZERO.normalize(), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_blend_renormalizes() {
        let v = Vec2Fixed::from_grid(1, 0).blend(Vec2Fixed::from_grid(0, 1), Fixed::from_num(1));
        assert!(close(v.length(), Fixed::from_num(1)));
        assert!(close(v.x, v.y));
    }

    #[test]
    fn test_mean_of_points() {
        let mean = Vec2Fixed::mean([Vec2Fixed::from_grid(0, 0), Vec2Fixed::from_grid(10, 20)]);
        assert_eq!(mean, Some(Vec2Fixed::from_grid(5, 10)));
        assert_eq!(Vec2Fixed::mean(std::iter::empty()), None);
    }

    #[test]
    fn test_trig_matches_reference_values() {
        for deg in [-270_i32, -90, 0, 30, 45, 90, 135, 180, 270, 359, 720] {
            let rad = Fixed::from_num(f64::from(deg).to_radians());
            let expected_sin = Fixed::from_num(f64::from(deg).to_radians().sin());
            let expected_cos = Fixed::from_num(f64::from(deg).to_radians().cos());
            assert!(close(fixed_sin(rad), expected_sin), "sin({deg})");
            assert!(close(fixed_cos(rad), expected_cos), "cos({deg})");
        }
    }

    #[test]
    fn test_out_of_range_coordinates_fail_to_parse() {
        let parsed: Vec2Fixed = serde_json::from_str("[12, -7]").unwrap();
        assert_eq!(parsed, Vec2Fixed::from_grid(12, -7));

        let error = serde_json::from_str::<Vec2Fixed>("[1, 9223372036854775807]").unwrap_err();
        assert!(error.to_string().contains("out of fixed-point range"));
    }

    #[test]
    fn test_grid_serialization_rounds() {
        let v = Vec2Fixed::new(Fixed::from_num(10.6), Fixed::from_num(-3.2));
        assert_eq!(v.to_grid(), (11, -3));
    }
}
