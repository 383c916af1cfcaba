//! Position values and trade direction.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Direction of a track or a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// Price P&L of `size` units opened at `entry` and valued at `price`.
    pub fn pnl(self, entry: f64, price: f64, size: f64) -> f64 {
        self.sign() * (price - entry) * size
    }

    /// True when `price` is on the favourable side of `level` for this direction.
    pub fn favours(self, price: f64, level: f64) -> bool {
        match self {
            Side::Long => price > level,
            Side::Short => price < level,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Scalar position for one bar: +1 long, -1 short, 0 flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    Long,
    Short,
    #[default]
    Flat,
}

impl Position {
    pub fn value(self) -> i8 {
        match self {
            Position::Long => 1,
            Position::Short => -1,
            Position::Flat => 0,
        }
    }

    pub fn from_value(value: i8) -> Option<Self> {
        match value {
            1 => Some(Position::Long),
            -1 => Some(Position::Short),
            0 => Some(Position::Flat),
            _ => None,
        }
    }

    pub fn side(self) -> Option<Side> {
        match self {
            Position::Long => Some(Side::Long),
            Position::Short => Some(Side::Short),
            Position::Flat => None,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }
}

impl From<Side> for Position {
    fn from(side: Side) -> Self {
        match side {
            Side::Long => Position::Long,
            Side::Short => Position::Short,
        }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value())
    }
}

/// Reconcile the two track states into one position. Long wins when both
/// tracks are open.
pub fn combine_positions(long_open: bool, short_open: bool) -> Position {
    if long_open {
        Position::Long
    } else if short_open {
        Position::Short
    } else {
        Position::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pnl_long_profit() {
        assert!((Side::Long.pnl(50.0, 55.0, 100.0) - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pnl_long_loss() {
        assert!((Side::Long.pnl(50.0, 45.0, 100.0) - (-500.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn pnl_short_profit() {
        assert!((Side::Short.pnl(100.0, 90.0, 100.0) - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pnl_short_loss() {
        assert!((Side::Short.pnl(100.0, 110.0, 100.0) - (-1000.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn favours_is_mirrored() {
        assert!(Side::Long.favours(101.0, 100.0));
        assert!(!Side::Long.favours(100.0, 100.0));
        assert!(Side::Short.favours(99.0, 100.0));
        assert!(!Side::Short.favours(100.0, 100.0));
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Short.opposite(), Side::Long);
    }

    #[test]
    fn position_values() {
        assert_eq!(Position::Long.value(), 1);
        assert_eq!(Position::Short.value(), -1);
        assert_eq!(Position::Flat.value(), 0);
        assert_eq!(Position::from_value(-1), Some(Position::Short));
        assert_eq!(Position::from_value(2), None);
        assert_eq!(Position::default(), Position::Flat);
    }

    #[test]
    fn position_side() {
        assert_eq!(Position::Long.side(), Some(Side::Long));
        assert_eq!(Position::Short.side(), Some(Side::Short));
        assert_eq!(Position::Flat.side(), None);
        assert_eq!(Position::from(Side::Short), Position::Short);
    }

    #[test]
    fn combine_long_takes_precedence() {
        assert_eq!(combine_positions(true, true), Position::Long);
        assert_eq!(combine_positions(true, false), Position::Long);
        assert_eq!(combine_positions(false, true), Position::Short);
        assert_eq!(combine_positions(false, false), Position::Flat);
    }

    #[test]
    fn side_display() {
        assert_eq!(Side::Long.to_string(), "LONG");
        assert_eq!(Side::Short.to_string(), "SHORT");
    }

    #[test]
    fn position_serializes_as_integer() {
        let json = serde_json::to_string(&vec![Position::Long, Position::Flat, Position::Short]).unwrap();
        assert_eq!(json, "[1,0,-1]");
    }
}
