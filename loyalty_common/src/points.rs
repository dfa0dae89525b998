use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

const SCALE: u32 = 2;

//--------------------------------------       Points        ---------------------------------------------------------
/// A fixed-point amount of loyalty points, stored as an integer number of hundredths.
///
/// All ledger arithmetic happens on the integer representation, so repeated credits and debits never drift. On the
/// wire, `Points` is a plain JSON decimal number (e.g. `500.5`), and it is parsed through [`Decimal`] so that amounts
/// with more than two decimal places are rejected rather than silently rounded.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[sqlx(transparent)]
pub struct Points(i64);

op!(binary Points, Add, add);
op!(binary Points, Sub, sub);
op!(inplace Points, AddAssign, add_assign);
op!(inplace Points, SubAssign, sub_assign);
op!(unary Points, Neg, neg);

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value cannot be represented as points: {0}")]
pub struct PointsConversionError(String);

impl Points {
    pub const ZERO: Points = Points(0);

    pub fn from_hundredths(value: i64) -> Self {
        Self(value)
    }

    pub fn from_whole(points: i64) -> Self {
        Self(points * 100)
    }

    pub fn hundredths(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, SCALE)
    }
}

impl TryFrom<Decimal> for Points {
    type Error = PointsConversionError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let scaled = value
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| PointsConversionError(format!("{value} is too large")))?;
        if !scaled.fract().is_zero() {
            return Err(PointsConversionError(format!("{value} has more than {SCALE} decimal places")));
        }
        scaled.to_i64().map(Self).ok_or_else(|| PointsConversionError(format!("{value} is out of range")))
    }
}

impl FromStr for Points {
    type Err = PointsConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| PointsConversionError(format!("{s}: {e}")))?;
        Self::try_from(value)
    }
}

impl Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal().normalize(), serializer)
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Points::try_from(value).map_err(serde::de::Error::custom)
    }
}
