use std::{fmt::Display, str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use log::error;
pub use loyalty_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::normalize_order_number;

//--------------------------------------        UserId         ---------------------------------------------------------
/// The identifier of an authenticated user. Authentication happens upstream, so the engine treats this as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------      OrderNumber      ---------------------------------------------------------
/// A purchase order number that has passed the Luhn check. The only ways to build one are [`FromStr`] and
/// [`normalize_order_number`], so holding an `OrderNumber` means the value is canonical and valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid order number: {0:?}")]
pub struct InvalidOrderNumber(pub String);

impl OrderNumber {
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = InvalidOrderNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_order_number(s).ok_or_else(|| InvalidOrderNumber(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for OrderNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// Life cycle of an uploaded order: `New → Processing → {Processed, Invalid}`. The two terminal states have no exits.
///
/// In the database the status is stored in upper case (`NEW`, `PROCESSED`, ...). Externally it is rendered in lower
/// case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been uploaded and the accrual oracle has not been asked about it yet.
    New,
    /// The oracle knows about the order but has not reached a verdict.
    Processing,
    /// The oracle granted an accrual, which has been credited to the owner's balance.
    Processed,
    /// The oracle rejected the order. No points are granted.
    Invalid,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }

    pub fn is_pending(&self) -> bool {
        !self.is_terminal()
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "new"),
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Processed => write!(f, "processed"),
            OrderStatusType::Invalid => write!(f, "invalid"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to New");
            OrderStatusType::New
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "invalid" => Ok(Self::Invalid),
            _ => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: UserId,
    pub number: OrderNumber,
    pub status: OrderStatusType,
    /// Zero until the order is `Processed`.
    pub accrual: Points,
    /// How many times the reconciliation scheduler has dispatched this order to a poller.
    pub poll_attempts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Withdrawal       ---------------------------------------------------------
/// A debit against a user's balance, keyed by the (Luhn-valid) order number the points were spent on. The number does
/// not have to match an uploaded order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Withdrawal {
    pub id: i64,
    pub user_id: UserId,
    pub number: OrderNumber,
    pub amount: Points,
    pub processed_at: DateTime<Utc>,
}

//--------------------------------------        Balance        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Balance {
    pub current: Points,
    pub withdrawn: Points,
}

//--------------------------------------      ClaimLease       ---------------------------------------------------------
/// Cooldown applied to an order each time the scheduler claims it. The n-th claim hides the order from discovery for
/// `base × 2^(n-1)`, never more than `cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimLease {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for ClaimLease {
    fn default() -> Self {
        Self { base: Duration::from_secs(60), cap: Duration::from_secs(3600) }
    }
}

impl ClaimLease {
    /// The cooldown applied to an order that has already been claimed `previous_attempts` times.
    pub fn cooldown(&self, previous_attempts: u32) -> Duration {
        let factor = 1u32.checked_shl(previous_attempts.min(20)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }
}
