//! Pending stop-entry orders and the metadata they carry into positions.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Regime;

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Position side opened by a fill of this order.
    pub fn position_side(self) -> Side {
        match self {
            OrderSide::Buy => Side::Long,
            OrderSide::Sell => Side::Short,
        }
    }
}

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
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

/// How the entry relates to the watched zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryKind {
    /// Stop order in the direction of the zone (TREND regime).
    Breakout,
    /// Stop order away from the zone (RANGE regime).
    Reversal,
}

/// A conditional stop-entry order waiting for its trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub side: OrderSide,
    pub trigger: f64,
    pub origin_time: NaiveDateTime,
    pub origin_bar: usize,
    pub regime: Regime,
    pub kind: EntryKind,
}

impl PendingOrder {
    /// Whether the bar's range reaches the trigger.
    pub fn is_triggered(&self, high: f64, low: f64) -> bool {
        match self.side {
            OrderSide::Buy => high >= self.trigger,
            OrderSide::Sell => low <= self.trigger,
        }
    }
}
