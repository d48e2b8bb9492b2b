//! Domain types: bars, timeframes, regimes, orders, positions, trades.

pub mod bar;
pub mod order;
pub mod timeframe;
pub mod trade;

pub use bar::{Bar, BarError, BarSeries};
pub use order::{EntryKind, OrderSide, PendingOrder, Side};
pub use timeframe::{Timeframe, TimeframeParseError};
pub use trade::{ExitReason, Position, Trade};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Market regime of a completed anchor bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regime {
    Trend,
    #[default]
    Range,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Trend => write!(f, "TREND"),
            Regime::Range => write!(f, "RANGE"),
        }
    }
}
