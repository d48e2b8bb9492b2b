//! Open positions and the closed-trade records they turn into.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{EntryKind, Regime, Side};

/// Why a position was closed. Variants are listed in evaluation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExitReason {
    Struct,
    Burst,
    Edge,
    Sl,
    End,
}

impl ExitReason {
    pub const ALL: [ExitReason; 5] = [
        ExitReason::Struct,
        ExitReason::Burst,
        ExitReason::Edge,
        ExitReason::Sl,
        ExitReason::End,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::Struct => "STRUCT",
            ExitReason::Burst => "BURST",
            ExitReason::Edge => "EDGE",
            ExitReason::Sl => "SL",
            ExitReason::End => "END",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single open position of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub stop: f64,
    /// |entry - stop|, always > 0.
    pub risk: f64,
    pub order_time: NaiveDateTime,
    pub entry_time: NaiveDateTime,
    pub entry_bar: usize,
    /// Spread paid at the fill, in risk units.
    pub spread_r: f64,
    pub regime: Regime,
    pub kind: EntryKind,
    /// Consecutive bars with the side's edge below the exit threshold.
    #[serde(default)]
    pub weak_edge_streak: usize,
}

impl Position {
    /// Realized result in risk units for an exit at `price`, net of spread.
    pub fn result_r(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) / self.risk - self.spread_r
    }

    /// Close the position into a trade record.
    pub fn close(
        self,
        exit_price: f64,
        exit_time: NaiveDateTime,
        exit_bar: usize,
        reason: ExitReason,
        pip_size: f64,
    ) -> Trade {
        Trade {
            side: self.side,
            kind: self.kind,
            regime: self.regime,
            entry_price: self.entry_price,
            stop: self.stop,
            risk: self.risk,
            order_time: self.order_time,
            entry_time: self.entry_time,
            entry_bar: self.entry_bar,
            exit_price,
            exit_time,
            exit_bar,
            reason,
            spread_r: self.spread_r,
            result_r: self.result_r(exit_price),
            pnl_pips: self.side.sign() * (exit_price - self.entry_price) / pip_size,
            stop_pips: self.risk / pip_size,
            bars_held: exit_bar - self.entry_bar + 1,
        }
    }
}

/// A completed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub kind: EntryKind,
    pub regime: Regime,
    pub entry_price: f64,
    pub stop: f64,
    pub risk: f64,
    pub order_time: NaiveDateTime,
    pub entry_time: NaiveDateTime,
    pub entry_bar: usize,
    pub exit_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_bar: usize,
    pub reason: ExitReason,
    pub spread_r: f64,
    /// Net result in risk units.
    pub result_r: f64,
    /// Gross price move in pips, signed by side.
    pub pnl_pips: f64,
    pub stop_pips: f64,
    pub bars_held: usize,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.result_r > 0.0
    }
}
