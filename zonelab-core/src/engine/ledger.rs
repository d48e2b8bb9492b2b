//! Trade ledger and run summary.
//!
//! Every statistic is a pure function of the trade list, in R units. Zero-trade
//! runs report zeros.

use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, Trade};

/// Exit counts per reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReasonCounts {
    pub structure: usize,
    pub burst: usize,
    pub edge: usize,
    pub stop_loss: usize,
    pub end: usize,
}

impl ReasonCounts {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut counts = Self::default();
        for t in trades {
            *counts.slot(t.reason) += 1;
        }
        counts
    }

    pub fn get(&self, reason: ExitReason) -> usize {
        match reason {
            ExitReason::Struct => self.structure,
            ExitReason::Burst => self.burst,
            ExitReason::Edge => self.edge,
            ExitReason::Sl => self.stop_loss,
            ExitReason::End => self.end,
        }
    }

    pub fn total(&self) -> usize {
        ExitReason::ALL.iter().map(|&r| self.get(r)).sum()
    }

    fn slot(&mut self, reason: ExitReason) -> &mut usize {
        match reason {
            ExitReason::Struct => &mut self.structure,
            ExitReason::Burst => &mut self.burst,
            ExitReason::Edge => &mut self.edge,
            ExitReason::Sl => &mut self.stop_loss,
            ExitReason::End => &mut self.end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_trades: usize,
    pub win_rate_pct: f64,
    pub total_r: f64,
    pub avg_r: f64,
    pub max_drawdown_r: f64,
    /// Infinite when there are trades but no losers; serialized as `"inf"`.
    #[serde(with = "profit_factor_serde")]
    pub profit_factor: f64,
    pub reason_counts: ReasonCounts,
    pub median_r: f64,
    pub best_r: f64,
    pub worst_r: f64,
    pub avg_bars_held: f64,
    pub avg_stop_pips: f64,
}

impl Summary {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let results: Vec<f64> = trades.iter().map(|t| t.result_r).collect();
        let total_r: f64 = results.iter().sum();
        Self {
            total_trades: trades.len(),
            win_rate_pct: win_rate_pct(&results),
            total_r,
            avg_r: mean(&results),
            max_drawdown_r: max_drawdown_r(&results),
            profit_factor: profit_factor(&results),
            reason_counts: ReasonCounts::from_trades(trades),
            median_r: median(&results),
            best_r: results.iter().copied().reduce(f64::max).unwrap_or(0.0),
            worst_r: results.iter().copied().reduce(f64::min).unwrap_or(0.0),
            avg_bars_held: mean(&trades.iter().map(|t| t.bars_held as f64).collect::<Vec<_>>()),
            avg_stop_pips: mean(&trades.iter().map(|t| t.stop_pips).collect::<Vec<_>>()),
        }
    }
}

// ─── Statistics ─────────────────────────────────────────────────────

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentage of strictly positive results.
pub fn win_rate_pct(results: &[f64]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let wins = results.iter().filter(|&&r| r > 0.0).count();
    wins as f64 / results.len() as f64 * 100.0
}

/// Cumulative R curve, one point per trade.
pub fn equity_curve_r(results: &[f64]) -> Vec<f64> {
    results
        .iter()
        .scan(0.0, |equity, &r| {
            *equity += r;
            Some(*equity)
        })
        .collect()
}

/// Largest drop from the running peak of the cumulative R curve. The peak
/// starts at 0, so an opening loss counts in full.
pub fn max_drawdown_r(results: &[f64]) -> f64 {
    let mut peak = 0.0_f64;
    let mut worst = 0.0_f64;
    for equity in equity_curve_r(results) {
        peak = peak.max(equity);
        worst = worst.max(peak - equity);
    }
    worst
}

/// Gross winning R over gross losing R.
pub fn profit_factor(results: &[f64]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let gross_win: f64 = results.iter().filter(|&&r| r > 0.0).sum();
    let gross_loss: f64 = results.iter().filter(|&&r| r < 0.0).map(|r| -r).sum();
    if gross_loss == 0.0 {
        f64::INFINITY
    } else {
        gross_win / gross_loss
    }
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

mod profit_factor_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    const INF: &str = "inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && *value > 0.0 {
            serializer.serialize_str(INF)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) if s == INF => Ok(f64::INFINITY),
            Repr::Text(s) => Err(serde::de::Error::custom(format!(
                "expected number or \"{INF}\", got {s:?}"
            ))),
        }
    }
}
