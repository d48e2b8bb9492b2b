//! Symmetric-window pivot detection.
//!
//! A bar `i` with `k <= i < len - k` is a pivot high when its high is the maximum
//! of highs[i-k..=i+k], and a pivot low when its low is the minimum of
//! lows[i-k..=i+k]. Under [`TiePolicy::Unique`] the extremum must also occur
//! exactly once in the window. A pivot at `i` needs bar `i + k` to be known.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotKind {
    High,
    Low,
}

/// How equal extremes inside the window are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TiePolicy {
    /// Strict: the extreme value appears once in the window.
    #[default]
    Unique,
    /// Any bar equal to the window extreme qualifies.
    Inclusive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotPoint {
    /// Index into the slice the pivots were detected on.
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub kind: PivotKind,
}

/// All pivots of `bars`, ordered by index (a high before a low on the same bar).
pub fn detect_pivots(bars: &[Bar], k: usize, policy: TiePolicy) -> Vec<PivotPoint> {
    let n = bars.len();
    let mut out = Vec::new();
    if n < 2 * k + 1 {
        return out;
    }
    for i in k..n - k {
        let window = &bars[i - k..=i + k];
        let high = bars[i].high;
        let low = bars[i].low;

        let max = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        if high == max && accepts(policy, window.iter().filter(|b| b.high == high).count()) {
            out.push(PivotPoint {
                index: i,
                timestamp: bars[i].timestamp,
                price: high,
                kind: PivotKind::High,
            });
        }

        let min = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        if low == min && accepts(policy, window.iter().filter(|b| b.low == low).count()) {
            out.push(PivotPoint {
                index: i,
                timestamp: bars[i].timestamp,
                price: low,
                kind: PivotKind::Low,
            });
        }
    }
    out
}

fn accepts(policy: TiePolicy, occurrences: usize) -> bool {
    match policy {
        TiePolicy::Unique => occurrences == 1,
        TiePolicy::Inclusive => true,
    }
}
