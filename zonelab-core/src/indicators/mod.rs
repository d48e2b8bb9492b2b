//! Indicator library.
//!
//! Every indicator is a pure function of a bar slice, precomputed once per run
//! and read by index during the bar loop. Series are aligned to their input and
//! hold `f64::NAN` while warming up. No value at bar t depends on bars after t,
//! with the exception of pivots, which need `k` bars of right-hand context and
//! must be read through their confirmation index.

pub mod atr;
pub mod ema;
pub mod extremes;
pub mod pivots;
pub mod regression;
pub mod rsi;
pub mod vwap;

pub use atr::{true_range, Atr};
pub use ema::{ema_of_series, Ema};
pub use extremes::{falling_lows, highest_high_before, lowest_low_before, rising_highs};
pub use pivots::{detect_pivots, PivotKind, PivotPoint, TiePolicy};
pub use regression::{regression_slope_sigma, slope_sigma_of_series, SlopeSigma};
pub use rsi::{compute_rsi, rsi_change, Rsi, NEUTRAL_RSI};
pub use vwap::{cumulative_vwap, session_vwap};

use crate::domain::Bar;

/// Single-series indicator over a bar slice.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "atr_14").
    fn name(&self) -> &str;

    /// Index of the first defined output value.
    fn lookback(&self) -> usize;

    /// Compute the full output series, same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Exponential smoothing with `alpha`, seeded with the first finite input.
///
/// Leading NaNs are skipped; outputs before `min_periods` observations are NaN.
pub(crate) fn ewm(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let mut state: Option<f64> = None;
    let mut seen = 0usize;
    for (i, &x) in values.iter().enumerate() {
        if !x.is_finite() {
            if let Some(s) = state {
                if seen >= min_periods {
                    out[i] = s;
                }
            }
            continue;
        }
        let s = match state {
            None => x,
            Some(prev) => alpha * x + (1.0 - alpha) * prev,
        };
        state = Some(s);
        seen += 1;
        if seen >= min_periods {
            out[i] = s;
        }
    }
    out
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev close (or close for the first bar), high/low = max/min of
/// open and close ± 1.0, volume = 1000, one bar per minute.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::minutes(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
                spread: None,
            }
        })
        .collect()
}

/// Build bars from explicit (open, high, low, close) tuples, one per minute.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + chrono::Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
            spread: None,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
