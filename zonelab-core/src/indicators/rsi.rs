//! Relative Strength Index (RSI).
//!
//! Average gain and average loss are exponentially smoothed with alpha = 1/period,
//! starting at the first close-to-close change.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! Edge cases: avg_loss == 0 → 50 (neutral, even with gains); fewer than
//! `period` changes observed → 50. The output is therefore always in [0, 100].

use super::{ewm, Indicator};
use crate::domain::Bar;

pub const NEUTRAL_RSI: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

/// RSI from smoothed averages, with the zero-loss convention.
pub fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if !avg_gain.is_finite() || !avg_loss.is_finite() || avg_loss == 0.0 {
        return NEUTRAL_RSI;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// One-bar change of an RSI series; NaN at index 0.
pub fn rsi_change(rsi: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; rsi.len()];
    for i in 1..rsi.len() {
        out[i] = rsi[i] - rsi[i - 1];
    }
    out
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut gains = vec![f64::NAN; n];
        let mut losses = vec![f64::NAN; n];
        for i in 1..n {
            let change = bars[i].close - bars[i - 1].close;
            gains[i] = change.max(0.0);
            losses[i] = (-change).max(0.0);
        }

        let alpha = 1.0 / self.period as f64;
        let avg_gain = ewm(&gains, alpha, self.period);
        let avg_loss = ewm(&losses, alpha, self.period);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| compute_rsi(g, l))
            .collect()
    }
}
