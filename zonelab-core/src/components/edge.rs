//! Edge score: a 0..1 directional confidence per bar.
//!
//! Four components, weighted 0.35 / 0.25 / 0.25 / 0.15:
//! - position: (close - EMA) / (2 * ATR), clipped to [-1, 1], rescaled to [0, 1]
//! - slope: (EMA - EMA[t-3]) / (3 * ATR), same treatment
//! - momentum: RSI / 100, clipped to [0, 1]
//! - structure: 1.0 for a one-sided new extreme, 0.5 when both sides break, else 0.0
//!
//! The short score inverts the first three components. Any component that is not
//! finite (zero or undefined ATR, warm-up) counts as 0.5.

use crate::domain::{Bar, Side};

pub const EDGE_WEIGHTS: [f64; 4] = [0.35, 0.25, 0.25, 0.15];
const NEUTRAL: f64 = 0.5;
const SLOPE_SPAN: usize = 3;

/// Per-bar long and short edge series.
#[derive(Debug, Clone, Default)]
pub struct EdgeSeries {
    pub long: Vec<f64>,
    pub short: Vec<f64>,
}

impl EdgeSeries {
    pub fn for_side(&self, side: Side) -> &[f64] {
        match side {
            Side::Long => &self.long,
            Side::Short => &self.short,
        }
    }

    /// Score of bar `i`, or neutral when out of range.
    pub fn at(&self, side: Side, i: usize) -> f64 {
        self.for_side(side).get(i).copied().unwrap_or(NEUTRAL)
    }
}

fn rescale(x: f64) -> f64 {
    (x.clamp(-1.0, 1.0) + 1.0) / 2.0
}

fn finite_or_neutral(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        NEUTRAL
    }
}

/// Structure component of bar `i` for `side`, against the two bars before it.
pub fn structure_score(bars: &[Bar], i: usize, side: Side) -> f64 {
    if i < 2 || i >= bars.len() {
        return 0.0;
    }
    let hh = bars[i].high > bars[i - 1].high.max(bars[i - 2].high);
    let ll = bars[i].low < bars[i - 1].low.min(bars[i - 2].low);
    let (with, against) = match side {
        Side::Long => (hh, ll),
        Side::Short => (ll, hh),
    };
    match (with, against) {
        (true, false) => 1.0,
        (true, true) => 0.5,
        _ => 0.0,
    }
}

/// Build both edge series from precomputed EMA, ATR and RSI.
pub fn edge_series(bars: &[Bar], ema: &[f64], atr: &[f64], rsi: &[f64]) -> EdgeSeries {
    let n = bars.len();
    let mut out = EdgeSeries {
        long: Vec::with_capacity(n),
        short: Vec::with_capacity(n),
    };
    for i in 0..n {
        let a = atr[i];
        let (pos, slope) = if a.is_finite() && a > 0.0 {
            let pos = rescale((bars[i].close - ema[i]) / (2.0 * a));
            let slope = if i >= SLOPE_SPAN {
                rescale((ema[i] - ema[i - SLOPE_SPAN]) / (SLOPE_SPAN as f64 * a))
            } else {
                f64::NAN
            };
            (pos, slope)
        } else {
            (f64::NAN, f64::NAN)
        };
        let momentum = (rsi[i] / 100.0).clamp(0.0, 1.0);

        let pos = finite_or_neutral(pos);
        let slope = finite_or_neutral(slope);
        let momentum = finite_or_neutral(momentum);

        out.long.push(blend([
            pos,
            slope,
            momentum,
            structure_score(bars, i, Side::Long),
        ]));
        out.short.push(blend([
            1.0 - pos,
            1.0 - slope,
            1.0 - momentum,
            structure_score(bars, i, Side::Short),
        ]));
    }
    out
}

fn blend(components: [f64; 4]) -> f64 {
    components
        .iter()
        .zip(EDGE_WEIGHTS)
        .map(|(c, w)| c * w)
        .sum()
}
