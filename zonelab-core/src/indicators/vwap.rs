//! Volume-weighted typical price anchors.
//!
//! Typical price is (H+L+C)/3. Bars with zero volume weigh 1.

use crate::domain::Bar;

fn weight(bar: &Bar) -> f64 {
    if bar.volume == 0.0 {
        1.0
    } else {
        bar.volume
    }
}

/// Session VWAP, cumulated from the first bar of each calendar day.
pub fn session_vwap(bars: &[Bar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut pv = 0.0;
    let mut v = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 && bar.timestamp.date() != bars[i - 1].timestamp.date() {
            pv = 0.0;
            v = 0.0;
        }
        let w = weight(bar);
        pv += bar.typical_price() * w;
        v += w;
        out.push(pv / v);
    }
    out
}

/// All-time cumulative VWAP.
pub fn cumulative_vwap(bars: &[Bar]) -> Vec<f64> {
    let mut pv = 0.0;
    let mut v = 0.0;
    bars.iter()
        .map(|bar| {
            let w = weight(bar);
            pv += bar.typical_price() * w;
            v += w;
            pv / v
        })
        .collect()
}
