//! Bar resampling and cross-timeframe alignment.
//!
//! Buckets are epoch-aligned (see [`Timeframe::bucket_start`]). A bucket with no
//! contributing bars produces no output bar; gaps are never zero-filled.

use crate::domain::{Bar, BarSeries, Timeframe};

/// Aggregate bars into `tf` buckets.
///
/// open = first open, high = max high, low = min low, close = last close,
/// volume = sum, spread = mean of the spreads that are present.
pub fn resample(series: &BarSeries, tf: Timeframe) -> BarSeries {
    BarSeries::from_resampled(resample_bars(series.bars(), tf))
}

/// Slice-level resampler. Input must be time-ordered.
pub fn resample_bars(bars: &[Bar], tf: Timeframe) -> Vec<Bar> {
    let mut out: Vec<Bar> = Vec::new();
    let mut spread_sum = 0.0;
    let mut spread_count = 0usize;

    for bar in bars {
        let start = tf.bucket_start(bar.timestamp);
        match out.last_mut() {
            Some(current) if current.timestamp == start => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            _ => {
                if let Some(prev) = out.last_mut() {
                    prev.spread = mean_spread(spread_sum, spread_count);
                }
                spread_sum = 0.0;
                spread_count = 0;
                out.push(Bar {
                    timestamp: start,
                    spread: None,
                    ..bar.clone()
                });
            }
        }
        if let Some(s) = bar.spread {
            spread_sum += s;
            spread_count += 1;
        }
    }
    if let Some(last) = out.last_mut() {
        last.spread = mean_spread(spread_sum, spread_count);
    }
    out
}

fn mean_spread(sum: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

/// For every fine bar, the index of the last coarse bar starting at or before it.
///
/// When `coarse` was resampled from the same base series at a timeframe that
/// `fine`'s timeframe divides, this is the index of the containing bucket.
pub fn align_index(fine: &[Bar], coarse: &[Bar]) -> Vec<usize> {
    let mut out = Vec::with_capacity(fine.len());
    let mut j = 0usize;
    for bar in fine {
        while j + 1 < coarse.len() && coarse[j + 1].timestamp <= bar.timestamp {
            j += 1;
        }
        out.push(j);
    }
    out
}
