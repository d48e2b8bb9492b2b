//! Rolling N-bar extremes over the bars strictly before an index.

use crate::domain::Bar;

/// Highest high of bars[i-n..i], or None when fewer than `n` bars precede `i`.
pub fn highest_high_before(bars: &[Bar], i: usize, n: usize) -> Option<f64> {
    window_before(bars, i, n).map(|w| w.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max))
}

/// Lowest low of bars[i-n..i], or None when fewer than `n` bars precede `i`.
pub fn lowest_low_before(bars: &[Bar], i: usize, n: usize) -> Option<f64> {
    window_before(bars, i, n).map(|w| w.iter().map(|b| b.low).fold(f64::INFINITY, f64::min))
}

fn window_before(bars: &[Bar], i: usize, n: usize) -> Option<&[Bar]> {
    if n == 0 || i < n || i > bars.len() {
        return None;
    }
    Some(&bars[i - n..i])
}

/// True when the `run` bars before `i` each set a strictly lower low than
/// the bar before them, i.e. low[i-1] < low[i-2] < ... < low[i-run-1].
pub fn falling_lows(bars: &[Bar], i: usize, run: usize) -> bool {
    run > 0 && i > run && i <= bars.len() && (i - run..i).all(|j| bars[j].low < bars[j - 1].low)
}

/// Mirror of [`falling_lows`] for strictly higher highs.
pub fn rising_highs(bars: &[Bar], i: usize, run: usize) -> bool {
    run > 0 && i > run && i <= bars.len() && (i - run..i).all(|j| bars[j].high > bars[j - 1].high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    fn bars() -> Vec<Bar> {
        make_ohlc_bars(&[
            (10.0, 11.0, 9.0, 10.0),
            (10.0, 12.0, 8.5, 10.0),
            (10.0, 13.0, 8.0, 10.0),
            (10.0, 10.5, 7.0, 10.0),
        ])
    }

    #[test]
    fn extremes_exclude_current_bar() {
        let b = bars();
        assert_eq!(highest_high_before(&b, 3, 3), Some(13.0));
        assert_eq!(lowest_low_before(&b, 3, 3), Some(8.0));
        assert_eq!(highest_high_before(&b, 2, 2), Some(12.0));
        assert_eq!(highest_high_before(&b, 2, 3), None);
        assert_eq!(lowest_low_before(&b, 1, 0), None);
    }

    #[test]
    fn monotonic_runs() {
        let b = bars();
        assert!(falling_lows(&b, 4, 3));
        assert!(falling_lows(&b, 3, 2));
        assert!(rising_highs(&b, 3, 2));
        assert!(!rising_highs(&b, 4, 2));
        assert!(!falling_lows(&b, 3, 3));
        assert!(!falling_lows(&b, 4, 0));
    }
}
