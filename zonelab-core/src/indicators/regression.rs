//! Trailing linear-regression slope and volatility of closes.
//!
//! For a window of `span` closes ending at bar t (inclusive): slope is the OLS
//! slope of close against 0..span, sigma is the sample standard deviation
//! (n-1 denominator). Both are NaN until the window is full.

use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeSigma {
    pub slope: f64,
    pub sigma: f64,
}

impl SlopeSigma {
    pub const UNDEFINED: SlopeSigma = SlopeSigma {
        slope: f64::NAN,
        sigma: f64::NAN,
    };

    pub fn is_defined(&self) -> bool {
        self.slope.is_finite() && self.sigma.is_finite()
    }
}

/// Slope/sigma for every bar of `bars` over a trailing window of `span` closes.
pub fn regression_slope_sigma(bars: &[Bar], span: usize) -> Vec<SlopeSigma> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    slope_sigma_of_series(&closes, span)
}

pub fn slope_sigma_of_series(values: &[f64], span: usize) -> Vec<SlopeSigma> {
    let n = values.len();
    let mut out = vec![SlopeSigma::UNDEFINED; n];
    if span < 2 || n < span {
        return out;
    }

    let x_mean = (span as f64 - 1.0) / 2.0;
    let x_var: f64 = (0..span).map(|x| (x as f64 - x_mean).powi(2)).sum();

    for (t, slot) in out.iter_mut().enumerate().skip(span - 1) {
        let window = &values[t + 1 - span..=t];
        let y_mean = window.iter().sum::<f64>() / span as f64;
        let mut cov = 0.0;
        let mut ss = 0.0;
        for (x, &y) in window.iter().enumerate() {
            let dy = y - y_mean;
            cov += (x as f64 - x_mean) * dy;
            ss += dy * dy;
        }
        *slot = SlopeSigma {
            slope: cov / x_var,
            sigma: (ss / (span as f64 - 1.0)).sqrt(),
        };
    }
    out
}
