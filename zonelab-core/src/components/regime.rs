//! Regime classification on completed anchor bars.
//!
//! Each anchor bar is labelled from the trailing regression slope and sigma
//! ending at that bar. An execution bar inside anchor bucket `h` reads the label
//! of bar `h - 1`, the last one that has closed.

use serde::{Deserialize, Serialize};

use crate::config::RegimeMode;
use crate::domain::Regime;
use crate::indicators::SlopeSigma;

/// Stateless single-threshold rule. Undefined or zero sigma is RANGE.
pub fn classify_threshold(slope: f64, sigma: f64, coef: f64) -> Regime {
    if !(slope.is_finite() && sigma.is_finite()) || sigma <= 0.0 {
        return Regime::Range;
    }
    if slope.abs() >= sigma * coef {
        Regime::Trend
    } else {
        Regime::Range
    }
}

/// Stateful deadband classifier. Starts in RANGE.
#[derive(Debug, Clone)]
pub struct Hysteresis {
    enter_coef: f64,
    exit_coef: f64,
    state: Regime,
}

impl Hysteresis {
    pub fn new(enter_coef: f64, exit_coef: f64) -> Self {
        Self {
            enter_coef,
            exit_coef,
            state: Regime::Range,
        }
    }

    pub fn state(&self) -> Regime {
        self.state
    }

    /// Advance one anchor bar. Undefined inputs hold the current state.
    pub fn step(&mut self, slope: f64, sigma: f64) -> Regime {
        if !(slope.is_finite() && sigma.is_finite()) || sigma <= 0.0 {
            return self.state;
        }
        self.state = match self.state {
            Regime::Range if slope.abs() >= sigma * self.enter_coef => Regime::Trend,
            Regime::Trend if slope.abs() <= sigma * self.exit_coef => Regime::Range,
            current => current,
        };
        self.state
    }
}

/// Label every anchor bar under `mode`.
pub fn classify_series(mode: &RegimeMode, stats: &[SlopeSigma]) -> Vec<Regime> {
    match *mode {
        RegimeMode::Threshold { coef } => stats
            .iter()
            .map(|s| classify_threshold(s.slope, s.sigma, coef))
            .collect(),
        RegimeMode::Hysteresis {
            enter_coef,
            exit_coef,
        } => {
            let mut gate = Hysteresis::new(enter_coef, exit_coef);
            stats.iter().map(|s| gate.step(s.slope, s.sigma)).collect()
        }
        RegimeMode::Forced { regime } => vec![regime; stats.len()],
    }
}

/// Regime seen by an execution bar that sits in anchor bucket `anchor_idx`.
pub fn regime_for_bucket(labels: &[Regime], anchor_idx: usize) -> Regime {
    anchor_idx
        .checked_sub(1)
        .and_then(|h| labels.get(h).copied())
        .unwrap_or(Regime::Range)
}

/// How often and how long the gate sits in TREND.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GateStats {
    pub anchor_bars: usize,
    pub switches: usize,
    pub trend_pct: f64,
}

impl GateStats {
    pub fn from_labels(labels: &[Regime]) -> Self {
        if labels.is_empty() {
            return Self::default();
        }
        let switches = labels.windows(2).filter(|w| w[0] != w[1]).count();
        let trend = labels.iter().filter(|&&r| r == Regime::Trend).count();
        Self {
            anchor_bars: labels.len(),
            switches,
            trend_pct: trend as f64 / labels.len() as f64 * 100.0,
        }
    }
}
