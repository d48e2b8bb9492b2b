//! Precomputed market view shared read-only by every run over the same bars.
//!
//! Built once from the base series: resampled execution, anchor and day series,
//! their alignment maps, and every indicator the bar loop reads. Nothing here
//! depends on regime mode, stop or exit parameters, so parameter sweeps reuse a
//! single `MarketData` across threads.

use tracing::debug;

use crate::components::edge::{edge_series, EdgeSeries};
use crate::config::{ConfigError, EngineConfig};
use crate::data::{align_index, resample, resample_bars};
use crate::domain::{Bar, BarSeries, Timeframe};
use crate::indicators::{
    cumulative_vwap, detect_pivots, regression_slope_sigma, rsi_change, session_vwap, Atr, Ema,
    Indicator, PivotKind, PivotPoint, Rsi, SlopeSigma,
};

#[derive(Debug, Clone)]
pub struct MarketData {
    pub execution: BarSeries,
    pub anchor: BarSeries,
    pub days: Vec<Bar>,
    /// Execution bar → anchor bucket index.
    pub anchor_index: Vec<usize>,
    /// Execution bar → day index.
    pub day_index: Vec<usize>,

    pub exec_atr: Vec<f64>,
    pub anchor_atr: Vec<f64>,
    pub ema: Vec<f64>,
    pub rsi: Vec<f64>,
    pub rsi_change: Vec<f64>,
    pub edge: EdgeSeries,
    pub session_vwap: Vec<f64>,
    pub anchor_vwap: Vec<f64>,
    pub anchor_trend: Vec<SlopeSigma>,
    /// Pivots of the whole anchor series; usable only once confirmed.
    pub anchor_pivots: Vec<PivotPoint>,
    pub pivot_radius: usize,
}

impl MarketData {
    /// Resample `base` and precompute indicators for `config`.
    pub fn build(base: &BarSeries, config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let m = &config.market;

        let execution = if m.execution_timeframe == m.base_timeframe {
            base.clone()
        } else {
            resample(base, m.execution_timeframe)
        };
        let anchor = resample(base, m.anchor_timeframe);
        let days = resample_bars(execution.bars(), Timeframe::D1);

        let anchor_index = align_index(execution.bars(), anchor.bars());
        let day_index = align_index(execution.bars(), &days);

        let exec_atr = Atr::new(m.atr_period).compute(&execution);
        let anchor_atr = Atr::new(m.atr_period).compute(&anchor);
        let ema = Ema::new(m.ma_period).compute(&execution);
        let rsi = Rsi::new(m.rsi_period).compute(&execution);
        let rsi_change = rsi_change(&rsi);
        let edge = edge_series(&execution, &ema, &exec_atr, &rsi);

        let session_vwap = session_vwap(&execution);
        let anchor_vwap = cumulative_vwap(&anchor);
        let anchor_trend = regression_slope_sigma(&anchor, m.regression_window);
        let anchor_pivots =
            detect_pivots(&anchor, config.zone.pivot_radius, config.zone.tie_policy);

        debug!(
            execution_bars = execution.len(),
            anchor_bars = anchor.len(),
            days = days.len(),
            anchor_pivots = anchor_pivots.len(),
            "market data prepared"
        );

        Ok(Self {
            execution,
            anchor,
            days,
            anchor_index,
            day_index,
            exec_atr,
            anchor_atr,
            ema,
            rsi,
            rsi_change,
            edge,
            session_vwap,
            anchor_vwap,
            anchor_trend,
            anchor_pivots,
            pivot_radius: config.zone.pivot_radius,
        })
    }

    pub fn len(&self) -> usize {
        self.execution.len()
    }

    pub fn is_empty(&self) -> bool {
        self.execution.is_empty()
    }

    /// Index of the last completed anchor bar as seen from execution bar `i`.
    pub fn completed_anchor(&self, i: usize) -> Option<usize> {
        self.anchor_index.get(i)?.checked_sub(1)
    }

    /// ATR of the last completed anchor bar, if defined and positive.
    pub fn anchor_atr_at(&self, i: usize) -> Option<f64> {
        let h = self.completed_anchor(i)?;
        let a = *self.anchor_atr.get(h)?;
        (a.is_finite() && a > 0.0).then_some(a)
    }

    /// Execution ATR at `i`, if defined and positive.
    pub fn exec_atr_at(&self, i: usize) -> Option<f64> {
        let a = *self.exec_atr.get(i)?;
        (a.is_finite() && a > 0.0).then_some(a)
    }

    /// Most recent confirmed anchor pivot of `kind` satisfying `beyond`, looking
    /// back at most `lookback` completed anchor bars from execution bar `i`.
    ///
    /// A pivot at anchor index j is confirmed once bar j + radius has completed.
    pub fn recent_anchor_pivot(
        &self,
        i: usize,
        kind: PivotKind,
        lookback: usize,
        beyond: impl Fn(f64) -> bool,
    ) -> Option<&PivotPoint> {
        let last = self.completed_anchor(i)?;
        let earliest = (last + 1).saturating_sub(lookback);
        self.anchor_pivots
            .iter()
            .rev()
            .filter(|p| p.index + self.pivot_radius <= last)
            .take_while(|p| p.index >= earliest)
            .find(|p| p.kind == kind && beyond(p.price))
    }
}
