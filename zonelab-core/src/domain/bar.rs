//! Bar and BarSeries: the market data units the engine steps through.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use thiserror::Error;

/// OHLCV bar with an optional spread quoted in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub spread: Option<f64>,
}

impl Bar {
    /// Returns true if any price or volume field is not finite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
            || self.spread.is_some_and(|s| !s.is_finite())
    }

    /// OHLC consistency: the range covers both open and close.
    pub fn is_sane(&self) -> bool {
        !self.is_void()
            && self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.volume >= 0.0
    }

    /// Typical price (H+L+C)/3.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Reasons a bar sequence is rejected before simulation.
#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("bar series is empty")]
    Empty,

    #[error("bar {index} at {timestamp} has a non-finite field")]
    NonFinite {
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("bar {index} at {timestamp} has inconsistent OHLC")]
    Inconsistent {
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("bar {index} at {timestamp} is not after the previous bar at {previous}")]
    NotIncreasing {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },
}

/// A validated, strictly time-ordered, immutable run of bars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Validate and wrap a bar vector.
    pub fn new(bars: Vec<Bar>) -> Result<Self, BarError> {
        if bars.is_empty() {
            return Err(BarError::Empty);
        }
        for (index, bar) in bars.iter().enumerate() {
            if bar.is_void() {
                return Err(BarError::NonFinite {
                    index,
                    timestamp: bar.timestamp,
                });
            }
            if !bar.is_sane() {
                return Err(BarError::Inconsistent {
                    index,
                    timestamp: bar.timestamp,
                });
            }
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(BarError::NotIncreasing {
                    index,
                    timestamp: bar.timestamp,
                    previous: bars[index - 1].timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    /// Wrap bars produced by the resampler, which preserves every invariant.
    pub(crate) fn from_resampled(bars: Vec<Bar>) -> Self {
        debug_assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.last().map(|b| b.timestamp)
    }
}

impl Deref for BarSeries {
    type Target = [Bar];

    fn deref(&self) -> &[Bar] {
        &self.bars
    }
}

impl<'de> Deserialize<'de> for BarSeries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            bars: Vec<Bar>,
        }
        let raw = Raw::deserialize(deserializer)?;
        BarSeries::new(raw.bars).map_err(serde::de::Error::custom)
    }
}
