//! Engine configuration.
//!
//! Every section defaults to the reference parameter set, so a TOML file only
//! needs the fields it changes:
//!
//! ```toml
//! [market]
//! execution_timeframe = "5m"
//! anchor_timeframe = "1h"
//!
//! [stop]
//! atr_cap = 3.0
//!
//! [regime]
//! mode = "hysteresis"
//! enter_coef = 0.0022
//! exit_coef = 0.0018
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::domain::{Regime, Timeframe};
use crate::indicators::TiePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid parameter {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Complete parameter set for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub market: MarketConfig,
    pub zone: ZoneConfig,
    pub window: WindowConfig,
    pub entry: EntryConfig,
    pub stop: StopConfig,
    pub exit: ExitConfig,
    pub regime: RegimeMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketConfig {
    /// Timeframe of the input bars.
    pub base_timeframe: Timeframe,
    /// Bars the engine steps through.
    pub execution_timeframe: Timeframe,
    /// Higher timeframe for regime, ATR(anchor), stop pivots and the zone cache key.
    pub anchor_timeframe: Timeframe,
    pub pip_size: f64,
    /// Price value of one spread point.
    pub point_value: f64,
    pub atr_period: usize,
    pub ma_period: usize,
    pub rsi_period: usize,
    pub regression_window: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_timeframe: Timeframe::M1,
            execution_timeframe: Timeframe::M5,
            anchor_timeframe: Timeframe::H1,
            pip_size: 0.01,
            point_value: 0.001,
            atr_period: 14,
            ma_period: 20,
            rsi_period: 3,
            regression_window: 48,
        }
    }
}

/// Vote weights per signal family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZoneWeights {
    pub pivots: f64,
    pub daily: f64,
    pub vwap: f64,
}

impl Default for ZoneWeights {
    fn default() -> Self {
        Self {
            pivots: 30.0,
            daily: 20.0,
            vwap: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZoneConfig {
    pub bucket_pips: f64,
    pub pivot_radius: usize,
    pub tie_policy: TiePolicy,
    /// Execution bars in the heatmap window.
    pub lookback: usize,
    /// Fewer bars than this in the window yields no zones.
    pub min_bars: usize,
    pub weights: ZoneWeights,
    pub score_threshold: f64,
    /// Best-scoring buckets considered for the nearest-zone query.
    pub candidates: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            bucket_pips: 2.0,
            pivot_radius: 3,
            tie_policy: TiePolicy::Unique,
            lookback: 120,
            min_bars: 60,
            weights: ZoneWeights::default(),
            score_threshold: 58.0,
            candidates: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub enter_tolerance_atr: f64,
    pub exit_tolerance_atr: f64,
    pub ttl_bars: u32,
    pub cooldown_bars: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            enter_tolerance_atr: 0.45,
            exit_tolerance_atr: 0.65,
            ttl_bars: 24,
            cooldown_bars: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntryConfig {
    pub swing_lookback: usize,
    pub breakout_buffer_atr: f64,
    pub reversal_buffer_atr: f64,
    pub edge_min: f64,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            swing_lookback: 6,
            breakout_buffer_atr: 0.12,
            reversal_buffer_atr: 0.10,
            edge_min: 0.60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StopConfig {
    /// ATR(anchor) added beyond the structural level.
    pub extra_atr: f64,
    /// ATR(anchor) distance used when no pivot qualifies (before `extra_atr`).
    pub fallback_atr: f64,
    /// When set, the stop is never further than this many ATR(anchor).
    pub atr_cap: Option<f64>,
    /// Completed anchor bars scanned for a protective pivot.
    pub pivot_lookback: usize,
}

impl Default for StopConfig {
    fn default() -> Self {
        Self {
            extra_atr: 0.20,
            fallback_atr: 2.5,
            atr_cap: None,
            pivot_lookback: 48,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExitConfig {
    pub struct_run: usize,
    pub burst_delta: f64,
    /// Opposing-extreme run required to confirm a burst; 0 disables.
    pub burst_confirm_run: usize,
    pub edge_threshold: f64,
    pub edge_bars: usize,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            struct_run: 2,
            burst_delta: 14.0,
            burst_confirm_run: 0,
            edge_threshold: 0.30,
            edge_bars: 2,
        }
    }
}

/// Regime classifier selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RegimeMode {
    /// TREND iff |slope| >= sigma * coef.
    Threshold { coef: f64 },
    /// Enter TREND at sigma * enter_coef, leave at sigma * exit_coef.
    Hysteresis { enter_coef: f64, exit_coef: f64 },
    /// Every anchor bar carries `regime`.
    Forced { regime: Regime },
}

impl Default for RegimeMode {
    fn default() -> Self {
        RegimeMode::Threshold { coef: 0.002 }
    }
}

impl EngineConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Blake3 hash of the canonical JSON form.
    pub fn fingerprint(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => blake3::hash(json.as_bytes()).to_hex().to_string(),
            Err(_) => blake3::hash(format!("{self:?}").as_bytes())
                .to_hex()
                .to_string(),
        }
    }

    /// Reject parameter sets the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.market;
        if !m.execution_timeframe.divides(m.anchor_timeframe)
            || m.anchor_timeframe <= m.execution_timeframe
        {
            return Err(invalid(
                "market.anchor_timeframe",
                format!(
                    "{} must be a coarser multiple of the execution timeframe {}",
                    m.anchor_timeframe, m.execution_timeframe
                ),
            ));
        }
        if m.execution_timeframe < m.base_timeframe {
            return Err(invalid(
                "market.execution_timeframe",
                format!(
                    "{} is finer than the base timeframe {}",
                    m.execution_timeframe, m.base_timeframe
                ),
            ));
        }
        positive("market.pip_size", m.pip_size)?;
        non_negative("market.point_value", m.point_value)?;
        at_least("market.atr_period", m.atr_period, 1)?;
        at_least("market.ma_period", m.ma_period, 1)?;
        at_least("market.rsi_period", m.rsi_period, 1)?;
        at_least("market.regression_window", m.regression_window, 2)?;

        let z = &self.zone;
        positive("zone.bucket_pips", z.bucket_pips)?;
        at_least("zone.pivot_radius", z.pivot_radius, 1)?;
        at_least("zone.lookback", z.lookback, 1)?;
        at_least("zone.candidates", z.candidates, 1)?;
        if z.min_bars > z.lookback {
            return Err(invalid(
                "zone.min_bars",
                format!("{} exceeds lookback {}", z.min_bars, z.lookback),
            ));
        }
        for (field, w) in [
            ("zone.weights.pivots", z.weights.pivots),
            ("zone.weights.daily", z.weights.daily),
            ("zone.weights.vwap", z.weights.vwap),
        ] {
            non_negative(field, w)?;
        }

        let w = &self.window;
        positive("window.enter_tolerance_atr", w.enter_tolerance_atr)?;
        positive("window.exit_tolerance_atr", w.exit_tolerance_atr)?;
        at_least("window.ttl_bars", w.ttl_bars as usize, 1)?;

        at_least("entry.swing_lookback", self.entry.swing_lookback, 1)?;
        non_negative("entry.breakout_buffer_atr", self.entry.breakout_buffer_atr)?;
        non_negative("entry.reversal_buffer_atr", self.entry.reversal_buffer_atr)?;

        let s = &self.stop;
        non_negative("stop.extra_atr", s.extra_atr)?;
        positive("stop.fallback_atr", s.fallback_atr)?;
        if let Some(cap) = s.atr_cap {
            positive("stop.atr_cap", cap)?;
        }

        at_least("exit.struct_run", self.exit.struct_run, 1)?;
        at_least("exit.edge_bars", self.exit.edge_bars, 1)?;
        positive("exit.burst_delta", self.exit.burst_delta)?;

        match self.regime {
            RegimeMode::Threshold { coef } => positive("regime.coef", coef)?,
            RegimeMode::Hysteresis {
                enter_coef,
                exit_coef,
            } => {
                non_negative("regime.exit_coef", exit_coef)?;
                if !(enter_coef > exit_coef) {
                    return Err(invalid(
                        "regime.enter_coef",
                        format!("enter_coef {enter_coef} must exceed exit_coef {exit_coef}"),
                    ));
                }
            }
            RegimeMode::Forced { .. } => {}
        }
        Ok(())
    }
}

fn positive(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{v} must be positive")))
    }
}

fn non_negative(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{v} must be non-negative")))
    }
}

fn at_least(field: &'static str, v: usize, min: usize) -> Result<(), ConfigError> {
    if v >= min {
        Ok(())
    } else {
        Err(invalid(field, format!("{v} must be at least {min}")))
    }
}
