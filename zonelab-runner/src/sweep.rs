//! Parallel parameter sweeps over one shared market view.
//!
//! Stop and regime parameters do not enter [`MarketData`], so every variant of
//! a sweep runs against the same precomputed series. Each variant owns its
//! own window, order book and ledger.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use zonelab_core::config::RegimeMode;
use zonelab_core::engine::{EngineError, MarketData};
use zonelab_core::EngineConfig;

use crate::data_loader::LoadedData;
use crate::runner::{run_from_market, RunError, RunReport};

/// Stop caps compared by default, in ATR(anchor).
pub const DEFAULT_CAPS: [f64; 3] = [2.0, 3.0, 4.0];

/// One labelled engine parameter set.
#[derive(Debug, Clone)]
pub struct Variant {
    pub label: String,
    pub engine: EngineConfig,
}

/// Reports of a sweep, in variant order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub name: String,
    pub runs: Vec<RunReport>,
}

impl SweepReport {
    /// Run with the highest total R; the first wins ties.
    pub fn best_by_total_r(&self) -> Option<&RunReport> {
        self.runs.iter().fold(None, |best, r| match best {
            Some(b) if b.summary.total_r >= r.summary.total_r => Some(b),
            _ => Some(r),
        })
    }
}

/// Run `variants` in parallel against one market view built from `data`.
///
/// Every variant must share `base`'s market and zone sections.
pub fn run_variants(
    name: &str,
    data: &LoadedData,
    base: &EngineConfig,
    variants: &[Variant],
) -> Result<SweepReport, RunError> {
    let market = MarketData::build(&data.series, base).map_err(EngineError::from)?;
    let runs = variants
        .par_iter()
        .map(|v| run_from_market(data, &market, &v.engine, &v.label))
        .collect::<Result<Vec<_>, RunError>>()?;

    info!(sweep = name, variants = runs.len(), "sweep finished");
    Ok(SweepReport {
        name: name.to_string(),
        runs,
    })
}

/// Uncapped baseline followed by one variant per cap.
pub fn cap_variants(base: &EngineConfig, caps: &[f64]) -> Vec<Variant> {
    let mut baseline = base.clone();
    baseline.stop.atr_cap = None;
    std::iter::once(Variant {
        label: "uncapped".to_string(),
        engine: baseline,
    })
    .chain(caps.iter().map(|&cap| {
        let mut engine = base.clone();
        engine.stop.atr_cap = Some(cap);
        Variant {
            label: format!("cap_{cap}atr"),
            engine,
        }
    }))
    .collect()
}

pub fn cap_sweep(
    data: &LoadedData,
    base: &EngineConfig,
    caps: &[f64],
) -> Result<SweepReport, RunError> {
    run_variants("cap-sweep", data, base, &cap_variants(base, caps))
}

/// Single-threshold gate against the deadband gate.
///
/// The threshold variant keeps `base`'s coefficient when it already runs in
/// threshold mode, else uses the default.
pub fn gate_variants(base: &EngineConfig, enter_coef: f64, exit_coef: f64) -> Vec<Variant> {
    let mut threshold = base.clone();
    if !matches!(threshold.regime, RegimeMode::Threshold { .. }) {
        threshold.regime = RegimeMode::default();
    }
    let mut hysteresis = base.clone();
    hysteresis.regime = RegimeMode::Hysteresis {
        enter_coef,
        exit_coef,
    };
    vec![
        Variant {
            label: "threshold".to_string(),
            engine: threshold,
        },
        Variant {
            label: format!("hysteresis_{enter_coef}_{exit_coef}"),
            engine: hysteresis,
        },
    ]
}

pub fn gate_compare(
    data: &LoadedData,
    base: &EngineConfig,
    enter_coef: f64,
    exit_coef: f64,
) -> Result<SweepReport, RunError> {
    run_variants(
        "gate-compare",
        data,
        base,
        &gate_variants(base, enter_coef, exit_coef),
    )
}
