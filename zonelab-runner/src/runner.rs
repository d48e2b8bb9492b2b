//! Run orchestration: data loading, engine run, report assembly.
//!
//! - `run_single()`: loads bars per the config, then runs. Used by the CLI.
//! - `run_from_data()`: takes pre-loaded bars. Used by sweeps and tests.
//! - `run_from_market()`: takes prepared market data so variants can share it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use zonelab_core::components::GateStats;
use zonelab_core::domain::Trade;
use zonelab_core::engine::{run_backtest, EngineError, MarketData, RunCounters, Summary};
use zonelab_core::EngineConfig;

use crate::config::{ConfigError, DataConfig, RunConfig};
use crate::data_loader::{generate_synthetic_bars, load_csv, LoadError, LoadOptions, LoadedData};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Everything one run produced, plus its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub label: String,
    /// Hash of the engine parameter set.
    pub config_fingerprint: String,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    /// Execution bars simulated.
    pub bar_count: usize,
    pub start: String,
    pub end: String,
    pub summary: Summary,
    pub gate: GateStats,
    pub counters: RunCounters,
    pub trades: Vec<Trade>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load the bars a config points at.
pub fn load_data(config: &DataConfig) -> Result<LoadedData, LoadError> {
    match config {
        DataConfig::Csv { path, strict, tail } => load_csv(
            path,
            &LoadOptions {
                strict: *strict,
                tail: *tail,
            },
        ),
        DataConfig::Synthetic {
            bars,
            seed,
            start_price,
        } => generate_synthetic_bars(*bars, seed, *start_price),
    }
}

/// Load data and run once.
pub fn run_single(config: &RunConfig) -> Result<RunReport, RunError> {
    let data = load_data(&config.data)?;
    run_from_data(&data, &config.engine, &config.display_label())
}

/// Run on already loaded bars.
pub fn run_from_data(
    data: &LoadedData,
    engine: &EngineConfig,
    label: &str,
) -> Result<RunReport, RunError> {
    let market = MarketData::build(&data.series, engine).map_err(EngineError::from)?;
    run_from_market(data, &market, engine, label)
}

/// Run on market data prepared from `data`.
///
/// `market` must have been built from `data.series` with the same market and
/// zone parameters as `engine`.
pub fn run_from_market(
    data: &LoadedData,
    market: &MarketData,
    engine: &EngineConfig,
    label: &str,
) -> Result<RunReport, RunError> {
    let result = run_backtest(market, engine)?;
    let stamp = |t: Option<chrono::NaiveDateTime>| t.map(|t| t.to_string()).unwrap_or_default();

    info!(
        label,
        trades = result.summary.total_trades,
        total_r = result.summary.total_r,
        "run finished"
    );

    Ok(RunReport {
        schema_version: SCHEMA_VERSION,
        label: label.to_string(),
        config_fingerprint: engine.fingerprint(),
        dataset_hash: data.dataset_hash.clone(),
        has_synthetic: data.has_synthetic,
        bar_count: market.len(),
        start: stamp(market.execution.first_timestamp()),
        end: stamp(market.execution.last_timestamp()),
        summary: result.summary,
        gate: result.gate,
        counters: result.counters,
        trades: result.trades,
    })
}
