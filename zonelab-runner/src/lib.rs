//! ZoneLab Runner: run orchestration on top of `zonelab-core`.
//!
//! - Bar loading from headerless CSV, or seeded synthetic bars
//! - Single runs with provenance (config fingerprint, dataset hash)
//! - Parallel stop-cap and regime-gate sweeps over one shared market view
//! - JSON/CSV export and artifact bundles

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod sweep;

pub use config::{ConfigError, DataConfig, RunConfig, RunId};
pub use data_loader::{
    compute_dataset_hash, generate_synthetic_bars, load_csv, read_csv, LoadError, LoadOptions,
    LoadedData,
};
pub use export::{
    export_json, export_summary_csv, export_trades_csv, import_json, save_artifacts,
    save_sweep_artifacts,
};
pub use runner::{load_data, run_from_data, run_from_market, run_single, RunError, RunReport};
pub use sweep::{cap_sweep, gate_compare, SweepReport, Variant, DEFAULT_CAPS};
