//! Errors that stop a run.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::BarError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bars(#[from] BarError),

    /// A fill produced a zero or non-finite risk unit.
    #[error("invalid stop at bar {bar} ({timestamp}): entry {entry}, stop {stop}")]
    InvalidStop {
        bar: usize,
        timestamp: NaiveDateTime,
        entry: f64,
        stop: f64,
    },
}
