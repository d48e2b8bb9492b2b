//! ZoneLab Core: deterministic zone-window backtesting over multi-timeframe bars.
//!
//! - Domain types (bars, timeframes, orders, positions, trades)
//! - Resampling and timeframe alignment
//! - Indicators (ATR, EMA, RSI, pivots, regression slope/sigma, VWAP)
//! - Regime gate, support/resistance heatmap and edge score
//! - Entry window, order book, protective stops and exit rules
//! - Bar-by-bar event loop and trade ledger

pub mod components;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;

pub use config::{ConfigError, EngineConfig, RegimeMode};
pub use domain::{Bar, BarError, BarSeries, Timeframe, Trade};
pub use engine::{backtest, run_backtest, EngineError, MarketData, RunResult, Summary};
