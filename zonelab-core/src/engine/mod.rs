//! Backtesting engine: precomputed market view, per-bar state machines and the
//! event loop that drives them.

pub mod entry;
pub mod error;
pub mod exits;
pub mod fills;
pub mod ledger;
pub mod loop_runner;
pub mod order_book;
pub mod precompute;
pub mod window;

pub use entry::entry_candidate;
pub use error::EngineError;
pub use exits::{evaluate_exit, ExitSignal};
pub use fills::{open_position, protective_stop, StopLevel, StopSource};
pub use ledger::{
    equity_curve_r, max_drawdown_r, median, profit_factor, win_rate_pct, ReasonCounts, Summary,
};
pub use loop_runner::{backtest, run_backtest, run_backtest_with_zones, RunCounters, RunResult};
pub use order_book::OrderBook;
pub use precompute::MarketData;
pub use window::{EntryWindow, WindowState, ZoneSide};
