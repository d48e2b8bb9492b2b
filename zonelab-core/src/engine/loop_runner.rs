//! Bar-by-bar event loop.
//!
//! Per execution bar, in fixed order:
//! 1. Regime lookup and zone cache refresh
//! 2. Window transition (cooldown countdown, open on a qualifying zone)
//! 3. Entry evaluation (TTL/drift check, arm an order)
//! 4. Order fill (flat only)
//! 5. Exit evaluation
//!
//! A position still open after the last bar closes with END.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::components::{
    classify_series, regime_for_bucket, GateStats, HeatmapBuilder, ZoneCache, ZoneSource,
};
use crate::config::EngineConfig;
use crate::domain::{BarSeries, ExitReason, Position, Trade};

use super::entry::entry_candidate;
use super::error::EngineError;
use super::exits::evaluate_exit;
use super::fills::open_position;
use super::ledger::Summary;
use super::order_book::OrderBook;
use super::precompute::MarketData;
use super::window::EntryWindow;

/// Event counts for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunCounters {
    pub zone_rebuilds: usize,
    pub windows_opened: usize,
    pub orders_armed: usize,
    /// Orders still armed when the series ended.
    pub orders_unfilled: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: Vec<Trade>,
    pub summary: Summary,
    pub gate: GateStats,
    pub counters: RunCounters,
}

/// Prepare market data from `bars` and run once.
pub fn backtest(bars: &BarSeries, config: &EngineConfig) -> Result<RunResult, EngineError> {
    let market = MarketData::build(bars, config)?;
    run_backtest(&market, config)
}

/// Run on prepared market data with the confluence heatmap.
pub fn run_backtest(market: &MarketData, config: &EngineConfig) -> Result<RunResult, EngineError> {
    let zones = HeatmapBuilder::new(config.zone.clone(), config.market.pip_size);
    run_backtest_with_zones(market, config, &zones)
}

/// Run with an arbitrary zone source.
///
/// `market` must have been built with the same market and zone sections as
/// `config`; regime, window, entry, stop and exit parameters may differ.
pub fn run_backtest_with_zones(
    market: &MarketData,
    config: &EngineConfig,
    zones: &dyn ZoneSource,
) -> Result<RunResult, EngineError> {
    config.validate()?;
    let bars = market.execution.bars();
    let labels = classify_series(&config.regime, &market.anchor_trend);
    let gate = GateStats::from_labels(&labels);

    let mut cache = ZoneCache::new();
    let mut window = EntryWindow::new(config.window.clone());
    let mut book = OrderBook::new();
    let mut position: Option<Position> = None;
    let mut trades: Vec<Trade> = Vec::new();

    for i in 1..bars.len() {
        let bar = &bars[i];
        let reference = bars[i - 1].close;
        let anchor_atr = market.anchor_atr_at(i);

        // ─── Regime & zone cache ───
        let regime = regime_for_bucket(&labels, market.anchor_index[i]);
        let key = config.market.anchor_timeframe.bucket_start(bar.timestamp);
        if cache.refresh(key, || zones.heatmap_at(market, i)) {
            debug!(bar = i, %key, zones = cache.heatmap().zones().len(), "heatmap rebuilt");
        }
        let zone = cache.heatmap().nearest(reference, config.zone.candidates);

        // ─── Window transition ───
        window.begin_bar();
        if window.try_open(zone, reference, anchor_atr, config.zone.score_threshold) {
            debug!(bar = i, state = ?window.state(), "window opened");
        }

        // ─── Entry evaluation ───
        if position.is_none() {
            if let Some(zone_side) = window.tick(reference, anchor_atr) {
                if let Some(order) = entry_candidate(market, i, zone_side, regime, config) {
                    debug!(
                        bar = i,
                        side = ?order.side,
                        trigger = order.trigger,
                        %regime,
                        "order armed"
                    );
                    book.arm(order);
                    window.arm();
                }
            }
        }

        // ─── Order fill ───
        if position.is_none() {
            if let Some(order) = book.take_fill(bar.high, bar.low) {
                position = Some(open_position(market, i, &order, config)?);
            }
        }

        // ─── Exit evaluation ───
        let exit = position
            .as_mut()
            .and_then(|pos| evaluate_exit(market, i, pos, &config.exit));
        if let Some(exit) = exit {
            if let Some(pos) = position.take() {
                debug!(bar = i, reason = %exit.reason, price = exit.price, "position closed");
                trades.push(pos.close(
                    exit.price,
                    bar.timestamp,
                    i,
                    exit.reason,
                    config.market.pip_size,
                ));
            }
        }
    }

    if let (Some(pos), Some(last)) = (position.take(), bars.last()) {
        debug!(bar = bars.len() - 1, "closing open position at end of data");
        trades.push(pos.close(
            last.close,
            last.timestamp,
            bars.len() - 1,
            ExitReason::End,
            config.market.pip_size,
        ));
    }

    let counters = RunCounters {
        zone_rebuilds: cache.rebuilds(),
        windows_opened: window.opened(),
        orders_armed: book.armed_total(),
        orders_unfilled: book.len(),
    };
    if counters.orders_unfilled > 0 {
        warn!(count = counters.orders_unfilled, "orders left unfilled at end of data");
    }

    let summary = Summary::from_trades(&trades);
    info!(
        trades = summary.total_trades,
        total_r = summary.total_r,
        win_rate_pct = summary.win_rate_pct,
        max_drawdown_r = summary.max_drawdown_r,
        "backtest complete"
    );

    Ok(RunResult {
        trades,
        summary,
        gate,
        counters,
    })
}
