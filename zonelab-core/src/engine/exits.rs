//! Exit rules for an open position, evaluated once per bar including the fill
//! bar. Priority is STRUCT, BURST, EDGE, SL; the first match wins.

use crate::config::ExitConfig;
use crate::domain::{ExitReason, Position, Side};
use crate::indicators::{falling_lows, rising_highs};

use super::precompute::MarketData;

/// A triggered exit and its fill price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitSignal {
    pub reason: ExitReason,
    pub price: f64,
}

/// `run` completed bars each extending against `side`.
fn adverse_run(market: &MarketData, i: usize, side: Side, run: usize) -> bool {
    match side {
        Side::Long => falling_lows(&market.execution, i, run),
        Side::Short => rising_highs(&market.execution, i, run),
    }
}

fn burst(market: &MarketData, i: usize, side: Side, config: &ExitConfig) -> bool {
    let Some(change) = i.checked_sub(1).and_then(|p| market.rsi_change.get(p)) else {
        return false;
    };
    let against = match side {
        Side::Long => *change <= -config.burst_delta,
        Side::Short => *change >= config.burst_delta,
    };
    against
        && (config.burst_confirm_run == 0
            || adverse_run(market, i, side, config.burst_confirm_run))
}

/// Evaluate bar `i`. Updates the position's weak-edge streak.
pub fn evaluate_exit(
    market: &MarketData,
    i: usize,
    position: &mut Position,
    config: &ExitConfig,
) -> Option<ExitSignal> {
    let bar = &market.execution[i];
    let side = position.side;
    let at_close = |reason| {
        Some(ExitSignal {
            reason,
            price: bar.close,
        })
    };

    if adverse_run(market, i, side, config.struct_run) {
        return at_close(ExitReason::Struct);
    }
    if burst(market, i, side, config) {
        return at_close(ExitReason::Burst);
    }

    let edge = i
        .checked_sub(1)
        .map(|p| market.edge.at(side, p))
        .unwrap_or(0.5);
    if edge < config.edge_threshold {
        position.weak_edge_streak += 1;
    } else {
        position.weak_edge_streak = 0;
    }
    if position.weak_edge_streak >= config.edge_bars {
        return at_close(ExitReason::Edge);
    }

    let stopped = match side {
        Side::Long => bar.low <= position.stop,
        Side::Short => bar.high >= position.stop,
    };
    stopped.then_some(ExitSignal {
        reason: ExitReason::Sl,
        price: position.stop,
    })
}
