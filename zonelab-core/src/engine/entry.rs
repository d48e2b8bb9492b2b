//! Entry candidates from an open window.
//!
//! TREND trades the breakout toward the zone; RANGE fades it with a reversal
//! stop on the opposite side of the recent swing.
//!
//! | regime | zone | order | trigger                         | edge  |
//! |--------|------|-------|---------------------------------|-------|
//! | TREND  | UP   | BUY   | swing high + breakout buffer    | LONG  |
//! | TREND  | DOWN | SELL  | swing low - breakout buffer     | SHORT |
//! | RANGE  | UP   | SELL  | swing low - reversal buffer     | SHORT |
//! | RANGE  | DOWN | BUY   | swing high + reversal buffer    | LONG  |

use crate::config::EngineConfig;
use crate::domain::{EntryKind, OrderSide, PendingOrder, Regime};
use crate::indicators::{highest_high_before, lowest_low_before};

use super::precompute::MarketData;
use super::window::ZoneSide;

/// The order an open window would arm on bar `i`, if the edge gate passes.
///
/// None during swing or ATR warm-up, or when the edge is below the entry threshold.
pub fn entry_candidate(
    market: &MarketData,
    i: usize,
    zone_side: ZoneSide,
    regime: Regime,
    config: &EngineConfig,
) -> Option<PendingOrder> {
    let e = &config.entry;
    let bars = market.execution.bars();
    let atr = market.exec_atr_at(i.checked_sub(1)?)?;

    let (kind, buffer) = match regime {
        Regime::Trend => (EntryKind::Breakout, e.breakout_buffer_atr),
        Regime::Range => (EntryKind::Reversal, e.reversal_buffer_atr),
    };
    let side = match (regime, zone_side) {
        (Regime::Trend, ZoneSide::Up) | (Regime::Range, ZoneSide::Down) => OrderSide::Buy,
        (Regime::Trend, ZoneSide::Down) | (Regime::Range, ZoneSide::Up) => OrderSide::Sell,
    };
    let trigger = match side {
        OrderSide::Buy => highest_high_before(bars, i, e.swing_lookback)? + buffer * atr,
        OrderSide::Sell => lowest_low_before(bars, i, e.swing_lookback)? - buffer * atr,
    };

    let edge = market.edge.at(side.position_side(), i - 1);
    if edge < e.edge_min {
        return None;
    }
    Some(PendingOrder {
        side,
        trigger,
        origin_time: bars[i].timestamp,
        origin_bar: i,
        regime,
        kind,
    })
}
