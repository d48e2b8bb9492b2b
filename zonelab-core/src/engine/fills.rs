//! Turning a triggered order into a position: protective stop, risk unit and
//! spread cost.

use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::{PendingOrder, Position, Side};
use crate::indicators::PivotKind;

use super::error::EngineError;
use super::precompute::MarketData;

/// How the stop level was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSource {
    /// Beyond the most recent confirmed anchor pivot.
    Pivot,
    /// Fixed ATR(anchor) distance, no pivot qualified.
    Fallback,
    /// The ATR cap was tighter than the structural stop.
    Cap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopLevel {
    pub price: f64,
    pub source: StopSource,
}

/// Protective stop for a `side` entry at `entry` filled on execution bar `i`.
///
/// NaN when ATR(anchor) is undefined at `i`.
pub fn protective_stop(
    market: &MarketData,
    i: usize,
    side: Side,
    entry: f64,
    config: &EngineConfig,
) -> StopLevel {
    let s = &config.stop;
    let atr = market.anchor_atr_at(i).unwrap_or(f64::NAN);
    let sign = side.sign();

    let pivot = match side {
        Side::Long => market.recent_anchor_pivot(i, PivotKind::Low, s.pivot_lookback, |p| p < entry),
        Side::Short => {
            market.recent_anchor_pivot(i, PivotKind::High, s.pivot_lookback, |p| p > entry)
        }
    };
    let mut stop = match pivot {
        Some(p) => StopLevel {
            price: p.price - sign * s.extra_atr * atr,
            source: StopSource::Pivot,
        },
        None => StopLevel {
            price: entry - sign * (s.fallback_atr + s.extra_atr) * atr,
            source: StopSource::Fallback,
        },
    };

    if let Some(cap) = s.atr_cap {
        let capped = entry - sign * cap * atr;
        if (entry - capped).abs() < (entry - stop.price).abs() {
            stop = StopLevel {
                price: capped,
                source: StopSource::Cap,
            };
        }
    }
    stop
}

/// Open a position from `order` filled at its trigger on bar `i`.
pub fn open_position(
    market: &MarketData,
    i: usize,
    order: &PendingOrder,
    config: &EngineConfig,
) -> Result<Position, EngineError> {
    let bar = &market.execution[i];
    let side = order.side.position_side();
    let entry = order.trigger;
    let stop = protective_stop(market, i, side, entry, config);

    let risk = (entry - stop.price).abs();
    if !(risk.is_finite() && risk > 0.0) {
        return Err(EngineError::InvalidStop {
            bar: i,
            timestamp: bar.timestamp,
            entry,
            stop: stop.price,
        });
    }
    let spread_price = bar.spread.unwrap_or(0.0) * config.market.point_value;

    debug!(
        bar = i,
        %side,
        entry,
        stop = stop.price,
        source = ?stop.source,
        risk,
        "order filled"
    );

    Ok(Position {
        side,
        entry_price: entry,
        stop: stop.price,
        risk,
        order_time: order.origin_time,
        entry_time: bar.timestamp,
        entry_bar: i,
        spread_r: spread_price / risk,
        regime: order.regime,
        kind: order.kind,
        weak_edge_streak: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StopConfig;
    use crate::domain::{BarSeries, EntryKind, OrderSide, Regime, Timeframe};
    use crate::indicators::{make_bars, PivotPoint};

    fn config(atr_cap: Option<f64>) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.market.execution_timeframe = Timeframe::M1;
        config.market.anchor_timeframe = Timeframe::M5;
        config.zone.pivot_radius = 2;
        config.stop = StopConfig {
            atr_cap,
            ..StopConfig::default()
        };
        config
    }

    /// 60 one-minute bars, anchor ATR pinned at 1.0.
    fn market(config: &EngineConfig) -> MarketData {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i % 3) as f64 * 0.1).collect();
        let series = BarSeries::new(make_bars(&closes)).unwrap();
        let mut md = MarketData::build(&series, config).unwrap();
        md.anchor_atr = vec![1.0; md.anchor.len()];
        md.anchor_pivots.clear();
        md
    }

    fn pivot(index: usize, price: f64, kind: PivotKind) -> PivotPoint {
        PivotPoint {
            index,
            timestamp: chrono::NaiveDateTime::default(),
            price,
            kind,
        }
    }

    fn order(side: OrderSide, trigger: f64) -> PendingOrder {
        PendingOrder {
            side,
            trigger,
            origin_time: chrono::NaiveDateTime::default(),
            origin_bar: 40,
            regime: Regime::Trend,
            kind: EntryKind::Breakout,
        }
    }

    #[test]
    fn fallback_stop_without_pivot() {
        let cfg = config(None);
        let md = market(&cfg);
        let stop = protective_stop(&md, 50, Side::Long, 100.0, &cfg);
        assert_eq!(stop.source, StopSource::Fallback);
        assert!((stop.price - (100.0 - 2.7)).abs() < 1e-12);

        let stop = protective_stop(&md, 50, Side::Short, 100.0, &cfg);
        assert!((stop.price - 102.7).abs() < 1e-12);
    }

    #[test]
    fn confirmed_pivot_beyond_entry_sets_stop() {
        let cfg = config(None);
        let mut md = market(&cfg);
        // bar 50 sits in anchor bucket 10; last completed anchor is 9
        md.anchor_pivots = vec![
            pivot(3, 99.0, PivotKind::Low),
            pivot(6, 99.5, PivotKind::Low),
            pivot(8, 99.8, PivotKind::Low), // 8 + 2 > 9: unconfirmed
            pivot(7, 100.2, PivotKind::Low), // not below entry
        ];
        md.anchor_pivots.sort_by_key(|p| p.index);
        let stop = protective_stop(&md, 50, Side::Long, 100.0, &cfg);
        assert_eq!(stop.source, StopSource::Pivot);
        assert!((stop.price - 99.3).abs() < 1e-12);
    }

    #[test]
    fn cap_selects_tighter_stop() {
        let cfg = config(Some(2.0));
        let md = market(&cfg);
        let stop = protective_stop(&md, 50, Side::Long, 100.0, &cfg);
        assert_eq!(stop.source, StopSource::Cap);
        assert!((stop.price - 98.0).abs() < 1e-12);

        let cfg = config(Some(4.0));
        let stop = protective_stop(&md, 50, Side::Long, 100.0, &cfg);
        assert_eq!(stop.source, StopSource::Fallback);
    }

    #[test]
    fn open_position_records_risk_and_spread() {
        let cfg = config(None);
        let mut md = market(&cfg);
        let mut bars = md.execution.clone().into_bars();
        bars[50].spread = Some(27.0);
        md.execution = BarSeries::new(bars).unwrap();

        let pos = open_position(&md, 50, &order(OrderSide::Sell, 100.0), &cfg).unwrap();
        assert_eq!(pos.side, Side::Short);
        assert!((pos.risk - 2.7).abs() < 1e-12);
        // 27 points * 0.001 / 2.7
        assert!((pos.spread_r - 0.01).abs() < 1e-12);
        assert_eq!(pos.entry_bar, 50);
    }

    #[test]
    fn undefined_anchor_atr_is_an_error() {
        let cfg = config(None);
        let mut md = market(&cfg);
        md.anchor_atr = vec![f64::NAN; md.anchor.len()];
        let err = open_position(&md, 50, &order(OrderSide::Buy, 100.0), &cfg).unwrap_err();
        assert!(matches!(err, EngineError::InvalidStop { bar: 50, .. }));
    }
}
