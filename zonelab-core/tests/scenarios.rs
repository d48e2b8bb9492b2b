//! End-to-end engine scenarios on hand-built bar series.
//!
//! 1. Breakout LONG in a forced-TREND uptrend, closed by STRUCT on a decline
//! 2. Forced-RANGE reversal stops on both sides of a fixed zone
//! 3. Window TTL paused while a position is held
//! 4. Orders armed before a trade stay live and fill after it closes
//! 5. Flat series: zero ATR, no zones, no windows, no trades
//! 6. Hysteresis gate vs single threshold on a slope peak inside the deadband
//! 7. Determinism and sweep-style reuse of one `MarketData`

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use zonelab_core::components::{classify_series, Heatmap, Zone, ZoneSource, ZoneVotes};
use zonelab_core::config::{EngineConfig, RegimeMode};
use zonelab_core::domain::{Bar, BarSeries, EntryKind, ExitReason, Regime, Side, Timeframe};
use zonelab_core::engine::{backtest, run_backtest, run_backtest_with_zones, MarketData};
use zonelab_core::indicators::SlopeSigma;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// One-minute bars from a path of price ticks: close = 1 + 0.01 * tick, open =
/// previous close, high/low spanning the body.
fn bars_from_ticks(ticks: &[i32]) -> BarSeries {
    let price = |t: i32| 1.0 + 0.01 * t as f64;
    let mut prev = price(ticks[0] - 1);
    let bars = ticks
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            let close = price(t);
            let bar = Bar {
                timestamp: start() + Duration::minutes(i as i64),
                open: prev,
                high: prev.max(close),
                low: prev.min(close),
                close,
                volume: 100.0,
                spread: None,
            };
            prev = close;
            bar
        })
        .collect();
    BarSeries::new(bars).unwrap()
}

/// A single full-score zone half a tick above the previous close.
struct ZoneAbovePrice;

impl ZoneSource for ZoneAbovePrice {
    fn heatmap_at(&self, market: &MarketData, i: usize) -> Heatmap {
        Heatmap::from_zones(vec![Zone {
            bucket: 0,
            level: market.execution[i - 1].close + 0.005,
            score: 100.0,
            votes: ZoneVotes::default(),
        }])
    }
}

fn trend_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.market.execution_timeframe = Timeframe::M1;
    config.market.anchor_timeframe = Timeframe::minutes(2).unwrap();
    config.market.atr_period = 3;
    config.regime = RegimeMode::Forced {
        regime: Regime::Trend,
    };
    config.exit.burst_confirm_run = 2;
    config
}

#[test]
fn uptrend_breakout_exits_on_structure() {
    // 200 rising bars, then 5 falling
    let mut ticks: Vec<i32> = (1..=200).collect();
    ticks.extend((195..=199).rev());
    let series = bars_from_ticks(&ticks);
    let config = trend_config();
    let market = MarketData::build(&series, &config).unwrap();

    let result = run_backtest_with_zones(&market, &config, &ZoneAbovePrice).unwrap();

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.side, Side::Long);
    assert_eq!(trade.kind, EntryKind::Breakout);
    assert!(trade.entry_bar < 20, "filled at bar {}", trade.entry_bar);
    assert_eq!(trade.entry_bar, 6);
    // swing high (close of bar 5) + 0.12 * ATR 0.01
    assert!((trade.entry_price - 1.0612).abs() < 1e-9);
    // no pivot below entry: (2.5 + 0.2) * ATR(anchor) 0.02
    assert!((trade.entry_price - trade.stop - 0.054).abs() < 1e-9);

    // decline starts at bar 200; lows fall strictly from bar 201
    assert_eq!(trade.reason, ExitReason::Struct);
    assert_eq!(trade.exit_bar, 203);
    assert_eq!(trade.exit_price, series[203].close);
    assert!(trade.exit_price > trade.stop);
    assert!(trade.result_r > 0.0);

    assert_eq!(result.counters.orders_armed, 1);
    assert_eq!(result.counters.orders_unfilled, 0);
    assert_eq!(result.summary.reason_counts.structure, 1);
    assert_eq!(result.gate.trend_pct, 100.0);
}

#[test]
fn open_position_is_closed_at_end_of_data() {
    let ticks: Vec<i32> = (1..=60).collect();
    let series = bars_from_ticks(&ticks);
    let config = trend_config();
    let market = MarketData::build(&series, &config).unwrap();

    let result = run_backtest_with_zones(&market, &config, &ZoneAbovePrice).unwrap();
    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.reason, ExitReason::End);
    assert_eq!(trade.exit_bar, 59);
    assert_eq!(trade.exit_price, series[59].close);
    assert_eq!(trade.bars_held, 54);
}

// ── Scripted market: fixed zone, unit ATR, strong edge, no momentum ──

const FLAT: (f64, f64, f64, f64) = (100.0, 100.5, 99.5, 100.0);

fn ohlc_series(data: &[(f64, f64, f64, f64)]) -> BarSeries {
    let bars = data
        .iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: start() + Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume: 100.0,
            spread: None,
        })
        .collect();
    BarSeries::new(bars).unwrap()
}

/// One full-score zone at a fixed level.
struct FixedZone(f64);

impl ZoneSource for FixedZone {
    fn heatmap_at(&self, _market: &MarketData, _i: usize) -> Heatmap {
        Heatmap::from_zones(vec![Zone {
            bucket: 0,
            level: self.0,
            score: 100.0,
            votes: ZoneVotes::default(),
        }])
    }
}

fn forced_config(regime: Regime) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.market.execution_timeframe = Timeframe::M1;
    config.market.anchor_timeframe = Timeframe::minutes(2).unwrap();
    config.regime = RegimeMode::Forced { regime };
    config
}

/// Both ATRs pinned to 1.0, both edges at 0.7, no RSI bursts and no anchor
/// pivots, so stops use the 2.7 ATR fallback.
fn scripted_market(series: &BarSeries, config: &EngineConfig) -> MarketData {
    let mut md = MarketData::build(series, config).unwrap();
    md.exec_atr = vec![1.0; md.len()];
    md.anchor_atr = vec![1.0; md.anchor.len()];
    md.edge.long = vec![0.7; md.len()];
    md.edge.short = vec![0.7; md.len()];
    md.rsi_change = vec![0.0; md.len()];
    md.anchor_pivots.clear();
    md
}

#[test]
fn range_regime_fades_the_zone_with_reversal_stops() {
    // bar 7 pierces both swing extremes
    let mut data = vec![FLAT; 10];
    data[7] = (100.0, 100.7, 99.0, 100.0);
    let series = ohlc_series(&data);
    let config = forced_config(Regime::Range);
    let market = scripted_market(&series, &config);

    // zone above the close: SELL stop under the 6-bar swing low
    let up = run_backtest_with_zones(&market, &config, &FixedZone(100.2)).unwrap();
    assert_eq!(up.trades.len(), 1);
    let trade = &up.trades[0];
    assert_eq!(trade.side, Side::Short);
    assert_eq!(trade.kind, EntryKind::Reversal);
    assert_eq!(trade.regime, Regime::Range);
    // armed on bar 6, the first bar with a full swing lookback
    assert_eq!(trade.order_time, series[6].timestamp);
    assert_eq!(trade.entry_bar, 7);
    assert!((trade.entry_price - 99.4).abs() < 1e-9);
    assert!((trade.stop - 102.1).abs() < 1e-9);
    assert_eq!(trade.reason, ExitReason::End);
    assert_eq!(trade.exit_bar, 9);

    // zone below the close: BUY stop over the 6-bar swing high
    let down = run_backtest_with_zones(&market, &config, &FixedZone(99.8)).unwrap();
    assert_eq!(down.trades.len(), 1);
    let trade = &down.trades[0];
    assert_eq!(trade.side, Side::Long);
    assert_eq!(trade.kind, EntryKind::Reversal);
    assert_eq!(trade.entry_bar, 7);
    assert!((trade.entry_price - 100.6).abs() < 1e-9);
    assert!((trade.stop - 97.9).abs() < 1e-9);

    for result in [&up, &down] {
        assert_eq!(result.counters.windows_opened, 1);
        assert_eq!(result.counters.orders_armed, 1);
        assert_eq!(result.counters.orders_unfilled, 0);
        assert_eq!(result.gate.trend_pct, 0.0);
    }
}

#[test]
fn window_ttl_is_paused_while_in_a_position() {
    let mut data = vec![FLAT; 15];
    data[2] = (100.0, 100.7, 99.5, 100.0);
    // two lower lows close the long by STRUCT on bar 12
    data[10] = (100.0, 100.5, 99.3, 100.0);
    data[11] = (100.0, 100.5, 99.1, 100.0);
    let series = ohlc_series(&data);
    let mut config = forced_config(Regime::Trend);
    config.entry.swing_lookback = 2;
    config.window.ttl_bars = 3;
    config.window.cooldown_bars = 1;
    let market = scripted_market(&series, &config);

    let result = run_backtest_with_zones(&market, &config, &FixedZone(100.2)).unwrap();

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.side, Side::Long);
    assert_eq!(trade.entry_bar, 2);
    assert!((trade.entry_price - 100.62).abs() < 1e-9);
    assert_eq!(trade.reason, ExitReason::Struct);
    assert_eq!(trade.exit_bar, 12);
    assert!(trade.exit_bar - trade.entry_bar > config.window.ttl_bars as usize);

    // The window reopened on bar 4 after its one-bar cooldown and sat out the
    // whole hold with its TTL intact; it arms again on bar 13 without
    // expiring and reopening in between.
    assert_eq!(result.counters.windows_opened, 2);
    assert_eq!(result.counters.orders_armed, 2);
    assert_eq!(result.counters.orders_unfilled, 1);
}

#[test]
fn order_armed_before_a_trade_fills_after_it_closes() {
    let data = [
        (100.0, 101.0, 99.5, 100.0),
        (100.0, 101.0, 99.5, 100.0),
        FLAT,
        FLAT,
        // fills the second order only
        (100.0, 100.7, 99.5, 100.0),
        (100.0, 100.5, 99.3, 100.0),
        (100.0, 100.5, 99.1, 100.0),
        FLAT,
        // reaches the first order's trigger
        (100.0, 101.2, 99.5, 100.0),
        FLAT,
    ];
    let series = ohlc_series(&data);
    let mut config = forced_config(Regime::Trend);
    config.entry.swing_lookback = 2;
    config.window.cooldown_bars = 1;
    let market = scripted_market(&series, &config);

    let result = run_backtest_with_zones(&market, &config, &FixedZone(100.2)).unwrap();

    assert_eq!(result.trades.len(), 2);
    let first = &result.trades[0];
    assert_eq!(first.order_time, series[4].timestamp);
    assert_eq!(first.entry_bar, 4);
    assert!((first.entry_price - 100.62).abs() < 1e-9);
    assert_eq!(first.reason, ExitReason::Struct);
    assert_eq!(first.exit_bar, 7);

    // armed on bar 2 above the 101.0 swing high, untouched until bar 8
    let second = &result.trades[1];
    assert_eq!(second.order_time, series[2].timestamp);
    assert_eq!(second.entry_bar, 8);
    assert!((second.entry_price - 101.12).abs() < 1e-9);
    assert_eq!(second.reason, ExitReason::End);
    assert_eq!(second.exit_bar, 9);

    // the order armed on bar 8 is still waiting
    assert_eq!(result.counters.windows_opened, 3);
    assert_eq!(result.counters.orders_armed, 3);
    assert_eq!(result.counters.orders_unfilled, 1);
}

#[test]
fn flat_series_never_trades() {
    let bars: Vec<Bar> = (0..600)
        .map(|i| Bar {
            timestamp: start() + Duration::minutes(i),
            open: 1.5,
            high: 1.5,
            low: 1.5,
            close: 1.5,
            volume: 10.0,
            spread: Some(10.0),
        })
        .collect();
    let series = BarSeries::new(bars).unwrap();
    let mut config = EngineConfig::default();
    config.market.anchor_timeframe = Timeframe::minutes(15).unwrap();
    config.zone.lookback = 60;
    config.zone.min_bars = 30;

    let market = MarketData::build(&series, &config).unwrap();
    assert!(market.exec_atr.iter().skip(20).all(|&a| a == 0.0));

    let result = run_backtest(&market, &config).unwrap();
    assert!(result.trades.is_empty());
    assert_eq!(result.counters.windows_opened, 0);
    assert_eq!(result.counters.orders_armed, 0);
    assert!(result.counters.zone_rebuilds > 0);
    assert_eq!(result.summary.total_trades, 0);
    assert_eq!(result.summary.profit_factor, 0.0);
    assert_eq!(result.gate.switches, 0);
}

#[test]
fn deadband_suppresses_threshold_flip() {
    let stats: Vec<SlopeSigma> = [0.0, 0.0010, 0.0015, 0.0020, 0.0015, 0.0010, 0.0]
        .iter()
        .map(|&slope| SlopeSigma { slope, sigma: 1.0 })
        .collect();

    let gated = classify_series(
        &RegimeMode::Hysteresis {
            enter_coef: 0.0022,
            exit_coef: 0.0018,
        },
        &stats,
    );
    assert!(gated.iter().all(|&r| r == Regime::Range));

    let plain = classify_series(&RegimeMode::Threshold { coef: 0.002 }, &stats);
    assert_eq!(plain[3], Regime::Trend);
}

fn random_walk(n: usize, seed: u64) -> BarSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 150.0_f64;
    let bars = (0..n)
        .map(|i| {
            let open = price;
            let close = open + rng.gen_range(-0.06..0.06);
            let bar = Bar {
                timestamp: start() + Duration::minutes(i as i64),
                open,
                high: open.max(close) + rng.gen_range(0.0..0.03),
                low: open.min(close) - rng.gen_range(0.0..0.03),
                close,
                volume: rng.gen_range(1.0..50.0),
                spread: Some(rng.gen_range(2.0..12.0)),
            };
            price = close;
            bar
        })
        .collect();
    BarSeries::new(bars).unwrap()
}

#[test]
fn identical_inputs_give_identical_results() {
    let series = random_walk(6_000, 7);
    let config = EngineConfig::default();
    let a = backtest(&series, &config).unwrap();
    let b = backtest(&series, &config).unwrap();
    assert_eq!(a.trades, b.trades);
    assert_eq!(
        serde_json::to_string(&a.summary).unwrap(),
        serde_json::to_string(&b.summary).unwrap()
    );
    assert_eq!(a.counters, b.counters);
}

#[test]
fn shared_market_data_serves_parameter_variants() {
    let series = random_walk(6_000, 11);
    let config = EngineConfig::default();
    let market = MarketData::build(&series, &config).unwrap();

    for cap in [2.0, 3.0, 4.0] {
        let mut variant = config.clone();
        variant.stop.atr_cap = Some(cap);
        let shared = run_backtest(&market, &variant).unwrap();
        let fresh = backtest(&series, &variant).unwrap();
        assert_eq!(shared.trades, fresh.trades);
        for t in &shared.trades {
            let atr = market.anchor_atr_at(t.entry_bar).unwrap();
            assert!(t.risk > 0.0);
            assert!(t.risk <= cap * atr + 1e-9);
        }
    }
}
