//! Support/resistance zone heatmap.
//!
//! Over the trailing window of execution bars, the price range is cut into
//! buckets of `pip_size * bucket_pips`. Three signal families vote into buckets:
//! window pivots, the prior day's high/low plus today's open, and two VWAP
//! anchors (session and cumulative anchor VWAP). Weighted votes are normalized to
//! 0..100 by the best bucket.
//!
//! The heatmap is rebuilt only when the anchor bucket changes; [`ZoneCache`]
//! holds it in between and the nearest-zone query runs against the cached map.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ZoneConfig;
use crate::domain::Bar;
use crate::engine::MarketData;
use crate::indicators::detect_pivots;

/// Upper bound on buckets per heatmap; wider windows are skipped.
pub const MAX_BUCKETS: usize = 10_000;

/// Raw vote counts per signal family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneVotes {
    pub pivots: u32,
    pub daily: u32,
    pub vwap: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Bucket index, 0 at the window low.
    pub bucket: usize,
    /// Lower edge of the bucket.
    pub level: f64,
    /// 0..100.
    pub score: f64,
    pub votes: ZoneVotes,
}

/// Scored buckets covering one window's price range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Heatmap {
    zones: Vec<Zone>,
}

/// Levels voted by the day and VWAP signal families.
#[derive(Debug, Clone, Default)]
pub struct AnchorLevels {
    pub daily: Vec<f64>,
    pub vwap: Vec<f64>,
}

impl Heatmap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_zones(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Score a window. Too few bars, a degenerate range, or more than
    /// [`MAX_BUCKETS`] buckets gives an empty map.
    pub fn build(window: &[Bar], levels: &AnchorLevels, config: &ZoneConfig, pip_size: f64) -> Self {
        if window.len() < config.min_bars || window.is_empty() {
            return Self::empty();
        }
        let lo = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let hi = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let range = hi - lo;
        let width = pip_size * config.bucket_pips;
        if !(range.is_finite() && range > 0.0 && width > 0.0) {
            return Self::empty();
        }

        let spans = (range / width).ceil();
        if spans >= MAX_BUCKETS as f64 {
            debug!(range, width, max = MAX_BUCKETS, "too many heatmap buckets, skipping window");
            return Self::empty();
        }
        let n = spans as usize + 1;
        let bucket_of = |price: f64| -> usize {
            let raw = ((price - lo) / width).floor();
            if raw <= 0.0 {
                0
            } else {
                (raw as usize).min(n - 1)
            }
        };

        let mut votes = vec![ZoneVotes::default(); n];
        for pivot in detect_pivots(window, config.pivot_radius, config.tie_policy) {
            votes[bucket_of(pivot.price)].pivots += 1;
        }
        for &level in levels.daily.iter().filter(|l| l.is_finite()) {
            votes[bucket_of(level)].daily += 1;
        }
        for &level in levels.vwap.iter().filter(|l| l.is_finite()) {
            votes[bucket_of(level)].vwap += 1;
        }

        let w = &config.weights;
        let raw: Vec<f64> = votes
            .iter()
            .map(|v| w.pivots * v.pivots as f64 + w.daily * v.daily as f64 + w.vwap * v.vwap as f64)
            .collect();
        let max = raw.iter().copied().fold(0.0, f64::max);
        let norm = if max > 0.0 { max } else { 1.0 };

        let zones = votes
            .into_iter()
            .zip(raw)
            .enumerate()
            .map(|(bucket, (votes, r))| Zone {
                bucket,
                level: lo + bucket as f64 * width,
                score: r / norm * 100.0,
                votes,
            })
            .collect();
        Self { zones }
    }

    /// Among the `candidates` best-scoring buckets, the one closest to `price`.
    ///
    /// Ranking is by score, lower bucket first on equal score. Equal distances
    /// resolve to the higher score.
    pub fn nearest(&self, price: f64, candidates: usize) -> Option<&Zone> {
        let mut ranked: Vec<&Zone> = self.zones.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.bucket.cmp(&b.bucket)));

        let mut best: Option<&Zone> = None;
        for zone in ranked.into_iter().take(candidates) {
            best = match best {
                None => Some(zone),
                Some(current) => {
                    let d = (zone.level - price).abs();
                    let d_best = (current.level - price).abs();
                    if d < d_best || (d == d_best && zone.score > current.score) {
                        Some(zone)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        best
    }
}

/// Produces the heatmap seen by execution bar `i`.
///
/// Implementations may only read data from bars before `i`.
pub trait ZoneSource: Send + Sync {
    fn heatmap_at(&self, market: &MarketData, i: usize) -> Heatmap;
}

/// The confluence heatmap over the trailing execution window.
#[derive(Debug, Clone)]
pub struct HeatmapBuilder {
    config: ZoneConfig,
    pip_size: f64,
}

impl HeatmapBuilder {
    pub fn new(config: ZoneConfig, pip_size: f64) -> Self {
        Self { config, pip_size }
    }

    /// Day and VWAP levels known at the close of bar `i - 1`.
    pub fn anchor_levels(market: &MarketData, i: usize) -> AnchorLevels {
        let mut levels = AnchorLevels::default();
        let Some(last) = i.checked_sub(1) else {
            return levels;
        };

        if let Some(&d) = market.day_index.get(last) {
            if d >= 1 {
                let prev = &market.days[d - 1];
                levels.daily = vec![prev.high, prev.low, market.days[d].open];
            }
        }
        if let Some(&v) = market.session_vwap.get(last) {
            levels.vwap.push(v);
        }
        if let Some(h) = market.completed_anchor(i) {
            if let Some(&v) = market.anchor_vwap.get(h) {
                levels.vwap.push(v);
            }
        }
        levels
    }
}

impl ZoneSource for HeatmapBuilder {
    /// Scores the last `lookback` completed bars, `[i - lookback, i)`.
    fn heatmap_at(&self, market: &MarketData, i: usize) -> Heatmap {
        let end = i.min(market.len());
        let start = end.saturating_sub(self.config.lookback);
        let window = &market.execution[start..end];
        Heatmap::build(
            window,
            &Self::anchor_levels(market, end),
            &self.config,
            self.pip_size,
        )
    }
}

/// Run-owned heatmap cache keyed by the anchor bucket timestamp.
#[derive(Debug, Default)]
pub struct ZoneCache {
    key: Option<NaiveDateTime>,
    heatmap: Heatmap,
    rebuilds: usize,
}

impl ZoneCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild when `key` differs from the cached key. Returns true on rebuild.
    pub fn refresh(&mut self, key: NaiveDateTime, build: impl FnOnce() -> Heatmap) -> bool {
        if self.key == Some(key) {
            return false;
        }
        self.key = Some(key);
        self.heatmap = build();
        self.rebuilds += 1;
        true
    }

    pub fn heatmap(&self) -> &Heatmap {
        &self.heatmap
    }

    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    fn zone(bucket: usize, level: f64, score: f64) -> Zone {
        Zone {
            bucket,
            level,
            score,
            votes: ZoneVotes::default(),
        }
    }

    fn config(min_bars: usize) -> ZoneConfig {
        ZoneConfig {
            min_bars,
            pivot_radius: 1,
            ..ZoneConfig::default()
        }
    }

    #[test]
    fn short_window_is_empty() {
        let bars = make_ohlc_bars(&[(1.0, 1.1, 0.9, 1.0); 10]);
        let map = Heatmap::build(&bars, &AnchorLevels::default(), &config(60), 0.01);
        assert!(map.is_empty());
    }

    #[test]
    fn flat_window_is_empty() {
        let bars = make_ohlc_bars(&[(1.0, 1.0, 1.0, 1.0); 80]);
        let map = Heatmap::build(&bars, &AnchorLevels::default(), &config(60), 0.01);
        assert!(map.is_empty());
    }

    #[test]
    fn oversized_bucket_count_is_empty() {
        // range 0.2 at width 2e-8 needs ten million buckets
        let bars = make_ohlc_bars(&[(1.0, 1.1, 0.9, 1.0); 80]);
        let map = Heatmap::build(&bars, &AnchorLevels::default(), &config(60), 1e-8);
        assert!(map.is_empty());

        // just under the limit still builds
        let width = 0.2 / (MAX_BUCKETS as f64 - 2.0);
        let map = Heatmap::build(&bars, &AnchorLevels::default(), &config(60), width / 2.0);
        assert!(!map.is_empty());
        assert!(map.zones().len() <= MAX_BUCKETS);
    }

    #[test]
    fn buckets_span_range_and_normalize() {
        // pip 0.0625 × 2 → width 0.125; range 0.625 → 5 + 1 = 6 buckets
        let bars = make_ohlc_bars(&[
            (1.0, 1.125, 1.0, 1.0625),
            (1.0625, 1.625, 1.0625, 1.375),
            (1.375, 1.375, 1.25, 1.3125),
            (1.3125, 1.3125, 1.0, 1.125),
        ]);
        let levels = AnchorLevels {
            daily: vec![1.01, 1.6, f64::NAN],
            vwap: vec![1.3],
        };
        let map = Heatmap::build(&bars, &levels, &config(1), 0.0625);
        let z = map.zones();
        assert_eq!(z.len(), 6);
        assert_eq!(z[1].level, 1.125);

        // the only interior pivot is the 1.625 high
        assert_eq!(z[5].votes.pivots, 1);
        assert_eq!(z.iter().map(|z| z.votes.pivots).sum::<u32>(), 1);
        assert_eq!(z[0].votes.daily, 1);
        assert_eq!(z[4].votes.daily, 1);
        assert_eq!(z[2].votes.vwap, 1);

        // raw: b0 20, b2 50, b4 20, b5 30 → normalized by 50
        assert_eq!(z[2].score, 100.0);
        assert_eq!(z[5].score, 60.0);
        assert_eq!(z[0].score, 40.0);
        assert_eq!(z[4].score, 40.0);
        assert_eq!(z[3].score, 0.0);
    }

    #[test]
    fn builder_window_ends_at_previous_bar() {
        use crate::config::EngineConfig;
        use crate::domain::{BarSeries, Timeframe};

        let mut data = vec![(1.0, 1.1, 0.9, 1.0); 12];
        data[10] = (1.0, 1.6, 0.9, 1.0);
        let series = BarSeries::new(make_ohlc_bars(&data)).unwrap();
        let mut engine = EngineConfig::default();
        engine.market.execution_timeframe = Timeframe::M1;
        engine.market.anchor_timeframe = Timeframe::M5;
        let market = MarketData::build(&series, &engine).unwrap();
        let builder = HeatmapBuilder::new(
            ZoneConfig {
                lookback: 8,
                ..config(1)
            },
            0.05,
        );

        let top = |i: usize| {
            builder
                .heatmap_at(&market, i)
                .zones()
                .last()
                .map(|z| z.level)
                .unwrap()
        };
        // bar 10's spike is outside the window of bar 10 and inside that of bar 11
        assert!(top(10) < 1.25);
        assert!(top(11) >= 1.5);
    }

    #[test]
    fn nearest_prefers_closer_then_higher_score() {
        let map = Heatmap::from_zones(vec![
            zone(0, 1.0, 90.0),
            zone(1, 1.25, 60.0),
            zone(2, 1.5, 100.0),
            zone(3, 1.75, 70.0),
        ]);
        assert_eq!(map.nearest(1.26, 16).unwrap().bucket, 1);
        // equidistant between 1.5 (100) and 1.75 (70)
        assert_eq!(map.nearest(1.625, 16).unwrap().bucket, 2);
        // only the best two (buckets 2 and 0) are candidates
        assert_eq!(map.nearest(1.26, 2).unwrap().bucket, 2);
        assert!(Heatmap::empty().nearest(1.0, 16).is_none());
    }

    #[test]
    fn cache_rebuilds_only_on_key_change() {
        let t0 = make_ohlc_bars(&[(1.0, 1.0, 1.0, 1.0); 2]);
        let mut cache = ZoneCache::new();
        let mut calls = 0;
        assert!(cache.refresh(t0[0].timestamp, || {
            calls += 1;
            Heatmap::from_zones(vec![zone(0, 1.0, 100.0)])
        }));
        assert!(!cache.refresh(t0[0].timestamp, || {
            calls += 1;
            Heatmap::empty()
        }));
        assert_eq!(cache.heatmap().zones().len(), 1);
        assert!(cache.refresh(t0[1].timestamp, Heatmap::empty));
        assert!(cache.heatmap().is_empty());
        assert_eq!(calls, 1);
        assert_eq!(cache.rebuilds(), 2);
    }
}
