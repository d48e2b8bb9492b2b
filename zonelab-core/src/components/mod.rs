//! Signal components the bar loop consults: regime gate, zone heatmap, edge score.

pub mod edge;
pub mod regime;
pub mod zones;

pub use edge::{edge_series, structure_score, EdgeSeries, EDGE_WEIGHTS};
pub use regime::{
    classify_series, classify_threshold, regime_for_bucket, GateStats, Hysteresis,
};
pub use zones::{
    AnchorLevels, Heatmap, HeatmapBuilder, Zone, ZoneCache, ZoneSource, ZoneVotes, MAX_BUCKETS,
};
