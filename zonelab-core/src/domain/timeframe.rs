//! Fixed-duration, epoch-aligned bar timeframes.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("invalid timeframe '{0}' (expected e.g. 1m, 5m, 1h, 1d)")]
pub struct TimeframeParseError(pub String);

/// A bucket duration in whole seconds.
///
/// Buckets are aligned to the Unix epoch, which coincides with midnight
/// alignment for every duration that divides a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    seconds: i64,
}

impl Timeframe {
    pub const M1: Timeframe = Timeframe { seconds: 60 };
    pub const M5: Timeframe = Timeframe { seconds: 300 };
    pub const H1: Timeframe = Timeframe { seconds: 3_600 };
    pub const D1: Timeframe = Timeframe { seconds: 86_400 };

    pub fn from_seconds(seconds: i64) -> Option<Self> {
        (seconds > 0).then_some(Self { seconds })
    }

    pub fn minutes(minutes: i64) -> Option<Self> {
        Self::from_seconds(minutes.checked_mul(60)?)
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Start of the bucket that contains `ts`.
    pub fn bucket_start(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let secs = ts.and_utc().timestamp();
        let floored = secs - secs.rem_euclid(self.seconds);
        DateTime::from_timestamp(floored, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or(ts)
    }

    /// True when `coarser` buckets are an exact multiple of this timeframe.
    pub fn divides(&self, coarser: Timeframe) -> bool {
        coarser.seconds % self.seconds == 0
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.seconds;
        if s % 86_400 == 0 {
            write!(f, "{}d", s / 86_400)
        } else if s % 3_600 == 0 {
            write!(f, "{}h", s / 3_600)
        } else if s % 60 == 0 {
            write!(f, "{}m", s / 60)
        } else {
            write!(f, "{s}s")
        }
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        let err = || TimeframeParseError(s.to_string());
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(err)?;
        let (num, unit) = trimmed.split_at(split);
        let n: i64 = num.parse().map_err(|_| err())?;
        let scale = match unit {
            "s" => 1,
            "m" | "min" => 60,
            "h" => 3_600,
            "d" => 86_400,
            _ => return Err(err()),
        };
        n.checked_mul(scale)
            .and_then(Timeframe::from_seconds)
            .ok_or_else(err)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = TimeframeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.to_string()
    }
}
