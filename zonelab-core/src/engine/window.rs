//! Entry window state machine: CLOSED → OPEN → COOLDOWN → CLOSED.
//!
//! A window opens when the previous close comes within tolerance of a strong
//! zone. While open (and flat) it counts down a TTL and closes on drift away
//! from the zone; arming an order also sends it straight to cooldown.

use serde::{Deserialize, Serialize};

use crate::components::Zone;
use crate::config::WindowConfig;

/// Where the zone sits relative to the reference price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneSide {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowState {
    Closed,
    Open {
        side: ZoneSide,
        level: f64,
        ttl: u32,
    },
    Cooldown {
        remaining: u32,
    },
}

#[derive(Debug, Clone)]
pub struct EntryWindow {
    config: WindowConfig,
    state: WindowState,
    opened: usize,
}

impl EntryWindow {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            state: WindowState::Closed,
            opened: 0,
        }
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, WindowState::Open { .. })
    }

    /// Windows opened so far in this run.
    pub fn opened(&self) -> usize {
        self.opened
    }

    /// Start-of-bar cooldown countdown. Reaching zero closes the window.
    pub fn begin_bar(&mut self) {
        if let WindowState::Cooldown { remaining } = self.state {
            let remaining = remaining.saturating_sub(1);
            self.state = if remaining == 0 {
                WindowState::Closed
            } else {
                WindowState::Cooldown { remaining }
            };
        }
    }

    /// Open on `zone` if the window is closed and the zone qualifies.
    pub fn try_open(
        &mut self,
        zone: Option<&Zone>,
        reference: f64,
        anchor_atr: Option<f64>,
        score_threshold: f64,
    ) -> bool {
        if self.state != WindowState::Closed {
            return false;
        }
        let (Some(zone), Some(atr)) = (zone, anchor_atr) else {
            return false;
        };
        if zone.score < score_threshold
            || (reference - zone.level).abs() > self.config.enter_tolerance_atr * atr
        {
            return false;
        }
        let side = if zone.level >= reference {
            ZoneSide::Up
        } else {
            ZoneSide::Down
        };
        self.state = WindowState::Open {
            side,
            level: zone.level,
            ttl: self.config.ttl_bars,
        };
        self.opened += 1;
        true
    }

    /// Per-bar countdown for an open window while flat.
    ///
    /// Returns the zone side when the window stays open and may evaluate an
    /// entry this bar. Drift is only checked when ATR(anchor) is defined.
    pub fn tick(&mut self, reference: f64, anchor_atr: Option<f64>) -> Option<ZoneSide> {
        let WindowState::Open { side, level, ttl } = self.state else {
            return None;
        };
        let ttl = ttl.saturating_sub(1);
        let drifted = anchor_atr
            .map(|atr| (reference - level).abs() >= self.config.exit_tolerance_atr * atr)
            .unwrap_or(false);
        if ttl == 0 || drifted {
            self.cool_down();
            return None;
        }
        self.state = WindowState::Open { side, level, ttl };
        Some(side)
    }

    /// An order was armed from this window. The next `cooldown_bars` bars
    /// stay blocked; the window may reopen on the bar after that.
    pub fn arm(&mut self) {
        self.state = WindowState::Cooldown {
            remaining: self.config.cooldown_bars.saturating_add(1),
        };
    }

    fn cool_down(&mut self) {
        self.state = WindowState::Cooldown {
            remaining: self.config.cooldown_bars,
        };
    }
}
