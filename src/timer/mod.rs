//! Running/paused/stopped state machine and the elapsed-seconds counter.
//!
//! The engine knows nothing about the ledger. The [session](crate::session) controller loads
//! counters into it when an activity is resumed and reads the [StopSnapshot] back out.

pub mod ticker;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::utils::time::duration_seconds;

pub const DEFAULT_ALERT_THRESHOLD_SECONDS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerState {
    Idle,
    Running,
    Paused { since: DateTime<Utc> },
}

/// Raised from [TimerEngine::tick] exactly on the tick that reaches the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdReached {
    pub elapsed_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopSnapshot {
    pub elapsed_seconds: u64,
    pub total_pause_seconds: f64,
    pub total_seconds: f64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("the timer is not running")]
    NotRunning,
}

#[derive(Debug)]
pub struct TimerEngine {
    state: TimerState,
    elapsed_seconds: u64,
    total_pause_seconds: f64,
    alert_threshold: u64,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_THRESHOLD_SECONDS)
    }
}

impl TimerEngine {
    pub fn new(alert_threshold: u64) -> Self {
        Self {
            state: TimerState::Idle,
            elapsed_seconds: 0,
            total_pause_seconds: 0.,
            alert_threshold,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn is_idle(&self) -> bool {
        self.state == TimerState::Idle
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Pause seconds folded so far. An open pause window is not included until it is closed.
    pub fn total_pause_seconds(&self) -> f64 {
        self.total_pause_seconds
    }

    /// Seeds the counters from a stored activity. Only allowed while idle, a live session keeps
    /// its own counters.
    pub fn load(&mut self, elapsed_seconds: u64, total_pause_seconds: f64) {
        if self.is_idle() {
            self.elapsed_seconds = elapsed_seconds;
            self.total_pause_seconds = total_pause_seconds;
        }
    }

    /// Idle/Paused -> Running. Returns false when already running, which leaves every counter
    /// untouched.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            TimerState::Running => false,
            TimerState::Idle => {
                self.state = TimerState::Running;
                true
            }
            TimerState::Paused { since } => {
                self.fold_pause(since, now);
                self.state = TimerState::Running;
                true
            }
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        if !self.is_running() {
            return Err(TimerError::NotRunning);
        }
        self.state = TimerState::Paused { since: now };
        Ok(())
    }

    /// Running/Paused -> Idle. The open pause window, if any, is folded first. Counters are reset
    /// afterwards, so the returned snapshot is the only record of the session. Idle gives
    /// [None].
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<StopSnapshot> {
        match self.state {
            TimerState::Idle => return None,
            TimerState::Paused { since } => self.fold_pause(since, now),
            TimerState::Running => {}
        }

        let snapshot = StopSnapshot {
            elapsed_seconds: self.elapsed_seconds,
            total_pause_seconds: self.total_pause_seconds,
            total_seconds: self.elapsed_seconds as f64 + self.total_pause_seconds,
        };
        debug!("Timer stopped {snapshot:?}");

        self.state = TimerState::Idle;
        self.elapsed_seconds = 0;
        self.total_pause_seconds = 0.;
        Some(snapshot)
    }

    /// One real second passed. Only counts while running.
    pub fn tick(&mut self) -> Option<ThresholdReached> {
        if !self.is_running() {
            return None;
        }
        self.elapsed_seconds += 1;
        trace!("Tick {}", self.elapsed_seconds);
        (self.elapsed_seconds == self.alert_threshold).then_some(ThresholdReached {
            elapsed_seconds: self.elapsed_seconds,
        })
    }

    fn fold_pause(&mut self, since: DateTime<Utc>, now: DateTime<Utc>) {
        let paused = duration_seconds(now - since);
        debug!("Closing pause window of {paused}s");
        self.total_pause_seconds += paused;
    }
}
