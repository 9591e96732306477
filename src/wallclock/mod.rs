//! Clock shown next to the timer. It starts on the local offset, gets rebased once if the
//! offset lookup answers, and is then advanced by one second per display tick. It is a
//! convenience only, nothing in the ledger depends on it.

pub mod lookup;

use chrono::{DateTime, Duration, FixedOffset, Local, Offset, Utc};
use lookup::OffsetLookup;
use tracing::{info, warn};

use crate::utils::time::TIME_OF_DAY_FORMAT;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayClock {
    current: DateTime<FixedOffset>,
}

impl DisplayClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            current: now.with_timezone(&offset),
        }
    }

    pub fn local(now: DateTime<Utc>) -> Self {
        Self::new(now, Local::now().offset().fix())
    }

    pub fn offset(&self) -> FixedOffset {
        *self.current.offset()
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.current
    }

    pub fn rebase(&mut self, now: DateTime<Utc>, offset: FixedOffset) {
        self.current = now.with_timezone(&offset);
    }

    pub fn advance(&mut self) {
        self.current += Duration::seconds(1);
    }

    pub fn display(&self) -> String {
        self.current.format(TIME_OF_DAY_FORMAT).to_string()
    }
}

/// Best-effort offset lookup. Failures are logged and swallowed, callers keep whatever offset
/// they already had.
pub async fn resolve_offset(lookup: &dyn OffsetLookup) -> Option<FixedOffset> {
    match lookup.utc_offset().await {
        Ok(offset) => {
            info!("Using looked up utc offset {offset}");
            Some(offset)
        }
        Err(e) => {
            warn!("Time zone lookup failed, keeping the local clock: {e}");
            None
        }
    }
}
