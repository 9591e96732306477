use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Source of wall-clock time and sleeping for the timer. Pause windows are measured with
/// [Clock::time], ticks are scheduled with [Clock::sleep_until], so tests can swap in a
/// clock they control.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

#[cfg(test)]
pub mod test_clock {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tokio::time::Instant;

    use super::Clock;

    pub const TEST_START_DATE: NaiveDateTime = match (
        NaiveDate::from_ymd_opt(2024, 3, 15),
        NaiveTime::from_hms_opt(9, 30, 0),
    ) {
        (Some(date), Some(time)) => NaiveDateTime::new(date, time),
        _ => panic!("invalid test start date"),
    };

    /// Wall-clock time only moves when the test says so. Sleeping still goes through tokio so
    /// paused-time tests keep working.
    #[derive(Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Arc::new(Mutex::new(Utc.from_utc_datetime(&TEST_START_DATE))),
            }
        }

        pub fn advance(&self, duration: chrono::Duration) {
            let mut now = self.now.lock().unwrap();
            *now += duration;
        }

        pub fn advance_secs(&self, seconds: i64) {
            self.advance(chrono::Duration::seconds(seconds));
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn time(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }
}
