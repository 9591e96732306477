use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::utils::clock::Clock;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Periodic task pushing `event` into a channel once per `period`. The task lives exactly as
/// long as the [Ticker]: dropping or [stopping](Ticker::stop) it tears the schedule down, so no
/// tick can arrive after its owner stopped caring.
pub struct Ticker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Starts ticking. The first event is delivered one full period after the call. `parent`
    /// cancellation (shutdown) stops the ticker too.
    pub fn spawn<T: Clone + Send + 'static>(
        clock: Arc<dyn Clock>,
        period: Duration,
        sender: mpsc::Sender<T>,
        event: T,
        parent: &CancellationToken,
    ) -> Self {
        let token = parent.child_token();
        let handle = tokio::spawn(run(clock, period, sender, event, token.clone()));
        Self { token, handle }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }

    /// Cancels the schedule and waits for the task to wind down.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Err(e) = (&mut self.handle).await {
            warn!("Ticker task ended abnormally {e:?}");
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run<T: Clone + Send + 'static>(
    clock: Arc<dyn Clock>,
    period: Duration,
    sender: mpsc::Sender<T>,
    event: T,
    token: CancellationToken,
) {
    let mut next_tick = clock.instant();
    loop {
        next_tick += period;

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Ticker cancelled");
                return;
            }
            _ = clock.sleep_until(next_tick) => ()
        }

        // The owner may be waiting on stop() instead of draining a full channel.
        let sent = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            sent = sender.send(event.clone()) => sent,
        };
        if sent.is_err() {
            debug!("Ticker receiver dropped");
            return;
        }
    }
}
