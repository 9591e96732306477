//! Turns user intent (select, name, comment, start, pause, stop) into timer transitions and
//! ledger mutations. All state is owned here; front ends read it through accessors and follow
//! changes by [subscribing](SessionController::subscribe) to [SessionEvent]s.

use std::sync::Arc;

use chrono::{FixedOffset, Local, Offset};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::{
    catalog::{self, CatalogEntry},
    ledger::{
        entities::{Activity, ActivityKey, Comment, DEFAULT_COMMENT},
        Ledger,
    },
    timer::{ThresholdReached, TimerEngine, TimerError, TimerState},
    utils::{clock::Clock, time::format_timestamp},
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The custom activity was started without a name. Nothing changed, the front end should
    /// ask for one and call [SessionController::provide_name].
    NameRequired,
    Started { name: String, created: bool },
    Resumed { name: String },
    Paused { name: String, elapsed_seconds: u64 },
    Stopped { activity: Activity },
    ThresholdReached { name: String, elapsed_seconds: u64 },
    LedgerReplaced { activities: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new activity was added to the ledger.
    Created,
    /// An existing ledger entry was picked up again after a stop.
    Restored,
    /// A paused session continues.
    Resumed,
    /// The timer was already running. Only the pending comment, if any, was recorded.
    AlreadyRunning,
    /// Start was deferred until a custom name is provided.
    NameRequired,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no activity is selected")]
    NoActivitySelected,
    #[error("activity {0} is not in the catalog")]
    UnknownActivity(u32),
    #[error("activity name can't be empty")]
    EmptyName,
    #[error("the timer is not running")]
    NotRunning,
    #[error("an activity is being timed, stop it first")]
    SessionActive,
    #[error("activity {0:?} is already recorded")]
    DuplicateActivity(String),
}

impl From<TimerError> for SessionError {
    fn from(value: TimerError) -> Self {
        match value {
            TimerError::NotRunning => SessionError::NotRunning,
        }
    }
}

pub struct SessionController {
    ledger: Ledger,
    engine: TimerEngine,
    clock: Arc<dyn Clock>,
    display_offset: FixedOffset,
    selected: Option<&'static CatalogEntry>,
    pending_custom_name: Option<String>,
    pending_comment: Option<String>,
    awaiting_name: bool,
    /// Activity the running or paused session belongs to.
    active: Option<ActivityKey>,
    /// Guards against appending more than one start timestamp per session.
    started_this_session: bool,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(clock: Arc<dyn Clock>, alert_threshold: u64) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            ledger: Ledger::new(),
            engine: TimerEngine::new(alert_threshold),
            clock,
            display_offset: Local::now().offset().fix(),
            selected: None,
            pending_custom_name: None,
            pending_comment: None,
            awaiting_name: false,
            active: None,
            started_this_session: false,
            events,
        }
    }

    pub fn with_display_offset(mut self, offset: FixedOffset) -> Self {
        self.display_offset = offset;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn timer_state(&self) -> TimerState {
        self.engine.state()
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.engine.elapsed_seconds()
    }

    pub fn selected(&self) -> Option<&'static CatalogEntry> {
        self.selected
    }

    pub fn awaiting_name(&self) -> bool {
        self.awaiting_name
    }

    pub fn active_activity(&self) -> Option<&Activity> {
        self.active.as_ref().and_then(|key| self.ledger.get(key))
    }

    /// Timestamps written from now on use this offset. Set once the time zone lookup answers.
    pub fn set_display_offset(&mut self, offset: FixedOffset) {
        self.display_offset = offset;
    }

    /// Picks the activity for the next start. Not allowed while a session is running or paused.
    pub fn select(&mut self, id: u32) -> Result<&'static CatalogEntry, SessionError> {
        if !self.engine.is_idle() {
            return Err(SessionError::SessionActive);
        }
        let entry = catalog::find(id).ok_or(SessionError::UnknownActivity(id))?;
        if self.selected.map(|v| v.id) != Some(entry.id) {
            self.started_this_session = false;
            self.pending_custom_name = None;
            self.awaiting_name = false;
        }
        self.selected = Some(entry);
        debug!("Selected {entry:?}");
        Ok(entry)
    }

    /// Comment recorded on the next start.
    pub fn set_comment(&mut self, text: &str) {
        let text = text.trim();
        self.pending_comment = (!text.is_empty()).then(|| text.to_string());
    }

    /// Name for the custom activity. Completes a start that was deferred for lack of a name.
    pub fn provide_name(&mut self, name: &str) -> Result<Option<StartOutcome>, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        if !self.engine.is_idle() {
            return Err(SessionError::SessionActive);
        }
        self.pending_custom_name = Some(name.to_string());
        if self.awaiting_name {
            return self.start().map(Some);
        }
        Ok(None)
    }

    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<StartOutcome, SessionError> {
        let entry = self.selected.ok_or(SessionError::NoActivitySelected)?;
        let now = self.clock.time();
        let timestamp = format_timestamp(&now.with_timezone(&self.display_offset));

        let (key, outcome) = match &self.active {
            Some(key) if !self.engine.is_idle() => {
                let outcome = if self.engine.is_running() {
                    StartOutcome::AlreadyRunning
                } else {
                    StartOutcome::Resumed
                };
                (key.clone(), outcome)
            }
            _ => {
                let name = if entry.is_custom() {
                    match self.pending_custom_name.clone() {
                        Some(name) => name,
                        None => {
                            self.awaiting_name = true;
                            self.emit(SessionEvent::NameRequired);
                            return Ok(StartOutcome::NameRequired);
                        }
                    }
                } else {
                    entry.name.to_string()
                };
                let key = ActivityKey::for_activity(entry.id, &name);
                match self.ledger.get(&key) {
                    Some(existing) => {
                        self.engine
                            .load(existing.elapsed_seconds, existing.total_pause_seconds);
                        (key, StartOutcome::Restored)
                    }
                    None => {
                        let comment = Comment {
                            text: self
                                .pending_comment
                                .take()
                                .unwrap_or_else(|| DEFAULT_COMMENT.to_string()),
                            timestamp: timestamp.clone(),
                        };
                        let activity = Activity::new(entry.id, name, comment, timestamp.clone());
                        if let Err(taken) = self.ledger.insert(activity) {
                            warn!("Activity {:?} is already in the ledger", taken.name);
                            return Err(SessionError::DuplicateActivity(taken.name));
                        }
                        self.started_this_session = true;
                        (key, StartOutcome::Created)
                    }
                }
            }
        };

        let started_this_session = self.started_this_session;
        let pending_comment = self.pending_comment.take();
        let Some(activity) = self.ledger.get_mut(&key) else {
            // Only reachable if the ledger was swapped under a live session, which
            // replace_ledger refuses.
            return Err(SessionError::NoActivitySelected);
        };
        if !started_this_session {
            activity.start_timestamps.push(timestamp.clone());
        }
        if let Some(text) = pending_comment {
            activity.comments.push(Comment { text, timestamp });
        }
        let name = activity.name.clone();

        self.started_this_session = true;
        self.awaiting_name = false;
        self.active = Some(key);
        self.engine.start(now);

        info!("Start {name:?}: {outcome:?}");
        match outcome {
            StartOutcome::Created => self.emit(SessionEvent::Started {
                name,
                created: true,
            }),
            StartOutcome::Restored => self.emit(SessionEvent::Started {
                name,
                created: false,
            }),
            StartOutcome::Resumed => self.emit(SessionEvent::Resumed { name }),
            StartOutcome::AlreadyRunning | StartOutcome::NameRequired => {}
        }
        Ok(outcome)
    }

    /// Running -> Paused. The ledger entry gets the elapsed counter right away, pause time is
    /// settled on the next start or stop.
    #[instrument(skip(self))]
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.engine.pause(self.clock.time())?;
        let elapsed_seconds = self.engine.elapsed_seconds();
        let activity = self
            .active
            .as_ref()
            .and_then(|key| self.ledger.get_mut(key));
        if let Some(activity) = activity {
            activity.elapsed_seconds = elapsed_seconds;
            let name = activity.name.clone();
            info!("Paused {name:?} at {elapsed_seconds}s");
            self.emit(SessionEvent::Paused {
                name,
                elapsed_seconds,
            });
        }
        Ok(())
    }

    /// Ends the session and writes the counters into the ledger. Returns the updated activity,
    /// or [None] when nothing was being timed.
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> Option<Activity> {
        let now = self.clock.time();
        let snapshot = self.engine.stop(now)?;
        let timestamp = format_timestamp(&now.with_timezone(&self.display_offset));

        let key = self.active.take();
        self.selected = None;
        self.pending_custom_name = None;
        self.awaiting_name = false;
        self.started_this_session = false;

        let activity = self.ledger.get_mut(&key?)?;
        activity.elapsed_seconds = snapshot.elapsed_seconds;
        activity.total_pause_seconds = snapshot.total_pause_seconds;
        activity.total_seconds = snapshot.total_seconds;
        activity.end_timestamps.push(timestamp);
        let activity = activity.clone();

        info!(
            "Stopped {:?}: {}s running, {}s paused",
            activity.name, activity.elapsed_seconds, activity.total_pause_seconds
        );
        self.emit(SessionEvent::Stopped {
            activity: activity.clone(),
        });
        Some(activity)
    }

    /// Called once per real second by the session loop.
    pub fn tick(&mut self) -> Option<ThresholdReached> {
        let alert = self.engine.tick()?;
        let name = self
            .active_activity()
            .map(|v| v.name.clone())
            .unwrap_or_default();
        info!("{name:?} reached {}s", alert.elapsed_seconds);
        self.emit(SessionEvent::ThresholdReached {
            name,
            elapsed_seconds: alert.elapsed_seconds,
        });
        Some(alert)
    }

    /// Swaps the whole ledger, e.g. after an import. Refused while a session is live, since its
    /// activity could disappear.
    pub fn replace_ledger(&mut self, ledger: Ledger) -> Result<(), SessionError> {
        if !self.engine.is_idle() {
            return Err(SessionError::SessionActive);
        }
        let activities = ledger.len();
        self.ledger.replace(ledger);
        info!("Ledger replaced with {activities} activities");
        self.emit(SessionEvent::LedgerReplaced { activities });
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
