//! The interactive session: one loop owning the [SessionController], fed by stdin lines, the
//! one-second timer tick, the clock display tick and the offset lookup result. Every mutation
//! happens on this loop, in the order events arrive.

use std::{io::Write, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::FixedOffset;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{
        broadcast::{self, error::TryRecvError},
        mpsc,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    cli::{
        commands::{self, SessionCommand},
        output,
    },
    export::{self, json::ImportError},
    session::{SessionController, SessionError, SessionEvent, StartOutcome},
    timer::{
        ticker::{Ticker, TICK_PERIOD},
        TimerState, DEFAULT_ALERT_THRESHOLD_SECONDS,
    },
    utils::{
        clock::{Clock, DefaultClock},
        time::format_hms,
    },
    wallclock::{
        lookup::{IpApiLookup, DEFAULT_LOOKUP_TIMEOUT, DEFAULT_LOOKUP_URL},
        resolve_offset, DisplayClock,
    },
};

const EVENT_BUFFER: usize = 32;

#[derive(Debug, Clone, clap::Args)]
pub struct SessionOptions {
    #[arg(
        long,
        short,
        default_value = "actividades",
        help = "Project title, used to name export and report files"
    )]
    pub project: String,
    #[arg(long, help = "Start from the activities in this JSON export")]
    pub import: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_ALERT_THRESHOLD_SECONDS, help = "Seconds of running time that trigger the alert")]
    pub threshold: u64,
    #[arg(long, help = "Skip the time zone lookup and use the local clock")]
    pub offline: bool,
    #[arg(long = "lookup-timeout-ms", default_value_t = DEFAULT_LOOKUP_TIMEOUT.as_millis() as u64)]
    pub lookup_timeout_ms: u64,
    #[arg(long = "lookup-url", default_value = DEFAULT_LOOKUP_URL)]
    pub lookup_url: String,
}

#[derive(Debug, Clone, PartialEq)]
enum LoopEvent {
    Line(String),
    InputClosed,
    Tick,
    ClockTick,
    OffsetResolved(FixedOffset),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Runs an interactive session on stdin/stdout until `quit`, end of input or ctrl-c.
pub async fn run_session(options: SessionOptions, output_dir: PathBuf) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let shutdown = CancellationToken::new();
    let (sender, receiver) = mpsc::channel::<LoopEvent>(EVENT_BUFFER);

    tokio::spawn(detect_shutdown(shutdown.clone()));
    tokio::spawn(read_lines(sender.clone(), shutdown.clone()));
    if !options.offline {
        let timeout = Duration::from_millis(options.lookup_timeout_ms);
        match IpApiLookup::new(&options.lookup_url, timeout) {
            Ok(lookup) => {
                tokio::spawn(lookup_offset(lookup, sender.clone()));
            }
            Err(e) => warn!("Can't build time zone lookup: {e}"),
        }
    }

    let mut session = InteractiveSession::open(
        options,
        clock,
        sender,
        shutdown.clone(),
        output_dir,
        std::io::stdout(),
    )
    .await?;
    writeln!(session.out, "Type `help` for the list of commands")?;
    let result = session.run(receiver).await;
    shutdown.cancel();
    result
}

/// Cancels the session on ctrl-c.
async fn detect_shutdown(shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => (),
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Can't listen for ctrl-c {e:?}");
                return;
            }
            info!("Received ctrl-c");
            shutdown.cancel();
        }
    }
}

async fn read_lines(sender: mpsc::Sender<LoopEvent>, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => return,
            next = lines.next_line() => next,
        };
        let event = match next {
            Ok(Some(line)) => LoopEvent::Line(line),
            Ok(None) => LoopEvent::InputClosed,
            Err(e) => {
                error!("Failed to read stdin {e:?}");
                LoopEvent::InputClosed
            }
        };
        let closed = event == LoopEvent::InputClosed;
        if sender.send(event).await.is_err() || closed {
            return;
        }
    }
}

async fn lookup_offset(lookup: IpApiLookup, sender: mpsc::Sender<LoopEvent>) {
    if let Some(offset) = resolve_offset(&lookup).await {
        let _ = sender.send(LoopEvent::OffsetResolved(offset)).await;
    }
}

struct InteractiveSession<W: Write> {
    controller: SessionController,
    /// Every change the controller makes is rendered from here.
    notifications: broadcast::Receiver<SessionEvent>,
    clock: Arc<dyn Clock>,
    display: DisplayClock,
    timer_ticker: Option<Ticker>,
    display_ticker: Option<Ticker>,
    events: mpsc::Sender<LoopEvent>,
    shutdown: CancellationToken,
    project: String,
    output_dir: PathBuf,
    /// Ledger changed since the last export.
    dirty: bool,
    quit_warned: bool,
    out: W,
}

impl<W: Write> InteractiveSession<W> {
    fn new(
        controller: SessionController,
        clock: Arc<dyn Clock>,
        events: mpsc::Sender<LoopEvent>,
        shutdown: CancellationToken,
        project: String,
        output_dir: PathBuf,
        out: W,
    ) -> Self {
        let display = DisplayClock::local(clock.time());
        Self {
            notifications: controller.subscribe(),
            controller,
            clock,
            display,
            timer_ticker: None,
            display_ticker: None,
            events,
            shutdown,
            project,
            output_dir,
            dirty: false,
            quit_warned: false,
            out,
        }
    }

    /// Builds the session for `options`. A rejected `--import` file is reported like any other
    /// failed import and the session starts with an empty ledger.
    async fn open(
        options: SessionOptions,
        clock: Arc<dyn Clock>,
        events: mpsc::Sender<LoopEvent>,
        shutdown: CancellationToken,
        output_dir: PathBuf,
        out: W,
    ) -> Result<Self> {
        let controller = SessionController::new(clock.clone(), options.threshold);
        let mut session = Self::new(
            controller,
            clock,
            events,
            shutdown,
            options.project,
            output_dir,
            out,
        );
        if let Some(path) = options.import {
            session.import(path).await?;
            session.render_notifications()?;
        }
        Ok(session)
    }

    async fn run(&mut self, mut receiver: mpsc::Receiver<LoopEvent>) -> Result<()> {
        self.display_ticker = Some(Ticker::spawn(
            self.clock.clone(),
            TICK_PERIOD,
            self.events.clone(),
            LoopEvent::ClockTick,
            &self.shutdown,
        ));

        let result = loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => break Ok(()),
                event = receiver.recv() => event,
            };
            let Some(event) = event else {
                break Ok(());
            };
            match self.handle(event).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.teardown().await;
        result
    }

    async fn teardown(&mut self) {
        if let Some(ticker) = self.timer_ticker.take() {
            ticker.stop().await;
        }
        if let Some(ticker) = self.display_ticker.take() {
            ticker.stop().await;
        }
        if self.controller.timer_state() != TimerState::Idle {
            warn!("Session ended while an activity was being timed");
        }
        info!("Session finished");
    }

    async fn handle(&mut self, event: LoopEvent) -> Result<Flow> {
        let flow = match event {
            LoopEvent::Tick => {
                self.controller.tick();
                Flow::Continue
            }
            LoopEvent::ClockTick => {
                self.display.advance();
                Flow::Continue
            }
            LoopEvent::OffsetResolved(offset) => {
                self.display.rebase(self.clock.time(), offset);
                self.controller.set_display_offset(offset);
                Flow::Continue
            }
            LoopEvent::InputClosed => Flow::Quit,
            LoopEvent::Line(line) => match commands::parse_line(&line) {
                Ok(None) => Flow::Continue,
                Ok(Some(command)) => self.execute(command).await?,
                Err(e) => {
                    output::print_error(&mut self.out, e.kind())?;
                    writeln!(self.out, "Type `help` for the list of commands")?;
                    Flow::Continue
                }
            },
        };
        self.render_notifications()?;
        self.sync_timer_ticker().await;
        self.out.flush()?;
        Ok(flow)
    }

    fn render_notifications(&mut self) -> Result<()> {
        loop {
            match self.notifications.try_recv() {
                Ok(event) => self.render_notification(event)?,
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("Missed {missed} session notifications")
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
            }
        }
    }

    fn render_notification(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::NameRequired => {
                output::print_warning(&mut self.out, "Enter the activity name with `name <text>`")?
            }
            SessionEvent::Started {
                name,
                created: true,
            } => {
                self.dirty = true;
                output::print_notice(&mut self.out, format!("Started {name}"))?
            }
            SessionEvent::Started {
                name,
                created: false,
            }
            | SessionEvent::Resumed { name } => {
                self.dirty = true;
                output::print_notice(
                    &mut self.out,
                    format!(
                        "Resumed {name} at {}",
                        format_hms(self.controller.elapsed_seconds())
                    ),
                )?
            }
            SessionEvent::Paused {
                name,
                elapsed_seconds,
            } => {
                self.dirty = true;
                output::print_notice(
                    &mut self.out,
                    format!("Paused {name} at {}", format_hms(elapsed_seconds)),
                )?
            }
            SessionEvent::Stopped { activity } => {
                self.dirty = true;
                output::print_notice(
                    &mut self.out,
                    format!(
                        "Stopped {}: {}s running, {:.2}s paused",
                        activity.name, activity.elapsed_seconds, activity.total_pause_seconds
                    ),
                )?
            }
            SessionEvent::ThresholdReached {
                name,
                elapsed_seconds,
            } => output::print_alert(&mut self.out, &name, elapsed_seconds)?,
            SessionEvent::LedgerReplaced { activities } => {
                output::print_notice(&mut self.out, format!("Loaded {activities} activities"))?
            }
        }
        Ok(())
    }

    /// The tick task only exists while the timer runs.
    async fn sync_timer_ticker(&mut self) {
        if self.controller.is_running() {
            if !self.timer_ticker.as_ref().is_some_and(Ticker::is_active) {
                debug!("Starting timer ticks");
                self.timer_ticker = Some(Ticker::spawn(
                    self.clock.clone(),
                    TICK_PERIOD,
                    self.events.clone(),
                    LoopEvent::Tick,
                    &self.shutdown,
                ));
            }
        } else if let Some(ticker) = self.timer_ticker.take() {
            debug!("Stopping timer ticks");
            ticker.stop().await;
        }
    }

    async fn execute(&mut self, command: SessionCommand) -> Result<Flow> {
        if command != SessionCommand::Quit {
            self.quit_warned = false;
        }

        match command {
            SessionCommand::Catalog => output::print_catalog(&mut self.out)?,
            SessionCommand::Select { id } => match self.controller.select(id) {
                Ok(entry) if entry.is_custom() => output::print_notice(
                    &mut self.out,
                    format!("Selected {}, give it a name with `name <text>`", entry.name),
                )?,
                Ok(entry) => {
                    output::print_notice(&mut self.out, format!("Selected {}", entry.name))?
                }
                Err(e) => output::print_error(&mut self.out, e)?,
            },
            SessionCommand::Name { name } => {
                let result = self.controller.provide_name(&name.join(" "));
                match result {
                    Ok(Some(outcome)) => self.report_start(outcome)?,
                    Ok(None) => output::print_notice(&mut self.out, "Name set")?,
                    Err(e) => output::print_error(&mut self.out, e)?,
                }
            }
            SessionCommand::Comment { text } => {
                self.controller.set_comment(&text.join(" "));
                output::print_notice(&mut self.out, "Comment will be recorded on start")?;
            }
            SessionCommand::Start => {
                let result = self.controller.start();
                match result {
                    Ok(outcome) => self.report_start(outcome)?,
                    Err(SessionError::NoActivitySelected) => {
                        output::print_error(&mut self.out, SessionError::NoActivitySelected)?;
                        writeln!(self.out, "Pick one with `select <id>`:")?;
                        output::print_catalog(&mut self.out)?;
                    }
                    Err(e) => output::print_error(&mut self.out, e)?,
                }
            }
            SessionCommand::Pause => {
                if let Err(e) = self.controller.pause() {
                    output::print_error(&mut self.out, e)?;
                }
            }
            SessionCommand::Stop => {
                if self.controller.stop().is_none() {
                    output::print_warning(&mut self.out, "Nothing is being timed")?;
                }
            }
            SessionCommand::Status => {
                output::print_status(&mut self.out, &self.controller, &self.display)?
            }
            SessionCommand::List => output::print_list(&mut self.out, self.controller.ledger())?,
            SessionCommand::Show { position } => {
                let activity = position
                    .checked_sub(1)
                    .and_then(|index| self.controller.ledger().activities().get(index));
                match activity {
                    Some(activity) => output::print_details(&mut self.out, activity)?,
                    None => output::print_error(
                        &mut self.out,
                        format!("there is no activity #{position}"),
                    )?,
                }
            }
            SessionCommand::Export { path } => self.export(path).await?,
            SessionCommand::Import { path } => self.import(path).await?,
            SessionCommand::Report { path } => self.report(path).await?,
            SessionCommand::Clock => writeln!(self.out, "{}", self.display.display())?,
            SessionCommand::Help => write!(self.out, "{}", commands::help())?,
            SessionCommand::Quit => return self.quit(),
        }
        Ok(Flow::Continue)
    }

    /// Only a start that changed nothing needs saying here, the rest arrives as notifications.
    fn report_start(&mut self, outcome: StartOutcome) -> Result<()> {
        if outcome == StartOutcome::AlreadyRunning {
            let name = self
                .controller
                .active_activity()
                .map(|v| v.name.clone())
                .unwrap_or_default();
            output::print_warning(&mut self.out, format!("{name} is already running"))?;
        }
        Ok(())
    }

    /// Leaving with a live timer or unexported changes needs a second `quit`.
    fn quit(&mut self) -> Result<Flow> {
        let unsafe_to_leave = self.controller.timer_state() != TimerState::Idle || self.dirty;
        if unsafe_to_leave && !self.quit_warned {
            self.quit_warned = true;
            output::print_warning(
                &mut self.out,
                "There are unsaved changes or a running activity. Type `quit` again to leave anyway",
            )?;
            return Ok(Flow::Continue);
        }
        Ok(Flow::Quit)
    }

    async fn export(&mut self, path: Option<PathBuf>) -> Result<()> {
        let path = export::target_path(path, &self.output_dir, export::export_file_name(&self.project));
        match export::save_json(self.controller.ledger(), &path).await {
            Ok(()) => {
                self.dirty = false;
                output::print_notice(
                    &mut self.out,
                    format!(
                        "Exported {} activities to {}",
                        self.controller.ledger().len(),
                        path.display()
                    ),
                )?;
            }
            Err(e) => {
                error!("Export failed {e:?}");
                output::print_error(&mut self.out, format!("{e:#}"))?;
            }
        }
        Ok(())
    }

    async fn import(&mut self, path: PathBuf) -> Result<()> {
        let ledger = match export::load_json(&path).await {
            Ok(ledger) => ledger,
            Err(e) => {
                let message = match e.downcast_ref::<ImportError>() {
                    Some(ImportError::Parse(_)) => format!("can't read the JSON file: {e}"),
                    Some(_) => format!("the JSON file has the wrong format: {e}"),
                    None => format!("{e:#}"),
                };
                warn!("Import of {path:?} rejected: {e}");
                output::print_error(&mut self.out, message)?;
                return Ok(());
            }
        };
        match self.controller.replace_ledger(ledger) {
            Ok(()) => {
                info!("Imported {path:?}");
                self.dirty = false;
            }
            Err(e) => output::print_error(&mut self.out, e)?,
        }
        Ok(())
    }

    async fn report(&mut self, path: Option<PathBuf>) -> Result<()> {
        let path = export::target_path(path, &self.output_dir, export::report_file_name(&self.project));
        let generated_on = self.display.now().date_naive();
        match export::save_report(self.controller.ledger(), &self.project, generated_on, &path).await {
            Ok(report) => {
                output::print_chart(&mut self.out, &report)?;
                output::print_notice(&mut self.out, format!("Report written to {}", path.display()))?;
            }
            Err(e) => {
                error!("Report failed {e:?}");
                output::print_error(&mut self.out, format!("{e:#}"))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::FixedOffset;
    use tempfile::tempdir;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{
        ledger::Ledger,
        utils::{clock::test_clock::ManualClock, logging::TEST_LOGGING},
    };

    fn session(
        output_dir: PathBuf,
    ) -> (
        InteractiveSession<Vec<u8>>,
        ManualClock,
        mpsc::Receiver<LoopEvent>,
    ) {
        *TEST_LOGGING;
        let clock = ManualClock::new();
        let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
        let controller =
            SessionController::new(Arc::new(clock.clone()), DEFAULT_ALERT_THRESHOLD_SECONDS)
                .with_display_offset(FixedOffset::east_opt(0).unwrap());
        let session = InteractiveSession::new(
            controller,
            Arc::new(clock.clone()),
            sender,
            CancellationToken::new(),
            "Tesis".into(),
            output_dir,
            vec![],
        );
        (session, clock, receiver)
    }

    async fn type_line(session: &mut InteractiveSession<Vec<u8>>, line: &str) -> Result<Flow> {
        session.handle(LoopEvent::Line(line.into())).await
    }

    fn take_output(session: &mut InteractiveSession<Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(&mut session.out)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_follows_running_state() -> Result<()> {
        let dir = tempdir()?;
        let (mut session, _, mut receiver) = session(dir.path().to_path_buf());

        type_line(&mut session, "select 1").await?;
        assert!(session.timer_ticker.is_none());
        type_line(&mut session, "start").await?;
        assert!(session.timer_ticker.is_some());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let mut ticks = 0;
        while let Ok(event) = receiver.try_recv() {
            assert_eq!(event, LoopEvent::Tick);
            session.handle(event).await?;
            ticks += 1;
        }
        assert_eq!(ticks, 2);
        assert_eq!(session.controller.elapsed_seconds(), 2);

        type_line(&mut session, "pause").await?;
        assert!(session.timer_ticker.is_none());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(receiver.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn alert_is_printed_once() -> Result<()> {
        let dir = tempdir()?;
        let (mut session, clock, _receiver) = session(dir.path().to_path_buf());
        type_line(&mut session, "select 1").await?;
        type_line(&mut session, "start").await?;
        take_output(&mut session);

        for _ in 0..120 {
            clock.advance_secs(1);
            session.handle(LoopEvent::Tick).await?;
        }
        let printed = take_output(&mut session);
        assert_eq!(printed.matches("Time alert").count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn custom_activity_flow() -> Result<()> {
        let dir = tempdir()?;
        let (mut session, _, _receiver) = session(dir.path().to_path_buf());
        type_line(&mut session, "select 10").await?;
        type_line(&mut session, "start").await?;
        assert!(take_output(&mut session).contains("name <text>"));
        assert!(session.controller.ledger().is_empty());

        type_line(&mut session, "name Piano practice").await?;
        assert!(take_output(&mut session).contains("Started Piano practice"));
        assert!(session.controller.is_running());
        Ok(())
    }

    #[tokio::test]
    async fn quit_is_guarded_until_exported() -> Result<()> {
        let dir = tempdir()?;
        let (mut session, clock, _receiver) = session(dir.path().to_path_buf());
        type_line(&mut session, "select 2").await?;
        type_line(&mut session, "comment first draft").await?;
        type_line(&mut session, "start").await?;
        clock.advance_secs(1);
        session.handle(LoopEvent::Tick).await?;

        assert_eq!(type_line(&mut session, "quit").await?, Flow::Continue);
        type_line(&mut session, "stop").await?;
        assert_eq!(type_line(&mut session, "quit").await?, Flow::Continue);
        type_line(&mut session, "export").await?;
        assert_eq!(type_line(&mut session, "quit").await?, Flow::Quit);

        let exported = export::load_json(&dir.path().join("Tesis.json")).await?;
        assert_eq!(exported, *session.controller.ledger());
        assert_eq!(exported.activities()[0].comments[0].text, "first draft");
        Ok(())
    }

    #[tokio::test]
    async fn second_quit_leaves_anyway() -> Result<()> {
        let dir = tempdir()?;
        let (mut session, _, _receiver) = session(dir.path().to_path_buf());
        type_line(&mut session, "select 2").await?;
        type_line(&mut session, "start").await?;
        assert_eq!(type_line(&mut session, "quit").await?, Flow::Continue);
        assert_eq!(type_line(&mut session, "quit").await?, Flow::Quit);
        Ok(())
    }

    #[tokio::test]
    async fn bad_import_leaves_ledger_alone() -> Result<()> {
        let dir = tempdir()?;
        let (mut session, _, _receiver) = session(dir.path().to_path_buf());
        type_line(&mut session, "select 1").await?;
        type_line(&mut session, "start").await?;
        type_line(&mut session, "stop").await?;
        let before = session.controller.ledger().clone();

        let bad = dir.path().join("bad.json");
        tokio::fs::write(&bad, r#"[{"id":1,"name":"x","time":5}]"#).await?;
        take_output(&mut session);
        type_line(&mut session, &format!("import {}", bad.display())).await?;

        assert!(take_output(&mut session).contains("wrong format"));
        assert_eq!(*session.controller.ledger(), before);

        let broken = dir.path().join("broken.json");
        tokio::fs::write(&broken, "{").await?;
        type_line(&mut session, &format!("import {}", broken.display())).await?;
        assert!(take_output(&mut session).contains("can't read the JSON file"));
        assert_eq!(*session.controller.ledger(), before);
        Ok(())
    }

    #[tokio::test]
    async fn report_is_written_to_output_dir() -> Result<()> {
        let dir = tempdir()?;
        let (mut session, clock, _receiver) = session(dir.path().to_path_buf());
        type_line(&mut session, "select 1").await?;
        type_line(&mut session, "start").await?;
        for _ in 0..5 {
            clock.advance_secs(1);
            session.handle(LoopEvent::Tick).await?;
        }
        type_line(&mut session, "stop").await?;
        type_line(&mut session, "report").await?;

        let written = tokio::fs::read_to_string(dir.path().join("report_Tesis.md")).await?;
        assert!(written.contains("| Lectura |"));
        assert!(take_output(&mut session).contains("Report written to"));
        Ok(())
    }

    #[tokio::test]
    async fn offset_rebases_clock_and_timestamps() -> Result<()> {
        let dir = tempdir()?;
        let (mut session, _, _receiver) = session(dir.path().to_path_buf());
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        session.handle(LoopEvent::OffsetResolved(offset)).await?;
        session.handle(LoopEvent::ClockTick).await?;
        assert_eq!(session.display.display(), "11:30:01");

        type_line(&mut session, "select 1").await?;
        type_line(&mut session, "start").await?;
        let activity = session.controller.active_activity().unwrap();
        assert_eq!(activity.start_timestamps[0], "15/03/2024, 11:30:00");
        Ok(())
    }

    #[tokio::test]
    async fn unknown_commands_are_reported() -> Result<()> {
        let dir = tempdir()?;
        let (mut session, _, _receiver) = session(dir.path().to_path_buf());
        assert_eq!(type_line(&mut session, "fly away").await?, Flow::Continue);
        assert!(take_output(&mut session).contains("help"));
        assert_eq!(
            session.handle(LoopEvent::InputClosed).await?,
            Flow::Quit
        );
        Ok(())
    }

    fn offline_options(import: Option<PathBuf>) -> SessionOptions {
        SessionOptions {
            project: "Tesis".into(),
            import,
            threshold: DEFAULT_ALERT_THRESHOLD_SECONDS,
            offline: true,
            lookup_timeout_ms: 3000,
            lookup_url: DEFAULT_LOOKUP_URL.into(),
        }
    }

    async fn open(
        options: SessionOptions,
        output_dir: PathBuf,
    ) -> Result<InteractiveSession<Vec<u8>>> {
        *TEST_LOGGING;
        let (sender, _) = mpsc::channel(EVENT_BUFFER);
        InteractiveSession::open(
            options,
            Arc::new(ManualClock::new()),
            sender,
            CancellationToken::new(),
            output_dir,
            vec![],
        )
        .await
    }

    #[tokio::test]
    async fn rejected_startup_import_still_opens_session() -> Result<()> {
        let dir = tempdir()?;
        let bad = dir.path().join("bad.json");
        tokio::fs::write(&bad, r#"[{"id":1,"name":"x","time":5}]"#).await?;

        let mut session = open(offline_options(Some(bad)), dir.path().to_path_buf()).await?;
        let printed = take_output(&mut session);
        assert!(printed.contains("wrong format"), "{printed}");
        assert!(session.controller.ledger().is_empty());

        type_line(&mut session, "select 1").await?;
        type_line(&mut session, "start").await?;
        assert!(session.controller.is_running());

        let missing = open(
            offline_options(Some(dir.path().join("missing.json"))),
            dir.path().to_path_buf(),
        )
        .await;
        assert!(missing.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn startup_import_seeds_the_ledger() -> Result<()> {
        let dir = tempdir()?;
        let (mut recorded, _, _receiver) = session(dir.path().to_path_buf());
        type_line(&mut recorded, "select 4").await?;
        type_line(&mut recorded, "start").await?;
        type_line(&mut recorded, "stop").await?;
        type_line(&mut recorded, "export").await?;

        let mut session = open(
            offline_options(Some(dir.path().join("Tesis.json"))),
            dir.path().to_path_buf(),
        )
        .await?;
        assert!(take_output(&mut session).contains("Loaded 1 activities"));
        assert_eq!(session.controller.ledger(), recorded.controller.ledger());
        assert_eq!(type_line(&mut session, "quit").await?, Flow::Quit);
        Ok(())
    }

    #[tokio::test]
    async fn controller_notifications_are_rendered_in_order() -> Result<()> {
        let dir = tempdir()?;
        let (mut session, clock, _receiver) = session(dir.path().to_path_buf());
        type_line(&mut session, "select 1").await?;
        for line in ["start", "pause"] {
            type_line(&mut session, line).await?;
            clock.advance_secs(2);
        }
        type_line(&mut session, "start").await?;
        type_line(&mut session, "stop").await?;

        let printed = take_output(&mut session);
        let position = |needle: &str| {
            printed
                .find(needle)
                .unwrap_or_else(|| panic!("{needle:?} missing from {printed}"))
        };
        assert!(position("Started Lectura") < position("Paused Lectura"));
        assert!(position("Paused Lectura") < position("Resumed Lectura"));
        assert!(position("Resumed Lectura") < position("Stopped Lectura: 0s running, 2.00s paused"));

        // Changes made outside the command handlers show up on the next loop event.
        session.controller.replace_ledger(Ledger::new())?;
        session.handle(LoopEvent::ClockTick).await?;
        assert!(take_output(&mut session).contains("Loaded 0 activities"));
        Ok(())
    }
}
