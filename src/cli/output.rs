//! Terminal rendering of catalog, ledger and timer state.

use std::io::{self, Write};

use ansi_term::Colour::{Cyan, Green, Red, Yellow};

use crate::{
    catalog::CATALOG,
    export::report::Report,
    ledger::{entities::Activity, Ledger},
    session::SessionController,
    timer::TimerState,
    utils::time::format_hms,
    wallclock::DisplayClock,
};

pub fn print_catalog(out: &mut impl Write) -> io::Result<()> {
    for entry in &CATALOG {
        if entry.is_custom() {
            writeln!(out, "{entry}  (asks for a name)")?;
        } else {
            writeln!(out, "{entry}")?;
        }
    }
    Ok(())
}

pub fn print_status(
    out: &mut impl Write,
    controller: &SessionController,
    display: &DisplayClock,
) -> io::Result<()> {
    let state = match controller.timer_state() {
        TimerState::Idle => Cyan.paint("idle"),
        TimerState::Running => Green.paint("running"),
        TimerState::Paused { .. } => Yellow.paint("paused"),
    };
    let activity = controller
        .active_activity()
        .map(|v| v.name.clone())
        .or_else(|| controller.selected().map(|v| format!("{} (selected)", v.name)))
        .unwrap_or_else(|| "-".to_string());
    writeln!(
        out,
        "[{}] {}  {}  {}",
        display.display(),
        format_hms(controller.elapsed_seconds()),
        state,
        activity
    )
}

pub fn print_list(out: &mut impl Write, ledger: &Ledger) -> io::Result<()> {
    if ledger.is_empty() {
        return writeln!(out, "No activities yet");
    }
    let mut running_total = 0;
    for (index, activity) in ledger.activities().iter().enumerate() {
        running_total += activity.elapsed_seconds;
        writeln!(
            out,
            "{:>3}. {:<20} {}  paused {:.2}s  (total so far {})",
            index + 1,
            activity.name,
            format_hms(activity.elapsed_seconds),
            activity.total_pause_seconds,
            format_hms(running_total)
        )?;
    }
    Ok(())
}

/// Full record of one activity, times in minutes.
pub fn print_details(out: &mut impl Write, activity: &Activity) -> io::Result<()> {
    writeln!(out, "{}", Cyan.bold().paint(&activity.name))?;
    writeln!(out, "Time: {:.2} minutes", activity.elapsed_seconds as f64 / 60.)?;
    writeln!(
        out,
        "Pause time: {:.2} minutes",
        activity.total_pause_seconds / 60.
    )?;
    writeln!(out, "Total time: {:.2} minutes", activity.total_seconds / 60.)?;

    writeln!(out, "Comments:")?;
    for comment in &activity.comments {
        writeln!(out, "  {}: {}", comment.timestamp, comment.text)?;
    }
    writeln!(out, "Start times:")?;
    for start in &activity.start_timestamps {
        writeln!(out, "  {start}")?;
    }
    writeln!(out, "End times:")?;
    for end in &activity.end_timestamps {
        writeln!(out, "  {end}")?;
    }
    Ok(())
}

/// Rings the terminal bell and highlights the message.
pub fn print_alert(out: &mut impl Write, name: &str, elapsed_seconds: u64) -> io::Result<()> {
    write!(out, "\x07")?;
    writeln!(
        out,
        "{}",
        Red.bold().paint(format!(
            "Time alert: {name} has been running for {elapsed_seconds} seconds!"
        ))
    )
}

pub fn print_chart(out: &mut impl Write, report: &Report) -> io::Result<()> {
    write!(out, "{}", report.render_chart())
}

pub fn print_notice(out: &mut impl Write, message: impl AsRef<str>) -> io::Result<()> {
    writeln!(out, "{}", Green.paint(message.as_ref()))
}

pub fn print_warning(out: &mut impl Write, message: impl AsRef<str>) -> io::Result<()> {
    writeln!(out, "{}", Yellow.paint(message.as_ref()))
}

pub fn print_error(out: &mut impl Write, message: impl std::fmt::Display) -> io::Result<()> {
    writeln!(out, "{} {message}", Red.paint("error:"))
}
