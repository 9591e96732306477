//! Tabular projection of the ledger plus a per-name time aggregation for the summary chart.
//! Both are pure functions of the ledger and the generation date.

use std::{collections::HashMap, fmt::Write};

use chrono::NaiveDate;

use crate::{
    ledger::{entities::Activity, Ledger},
    utils::{
        percentage::{share_percentage, Percentage},
        time::{format_date, parse_timestamp, TIME_OF_DAY_FORMAT},
    },
};

const CHART_WIDTH: usize = 40;
const MISSING: &str = "-";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub name: String,
    pub date: String,
    pub first_start: String,
    pub last_end: String,
    pub pause_seconds: String,
    pub elapsed_seconds: String,
    pub comments: String,
    pub times_started: usize,
}

impl ReportRow {
    fn new(activity: &Activity, date: &str) -> Self {
        Self {
            name: activity.name.clone(),
            date: date.to_string(),
            first_start: time_of_day(activity.start_timestamps.first()),
            last_end: time_of_day(activity.end_timestamps.last()),
            pause_seconds: format!("{:.2}", activity.total_pause_seconds),
            elapsed_seconds: format!("{:.2}", activity.elapsed_seconds as f64),
            comments: activity
                .comments
                .iter()
                .map(|v| v.text.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            times_started: activity.times_started(),
        }
    }
}

/// Elapsed time of every activity sharing one name.
#[derive(Debug, Clone, PartialEq)]
pub struct NameTotal {
    pub name: String,
    pub elapsed_seconds: u64,
    pub share: Percentage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub totals: Vec<NameTotal>,
}

pub fn build_report(ledger: &Ledger, generated_on: NaiveDate) -> Report {
    let date = format_date(generated_on);
    Report {
        rows: ledger
            .activities()
            .iter()
            .map(|v| ReportRow::new(v, &date))
            .collect(),
        totals: aggregate_by_name(ledger),
    }
}

/// Sums elapsed seconds per name, in order of first appearance.
pub fn aggregate_by_name(ledger: &Ledger) -> Vec<NameTotal> {
    let mut index = HashMap::<&str, usize>::new();
    let mut sums = Vec::<(&str, u64)>::new();
    for activity in ledger.activities() {
        match index.get(activity.name.as_str()) {
            Some(&position) => sums[position].1 += activity.elapsed_seconds,
            None => {
                index.insert(activity.name.as_str(), sums.len());
                sums.push((activity.name.as_str(), activity.elapsed_seconds));
            }
        }
    }

    let whole = sums.iter().map(|v| v.1).sum::<u64>() as f64;
    sums.into_iter()
        .map(|(name, elapsed_seconds)| NameTotal {
            name: name.to_string(),
            elapsed_seconds,
            share: share_percentage(elapsed_seconds as f64, whole),
        })
        .collect()
}

impl Report {
    /// Markdown document: title, project summary, activity table and a bar chart.
    pub fn render(&self, project_title: &str) -> String {
        let mut out = String::new();
        // Writing into a String can't fail.
        let _ = self.write_document(&mut out, project_title);
        out
    }

    fn write_document(&self, out: &mut String, project_title: &str) -> std::fmt::Result {
        writeln!(out, "# Project report: {}", cell(project_title))?;
        writeln!(out)?;
        writeln!(out, "| Project | {} |", cell(project_title))?;
        writeln!(out, "|---|---|")?;
        writeln!(out, "| Total activities | {} |", self.rows.len())?;
        writeln!(out)?;

        writeln!(
            out,
            "| Activity | Date | Start | End | Pause (s) | Time (s) | Comments | Times started |"
        )?;
        writeln!(out, "|---|---|---|---|---:|---:|---|---:|")?;
        for row in &self.rows {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                cell(&row.name),
                row.date,
                cell(&row.first_start),
                cell(&row.last_end),
                row.pause_seconds,
                row.elapsed_seconds,
                cell(&row.comments),
                row.times_started
            )?;
        }
        writeln!(out)?;

        writeln!(out, "## Time per activity")?;
        writeln!(out)?;
        writeln!(out, "```text")?;
        out.push_str(&self.render_chart());
        writeln!(out, "```")?;
        Ok(())
    }

    /// Horizontal bar chart, bars scaled to the largest total.
    pub fn render_chart(&self) -> String {
        let mut out = String::new();
        if self.totals.is_empty() {
            out.push_str("(no activities)\n");
            return out;
        }
        let label_width = self
            .totals
            .iter()
            .map(|v| v.name.chars().count())
            .max()
            .unwrap_or(0);
        let max = self
            .totals
            .iter()
            .map(|v| v.elapsed_seconds)
            .max()
            .unwrap_or(0);

        for total in &self.totals {
            let bar = if max == 0 {
                0
            } else {
                (total.elapsed_seconds as f64 / max as f64 * CHART_WIDTH as f64).round() as usize
            };
            let _ = writeln!(
                out,
                "{:<label_width$}  {:<CHART_WIDTH$}  {}s  {}",
                total.name,
                "#".repeat(bar),
                total.elapsed_seconds,
                total.share,
            );
        }
        out
    }
}

fn time_of_day(timestamp: Option<&String>) -> String {
    match timestamp {
        None => MISSING.to_string(),
        Some(raw) => parse_timestamp(raw)
            .map(|v| v.format(TIME_OF_DAY_FORMAT).to_string())
            .unwrap_or_else(|| raw.clone()),
    }
}

/// Keeps a value from breaking the markdown table.
fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}
