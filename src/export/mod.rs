//! Everything that reads the ledger out of the process or brings one back in: the JSON snapshot
//! and the report document. File names are derived from the project title.

pub mod json;
pub mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::{fs::operations, ledger::Ledger};

const DEFAULT_PROJECT: &str = "actividades";

/// Turns a free text project title into something safe to use as a file name.
pub fn project_slug(title: &str) -> String {
    let slug = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();
    if slug.trim_matches('_').is_empty() {
        DEFAULT_PROJECT.to_string()
    } else {
        slug
    }
}

pub fn export_file_name(project_title: &str) -> String {
    format!("{}.json", project_slug(project_title))
}

pub fn report_file_name(project_title: &str) -> String {
    format!("report_{}.md", project_slug(project_title))
}

/// Resolves where an export or report goes: an explicit path wins, otherwise `default_dir`
/// joined with the derived file name.
pub fn target_path(explicit: Option<PathBuf>, default_dir: &Path, file_name: String) -> PathBuf {
    explicit.unwrap_or_else(|| default_dir.join(file_name))
}

#[instrument(skip(ledger))]
pub async fn save_json(ledger: &Ledger, path: &Path) -> Result<()> {
    let contents = json::export_json(ledger)?;
    operations::write_locked(path, contents.as_bytes())
        .await
        .with_context(|| format!("Failed to write export into {path:?}"))?;
    info!("Exported {} activities", ledger.len());
    Ok(())
}

/// Reads and validates an import file. The error keeps the [json::ImportError] so callers can
/// tell a bad file from an I/O failure.
#[instrument]
pub async fn load_json(path: &Path) -> Result<Ledger> {
    let raw = operations::read_locked(path)
        .await
        .with_context(|| format!("Failed to read {path:?}"))?;
    Ok(json::import_json(&raw)?)
}

#[instrument(skip(ledger))]
pub async fn save_report(
    ledger: &Ledger,
    project_title: &str,
    generated_on: NaiveDate,
    path: &Path,
) -> Result<report::Report> {
    let report = report::build_report(ledger, generated_on);
    operations::write_locked(path, report.render(project_title).as_bytes())
        .await
        .with_context(|| format!("Failed to write report into {path:?}"))?;
    info!("Report with {} rows written", report.rows.len());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::*;
    use crate::ledger::entities::{Activity, Comment};

    #[test]
    fn slugs() {
        assert_eq!(project_slug("Tesis final"), "Tesis_final");
        assert_eq!(project_slug("  año-2024 "), "año-2024");
        assert_eq!(project_slug("../../etc"), "______etc");
        assert_eq!(project_slug("   "), DEFAULT_PROJECT);
        assert_eq!(project_slug("///"), DEFAULT_PROJECT);
        assert_eq!(export_file_name("Tesis"), "Tesis.json");
        assert_eq!(report_file_name("Tesis"), "report_Tesis.md");
    }

    #[tokio::test]
    async fn saved_file_loads_back() -> Result<()> {
        let dir = tempdir()?;
        let path = target_path(None, dir.path(), export_file_name("demo"));
        let ledger = Ledger::from_activities(vec![Activity::new(
            7,
            "Pruebas".into(),
            Comment {
                text: "go".into(),
                timestamp: "15/03/2024, 09:30:00".into(),
            },
            "15/03/2024, 09:30:00".into(),
        )])?;

        save_json(&ledger, &path).await?;
        assert_eq!(load_json(&path).await?, ledger);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_file_keeps_import_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, r#"[{"id":1,"name":"x","time":5}]"#).await?;

        let err = load_json(&path).await.unwrap_err();
        assert!(err.downcast_ref::<json::ImportError>().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn report_is_written() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(report_file_name("demo"));
        let date = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();
        save_report(&Ledger::new(), "demo", date, &path).await?;
        let written = tokio::fs::read_to_string(&path).await?;
        assert!(written.starts_with("# Project report: demo"));
        Ok(())
    }
}
