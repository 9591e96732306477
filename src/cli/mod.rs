pub mod commands;
pub mod interactive;
pub mod output;

use std::{env, io::Write, path::PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use interactive::{run_session, SessionOptions};
use tracing::{info, level_filters::LevelFilter};

use crate::{
    export,
    utils::{
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, LOG_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "actimer", version, long_about = None)]
#[command(about = "Time activities from a fixed catalog, export them and write reports")]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Copy log output to the terminal")]
    log: bool,
    #[arg(long = "log-filter", global = true, help = "Log level. Defaults to RUST_LOG or info")]
    log_filter: Option<LevelFilter>,
    #[arg(
        long,
        global = true,
        help = "Application directory for logs. By default $XDG_STATE_HOME/actimer or $HOME/.local/state/actimer"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Start an interactive timing session")]
    Session {
        #[command(flatten)]
        options: SessionOptions,
    },
    #[command(about = "Write the report for an exported JSON file")]
    Report {
        input: PathBuf,
        #[arg(long, short, default_value = "actividades", help = "Project title used in the heading")]
        project: String,
        #[arg(long, short, help = "Report path. Defaults to report_<project>.md in the current directory")]
        output: Option<PathBuf>,
    },
    #[command(about = "Check that a JSON file can be imported")]
    Validate { input: PathBuf },
    #[command(about = "List the activity catalog")]
    Catalog,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args.dir.map_or_else(create_application_default_path, ensure_dir)?;
    let log_dir = ensure_dir(app_dir.join("logs"))?;
    enable_logging(LOG_PREFIX, &log_dir, args.log_filter, args.log)?;
    info!("Using application directory {app_dir:?}");

    let current_dir = env::current_dir()?;
    let mut stdout = std::io::stdout();

    match args.commands {
        Commands::Session { options } => run_session(options, current_dir).await,
        Commands::Report {
            input,
            project,
            output: report_path,
        } => {
            let ledger = export::load_json(&input).await?;
            let path = export::target_path(report_path, &current_dir, export::report_file_name(&project));
            let report =
                export::save_report(&ledger, &project, Local::now().date_naive(), &path).await?;
            output::print_chart(&mut stdout, &report)?;
            output::print_notice(&mut stdout, format!("Report written to {}", path.display()))?;
            Ok(())
        }
        Commands::Validate { input } => {
            let ledger = export::load_json(&input).await?;
            output::print_notice(
                &mut stdout,
                format!("{} is valid, {} activities", input.display(), ledger.len()),
            )?;
            Ok(())
        }
        Commands::Catalog => {
            output::print_catalog(&mut stdout)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn session_defaults() {
        let args = Args::try_parse_from(["actimer", "session"]).unwrap();
        let Commands::Session { options } = args.commands else {
            panic!("expected session");
        };
        assert_eq!(options.project, "actividades");
        assert_eq!(options.threshold, 60);
        assert_eq!(options.lookup_timeout_ms, 3000);
        assert!(!options.offline);
        assert!(options.import.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "actimer",
            "report",
            "tesis.json",
            "--project",
            "Tesis",
            "--log-filter",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.log_filter, Some(LevelFilter::DEBUG));
        assert!(matches!(args.commands, Commands::Report { project, .. } if project == "Tesis"));
    }
}
