use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};

/// One line typed into the interactive session.
#[derive(Parser, Debug, PartialEq)]
#[command(
    name = "session",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
struct CommandLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum SessionCommand {
    #[command(about = "List the activities that can be selected")]
    Catalog,
    #[command(about = "Select the activity to time by catalog id")]
    Select { id: u32 },
    #[command(about = "Name the custom activity (id 10)")]
    Name {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        name: Vec<String>,
    },
    #[command(about = "Attach a comment, recorded on the next start")]
    Comment {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    #[command(about = "Start or resume the selected activity")]
    Start,
    #[command(about = "Pause the running activity")]
    Pause,
    #[command(about = "Stop the activity and record its times")]
    Stop,
    #[command(about = "Show the clock, timer and activity")]
    Status,
    #[command(about = "List the recorded activities", alias = "ls")]
    List,
    #[command(about = "Show every detail of a recorded activity")]
    Show {
        #[arg(help = "Position in `list`, starting at 1")]
        position: usize,
    },
    #[command(about = "Save the activities as JSON")]
    Export { path: Option<PathBuf> },
    #[command(about = "Replace the activities with a JSON file")]
    Import { path: PathBuf },
    #[command(about = "Write the project report")]
    Report { path: Option<PathBuf> },
    #[command(about = "Show the current time")]
    Clock,
    #[command(about = "Show this help")]
    Help,
    #[command(about = "Leave the session", alias = "exit")]
    Quit,
}

/// Empty lines give [None].
pub fn parse_line(line: &str) -> Result<Option<SessionCommand>, clap::Error> {
    let words = line.split_whitespace().collect::<Vec<_>>();
    if words.is_empty() {
        return Ok(None);
    }
    CommandLine::try_parse_from(words).map(|v| Some(v.command))
}

pub fn help() -> String {
    CommandLine::command().render_help().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("select 3").unwrap(), Some(SessionCommand::Select { id: 3 }));
        assert_eq!(parse_line("  start ").unwrap(), Some(SessionCommand::Start));
        assert_eq!(parse_line("ls").unwrap(), Some(SessionCommand::List));
        assert_eq!(parse_line("exit").unwrap(), Some(SessionCommand::Quit));
        assert_eq!(
            parse_line("export out/tesis.json").unwrap(),
            Some(SessionCommand::Export {
                path: Some("out/tesis.json".into())
            })
        );
        assert_eq!(parse_line("report").unwrap(), Some(SessionCommand::Report { path: None }));
    }

    #[test]
    fn free_text_keeps_every_word() {
        assert_eq!(
            parse_line("comment re-read chapter  3").unwrap(),
            Some(SessionCommand::Comment {
                text: vec!["re-read".into(), "chapter".into(), "3".into()]
            })
        );
        assert_eq!(
            parse_line("name Piano practice").unwrap(),
            Some(SessionCommand::Name {
                name: vec!["Piano".into(), "practice".into()]
            })
        );
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn bad_input_is_an_error() {
        assert!(parse_line("select lectura").is_err());
        assert!(parse_line("fly").is_err());
        assert!(parse_line("comment").is_err());
    }

    #[test]
    fn help_lists_commands() {
        let help = help();
        for command in ["select", "start", "pause", "stop", "export", "import", "report"] {
            assert!(help.contains(command), "{command}");
        }
    }
}
