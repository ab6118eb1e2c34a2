use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::task::{DEFAULT_ESTIMATE_MINUTES, PRESET_ESTIMATES, SUGGESTED_CATEGORIES};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "habitstack",
    version,
    about = "HabitStack: today's task stack, focus timer and daily reflection"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rc-file", global = true)]
    pub rc_file: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a task
    Add(AddArgs),
    /// Today's stack (or every task with --all)
    #[command(visible_alias = "today")]
    List {
        #[arg(long)]
        all: bool,
    },
    /// Change a task's title, description or estimate
    Edit(EditArgs),
    /// Mark a task completed
    Done { task: String },
    /// Mark a completed task pending again
    Undone { task: String },
    Delete { task: String },
    /// Move a task one place up in today's stack
    Up { task: String },
    /// Move a task one place down in today's stack
    Down { task: String },
    /// Pin a task to today's stack
    Assign { task: String },
    /// Unpin a task from today's stack
    Unassign { task: String },
    /// Run a focus session on a task (default: head of today's stack)
    Focus { task: Option<String> },
    /// Run the standalone pomodoro timer
    Timer {
        #[arg(long)]
        work: Option<u32>,
        #[arg(long = "break")]
        break_minutes: Option<u32>,
    },
    /// Today's progress
    Stats,
    /// Show or save today's reflection
    Reflect {
        #[arg(long)]
        mood: Option<String>,
        text: Vec<String>,
    },
    /// List themes, select one, or set a custom gradient
    Theme {
        id: Option<String>,
        #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
        custom: Option<Vec<String>>,
        #[arg(long)]
        clear_custom: bool,
    },
    /// Set or clear the background image
    Background {
        path: Option<PathBuf>,
        #[arg(long)]
        clear: bool,
    },
    /// Turn notifications on or off
    Notifications { state: String },
    /// Walk through the introduction
    Intro,
    /// Print effective configuration
    Show,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: Vec<String>,
    #[arg(short = 'e', long = "estimate", help = estimate_help())]
    pub estimate: Option<u32>,
    #[arg(short = 'p', long)]
    pub priority: Option<String>,
    #[arg(short = 'c', long, help = category_help())]
    pub category: Option<String>,
    #[arg(short = 'd', long)]
    pub description: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub task: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(short = 'd', long)]
    pub description: Option<String>,
    #[arg(short = 'e', long = "estimate")]
    pub estimate: Option<u32>,
}

fn estimate_help() -> String {
    let presets: Vec<String> = PRESET_ESTIMATES.iter().map(|m| m.to_string()).collect();
    format!(
        "Estimated minutes (default {DEFAULT_ESTIMATE_MINUTES}; common: {})",
        presets.join(", ")
    )
}

fn category_help() -> String {
    format!("Category label, e.g. {}", SUGGESTED_CATEGORIES.join(", "))
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&args(&[
            "habitstack",
            "rc.session.break=10",
            "list",
            "rc.color:off",
        ]))
        .expect("preprocess");
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.session.break".to_string(), "10".to_string()),
                ("rc.color".to_string(), "off".to_string()),
            ]
        );
        assert_eq!(pre.cleaned_args, args(&["habitstack", "list"]));
    }

    #[test]
    fn add_help_lists_presets_and_categories() {
        let cmd = GlobalCli::command();
        let add = cmd.find_subcommand("add").expect("add subcommand");
        let help_of = |id: &str| {
            add.get_arguments()
                .find(|a| a.get_id() == id)
                .and_then(|a| a.get_help())
                .map(|h| h.to_string())
                .expect("argument help")
        };
        assert!(help_of("estimate").contains("15, 25, 30, 45, 60, 90"));
        assert!(help_of("category").contains("Creativity"));
    }

    #[test]
    fn parses_add_with_flags() {
        let cli = GlobalCli::parse_from(args(&[
            "habitstack", "add", "Write", "report", "-e", "30", "-p", "medium",
        ]));
        let Some(Command::Add(add)) = cli.command else {
            panic!("expected add command");
        };
        assert_eq!(add.title.join(" "), "Write report");
        assert_eq!(add.estimate, Some(30));
    }
}
