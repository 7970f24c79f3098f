use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

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
    name = "lane",
    version,
    about = "tasklane: queue and week boards with drag-and-drop reordering"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "lanerc")]
    pub lanerc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a task.
    Add(AddArgs),
    /// Show the backlog, today and this-week columns.
    Board {
        #[arg(long)]
        json: bool,
    },
    /// Show one week of date columns plus unscheduled tasks.
    Week {
        #[command(flatten)]
        week: WeekArgs,
        #[arg(long)]
        json: bool,
    },
    /// List the drag tokens of every container and item in a view.
    Tokens {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Pick a task up, hover over targets and drop it.
    Drag(DragArgs),
    /// Move a task to the end of a queue or day without dragging.
    Send {
        task: String,
        /// Queue (backlog, today, week) or date (YYYY-MM-DD, tomorrow, none, ...).
        target: String,
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long)]
        dry_run: bool,
    },
    /// Replay drag or pointer events from a JSON-lines file.
    Replay {
        file: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long)]
        dry_run: bool,
    },
    /// Mark a task done.
    Done { task: String },
    /// Move overdue tasks, or one day's tasks, to another date.
    Reschedule {
        /// Date to reschedule to.
        to: String,
        /// Only tasks due on this day; overdue tasks when absent.
        #[arg(long)]
        from: Option<String>,
        #[command(flatten)]
        week: WeekArgs,
        #[arg(long)]
        dry_run: bool,
    },
    /// Revert the last change.
    Undo,
    /// Print every task as JSON.
    Export,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,
    #[arg(long)]
    pub queue: Option<String>,
    #[arg(long, short = 'p')]
    pub priority: Option<String>,
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Args, Debug, Clone)]
pub struct DragArgs {
    /// Task id, unique id prefix, or `item::` token.
    pub task: String,
    /// Token hovered over, in order.
    #[arg(long = "over", action = ArgAction::Append)]
    pub over: Vec<String>,
    /// Token dropped on; defaults to the last `--over`.
    #[arg(long = "drop")]
    pub drop_on: Option<String>,
    #[arg(long, conflicts_with = "drop_on")]
    pub cancel: bool,
    #[command(flatten)]
    pub view: ViewArgs,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewKind {
    #[default]
    Work,
    Week,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WeekArgs {
    /// Weeks relative to the current one.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub offset: i64,
    /// Show Saturday and Sunday columns.
    #[arg(long)]
    pub weekend: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    #[arg(long, value_enum, default_value_t = ViewKind::Work)]
    pub view: ViewKind,
    #[command(flatten)]
    pub week: WeekArgs,
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
            let parsed = rest.split_once('=').or_else(|| rest.split_once(':'));
            if let Some((k, v)) = parsed {
                if k.is_empty() {
                    return Err(anyhow!("empty rc override key in: {s}"));
                }
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((format!("rc.{k}"), v.to_string()));
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
    use std::ffi::OsString;

    use clap::Parser;

    use super::{Command, GlobalCli, ViewKind, preprocess_args};

    fn args(raw: &[&str]) -> Vec<OsString> {
        raw.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_removed() {
        let pre = preprocess_args(&args(&["lane", "rc.color=off", "board", "rc.week.weekend:on"]))
            .expect("preprocess");
        assert_eq!(pre.cleaned_args, args(&["lane", "board"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.week.weekend".to_string(), "on".to_string()),
            ]
        );
    }

    #[test]
    fn drag_collects_hover_targets_in_order() {
        let cli = GlobalCli::parse_from(args(&[
            "lane",
            "drag",
            "task-1",
            "--over",
            "column::day",
            "--over",
            "item::task-2",
            "--view",
            "week",
            "--offset",
            "-1",
        ]));
        let Some(Command::Drag(drag)) = cli.command else {
            panic!("expected drag command");
        };
        assert_eq!(drag.over, vec!["column::day", "item::task-2"]);
        assert_eq!(drag.view.view, ViewKind::Week);
        assert_eq!(drag.view.week.offset, -1);
        assert!(drag.drop_on.is_none());
    }
}
