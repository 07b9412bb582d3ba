//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::PlannerConfig;

/// planwrap - supervised planner runs
#[derive(Parser)]
#[command(
    name = "pw",
    about = "Run an external planner under a deadline and inspect its plan",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the planner on a problem file and print the plan
    Plan {
        /// Problem file handed to the planner
        problem: PathBuf,

        /// Deadline in milliseconds (overrides config)
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Signal sent when the deadline elapses (overrides config)
        #[arg(short, long)]
        signal: Option<String>,

        /// Search configuration (overrides config)
        #[arg(long)]
        search: Option<String>,
    },

    /// Parse an existing result artifact and print the plan
    Show {
        /// Path to the result artifact
        artifact: PathBuf,
    },

    /// Parse one state line
    ParseState {
        /// e.g. "(on(a,b) clear(c) handempty)"
        line: String,
    },

    /// Parse one action line
    ParseAction {
        /// e.g. "(pick-up a table)"
        line: String,
    },

    /// Show facts added and removed between two state lines
    Diff {
        /// Source state line
        from: String,

        /// Target state line
        to: String,
    },
}

/// Availability of a file the planner needs
#[derive(Debug, Clone)]
pub struct PathCheck {
    pub label: &'static str,
    pub path: PathBuf,
    pub available: bool,
}

impl PathCheck {
    fn check(label: &'static str, path: PathBuf) -> Self {
        let available = path.exists();
        debug!(label, ?path, available, "PathCheck::check: called");
        Self { label, path, available }
    }
}

/// Check the interpreter and launcher configured for the planner
pub fn check_planner_paths(config: &PlannerConfig) -> Vec<PathCheck> {
    debug!("check_planner_paths: called");
    vec![
        PathCheck::check("interpreter", config.interpreter.clone()),
        PathCheck::check("launcher", config.launcher_path()),
    ]
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("planwrap")
        .join("logs")
        .join("planwrap.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text with planner checks and the log location
pub fn generate_after_help(config: &PlannerConfig) -> String {
    debug!("generate_after_help: called");
    let mut help = String::new();

    help.push_str("Planner:\n");
    for check in check_planner_paths(config) {
        let icon = if check.available { "\u{2705}" } else { "\u{274C}" };
        help.push_str(&format!("  {} {:<12} {}\n", icon, check.label, check.path.display()));
    }
    help.push_str(&format!("  search: {}\n", config.search_strategy));

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));

    help
}
