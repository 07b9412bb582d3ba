//! planwrap - supervised planner runs
//!
//! CLI entry point for planning and for inspecting planner answers.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use planwrap::cli::{Cli, Command, generate_after_help, get_log_path};
use planwrap::config::{Config, PlannerConfig};
use planwrap::{Plan, PlanSession, State, StateDelta, difference, parse_action, parse_state, read_plan};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // After-help reflects the default config chain; --config is not parsed yet
    let help_config = Config::load(None).map(|c| c.planner).unwrap_or_default();
    let cmd = Cli::command().after_help(generate_after_help(&help_config));
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Plan {
            problem,
            timeout_ms,
            signal,
            search,
        } => cmd_plan(config.planner, problem, timeout_ms, signal, search).await,
        Command::Show { artifact } => cmd_show(&artifact),
        Command::ParseState { line } => {
            let state = parse_state(&line).context("Invalid state line")?;
            println!("{}", format_state(&state));
            Ok(())
        }
        Command::ParseAction { line } => {
            let action = parse_action(&line).context("Invalid action line")?;
            println!("{}", action.to_string().cyan());
            Ok(())
        }
        Command::Diff { from, to } => {
            let from = parse_state(&from).context("Invalid source state line")?;
            let to = parse_state(&to).context("Invalid target state line")?;
            print_delta(&difference(&from, &to));
            Ok(())
        }
    }
}

async fn cmd_plan(
    mut planner: PlannerConfig,
    problem: PathBuf,
    timeout_ms: Option<u64>,
    signal: Option<String>,
    search: Option<String>,
) -> Result<()> {
    debug!(?problem, ?timeout_ms, ?signal, ?search, "cmd_plan: called");
    if let Some(ms) = timeout_ms {
        planner.timeout_ms = ms;
    }
    if let Some(signal) = signal {
        planner.kill_signal = signal;
    }
    if let Some(search) = search {
        planner.search_strategy = search;
    }

    let mut session = PlanSession::new(planner);
    session.set_plan_problem(problem);

    match session.build_plan().await {
        Ok(plan) => {
            print_plan(plan);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            Err(e).context("Planning failed")
        }
    }
}

fn cmd_show(artifact: &Path) -> Result<()> {
    debug!(?artifact, "cmd_show: called");
    let plan = read_plan(artifact).context(format!("Failed to read {}", artifact.display()))?;
    print_plan(&plan);
    Ok(())
}

fn format_state(state: &State) -> String {
    state.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

fn print_plan(plan: &Plan) {
    println!("{} {}", "state:".dimmed(), format_state(plan.initial_state()));
    for (_, action, after) in plan.steps() {
        println!("{} {}", "action:".yellow(), action.to_string().cyan());
        println!("{} {}", "state:".dimmed(), format_state(after));
    }
    println!("{} {} actions", "✓".green(), plan.len());
}

fn print_delta(delta: &StateDelta) {
    for term in &delta.add_list {
        println!("{} {}", "+".green(), term);
    }
    for term in &delta.del_list {
        println!("{} {}", "-".red(), term);
    }
}
