//! Plan sessions
//!
//! A [`PlanSession`] runs the planner under supervision, reads its answer
//! into a [`Plan`], and exposes a cursor over the plan's actions.
//!
//! Cursor accessors are total. Past the last action, or when no plan is
//! held, [`PlanSession::plan_action`] yields the end-of-plan marker and
//! [`PlanSession::plan_state`] the empty state.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::sys::signal::Signal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::artifact::{self, ArtifactError};
use crate::config::PlannerConfig;
use crate::delta::{self, StateDelta};
use crate::domain::{DomainDescription, DomainError, DomainModel, FixedProblem, PermissiveDomain, ProblemSource};
use crate::plan::Plan;
use crate::supervisor::{RunRequest, Supervisor, SupervisorError};
use crate::term::{State, Term};

static EMPTY_STATE: State = State::new();

/// Errors from building a plan
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Problem unavailable: {0}")]
    Problem(#[from] DomainError),

    #[error("Failed to launch planner {program}: {source}")]
    LaunchFailure {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Planner did not finish within {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    #[error("Supervisor error: {0}")]
    Supervisor(#[source] SupervisorError),

    #[error("Malformed result artifact: {0}")]
    MalformedArtifact(#[from] ArtifactError),

    #[error("Unknown kill signal: {0}")]
    InvalidSignal(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<SupervisorError> for PlanError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::Launch { program, source } => Self::LaunchFailure { program, source },
            other => Self::Supervisor(other),
        }
    }
}

/// One planner front end with its held plan and cursor
///
/// Single owner: wrap in a lock if several tasks drive the same session.
pub struct PlanSession {
    config: PlannerConfig,
    supervisor: Supervisor,
    description: DomainDescription,
    problems: Box<dyn ProblemSource>,
    model: Box<dyn DomainModel>,
    plan: Option<Plan>,
    pointer: usize,
}

impl std::fmt::Debug for PlanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanSession")
            .field("config", &self.config)
            .field("plan", &self.plan)
            .field("pointer", &self.pointer)
            .finish_non_exhaustive()
    }
}

impl PlanSession {
    pub fn new(config: PlannerConfig) -> Self {
        debug!(?config, "PlanSession::new: called");
        Self {
            config,
            supervisor: Supervisor::new(),
            description: DomainDescription::new(),
            problems: Box::new(FixedProblem::unset()),
            model: Box::new(PermissiveDomain),
            plan: None,
            pointer: 0,
        }
    }

    /// Session for a planner directory, launcher script and interpreter
    pub fn with_planner(dir: impl Into<PathBuf>, launcher: impl Into<String>, interpreter: impl Into<PathBuf>) -> Self {
        Self::new(PlannerConfig {
            dir: dir.into(),
            launcher: launcher.into(),
            interpreter: interpreter.into(),
            ..PlannerConfig::default()
        })
    }

    pub fn with_supervisor(mut self, supervisor: Supervisor) -> Self {
        self.supervisor = supervisor;
        self
    }

    pub fn with_problem_source(mut self, problems: Box<dyn ProblemSource>) -> Self {
        self.problems = problems;
        self
    }

    pub fn with_domain_model(mut self, model: Box<dyn DomainModel>) -> Self {
        self.model = model;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PlannerConfig {
        &mut self.config
    }

    pub fn description(&self) -> &DomainDescription {
        &self.description
    }

    pub fn description_mut(&mut self) -> &mut DomainDescription {
        &mut self.description
    }

    /// Select the problem file used by [`build_plan`](Self::build_plan)
    pub fn set_plan_problem(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(?path, "PlanSession::set_plan_problem: called");
        self.problems = Box::new(FixedProblem::new(path));
    }

    /// Argument vector passed to the interpreter
    pub fn planner_args(&self, problem_file: &Path) -> Vec<String> {
        vec![
            self.config.launcher_path().to_string_lossy().into_owned(),
            problem_file.to_string_lossy().into_owned(),
            "--search-options".to_string(),
            "--search".to_string(),
            self.config.search_strategy.clone(),
        ]
    }

    /// Plan with the problem, deadline and signal from the session configuration
    pub async fn build_plan(&mut self) -> Result<&Plan, PlanError> {
        debug!("PlanSession::build_plan: called");
        self.clear_plan();

        let problem = self.problems.problem_file(&self.description)?;
        let signal = self
            .config
            .kill_signal()
            .ok_or_else(|| PlanError::InvalidSignal(self.config.kill_signal.clone()))?;
        let timeout = self.config.timeout();

        self.plan(&problem, timeout, signal).await
    }

    /// Run the planner on `problem_file` and read back its plan
    ///
    /// Any held plan is discarded first; on error no plan is held.
    pub async fn plan(&mut self, problem_file: &Path, timeout: Duration, signal: Signal) -> Result<&Plan, PlanError> {
        debug!(?problem_file, ?timeout, %signal, "PlanSession::plan: called");
        self.clear_plan();

        let problem_file = absolute(problem_file)?;
        let result_path = self.config.result_path();
        remove_stale(&result_path)?;

        let request = RunRequest::new(
            self.config.interpreter.clone(),
            self.planner_args(&problem_file),
            timeout,
            signal,
        )
        .current_dir(&self.config.dir)
        .kill_grace(self.config.kill_grace())
        .quiet(self.config.quiet);

        info!("Planning {}", problem_file.display());
        let outcome = self.supervisor.run(&request).await?;
        if !outcome.completed_normally {
            warn!(timeout_ms = timeout.as_millis() as u64, "Planner timed out");
            return Err(PlanError::Timeout { timeout });
        }

        info!("Reading solution from {}", result_path.display());
        let plan = artifact::read_plan(&result_path)?;
        info!(actions = plan.len(), "Plan defined");
        let plan: &Plan = self.plan.insert(plan);
        Ok(plan)
    }

    /// Drop the held plan and rewind the cursor
    pub fn clear_plan(&mut self) {
        debug!("PlanSession::clear_plan: called");
        self.plan = None;
        self.pointer = 0;
    }

    pub fn reset_plan(&mut self) {
        debug!("PlanSession::reset_plan: called");
        self.pointer = 0;
    }

    /// Move to the next action; not clamped, check [`is_end_of_plan`](Self::is_end_of_plan)
    pub fn advance_plan(&mut self) {
        self.pointer += 1;
        debug!(pointer = self.pointer, "PlanSession::advance_plan: advanced");
    }

    pub fn is_plan_defined(&self) -> bool {
        self.plan.is_some()
    }

    pub fn is_end_of_plan(&self) -> bool {
        self.pointer >= self.plan_actions().len()
    }

    /// Held plan, if the last build succeeded
    pub fn current_plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Cursor position
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn plan_actions(&self) -> &[Term] {
        self.plan.as_ref().map(Plan::actions).unwrap_or(&[])
    }

    pub fn plan_states(&self) -> &[State] {
        self.plan.as_ref().map(Plan::states).unwrap_or(&[])
    }

    /// The action at the cursor, or the end-of-plan marker
    pub fn plan_action(&self) -> &Term {
        self.plan_actions().get(self.pointer).unwrap_or(Term::end_of_plan())
    }

    /// The expected state after the action at the cursor, or the empty state
    pub fn plan_state(&self) -> &State {
        if self.is_end_of_plan() {
            return &EMPTY_STATE;
        }
        self.plan_states().get(self.pointer + 1).unwrap_or(&EMPTY_STATE)
    }

    /// First state of the plan, or the empty state when no plan is held
    pub fn plan_initial_state(&self) -> &State {
        self.plan.as_ref().map(Plan::initial_state).unwrap_or(&EMPTY_STATE)
    }

    /// Initial state of the domain as the planner solved it
    pub fn domain_initial_state(&self) -> &State {
        self.plan_initial_state()
    }

    /// Initial state of the selected problem as the planner solved it
    pub fn domain_problem_initial_state(&self) -> &State {
        self.plan_initial_state()
    }

    /// Whether the action at the cursor may be applied in `state`
    ///
    /// Always false at the end of the plan.
    pub fn check_plan_action_preconditions(&self, state: &State) -> bool {
        debug!("PlanSession::check_plan_action_preconditions: called");
        if self.is_end_of_plan() {
            return false;
        }
        self.model.check_preconditions(self.plan_action(), state)
    }

    /// Effects of the action at the cursor in `state`; empty at the end of the plan
    pub fn plan_action_effects(&self, state: &State) -> StateDelta {
        debug!("PlanSession::plan_action_effects: called");
        if self.is_end_of_plan() {
            return StateDelta::default();
        }
        self.model.action_effects(self.plan_action(), state)
    }

    /// `state` after the action at the cursor; unchanged at the end of the plan
    pub fn plan_action_effects_state(&self, state: &State) -> State {
        debug!("PlanSession::plan_action_effects_state: called");
        if self.is_end_of_plan() {
            return state.clone();
        }
        self.model.action_effects_state(self.plan_action(), state)
    }

    pub fn state_difference(&self, from: &State, to: &State) -> StateDelta {
        delta::difference(from, to)
    }
}

/// Problem paths are resolved before the worker changes directory
fn absolute(path: &Path) -> Result<PathBuf, PlanError> {
    std::path::absolute(path).map_err(|source| PlanError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A result left by an earlier run must never be read as this run's answer
fn remove_stale(path: &Path) -> Result<(), PlanError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(?path, "remove_stale: removed previous artifact");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PlanError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
