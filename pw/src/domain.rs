//! Domain and problem collaborators
//!
//! Authoring PDDL and checking action semantics live outside this crate.
//! The session reaches them through two seams:
//!
//! - [`ProblemSource`] turns the accumulated [`DomainDescription`] into the
//!   problem file handed to the planner.
//! - [`DomainModel`] answers precondition and effect queries for plan
//!   actions.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::delta::StateDelta;
use crate::term::{State, Term};

/// Errors from the problem collaborator
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No planning problem selected")]
    NoProblem,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// Domain and problem text accumulated before planning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainDescription {
    pub domain: String,
    pub symbols: Vec<String>,
    pub actions: Vec<String>,
    pub problems: Vec<String>,
    pub initial_state: Vec<String>,
    pub initial_facts: BTreeSet<Term>,
}

impl DomainDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every field
    pub fn clear(&mut self) {
        debug!("DomainDescription::clear: called");
        *self = Self::default();
    }

    pub fn clear_domain(&mut self) {
        self.domain.clear();
    }

    pub fn clear_symbols(&mut self) {
        self.symbols.clear();
    }

    pub fn clear_actions(&mut self) {
        self.actions.clear();
    }

    pub fn clear_problems(&mut self) {
        self.problems.clear();
    }

    pub fn clear_initial_state(&mut self) {
        self.initial_state.clear();
        self.initial_facts.clear();
    }

    /// Replace the domain text with the contents of a file
    pub fn load_domain(&mut self, path: &Path) -> Result<(), DomainError> {
        debug!(?path, "DomainDescription::load_domain: called");
        let text = fs::read_to_string(path).map_err(|source| DomainError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.domain = text;
        Ok(())
    }

    pub fn define_domain(&mut self, text: &str) {
        self.domain.push_str(text);
    }

    pub fn define_symbols(&mut self, text: &str) {
        self.symbols.push(text.to_string());
    }

    pub fn define_actions(&mut self, text: &str) {
        self.actions.push(text.to_string());
    }

    pub fn define_problems(&mut self, text: &str) {
        self.problems.push(text.to_string());
    }

    pub fn define_initial_state(&mut self, text: &str) {
        self.initial_state.push(text.to_string());
    }

    pub fn define_initial_facts(&mut self, facts: impl IntoIterator<Item = Term>) {
        self.initial_facts.extend(facts);
    }
}

/// Produces the problem file for a planning run
pub trait ProblemSource: Send + Sync {
    fn problem_file(&self, description: &DomainDescription) -> Result<PathBuf, DomainError>;
}

/// A problem file chosen up front; the description is not consulted
#[derive(Debug, Clone, Default)]
pub struct FixedProblem {
    path: Option<PathBuf>,
}

impl FixedProblem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()) }
    }

    /// No problem selected yet
    pub fn unset() -> Self {
        Self::default()
    }
}

impl ProblemSource for FixedProblem {
    fn problem_file(&self, _description: &DomainDescription) -> Result<PathBuf, DomainError> {
        self.path.clone().ok_or(DomainError::NoProblem)
    }
}

/// Action semantics against a domain theory
pub trait DomainModel: Send + Sync {
    /// Whether `action` is applicable in `state`
    fn check_preconditions(&self, action: &Term, state: &State) -> bool;

    /// Facts `action` adds and removes when applied in `state`
    fn action_effects(&self, action: &Term, state: &State) -> StateDelta;

    /// The state after applying `action` in `state`
    fn action_effects_state(&self, action: &Term, state: &State) -> State {
        self.action_effects(action, state).apply(state)
    }
}

/// Accepts every action and reports no effects
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveDomain;

impl DomainModel for PermissiveDomain {
    fn check_preconditions(&self, action: &Term, _state: &State) -> bool {
        debug!(%action, "PermissiveDomain::check_preconditions: called");
        true
    }

    fn action_effects(&self, action: &Term, _state: &State) -> StateDelta {
        debug!(%action, "PermissiveDomain::action_effects: called");
        StateDelta::default()
    }
}
