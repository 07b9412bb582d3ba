//! planwrap - supervised external planner runs
//!
//! planwrap launches an external batch planner (Fast Downward style), races
//! it against a wall-clock deadline, and reads its answer file as a plan of
//! alternating world states and actions.
//!
//! # Core Concepts
//!
//! - **Supervised runs**: the worker is terminated when the deadline elapses
//!   and always reaped before control returns
//! - **Terms**: facts and actions share one `functor(arg,...)` value type
//! - **Plan cursor**: the session walks the plan one action at a time
//! - **State deltas**: added and removed facts between any two states
//!
//! # Modules
//!
//! - [`term`] - term values and the answer-line parser
//! - [`delta`] - state differences
//! - [`supervisor`] - deadline-bounded process execution
//! - [`artifact`] - result file reader
//! - [`plan`] - plan value type
//! - [`domain`] - domain/problem collaborator seams
//! - [`session`] - plan sessions and cursor
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod artifact;
pub mod cli;
pub mod config;
pub mod delta;
pub mod domain;
pub mod plan;
pub mod session;
pub mod supervisor;
pub mod term;

// Re-export commonly used types
pub use artifact::{ArtifactError, parse_plan, read_plan};
pub use config::{Config, PlannerConfig};
pub use delta::{StateDelta, difference};
pub use domain::{DomainDescription, DomainError, DomainModel, FixedProblem, PermissiveDomain, ProblemSource};
pub use plan::Plan;
pub use session::{PlanError, PlanSession};
pub use supervisor::{RunOutcome, RunRequest, SignalTerminator, Supervisor, SupervisorError, Terminator};
pub use term::{END_OF_PLAN, ParseError, State, Term, parse_action, parse_state, render_action, render_state};
