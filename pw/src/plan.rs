//! Plans: alternating states and actions from one planner run

use tracing::debug;

use crate::term::{State, Term};

/// An ordered action sequence with the state before and after every step
///
/// `states[i]` holds before `actions[i]` and `states[i + 1]` after it, so
/// there is always one more state than actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    states: Vec<State>,
    actions: Vec<Term>,
}

impl Plan {
    /// Pair states with actions; `None` unless `states.len() == actions.len() + 1`
    pub fn new(states: Vec<State>, actions: Vec<Term>) -> Option<Self> {
        debug!(states = states.len(), actions = actions.len(), "Plan::new: called");
        if states.len() != actions.len() + 1 {
            debug!("Plan::new: length mismatch");
            return None;
        }
        Some(Self { states, actions })
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn actions(&self) -> &[Term] {
        &self.actions
    }

    /// Number of actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn initial_state(&self) -> &State {
        &self.states[0]
    }

    pub fn final_state(&self) -> &State {
        &self.states[self.states.len() - 1]
    }

    /// Iterate `(before, action, after)` triples
    pub fn steps(&self) -> impl Iterator<Item = (&State, &Term, &State)> {
        self.actions
            .iter()
            .enumerate()
            .map(|(i, action)| (&self.states[i], action, &self.states[i + 1]))
    }
}
