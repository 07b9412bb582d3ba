//! Terms, states and the planner answer syntax
//!
//! A [`Term`] is a functor with an ordered list of string arguments. Facts
//! and actions are both terms; a [`State`] is an ordered set of facts.

mod lexer;
mod parser;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use tracing::debug;

pub use lexer::{Lexer, Spanned, Token};
pub use parser::{ParseError, parse_action, parse_state};

/// Functor of the marker returned by cursor accessors past the last action
pub const END_OF_PLAN: &str = "EOP";

/// A world state: a set of facts with a deterministic iteration order
pub type State = BTreeSet<Term>;

static END_OF_PLAN_TERM: LazyLock<Term> = LazyLock::new(|| Term::atom(END_OF_PLAN));

/// A fact or action: `functor` or `functor(arg1,arg2,...)`
///
/// Ordering is by functor first, then element-wise over the arguments.
/// Field order matters for the derived `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term {
    functor: String,
    args: Vec<String>,
}

impl Term {
    /// Create a term with arguments
    pub fn new(functor: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            functor: functor.into(),
            args,
        }
    }

    /// Create a term without arguments
    pub fn atom(functor: impl Into<String>) -> Self {
        Self::new(functor, Vec::new())
    }

    /// The sentinel term handed out at the end of a plan
    pub fn end_of_plan() -> &'static Term {
        &END_OF_PLAN_TERM
    }

    pub fn functor(&self) -> &str {
        &self.functor
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Argument at position `i`, if present
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).map(String::as_str)
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn is_end_of_plan(&self) -> bool {
        self.functor == END_OF_PLAN && self.args.is_empty()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return write!(f, "{}", self.functor);
        }
        write!(f, "{}({})", self.functor, self.args.join(","))
    }
}

/// Render a state as one answer-file state line: `(f1(a,b) f2 f3(c))`
pub fn render_state(state: &State) -> String {
    debug!(len = state.len(), "render_state: called");
    let facts: Vec<String> = state.iter().map(Term::to_string).collect();
    format!("({})", facts.join(" "))
}

/// Render an action as one answer-file action line: `(name arg1 arg2)`
pub fn render_action(action: &Term) -> String {
    debug!(%action, "render_action: called");
    let mut tokens = Vec::with_capacity(action.arity() + 1);
    tokens.push(action.functor());
    tokens.extend(action.args().iter().map(String::as_str));
    format!("({})", tokens.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(functor: &str, args: &[&str]) -> Term {
        Term::new(functor, args.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn test_display_bare_functor() {
        assert_eq!(Term::atom("handempty").to_string(), "handempty");
    }

    #[test]
    fn test_display_with_args() {
        assert_eq!(term("on", &["a", "b"]).to_string(), "on(a,b)");
    }

    #[test]
    fn test_ordering_functor_first() {
        assert!(term("a", &["z"]) < term("b", &["a"]));
        assert!(term("on", &["a", "b"]) < term("on", &["a", "c"]));
        assert!(term("on", &["a"]) < term("on", &["a", "b"]));
        assert!(Term::atom("p") < term("p", &["x"]));
    }

    #[test]
    fn test_state_collapses_duplicates() {
        let state: State = [term("on", &["a", "b"]), term("on", &["a", "b"]), Term::atom("q")]
            .into_iter()
            .collect();
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_accessors() {
        let t = term("move", &["a", "b"]);
        assert_eq!(t.functor(), "move");
        assert_eq!(t.arity(), 2);
        assert_eq!(t.arg(1), Some("b"));
        assert_eq!(t.arg(2), None);
    }

    #[test]
    fn test_end_of_plan_sentinel() {
        let eop = Term::end_of_plan();
        assert!(eop.is_end_of_plan());
        assert_eq!(eop.to_string(), "EOP");
        assert!(!term("EOP", &["x"]).is_end_of_plan());
    }

    #[test]
    fn test_render_lines() {
        let state: State = [term("on", &["a", "b"]), Term::atom("handempty")].into_iter().collect();
        assert_eq!(render_state(&state), "(handempty on(a,b))");
        assert_eq!(render_action(&term("pick-up", &["a", "table"])), "(pick-up a table)");
        assert_eq!(render_state(&State::new()), "()");
    }
}
