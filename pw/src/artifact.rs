//! Reading the planner's result artifact
//!
//! The artifact is line oriented. Lines starting with `;` are comments and
//! blank lines are skipped; neither consumes a slot. The remaining lines
//! alternate state, action, state, ... beginning and ending with a state.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::plan::Plan;
use crate::term::{ParseError, parse_action, parse_state};

/// Comment marker in the result artifact
pub const COMMENT_MARKER: char = ';';

/// Errors from reading a result artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Result artifact {path} not found")]
    Missing { path: PathBuf },

    #[error("Result artifact {path} contains no states")]
    Empty { path: PathBuf },

    #[error("{path}:{line}: {source}")]
    Line {
        path: PathBuf,
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("Result artifact {path} ends with an action and no resulting state")]
    TrailingAction { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Open and parse the artifact at `path`
pub fn read_plan(path: &Path) -> Result<Plan, ArtifactError> {
    debug!(?path, "read_plan: called");
    let file = File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ArtifactError::Missing {
            path: path.to_path_buf(),
        },
        _ => ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    parse_plan(BufReader::new(file), path)
}

/// Parse an artifact from a line reader; `path` is used for error context
pub fn parse_plan<R: BufRead>(reader: R, path: &Path) -> Result<Plan, ArtifactError> {
    debug!(?path, "parse_plan: called");
    let mut states = Vec::new();
    let mut actions = Vec::new();
    let mut expect_state = true;

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.starts_with(COMMENT_MARKER) || line.trim().is_empty() {
            continue;
        }

        let at_line = |source| ArtifactError::Line {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        };
        if expect_state {
            states.push(parse_state(&line).map_err(at_line)?);
        } else {
            actions.push(parse_action(&line).map_err(at_line)?);
        }
        expect_state = !expect_state;
    }

    if states.is_empty() {
        debug!("parse_plan: no states read");
        return Err(ArtifactError::Empty {
            path: path.to_path_buf(),
        });
    }

    let plan = Plan::new(states, actions).ok_or_else(|| ArtifactError::TrailingAction {
        path: path.to_path_buf(),
    })?;
    info!(actions = plan.len(), "Plan read from {}", path.display());
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{State, Term};
    use std::io::Cursor;

    fn parse(text: &str) -> Result<Plan, ArtifactError> {
        parse_plan(Cursor::new(text), Path::new("sas_plan_em"))
    }

    fn state(facts: &[&str]) -> State {
        facts.iter().map(|f| Term::atom(*f)).collect()
    }

    #[test]
    fn test_comment_does_not_flip_alternation() {
        let plan = parse(";comment\n(p)\n(move a b)\n(q)\n").unwrap();
        assert_eq!(plan.states(), &[state(&["p"]), state(&["q"])]);
        assert_eq!(
            plan.actions(),
            &[Term::new("move", vec!["a".to_string(), "b".to_string()])]
        );
    }

    #[test]
    fn test_interleaved_comments_and_blank_lines() {
        let plan = parse("(p)\n; step 1\n\n(a)\n(q)\n; cost = 1 (unit cost)\n").unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_initial_state_only() {
        let plan = parse("(p q)\n").unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.initial_state(), &state(&["p", "q"]));
    }

    #[test]
    fn test_empty_artifact() {
        assert!(matches!(parse(""), Err(ArtifactError::Empty { .. })));
        assert!(matches!(parse("; only a comment\n"), Err(ArtifactError::Empty { .. })));
    }

    #[test]
    fn test_trailing_action() {
        assert!(matches!(parse("(p)\n(a)\n"), Err(ArtifactError::TrailingAction { .. })));
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let err = parse("; header\n(p)\n(a\n(q)\n").unwrap_err();
        match err {
            ArtifactError::Line { line, source, .. } => {
                assert_eq!(line, 3);
                assert_eq!(source, ParseError::Unbalanced);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let err = read_plan(&temp.path().join("sas_plan_em")).unwrap_err();
        assert!(matches!(err, ArtifactError::Missing { .. }));
    }

    #[test]
    fn test_read_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sas_plan_em");
        std::fs::write(&path, "(on(a,b) clear(c))\n(unstack a b)\n(clear(b) holding(a))\n").unwrap();

        let plan = read_plan(&path).unwrap();

        assert_eq!(plan.states().len(), plan.actions().len() + 1);
        assert_eq!(plan.actions()[0].to_string(), "unstack(a,b)");
    }
}
