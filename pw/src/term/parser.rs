//! Recursive builders for state and action lines
//!
//! State line: `(f1(a,b) f2 f3(c))`. Facts are separated by whitespace; a
//! fact is a bare functor or a functor followed by one parenthesized,
//! comma-separated argument list. Whitespace inside an argument list is
//! dropped. Only one level of argument nesting is accepted.
//!
//! Action line: `(name arg1 arg2)`. The first token is the functor, the
//! rest are positional arguments.

use std::iter::Peekable;

use thiserror::Error;
use tracing::debug;

use super::lexer::{Lexer, Spanned, Token};
use super::{State, Term};

/// Errors from parsing one answer line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected '(' at offset {offset}")]
    ExpectedOpen { offset: usize },

    #[error("unexpected {token} at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },

    #[error("term at offset {offset} has no functor")]
    MissingFunctor { offset: usize },

    #[error("argument nesting deeper than one level at offset {offset}")]
    NestingTooDeep { offset: usize },

    #[error("unbalanced parentheses: line ended inside a term")]
    Unbalanced,

    #[error("trailing input after closing ')' at offset {offset}")]
    TrailingInput { offset: usize },
}

impl ParseError {
    fn unexpected(spanned: Spanned<'_>) -> Self {
        Self::UnexpectedToken {
            token: spanned.token.to_string(),
            offset: spanned.offset,
        }
    }
}

type Tokens<'a> = Peekable<Lexer<'a>>;

/// Parse a state line into its set of facts
pub fn parse_state(line: &str) -> Result<State, ParseError> {
    debug!(%line, "parse_state: called");
    let mut tokens = Lexer::new(line).peekable();
    open_line(&mut tokens)?;

    let mut state = State::new();
    loop {
        skip_space(&mut tokens);
        let spanned = tokens.next().ok_or(ParseError::Unbalanced)?;
        match spanned.token {
            Token::Close => break,
            Token::Word(functor) => {
                let fact = fact(functor, &mut tokens)?;
                debug!(%fact, "parse_state: fact parsed");
                state.insert(fact);
            }
            Token::Open => return Err(ParseError::MissingFunctor { offset: spanned.offset }),
            _ => return Err(ParseError::unexpected(spanned)),
        }
    }

    close_line(&mut tokens)?;
    debug!(facts = state.len(), "parse_state: done");
    Ok(state)
}

/// Parse an action line into a single term
pub fn parse_action(line: &str) -> Result<Term, ParseError> {
    debug!(%line, "parse_action: called");
    let mut tokens = Lexer::new(line).peekable();
    let open_offset = open_line(&mut tokens)?;

    let mut words = Vec::new();
    loop {
        skip_space(&mut tokens);
        let spanned = tokens.next().ok_or(ParseError::Unbalanced)?;
        match spanned.token {
            Token::Close => break,
            Token::Word(w) => words.push(w.to_string()),
            Token::Open => return Err(ParseError::NestingTooDeep { offset: spanned.offset }),
            _ => return Err(ParseError::unexpected(spanned)),
        }
    }
    close_line(&mut tokens)?;

    let mut words = words.into_iter();
    let functor = words.next().ok_or(ParseError::MissingFunctor { offset: open_offset })?;
    let action = Term::new(functor, words.collect());
    debug!(%action, "parse_action: done");
    Ok(action)
}

/// Consume leading whitespace and the line's opening parenthesis
fn open_line(tokens: &mut Tokens<'_>) -> Result<usize, ParseError> {
    skip_space(tokens);
    match tokens.next() {
        Some(Spanned {
            token: Token::Open,
            offset,
        }) => Ok(offset),
        Some(spanned) => Err(ParseError::ExpectedOpen { offset: spanned.offset }),
        None => Err(ParseError::ExpectedOpen { offset: 0 }),
    }
}

/// Only whitespace may follow the line's closing parenthesis
fn close_line(tokens: &mut Tokens<'_>) -> Result<(), ParseError> {
    skip_space(tokens);
    match tokens.next() {
        None => Ok(()),
        Some(spanned) => Err(ParseError::TrailingInput { offset: spanned.offset }),
    }
}

fn skip_space(tokens: &mut Tokens<'_>) {
    while tokens.next_if(|s| s.token == Token::Space).is_some() {}
}

/// A fact whose functor has just been read
fn fact(functor: &str, tokens: &mut Tokens<'_>) -> Result<Term, ParseError> {
    match tokens.peek().map(|s| s.token) {
        Some(Token::Open) => {
            tokens.next();
            Ok(Term::new(functor, arguments(tokens)?))
        }
        Some(Token::Comma) => match tokens.next() {
            Some(spanned) => Err(ParseError::unexpected(spanned)),
            None => Err(ParseError::Unbalanced),
        },
        _ => Ok(Term::atom(functor)),
    }
}

/// Argument list after its opening parenthesis, through the closing one
///
/// Empty arguments are kept: `f()` has one empty argument.
fn arguments(tokens: &mut Tokens<'_>) -> Result<Vec<String>, ParseError> {
    let mut args = Vec::new();
    let mut current = String::new();
    loop {
        let spanned = tokens.next().ok_or(ParseError::Unbalanced)?;
        match spanned.token {
            Token::Word(w) => current.push_str(w),
            Token::Space => {}
            Token::Comma => args.push(std::mem::take(&mut current)),
            Token::Close => {
                args.push(current);
                return Ok(args);
            }
            Token::Open => return Err(ParseError::NestingTooDeep { offset: spanned.offset }),
        }
    }
}
