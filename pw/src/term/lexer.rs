//! Tokenizer for planner answer lines

use std::fmt;

/// Lexical token of an answer line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Open,
    Close,
    Comma,
    /// A run of whitespace
    Space,
    /// Functor or argument text
    Word(&'a str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "'('"),
            Self::Close => write!(f, "')'"),
            Self::Comma => write!(f, "','"),
            Self::Space => write!(f, "whitespace"),
            Self::Word(w) => write!(f, "'{}'", w),
        }
    }
}

/// A token with its byte offset in the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub offset: usize,
}

/// Lazy tokenizer over one line
///
/// Finite: every call to `next` consumes at least one byte. Cloning or
/// calling [`Lexer::restart`] replays the line from the start.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn restart(&mut self) {
        self.pos = 0;
    }

    /// Byte offset of the next unread character
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn is_delimiter(c: char) -> bool {
        matches!(c, '(' | ')' | ',') || c.is_whitespace()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Spanned<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let src = self.src;
        let rest = &src[self.pos..];
        let c = rest.chars().next()?;
        let offset = self.pos;

        let (token, len) = match c {
            '(' => (Token::Open, 1),
            ')' => (Token::Close, 1),
            ',' => (Token::Comma, 1),
            c if c.is_whitespace() => {
                let len = rest.find(|ch: char| !ch.is_whitespace()).unwrap_or(rest.len());
                (Token::Space, len)
            }
            _ => {
                let len = rest.find(Self::is_delimiter).unwrap_or(rest.len());
                (Token::Word(&rest[..len]), len)
            }
        };

        self.pos += len;
        Some(Spanned { token, offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token<'_>> {
        Lexer::new(src).map(|s| s.token).collect()
    }

    #[test]
    fn test_state_line_tokens() {
        assert_eq!(
            tokens("(on(a,b) p)"),
            vec![
                Token::Open,
                Token::Word("on"),
                Token::Open,
                Token::Word("a"),
                Token::Comma,
                Token::Word("b"),
                Token::Close,
                Token::Space,
                Token::Word("p"),
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        assert_eq!(
            tokens("(a  \t b)"),
            vec![Token::Open, Token::Word("a"), Token::Space, Token::Word("b"), Token::Close]
        );
    }

    #[test]
    fn test_offsets() {
        let spans: Vec<usize> = Lexer::new("(ab c)").map(|s| s.offset).collect();
        assert_eq!(spans, vec![0, 1, 3, 4, 5]);
    }

    #[test]
    fn test_restart_replays() {
        let mut lexer = Lexer::new("(x)");
        let first: Vec<_> = lexer.by_ref().collect();
        assert_eq!(lexer.next(), None);
        lexer.restart();
        let second: Vec<_> = lexer.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_line() {
        assert!(tokens("").is_empty());
    }

    #[test]
    fn test_multibyte_word() {
        assert_eq!(tokens("(café)"), vec![Token::Open, Token::Word("café"), Token::Close]);
    }
}
