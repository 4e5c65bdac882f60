use crate::instruction::GateError;
use crate::validation::identifier::IdentifierValidationError;

use super::ParserInput;

/// An error encountered while reading Quil-T text, with the 1-based line it was found on.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("at line {line}: {kind}")]
pub struct ParseError {
    line: u32,
    kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(line: u32, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }

    /// The line on which the error was found.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The reason for the error.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Locate an error raised while parsing `tokens`. Errors raised at the end of input are
    /// reported on the last line.
    pub(crate) fn from_internal(error: InternalParseError<'_>, tokens: ParserInput<'_>) -> Self {
        let line = error
            .input
            .first()
            .or_else(|| tokens.last())
            .map_or(1, |token| token.line());
        Self::new(line, error.kind)
    }
}

/// Parsing errors specific to Quil-T.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    /// A character which starts no token.
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),

    /// Reached end of input, but expected something else.
    #[error("expected {0}, found end of input")]
    UnexpectedEof(String),

    /// Got an unexpected token and expected something else.
    #[error("expected {expected}, found {actual}")]
    ExpectedToken { actual: String, expected: String },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierValidationError),

    #[error("invalid gate: {0}")]
    InvalidGate(#[from] GateError),

    /// A combinator failed without saying what it expected.
    #[error("unexpected input ({0:?})")]
    Internal(nom::error::ErrorKind),
}

/// The error type threaded through the token parsers.
#[derive(Debug)]
pub(crate) struct InternalParseError<'a> {
    pub(crate) input: ParserInput<'a>,
    pub(crate) kind: ParseErrorKind,
}

impl<'a> InternalParseError<'a> {
    pub(crate) fn new(input: ParserInput<'a>, kind: ParseErrorKind) -> Self {
        Self { input, kind }
    }

    /// An error describing what was expected at the head of `input` and what was found there.
    pub(crate) fn expected(input: ParserInput<'a>, expected: &str) -> Self {
        let kind = match input.first() {
            None => ParseErrorKind::UnexpectedEof(expected.to_string()),
            Some(token) => ParseErrorKind::ExpectedToken {
                actual: token.as_token().to_string(),
                expected: expected.to_string(),
            },
        };
        Self::new(input, kind)
    }
}

impl<'a> nom::error::ParseError<ParserInput<'a>> for InternalParseError<'a> {
    fn from_error_kind(input: ParserInput<'a>, kind: nom::error::ErrorKind) -> Self {
        Self::new(input, ParseErrorKind::Internal(kind))
    }

    fn append(_: ParserInput<'a>, _: nom::error::ErrorKind, other: Self) -> Self {
        other
    }

    /// Keep whichever alternative got further into the input.
    fn or(self, other: Self) -> Self {
        if other.input.len() < self.input.len() {
            other
        } else {
            self
        }
    }
}
