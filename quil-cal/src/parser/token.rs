use std::fmt;

use crate::reserved::ReservedKeyword;

/// Wrapper for [`Token`] that includes the line it was read from.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenWithLocation {
    token: Token,
    line: u32,
}

impl PartialEq<Token> for TokenWithLocation {
    fn eq(&self, other: &Token) -> bool {
        &self.token == other
    }
}

impl TokenWithLocation {
    pub(crate) fn new(token: Token, line: u32) -> Self {
        Self { token, line }
    }

    /// Returns a reference to the contained token.
    pub fn as_token(&self) -> &Token {
        &self.token
    }

    /// The 1-based line that this token appears on.
    pub fn line(&self) -> u32 {
        self.line
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Colon,
    Comma,
    Command(ReservedKeyword),
    Float(f64),
    Identifier(String),
    Indentation,
    Integer(u64),
    LBracket,
    LParenthesis,
    NonBlocking,
    NewLine,
    Operator(Operator),
    RBracket,
    RParenthesis,
    String(String),
    Variable(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Colon => write!(f, ":"),
            Token::Comma => write!(f, ","),
            Token::Command(command) => write!(f, "{command}"),
            Token::Float(value) => write!(f, "{value}"),
            Token::Identifier(name) => write!(f, "{name}"),
            Token::Indentation => write!(f, "<indent>"),
            Token::Integer(value) => write!(f, "{value}"),
            Token::LBracket => write!(f, "["),
            Token::LParenthesis => write!(f, "("),
            Token::NonBlocking => write!(f, "NONBLOCKING"),
            Token::NewLine => write!(f, "NEWLINE"),
            Token::Operator(operator) => write!(f, "{operator}"),
            Token::RBracket => write!(f, "]"),
            Token::RParenthesis => write!(f, ")"),
            Token::String(value) => write!(f, "{value:?}"),
            Token::Variable(name) => write!(f, "%{name}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum Operator {
    #[strum(serialize = "^")]
    Caret,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "*")]
    Star,
}
