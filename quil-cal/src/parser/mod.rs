// Copyright 2021 Rigetti Computing
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reading the Quil-T subset used by calibration programs.
//!
//! Text is first split into [`Token`]s line by line, then parsed with `nom` combinators running
//! over the token slice.

use nom::IResult;

use crate::expression::Expression;
use crate::instruction::Instruction;

mod common;
mod error;
mod expression;
mod instruction;
mod lexer;
mod macros;
mod token;

pub(crate) use error::InternalParseError;
pub use error::{ParseError, ParseErrorKind};
pub use token::{Operator, Token, TokenWithLocation};

pub(crate) type ParserInput<'a> = &'a [TokenWithLocation];
pub(crate) type InternalParserResult<'a, R, E = InternalParseError<'a>> =
    IResult<ParserInput<'a>, R, E>;

/// Returns the next token without consuming it.
pub(crate) fn first_token(input: ParserInput) -> Option<&Token> {
    input.first().map(TokenWithLocation::as_token)
}

/// Returns a pair of the first token and the remaining input.
pub(crate) fn split_first_token(input: ParserInput) -> Option<(&Token, ParserInput)> {
    input
        .split_first()
        .map(|(first, rest)| (first.as_token(), rest))
}

/// Fail with an error naming what was expected at the head of `input`.
pub(crate) fn expected<'a, R>(input: ParserInput<'a>, what: &str) -> InternalParserResult<'a, R> {
    Err(nom::Err::Error(InternalParseError::expected(input, what)))
}

/// Read a complete program: a sequence of instructions, one per line, with `DEFFRAME` and
/// `DEFCAL` bodies on the indented lines that follow their headers.
pub fn parse_program_text(input: &str) -> Result<Vec<Instruction>, ParseError> {
    let tokens = lexer::lex(input)?;
    instruction::parse_instructions(&tokens)
        .map_err(|error| ParseError::from_internal(error, &tokens))
}

/// Read a single expression, which must make up the whole of `input`.
pub fn parse_expression_text(input: &str) -> Result<Expression, ParseError> {
    let tokens = lexer::lex(input)?;
    let result = expression::parse_expression(&tokens).and_then(|(remainder, expression)| {
        match split_first_token(remainder) {
            None | Some((Token::NewLine, [])) => Ok((remainder, expression)),
            Some(_) => expected(remainder, "end of expression"),
        }
    });
    match result {
        Ok((_, expression)) => Ok(expression),
        Err(nom::Err::Error(error)) | Err(nom::Err::Failure(error)) => {
            Err(ParseError::from_internal(error, &tokens))
        }
        Err(nom::Err::Incomplete(_)) => Err(ParseError::new(
            1,
            ParseErrorKind::UnexpectedEof("an expression".to_string()),
        )),
    }
}
