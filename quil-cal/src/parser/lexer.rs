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

use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while, take_while1},
    character::complete::{char, space0, space1},
    combinator::{map, opt, recognize, rest, value},
    error::ErrorKind,
    multi::many0,
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use super::error::{ParseError, ParseErrorKind};
use super::token::{Operator, Token, TokenWithLocation};
use crate::reserved::ReservedKeyword;

type LexResult<'a, T = Token> = IResult<&'a str, T>;

/// Completely lex a string, line by line.
///
/// Every line holding at least one token ends with [`Token::NewLine`]. Lines holding only
/// whitespace or a comment produce no tokens at all, and leading whitespace becomes a single
/// [`Token::Indentation`].
pub(crate) fn lex(input: &str) -> Result<Vec<TokenWithLocation>, ParseError> {
    let mut tokens = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line_number = index as u32 + 1;
        let unexpected = |remainder: &str| {
            ParseError::new(
                line_number,
                ParseErrorKind::UnexpectedCharacter(remainder.chars().next().unwrap_or('\n')),
            )
        };

        let (remainder, line_tokens) = lex_line(line).map_err(|error| match error {
            nom::Err::Error(error) | nom::Err::Failure(error) => unexpected(error.input),
            nom::Err::Incomplete(_) => unexpected(""),
        })?;
        if !remainder.is_empty() {
            return Err(unexpected(remainder));
        }

        if line_tokens.iter().all(|token| token == &Token::Indentation) {
            continue;
        }

        tokens.extend(
            line_tokens
                .into_iter()
                .map(|token| TokenWithLocation::new(token, line_number)),
        );
        tokens.push(TokenWithLocation::new(Token::NewLine, line_number));
    }

    Ok(tokens)
}

fn lex_line(line: &str) -> LexResult<Vec<Token>> {
    let (input, indentation) = opt(value(Token::Indentation, space1))(line)?;
    let (input, mut tokens) = many0(preceded(space0, lex_token))(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = opt(lex_comment)(input)?;
    if let Some(indentation) = indentation {
        tokens.insert(0, indentation);
    }
    Ok((input, tokens))
}

fn lex_token(input: &str) -> LexResult {
    alt((
        lex_punctuation,
        lex_string,
        // Operator must come before number (or it may be parsed as a sign)
        lex_operator,
        lex_number,
        lex_variable,
        // This should come last because it's sort of a catch all
        lex_command_or_identifier,
    ))(input)
}

fn lex_comment(input: &str) -> LexResult<&str> {
    preceded(char('#'), rest)(input)
}

fn lex_punctuation(input: &str) -> LexResult {
    alt((
        value(Token::Colon, char(':')),
        value(Token::Comma, char(',')),
        value(Token::LBracket, char('[')),
        value(Token::RBracket, char(']')),
        value(Token::LParenthesis, char('(')),
        value(Token::RParenthesis, char(')')),
    ))(input)
}

fn lex_operator(input: &str) -> LexResult {
    use Operator::*;
    map(
        alt((
            value(Caret, char('^')),
            value(Minus, char('-')),
            value(Plus, char('+')),
            value(Slash, char('/')),
            value(Star, char('*')),
        )),
        Token::Operator,
    )(input)
}

fn lex_number(input: &str) -> LexResult {
    let (remainder, float_string) = recognize_float(input)?;
    if float_string.bytes().all(|byte| byte.is_ascii_digit()) {
        if let Ok(value) = float_string.parse::<u64>() {
            return Ok((remainder, Token::Integer(value)));
        }
    }
    float_string
        .parse::<f64>()
        .map(|value| (remainder, Token::Float(value)))
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, ErrorKind::Float)))
}

fn lex_string(input: &str) -> LexResult {
    map(
        delimited(
            char('"'),
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("\n", tag("n")),
                    value("\t", tag("t")),
                )),
            )),
            char('"'),
        ),
        |content: Option<String>| Token::String(content.unwrap_or_default()),
    )(input)
}

fn lex_variable(input: &str) -> LexResult {
    map(preceded(char('%'), lex_identifier_raw), Token::Variable)(input)
}

fn is_valid_identifier_leading_character(chr: char) -> bool {
    chr.is_ascii_alphabetic() || chr == '_'
}

fn is_valid_identifier_end_character(chr: char) -> bool {
    is_valid_identifier_leading_character(chr) || chr.is_ascii_digit()
}

fn is_dash(chr: char) -> bool {
    chr == '-'
}

/// Identifiers may contain dashes, but never end in one, so that `a-b` is one identifier while
/// `a - b` is an expression.
fn lex_identifier_raw(input: &str) -> LexResult<String> {
    map(
        recognize(tuple((
            take_while1(is_valid_identifier_leading_character),
            take_while(is_valid_identifier_end_character),
            many0(pair(
                take_while1(is_dash),
                take_while1(is_valid_identifier_end_character),
            )),
        ))),
        String::from,
    )(input)
}

/// If the given identifier string matches a command keyword, return the keyword;
/// otherwise, return the original identifier as a token.
fn lex_command_or_identifier(input: &str) -> LexResult {
    let (input, identifier) = lex_identifier_raw(input)?;
    let token = match ReservedKeyword::from_str(&identifier) {
        Ok(ReservedKeyword::Nonblocking) => Token::NonBlocking,
        Ok(keyword) => Token::Command(keyword),
        Err(_) => Token::Identifier(identifier),
    };
    Ok((input, token))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::lex;
    use crate::parser::error::ParseErrorKind;
    use crate::parser::token::{Operator, Token};
    use crate::reserved::ReservedKeyword;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input)
            .unwrap()
            .into_iter()
            .map(|token| token.as_token().clone())
            .collect()
    }

    #[rstest]
    #[case("SHIFT-FREQUENCY", vec![Token::Command(ReservedKeyword::ShiftFrequency)])]
    #[case("NONBLOCKING", vec![Token::NonBlocking])]
    #[case("q0_ff", vec![Token::Identifier("q0_ff".to_string())])]
    #[case("a-b", vec![Token::Identifier("a-b".to_string())])]
    #[case(
        "a - b",
        vec![
            Token::Identifier("a".to_string()),
            Token::Operator(Operator::Minus),
            Token::Identifier("b".to_string()),
        ]
    )]
    #[case("%theta", vec![Token::Variable("theta".to_string())])]
    #[case("-0.5", vec![Token::Operator(Operator::Minus), Token::Float(0.5)])]
    #[case("1e9", vec![Token::Float(1e9)])]
    #[case("42", vec![Token::Integer(42)])]
    #[case(r#""say \"hi\"""#, vec![Token::String("say \"hi\"".to_string())])]
    #[case(r#""""#, vec![Token::String(String::new())])]
    fn single_line(#[case] input: &str, #[case] expected: Vec<Token>) {
        let mut expected = expected;
        expected.push(Token::NewLine);
        assert_eq!(tokens(input), expected);
    }

    #[test]
    fn indentation_comments_and_blank_lines() {
        let input = "# header comment\n\nDEFFRAME 0 \"rf\":  # trailing\n    SAMPLE-RATE: 1e9\n   \n";
        assert_eq!(
            tokens(input),
            vec![
                Token::Command(ReservedKeyword::DefFrame),
                Token::Integer(0),
                Token::String("rf".to_string()),
                Token::Colon,
                Token::NewLine,
                Token::Indentation,
                Token::Identifier("SAMPLE-RATE".to_string()),
                Token::Colon,
                Token::Float(1e9),
                Token::NewLine,
            ]
        );
    }

    #[test]
    fn lines_are_numbered_from_one() {
        let lexed = lex("\nX 0\n").unwrap();
        assert!(lexed.iter().all(|token| token.line() == 2));
    }

    #[test]
    fn unexpected_character() {
        let error = lex("X 0\nY $1\n").unwrap_err();
        assert_eq!(error.line(), 2);
        assert_eq!(error.kind(), &ParseErrorKind::UnexpectedCharacter('$'));
    }
}
