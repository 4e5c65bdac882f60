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

use nom::combinator::opt;

use crate::expression::{Expression, InfixExpression, InfixOperator, PrefixExpression, PrefixOperator};
use crate::{imag, real};

use super::common::parse_memory_reference_with_brackets;
use super::{expected, InternalParserResult, Operator, ParserInput, Token};

#[derive(Debug, PartialEq, PartialOrd)]
enum Precedence {
    Lowest,
    Sum,
    Product,
    Exponentiation,
}

impl From<&Token> for Precedence {
    fn from(token: &Token) -> Self {
        match token {
            Token::Operator(operator) => Self::from(operator),
            _ => Precedence::Lowest,
        }
    }
}

impl From<&Operator> for Precedence {
    fn from(operator: &Operator) -> Self {
        match operator {
            Operator::Plus | Operator::Minus => Precedence::Sum,
            Operator::Star | Operator::Slash => Precedence::Product,
            Operator::Caret => Precedence::Exponentiation,
        }
    }
}

fn get_precedence(input: ParserInput) -> Precedence {
    match super::first_token(input) {
        Some(v) => Precedence::from(v),
        None => Precedence::Lowest,
    }
}

/// Parse an expression at the head of the current input, for as long as the expression continues.
/// Return an error only if the first token(s) do not form an expression.
pub(crate) fn parse_expression(input: ParserInput) -> InternalParserResult<Expression> {
    parse(input, Precedence::Lowest)
}

/// Recursively parse an expression as long as operator precedence is satisfied.
fn parse(input: ParserInput, precedence: Precedence) -> InternalParserResult<Expression> {
    let (input, prefix) = opt(parse_prefix)(input)?;
    let (mut input, mut left) = match super::split_first_token(input) {
        Some((Token::Integer(value), remainder)) => number(remainder, *value as f64),
        Some((Token::Float(value), remainder)) => number(remainder, *value),
        Some((Token::Variable(name), remainder)) => {
            Ok((remainder, Expression::Variable(name.clone())))
        }
        Some((Token::Identifier(_), _)) => parse_expression_identifier(input),
        Some((Token::LParenthesis, remainder)) => parse_grouped_expression(remainder),
        _ => expected(input, "an expression"),
    }?;

    if let Some(prefix) = prefix {
        left = Expression::Prefix(PrefixExpression::new(prefix, left));
    }

    while get_precedence(input) > precedence {
        let (remainder, expression) = parse_infix(input, left)?;
        left = expression;
        input = remainder;
    }

    Ok((input, left))
}

/// A numeric literal, which is imaginary when immediately followed by `i`.
fn number(input: ParserInput, value: f64) -> InternalParserResult<Expression> {
    let (input, imaginary) = opt(parse_i)(input)?;
    match imaginary {
        None => Ok((input, Expression::Number(real!(value)))),
        Some(_) => Ok((input, Expression::Number(imag!(value)))),
    }
}

/// Returns successfully if the head of input is the identifier `i`, returns error otherwise.
fn parse_i(input: ParserInput) -> InternalParserResult<()> {
    match super::split_first_token(input) {
        Some((Token::Identifier(v), remainder)) if v == "i" => Ok((remainder, ())),
        _ => expected(input, "i"),
    }
}

/// Identifiers have to be handled specially because some have special meaning.
///
/// By order of precedence:
///
/// 1. Memory references with brackets
/// 2. The constants `pi` and `i`
/// 3. Anything else is considered to be a memory reference without index brackets
fn parse_expression_identifier(input: ParserInput) -> InternalParserResult<Expression> {
    let (input, memory_reference) = opt(parse_memory_reference_with_brackets)(input)?;
    if let Some(memory_reference) = memory_reference {
        return Ok((input, Expression::Address(memory_reference)));
    }

    match super::split_first_token(input) {
        Some((Token::Identifier(ident), remainder)) => match ident.as_str() {
            "i" => Ok((remainder, Expression::Number(imag!(1f64)))),
            "pi" => Ok((remainder, Expression::PiConstant())),
            name => Ok((
                remainder,
                Expression::Address(crate::instruction::MemoryReference::new(
                    name.to_owned(),
                    0,
                )),
            )),
        },
        _ => expected(input, "an identifier"),
    }
}

/// To be called following an opening parenthesis, this will parse the expression to its end
/// and then expect a closing right parenthesis.
fn parse_grouped_expression(input: ParserInput) -> InternalParserResult<Expression> {
    let (input, expression) = parse(input, Precedence::Lowest)?;
    match super::split_first_token(input) {
        Some((Token::RParenthesis, remainder)) => Ok((remainder, expression)),
        _ => expected(input, "right parenthesis"),
    }
}

/// Parse an infix operator and then the expression to the right of the operator, and return the
/// resulting infixed expression.
fn parse_infix(input: ParserInput, left: Expression) -> InternalParserResult<Expression> {
    match super::split_first_token(input) {
        Some((Token::Operator(token_operator), remainder)) => {
            let expression_operator = match token_operator {
                Operator::Plus => InfixOperator::Plus,
                Operator::Minus => InfixOperator::Minus,
                Operator::Caret => InfixOperator::Caret,
                Operator::Slash => InfixOperator::Slash,
                Operator::Star => InfixOperator::Star,
            };
            let precedence = Precedence::from(token_operator);
            let (remainder, right) = parse(remainder, precedence)?;
            Ok((
                remainder,
                Expression::Infix(InfixExpression::new(left, expression_operator, right)),
            ))
        }
        _ => expected(input, "infix operator"),
    }
}

/// Return the prefix operator at the beginning of the input, if any.
fn parse_prefix(input: ParserInput) -> InternalParserResult<PrefixOperator> {
    match super::split_first_token(input) {
        Some((Token::Operator(Operator::Minus), remainder)) => {
            Ok((remainder, PrefixOperator::Minus))
        }
        Some((Token::Operator(Operator::Plus), remainder)) => Ok((remainder, PrefixOperator::Plus)),
        _ => expected(input, "prefix operator"),
    }
}
