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

use std::collections::HashMap;

use nom::{
    branch::alt,
    combinator::{cut, map, opt},
    multi::{many1, separated_list0},
    sequence::{delimited, tuple},
};

use crate::{
    expression::Expression,
    instruction::{
        AttributeValue, FrameIdentifier, MemoryReference, Qubit, ScalarType, Vector,
        WaveformInvocation,
    },
};

use super::{
    expected, expression::parse_expression, macros::token, InternalParserResult, ParserInput,
    Token,
};

/// Parse the value of a frame attribute, which may be either a string or an expression.
pub(crate) fn parse_attribute_value<'a>(
    input: ParserInput<'a>,
) -> InternalParserResult<'a, AttributeValue> {
    alt((
        map(token!(String(v)), AttributeValue::String),
        map(parse_expression, AttributeValue::Expression),
    ))(input)
}

/// Parse a single attribute key-value pair of a frame, such as `SAMPLE-RATE: 1e9`.
pub(crate) fn parse_frame_attribute<'a>(
    input: ParserInput<'a>,
) -> InternalParserResult<'a, (String, AttributeValue)> {
    let (input, key) = token!(Identifier(v))(input)?;
    let (input, _) = token!(Colon)(input)?;
    let (input, value) = parse_attribute_value(input)?;
    Ok((input, (key, value)))
}

/// Parse a frame identifier, such as `0 "rf"`.
pub(crate) fn parse_frame_identifier<'a>(
    input: ParserInput<'a>,
) -> InternalParserResult<'a, FrameIdentifier> {
    let (input, qubits) = many1(parse_qubit)(input)?;
    let (input, name) = token!(String(v))(input)?;

    Ok((input, FrameIdentifier { name, qubits }))
}

/// Parse a reference to a memory location, such as `ro[5]`, with optional brackets
/// (i.e, `ro` allowed).
pub(crate) fn parse_memory_reference<'a>(
    input: ParserInput<'a>,
) -> InternalParserResult<'a, MemoryReference> {
    let (input, name) = token!(Identifier(v))(input)?;
    let (input, index) = opt(delimited(
        token!(LBracket),
        token!(Integer(v)),
        token!(RBracket),
    ))(input)?;
    let index = index.unwrap_or(0);
    Ok((input, MemoryReference { name, index }))
}

/// Parse a reference to a memory location, such as `ro[5]` requiring the brackets.
pub(crate) fn parse_memory_reference_with_brackets<'a>(
    input: ParserInput<'a>,
) -> InternalParserResult<'a, MemoryReference> {
    let (input, name) = token!(Identifier(v))(input)?;
    let (input, index) = delimited(token!(LBracket), token!(Integer(v)), token!(RBracket))(input)?;
    Ok((input, MemoryReference { name, index }))
}

/// Parse a named argument key-value pair, such as `duration: 4e-8`.
pub(crate) fn parse_named_argument<'a>(
    input: ParserInput<'a>,
) -> InternalParserResult<'a, (String, Expression)> {
    let (input, (name, _, value)) =
        tuple((token!(Identifier(v)), token!(Colon), parse_expression))(input)?;
    Ok((input, (name, value)))
}

/// Parse the invocation of a waveform, such as `flat(iq: 1)`.
pub(crate) fn parse_waveform_invocation<'a>(
    input: ParserInput<'a>,
) -> InternalParserResult<'a, WaveformInvocation> {
    let (input, name) = token!(Identifier(v))(input)?;
    let (input, parameter_tuples) = opt(delimited(
        token!(LParenthesis),
        cut(separated_list0(token!(Comma), parse_named_argument)),
        token!(RParenthesis),
    ))(input)?;
    let parameters: HashMap<_, _> = parameter_tuples.unwrap_or_default().into_iter().collect();

    Ok((input, WaveformInvocation { name, parameters }))
}

/// Parse a single qubit, which may be an integer (`1`), variable (`%q1`), or identifier (`q1`).
pub(crate) fn parse_qubit(input: ParserInput) -> InternalParserResult<Qubit> {
    match super::split_first_token(input) {
        Some((Token::Integer(value), remainder)) => Ok((remainder, Qubit::Fixed(*value))),
        Some((Token::Variable(name), remainder)) | Some((Token::Identifier(name), remainder)) => {
            Ok((remainder, Qubit::Variable(name.clone())))
        }
        _ => expected(input, "a qubit"),
    }
}

/// Parse a memory region size, such as `REAL[2]`. The length defaults to 1.
pub(crate) fn parse_vector<'a>(input: ParserInput<'a>) -> InternalParserResult<'a, Vector> {
    let (input, data_type) = match super::split_first_token(input) {
        Some((Token::Identifier(name), remainder)) => match name.as_str() {
            "BIT" => Ok((remainder, ScalarType::Bit)),
            "INTEGER" => Ok((remainder, ScalarType::Integer)),
            "OCTET" => Ok((remainder, ScalarType::Octet)),
            "REAL" => Ok((remainder, ScalarType::Real)),
            _ => expected(input, "a data type"),
        },
        _ => expected(input, "a data type"),
    }?;

    let (input, length) = opt(delimited(
        token!(LBracket),
        token!(Integer(v)),
        token!(RBracket),
    ))(input)?;
    let length = length.unwrap_or(1);

    Ok((input, Vector { data_type, length }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::{
        parse_frame_attribute, parse_frame_identifier, parse_memory_reference, parse_vector,
        parse_waveform_invocation,
    };
    use crate::expression::Expression;
    use crate::instruction::{
        AttributeValue, FrameIdentifier, MemoryReference, Qubit, ScalarType, Vector,
        WaveformInvocation,
    };
    use crate::parser::macros::make_test;

    make_test!(
        frame_identifier_on_two_qubits,
        parse_frame_identifier,
        "0 q \"cz\"",
        FrameIdentifier::new(
            "cz".to_string(),
            vec![Qubit::Fixed(0), Qubit::Variable("q".to_string())]
        )
    );

    make_test!(
        memory_reference_without_brackets,
        parse_memory_reference,
        "ro",
        MemoryReference::new("ro".to_string(), 0)
    );

    make_test!(
        vector_with_length,
        parse_vector,
        "REAL[2]",
        Vector::new(ScalarType::Real, 2)
    );

    make_test!(
        vector_defaults_to_one,
        parse_vector,
        "BIT",
        Vector::new(ScalarType::Bit, 1)
    );

    make_test!(
        string_attribute,
        parse_frame_attribute,
        "DIRECTION: \"rx\"",
        (
            "DIRECTION".to_string(),
            AttributeValue::String("rx".to_string())
        )
    );

    make_test!(
        waveform_with_parameters,
        parse_waveform_invocation,
        "gaussian(duration: 1, fwhm: %width)",
        WaveformInvocation::new(
            "gaussian".to_string(),
            HashMap::from([
                ("duration".to_string(), Expression::from(1.0)),
                ("fwhm".to_string(), Expression::Variable("width".to_string())),
            ])
        )
    );

    make_test!(
        waveform_without_parameters,
        parse_waveform_invocation,
        "flat",
        WaveformInvocation::new("flat".to_string(), HashMap::new())
    );
}
