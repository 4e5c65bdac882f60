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

use nom::{
    branch::alt,
    combinator::{map, opt},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, pair, preceded},
};

use crate::{
    expression::Expression,
    instruction::{
        CalibrationDefinition, CalibrationIdentifier, Capture, Declaration, Delay, Fence,
        FrameAttributes, FrameDefinition, Gate, Instruction, MeasureCalibrationDefinition,
        MeasureCalibrationIdentifier, Measurement, MemoryReference, Pragma, PragmaArgument, Pulse,
        Qubit, SetFrequency, SetPhase, SetScale, ShiftFrequency, ShiftPhase,
    },
    reserved::ReservedKeyword,
};

use super::{
    common::{
        parse_frame_attribute, parse_frame_identifier, parse_memory_reference, parse_qubit,
        parse_vector, parse_waveform_invocation,
    },
    error::{InternalParseError, ParseErrorKind},
    expected,
    expression::parse_expression,
    macros::token,
    InternalParserResult, ParserInput, Token,
};

/// Parse every instruction in `input`, each of which must end its line.
pub(crate) fn parse_instructions(
    mut input: ParserInput,
) -> Result<Vec<Instruction>, InternalParseError> {
    let mut instructions = Vec::new();
    while !input.is_empty() {
        let (remainder, instruction) = parse_instruction(input).map_err(into_error(input))?;
        let (remainder, _) = end_of_line(remainder).map_err(into_error(remainder))?;
        instructions.push(instruction);
        input = remainder;
    }
    Ok(instructions)
}

fn into_error<'a>(
    input: ParserInput<'a>,
) -> impl FnOnce(nom::Err<InternalParseError<'a>>) -> InternalParseError<'a> {
    move |error| match error {
        nom::Err::Error(error) | nom::Err::Failure(error) => error,
        nom::Err::Incomplete(_) => InternalParseError::expected(input, "more input"),
    }
}

fn end_of_line<'a>(input: ParserInput<'a>) -> InternalParserResult<'a, ()> {
    match super::split_first_token(input) {
        Some((Token::NewLine, remainder)) => Ok((remainder, ())),
        _ => expected(input, "end of line"),
    }
}

/// Parse a single instruction, up to but not including the end of its line.
pub(crate) fn parse_instruction(input: ParserInput) -> InternalParserResult<Instruction> {
    match super::split_first_token(input) {
        Some((Token::Command(command), remainder)) => parse_command(*command, input, remainder),
        Some((Token::NonBlocking, remainder)) => parse_nonblocking(remainder),
        Some((Token::Identifier(_), _)) => parse_gate(input),
        _ => expected(input, "an instruction"),
    }
}

fn parse_command<'a>(
    command: ReservedKeyword,
    input: ParserInput<'a>,
    remainder: ParserInput<'a>,
) -> InternalParserResult<'a, Instruction> {
    match command {
        ReservedKeyword::Capture => parse_capture(remainder, true),
        ReservedKeyword::Declare => parse_declare(remainder),
        ReservedKeyword::DefCal => parse_defcal(remainder),
        ReservedKeyword::DefFrame => parse_defframe(remainder),
        ReservedKeyword::Delay => parse_delay(remainder),
        ReservedKeyword::Fence => parse_fence(remainder),
        ReservedKeyword::Measure => parse_measurement(remainder),
        ReservedKeyword::Pragma => parse_pragma(remainder),
        ReservedKeyword::Pulse => parse_pulse(remainder, true),
        ReservedKeyword::SetFrequency => {
            frame_expression(remainder, |frame, frequency| {
                Instruction::SetFrequency(SetFrequency { frame, frequency })
            })
        }
        ReservedKeyword::SetPhase => frame_expression(remainder, |frame, phase| {
            Instruction::SetPhase(SetPhase { frame, phase })
        }),
        ReservedKeyword::SetScale => frame_expression(remainder, |frame, scale| {
            Instruction::SetScale(SetScale { frame, scale })
        }),
        ReservedKeyword::ShiftFrequency => frame_expression(remainder, |frame, frequency| {
            Instruction::ShiftFrequency(ShiftFrequency { frame, frequency })
        }),
        ReservedKeyword::ShiftPhase => frame_expression(remainder, |frame, phase| {
            Instruction::ShiftPhase(ShiftPhase { frame, phase })
        }),
        ReservedKeyword::Nonblocking => expected(input, "an instruction"),
    }
}

/// Parse the instruction following a `NONBLOCKING` prefix.
fn parse_nonblocking(input: ParserInput) -> InternalParserResult<Instruction> {
    match super::split_first_token(input) {
        Some((Token::Command(ReservedKeyword::Pulse), remainder)) => parse_pulse(remainder, false),
        Some((Token::Command(ReservedKeyword::Capture), remainder)) => {
            parse_capture(remainder, false)
        }
        _ => expected(input, "PULSE or CAPTURE"),
    }
}

/// Parse the contents of a `CAPTURE` instruction.
///
/// Unlike most other instructions, this can be _prefixed_ with the NONBLOCKING keyword,
/// and thus it expects and parses the CAPTURE token itself.
fn parse_capture(input: ParserInput, blocking: bool) -> InternalParserResult<Instruction> {
    let (input, frame) = parse_frame_identifier(input)?;
    let (input, waveform) = parse_waveform_invocation(input)?;
    let (input, memory_reference) = parse_memory_reference(input)?;

    Ok((
        input,
        Instruction::Capture(Capture {
            blocking,
            frame,
            memory_reference,
            waveform,
        }),
    ))
}

/// Parse the contents of a `PULSE` instruction.
fn parse_pulse(input: ParserInput, blocking: bool) -> InternalParserResult<Instruction> {
    let (input, frame) = parse_frame_identifier(input)?;
    let (input, waveform) = parse_waveform_invocation(input)?;

    Ok((
        input,
        Instruction::Pulse(Pulse {
            blocking,
            frame,
            waveform,
        }),
    ))
}

/// Parse the contents of a `DECLARE` instruction.
fn parse_declare<'a>(input: ParserInput<'a>) -> InternalParserResult<'a, Instruction> {
    let (remainder, name) = token!(Identifier(v))(input)?;
    let (remainder, size) = parse_vector(remainder)?;
    let declaration = Declaration::try_new(name, size).map_err(|error| {
        nom::Err::Failure(InternalParseError::new(
            input,
            ParseErrorKind::InvalidIdentifier(error),
        ))
    })?;
    Ok((remainder, Instruction::Declaration(declaration)))
}

/// Parse the indented lines of a block, each of which is read by `item`.
fn parse_block<'a, O>(
    input: ParserInput<'a>,
    item: impl FnMut(ParserInput<'a>) -> InternalParserResult<'a, O>,
) -> InternalParserResult<'a, Vec<O>> {
    let (input, _) = token!(Colon)(input)?;
    many0(preceded(pair(token!(NewLine), token!(Indentation)), item))(input)
}

/// Parse the contents of a `DEFCAL` instruction, for a gate or a measurement.
fn parse_defcal<'a>(input: ParserInput<'a>) -> InternalParserResult<'a, Instruction> {
    if let Some(Token::Command(ReservedKeyword::Measure)) = super::first_token(input) {
        return parse_defcal_measure(&input[1..]);
    }

    let start = input;
    let (input, name) = token!(Identifier(v))(input)?;
    let (input, parameters) = opt(delimited(
        token!(LParenthesis),
        separated_list1(token!(Comma), parse_expression),
        token!(RParenthesis),
    ))(input)?;
    let (input, qubits) = many0(parse_qubit)(input)?;
    let identifier = CalibrationIdentifier::new(name, parameters.unwrap_or_default(), qubits)
        .map_err(|error| {
            nom::Err::Failure(InternalParseError::new(
                start,
                ParseErrorKind::InvalidIdentifier(error),
            ))
        })?;
    let (input, instructions) = parse_block(input, parse_instruction)?;

    Ok((
        input,
        Instruction::CalibrationDefinition(CalibrationDefinition {
            identifier,
            instructions,
        }),
    ))
}

/// Parse the contents of a `DEFCAL MEASURE` instruction, following the `MEASURE` keyword.
fn parse_defcal_measure<'a>(input: ParserInput<'a>) -> InternalParserResult<'a, Instruction> {
    let (input, qubit) = parse_qubit(input)?;
    let (input, target) = opt(token!(Identifier(v)))(input)?;
    let (input, instructions) = parse_block(input, parse_instruction)?;

    Ok((
        input,
        Instruction::MeasureCalibrationDefinition(MeasureCalibrationDefinition {
            identifier: MeasureCalibrationIdentifier::new(qubit, target),
            instructions,
        }),
    ))
}

/// Parse the contents of a `DEFFRAME` instruction.
fn parse_defframe(input: ParserInput) -> InternalParserResult<Instruction> {
    let (input, identifier) = parse_frame_identifier(input)?;
    let (input, attribute_pairs) = parse_block(input, parse_frame_attribute)?;
    let attributes: FrameAttributes = attribute_pairs.into_iter().collect();

    Ok((
        input,
        Instruction::FrameDefinition(FrameDefinition {
            identifier,
            attributes,
        }),
    ))
}

/// A qubit operand of `DELAY`. Named memory such as `t[0]` is left for the duration.
fn parse_delay_qubit(input: ParserInput) -> InternalParserResult<Qubit> {
    match super::split_first_token(input) {
        Some((Token::Integer(value), remainder)) => Ok((remainder, Qubit::Fixed(*value))),
        Some((Token::Identifier(name), remainder))
            if super::first_token(remainder) != Some(&Token::LBracket) =>
        {
            Ok((remainder, Qubit::Variable(name.clone())))
        }
        _ => expected(input, "a qubit"),
    }
}

/// Parse the contents of a `DELAY` instruction: qubits, then optional frame names, then the
/// duration. A trailing integer with no duration after it is the duration itself, as in
/// `DELAY 0 4`.
fn parse_delay<'a>(input: ParserInput<'a>) -> InternalParserResult<'a, Instruction> {
    let (input, mut qubits) = many0(parse_delay_qubit)(input)?;
    let (input, frame_names) = many0(token!(String(v)))(input)?;
    let (input, duration) = opt(parse_expression)(input)?;

    let duration = match duration {
        Some(duration) => duration,
        None => match qubits.pop() {
            Some(Qubit::Fixed(value)) if frame_names.is_empty() => Expression::from(value as f64),
            Some(Qubit::Variable(name)) if frame_names.is_empty() => {
                Expression::Address(MemoryReference::new(name, 0))
            }
            _ => return expected(input, "a duration"),
        },
    };

    Ok((
        input,
        Instruction::Delay(Delay {
            duration,
            frame_names,
            qubits,
        }),
    ))
}

/// Parse the contents of a `FENCE` instruction.
fn parse_fence(input: ParserInput) -> InternalParserResult<Instruction> {
    let (input, qubits) = many0(parse_qubit)(input)?;

    Ok((input, Instruction::Fence(Fence { qubits })))
}

/// Parse a shared-memory reference or `None` to obtain the contents of a `MEASURE` instruction.
fn parse_measurement(input: ParserInput) -> InternalParserResult<Instruction> {
    let (input, qubit) = parse_qubit(input)?;
    let (input, target) = opt(parse_memory_reference)(input)?;

    Ok((input, Instruction::Measurement(Measurement { qubit, target })))
}

/// Parse the contents of a `PRAGMA` instruction.
fn parse_pragma<'a>(input: ParserInput<'a>) -> InternalParserResult<'a, Instruction> {
    let (input, name) = token!(Identifier(v))(input)?;
    let (input, arguments) = many0(alt((
        map(token!(Identifier(v)), PragmaArgument::Identifier),
        map(token!(Integer(v)), PragmaArgument::Integer),
    )))(input)?;
    let (input, data) = opt(token!(String(v)))(input)?;

    Ok((input, Instruction::Pragma(Pragma::new(name, arguments, data))))
}

/// Parse the operands of an instruction made of a frame and one expression, such as
/// `SET-SCALE 0 "rf" 0.5`.
fn frame_expression(
    input: ParserInput,
    build: impl FnOnce(crate::instruction::FrameIdentifier, Expression) -> Instruction,
) -> InternalParserResult<Instruction> {
    let (input, frame) = parse_frame_identifier(input)?;
    let (input, expression) = parse_expression(input)?;
    Ok((input, build(frame, expression)))
}

/// Parse a gate application, such as `RX(pi/2) 0`.
fn parse_gate<'a>(input: ParserInput<'a>) -> InternalParserResult<'a, Instruction> {
    let start = input;
    let (input, name) = token!(Identifier(v))(input)?;
    let (input, parameters) = opt(delimited(
        token!(LParenthesis),
        separated_list1(token!(Comma), parse_expression),
        token!(RParenthesis),
    ))(input)?;
    let (input, qubits) = many1(parse_qubit)(input)?;
    let gate = Gate::new(&name, parameters.unwrap_or_default(), qubits).map_err(|error| {
        nom::Err::Failure(InternalParseError::new(
            start,
            ParseErrorKind::InvalidGate(error),
        ))
    })?;
    Ok((input, Instruction::Gate(gate)))
}
