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

use crate::expression::Expression;
use crate::quil::{write_join_quil, Quil, ToQuilResult};

mod calibration;
mod declaration;
mod frame;
mod gate;
mod measurement;
mod pragma;
mod qubit;
mod timing;
mod waveform;

pub use self::calibration::{
    CalibrationDefinition, CalibrationIdentifier, CalibrationSignature,
    MeasureCalibrationDefinition, MeasureCalibrationIdentifier,
};
pub use self::declaration::{Declaration, MemoryReference, ScalarType, Vector};
pub use self::frame::{
    attribute, real_attribute, AttributeValue, Capture, FrameAttributeError, FrameAttributes,
    FrameDefinition, FrameIdentifier, Pulse, SetFrequency, SetPhase, SetScale, ShiftFrequency,
    ShiftPhase,
};
pub use self::gate::{Gate, GateError};
pub use self::measurement::Measurement;
pub use self::pragma::{Pragma, PragmaArgument, LOAD_MEMORY};
pub use self::qubit::Qubit;
pub use self::timing::{Delay, Fence};
pub use self::waveform::{WaveformInvocation, DURATION_PARAMETER};

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    CalibrationDefinition(CalibrationDefinition),
    Capture(Capture),
    Declaration(Declaration),
    Delay(Delay),
    Fence(Fence),
    FrameDefinition(FrameDefinition),
    Gate(Gate),
    MeasureCalibrationDefinition(MeasureCalibrationDefinition),
    Measurement(Measurement),
    Pragma(Pragma),
    Pulse(Pulse),
    SetFrequency(SetFrequency),
    SetPhase(SetPhase),
    SetScale(SetScale),
    ShiftFrequency(ShiftFrequency),
    ShiftPhase(ShiftPhase),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionRole {
    ClassicalCompute,
    ProgramComposition,
    RFControl,
}

impl From<&Instruction> for InstructionRole {
    fn from(instruction: &Instruction) -> Self {
        match instruction {
            Instruction::CalibrationDefinition(_)
            | Instruction::Declaration(_)
            | Instruction::FrameDefinition(_)
            | Instruction::Gate(_)
            | Instruction::MeasureCalibrationDefinition(_)
            | Instruction::Measurement(_) => InstructionRole::ProgramComposition,
            Instruction::Capture(_)
            | Instruction::Delay(_)
            | Instruction::Fence(_)
            | Instruction::Pulse(_)
            | Instruction::SetFrequency(_)
            | Instruction::SetPhase(_)
            | Instruction::SetScale(_)
            | Instruction::ShiftFrequency(_)
            | Instruction::ShiftPhase(_) => InstructionRole::RFControl,
            Instruction::Pragma(_) => InstructionRole::ClassicalCompute,
        }
    }
}

/// Write a list of qubits, with each prefixed by a space (including the first)
fn write_qubits(
    f: &mut impl std::fmt::Write,
    fall_back_to_debug: bool,
    qubits: &[Qubit],
) -> crate::quil::ToQuilResult<()> {
    for qubit in qubits {
        write!(f, " ")?;
        qubit.write(f, fall_back_to_debug)?;
    }
    Ok(())
}

fn write_expression_parameter_string(
    f: &mut impl std::fmt::Write,
    fall_back_to_debug: bool,
    parameters: &[Expression],
) -> crate::quil::ToQuilResult<()> {
    if parameters.is_empty() {
        return Ok(());
    }

    write!(f, "(")?;
    write_join_quil(f, fall_back_to_debug, parameters, ", ")?;
    write!(f, ")")?;
    Ok(())
}

impl Quil for Instruction {
    fn write(
        &self,
        f: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> ToQuilResult<()> {
        match self {
            Instruction::CalibrationDefinition(calibration) => {
                calibration.write(f, fall_back_to_debug)
            }
            Instruction::Capture(capture) => capture.write(f, fall_back_to_debug),
            Instruction::Declaration(declaration) => declaration.write(f, fall_back_to_debug),
            Instruction::Delay(delay) => delay.write(f, fall_back_to_debug),
            Instruction::Fence(fence) => fence.write(f, fall_back_to_debug),
            Instruction::FrameDefinition(frame_definition) => {
                frame_definition.write(f, fall_back_to_debug)
            }
            Instruction::Gate(gate) => gate.write(f, fall_back_to_debug),
            Instruction::MeasureCalibrationDefinition(measure_calibration) => {
                measure_calibration.write(f, fall_back_to_debug)
            }
            Instruction::Measurement(measurement) => measurement.write(f, fall_back_to_debug),
            Instruction::Pragma(pragma) => pragma.write(f, fall_back_to_debug),
            Instruction::Pulse(pulse) => pulse.write(f, fall_back_to_debug),
            Instruction::SetFrequency(set_frequency) => set_frequency.write(f, fall_back_to_debug),
            Instruction::SetPhase(set_phase) => set_phase.write(f, fall_back_to_debug),
            Instruction::SetScale(set_scale) => set_scale.write(f, fall_back_to_debug),
            Instruction::ShiftFrequency(shift_frequency) => {
                shift_frequency.write(f, fall_back_to_debug)
            }
            Instruction::ShiftPhase(shift_phase) => shift_phase.write(f, fall_back_to_debug),
        }
    }
}

impl Instruction {
    /// The frame an RF control instruction acts upon, if it acts upon exactly one.
    pub fn frame(&self) -> Option<&FrameIdentifier> {
        match self {
            Instruction::Capture(Capture { frame, .. })
            | Instruction::Pulse(Pulse { frame, .. })
            | Instruction::SetFrequency(SetFrequency { frame, .. })
            | Instruction::SetPhase(SetPhase { frame, .. })
            | Instruction::SetScale(SetScale { frame, .. })
            | Instruction::ShiftFrequency(ShiftFrequency { frame, .. })
            | Instruction::ShiftPhase(ShiftPhase { frame, .. }) => Some(frame),
            _ => None,
        }
    }

    /// Apply `closure` to every expression operand of the instruction, in place.
    pub fn apply_to_expressions(&mut self, mut closure: impl FnMut(&mut Expression)) {
        match self {
            Instruction::Capture(Capture { waveform, .. })
            | Instruction::Pulse(Pulse { waveform, .. }) => {
                waveform.parameters.values_mut().for_each(&mut closure)
            }
            Instruction::Delay(Delay { duration, .. }) => closure(duration),
            Instruction::Gate(Gate { parameters, .. }) => {
                parameters.iter_mut().for_each(&mut closure)
            }
            Instruction::SetFrequency(SetFrequency { frequency, .. })
            | Instruction::ShiftFrequency(ShiftFrequency { frequency, .. }) => closure(frequency),
            Instruction::SetPhase(SetPhase { phase, .. })
            | Instruction::ShiftPhase(ShiftPhase { phase, .. }) => closure(phase),
            Instruction::SetScale(SetScale { scale, .. }) => closure(scale),
            Instruction::CalibrationDefinition(_)
            | Instruction::Declaration(_)
            | Instruction::Fence(_)
            | Instruction::FrameDefinition(_)
            | Instruction::MeasureCalibrationDefinition(_)
            | Instruction::Measurement(_)
            | Instruction::Pragma(_) => {}
        }
    }

    /// Every qubit the instruction acts upon, including those of its frame.
    pub fn get_qubits(&self) -> Vec<&Qubit> {
        match self {
            Instruction::Gate(Gate { qubits, .. })
            | Instruction::Delay(Delay { qubits, .. })
            | Instruction::Fence(Fence { qubits }) => qubits.iter().collect(),
            Instruction::Measurement(Measurement { qubit, .. }) => vec![qubit],
            other => other
                .frame()
                .map(|frame| frame.qubits.iter().collect())
                .unwrap_or_default(),
        }
    }

    /// Mutable references to every qubit the instruction acts upon, including those of its frame.
    pub fn qubits_mut(&mut self) -> Vec<&mut Qubit> {
        match self {
            Instruction::Gate(Gate { qubits, .. })
            | Instruction::Delay(Delay { qubits, .. })
            | Instruction::Fence(Fence { qubits })
            | Instruction::Capture(Capture {
                frame: FrameIdentifier { qubits, .. },
                ..
            })
            | Instruction::Pulse(Pulse {
                frame: FrameIdentifier { qubits, .. },
                ..
            })
            | Instruction::SetFrequency(SetFrequency {
                frame: FrameIdentifier { qubits, .. },
                ..
            })
            | Instruction::SetPhase(SetPhase {
                frame: FrameIdentifier { qubits, .. },
                ..
            })
            | Instruction::SetScale(SetScale {
                frame: FrameIdentifier { qubits, .. },
                ..
            })
            | Instruction::ShiftFrequency(ShiftFrequency {
                frame: FrameIdentifier { qubits, .. },
                ..
            })
            | Instruction::ShiftPhase(ShiftPhase {
                frame: FrameIdentifier { qubits, .. },
                ..
            }) => qubits.iter_mut().collect(),
            Instruction::Measurement(Measurement { qubit, .. }) => vec![qubit],
            Instruction::CalibrationDefinition(_)
            | Instruction::Declaration(_)
            | Instruction::FrameDefinition(_)
            | Instruction::MeasureCalibrationDefinition(_)
            | Instruction::Pragma(_) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_and_role_of_frame_instructions() {
        let frame = FrameIdentifier::new("rf".to_string(), vec![Qubit::Fixed(0)]);
        let instruction = Instruction::ShiftFrequency(ShiftFrequency::new(
            frame.clone(),
            Expression::from(1e6),
        ));
        assert_eq!(instruction.frame(), Some(&frame));
        assert_eq!(InstructionRole::from(&instruction), InstructionRole::RFControl);
    }

    #[test]
    fn qubits_mut_reaches_frame_qubits() {
        let mut instruction = Instruction::SetScale(SetScale::new(
            FrameIdentifier::new("rf".to_string(), vec![Qubit::Variable("q".to_string())]),
            Expression::from(0.5),
        ));
        for qubit in instruction.qubits_mut() {
            *qubit = Qubit::Fixed(7);
        }
        assert_eq!(
            instruction.to_quil().unwrap(),
            "SET-SCALE 7 \"rf\" 0.5"
        );
    }

    #[test]
    fn apply_to_expressions_rewrites_operands() {
        let mut instruction = Instruction::Delay(Delay::new(
            Expression::Variable("t".to_string()),
            vec![],
            vec![Qubit::Fixed(0)],
        ));
        instruction.apply_to_expressions(|expression| *expression = Expression::from(4e-8));
        assert_eq!(instruction.to_quil().unwrap(), "DELAY 0 4e-8");
    }
}
