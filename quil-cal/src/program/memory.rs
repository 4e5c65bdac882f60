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

use std::collections::HashSet;

use crate::expression::{Expression, InfixExpression, PrefixExpression};
use crate::instruction::{
    Capture, Delay, Gate, Instruction, Measurement, Pulse, SetFrequency, SetPhase, SetScale,
    ShiftFrequency, ShiftPhase, Vector, WaveformInvocation,
};

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct MemoryRegion {
    pub size: Vector,
}

impl MemoryRegion {
    pub fn new(size: Vector) -> Self {
        Self { size }
    }
}

/// The names of the memory regions an instruction touches, by mode of access.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryAccesses {
    /// Regions written by readout (`CAPTURE` and `MEASURE`).
    pub captures: HashSet<String>,
    /// Regions read as expression operands.
    pub reads: HashSet<String>,
}

impl MemoryAccesses {
    /// Merge the accesses of another instruction into these.
    pub fn extend(&mut self, other: MemoryAccesses) {
        self.captures.extend(other.captures);
        self.reads.extend(other.reads);
    }
}

fn expression_reads(expression: &Expression, reads: &mut HashSet<String>) {
    match expression {
        Expression::Address(reference) => {
            reads.insert(reference.name.clone());
        }
        Expression::Infix(InfixExpression { left, right, .. }) => {
            expression_reads(left, reads);
            expression_reads(right, reads);
        }
        Expression::Prefix(PrefixExpression { expression, .. }) => {
            expression_reads(expression, reads)
        }
        Expression::Number(_) | Expression::PiConstant() | Expression::Variable(_) => {}
    }
}

fn waveform_reads(waveform: &WaveformInvocation, reads: &mut HashSet<String>) {
    for expression in waveform.parameters.values() {
        expression_reads(expression, reads);
    }
}

impl Instruction {
    /// Return all memory accesses by the instruction, in expressions and in readout.
    pub fn get_memory_accesses(&self) -> MemoryAccesses {
        let mut accesses = MemoryAccesses::default();
        match self {
            Instruction::Capture(Capture {
                memory_reference,
                waveform,
                ..
            }) => {
                accesses.captures.insert(memory_reference.name.clone());
                waveform_reads(waveform, &mut accesses.reads);
            }
            Instruction::Delay(Delay { duration, .. }) => {
                expression_reads(duration, &mut accesses.reads)
            }
            Instruction::Gate(Gate { parameters, .. }) => {
                for parameter in parameters {
                    expression_reads(parameter, &mut accesses.reads);
                }
            }
            Instruction::Measurement(Measurement {
                target: Some(target),
                ..
            }) => {
                accesses.captures.insert(target.name.clone());
            }
            Instruction::Pulse(Pulse { waveform, .. }) => {
                waveform_reads(waveform, &mut accesses.reads)
            }
            Instruction::SetFrequency(SetFrequency { frequency, .. })
            | Instruction::ShiftFrequency(ShiftFrequency { frequency, .. }) => {
                expression_reads(frequency, &mut accesses.reads)
            }
            Instruction::SetPhase(SetPhase { phase, .. })
            | Instruction::ShiftPhase(ShiftPhase { phase, .. }) => {
                expression_reads(phase, &mut accesses.reads)
            }
            Instruction::SetScale(SetScale { scale, .. }) => {
                expression_reads(scale, &mut accesses.reads)
            }
            Instruction::CalibrationDefinition(_)
            | Instruction::Declaration(_)
            | Instruction::Fence(_)
            | Instruction::FrameDefinition(_)
            | Instruction::MeasureCalibrationDefinition(_)
            | Instruction::Measurement(_)
            | Instruction::Pragma(_) => {}
        }
        accesses
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use rstest::rstest;

    use crate::expression::Expression;
    use crate::instruction::{
        Capture, FrameIdentifier, Instruction, Measurement, MemoryReference, Pulse, Qubit,
        SetScale, ShiftFrequency, WaveformInvocation,
    };

    use super::MemoryAccesses;

    fn rf() -> FrameIdentifier {
        FrameIdentifier::new("rf".to_string(), vec![Qubit::Fixed(0)])
    }

    fn reference(name: &str) -> MemoryReference {
        MemoryReference::new(name.to_string(), 0)
    }

    fn names(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[rstest]
    #[case::shift_frequency(
        Instruction::ShiftFrequency(ShiftFrequency::new(
            rf(),
            Expression::Address(reference("freq")) * Expression::from(2.0),
        )),
        MemoryAccesses { captures: names(&[]), reads: names(&["freq"]) },
    )]
    #[case::set_scale(
        Instruction::SetScale(SetScale::new(rf(), Expression::Address(reference("scale")))),
        MemoryAccesses { captures: names(&[]), reads: names(&["scale"]) },
    )]
    #[case::pulse_parameters(
        Instruction::Pulse(Pulse::new(
            true,
            rf(),
            WaveformInvocation::new(
                "flat".to_string(),
                HashMap::from([("scale".to_string(), Expression::Address(reference("amp")))]),
            ),
        )),
        MemoryAccesses { captures: names(&[]), reads: names(&["amp"]) },
    )]
    #[case::capture(
        Instruction::Capture(Capture::new(
            true,
            rf(),
            reference("ro"),
            WaveformInvocation::new("boxcar_kernel".to_string(), HashMap::new()),
        )),
        MemoryAccesses { captures: names(&["ro"]), reads: names(&[]) },
    )]
    #[case::measurement(
        Instruction::Measurement(Measurement::new(Qubit::Fixed(0), Some(reference("ro")))),
        MemoryAccesses { captures: names(&["ro"]), reads: names(&[]) },
    )]
    #[case::measurement_for_effect(
        Instruction::Measurement(Measurement::new(Qubit::Fixed(0), None)),
        MemoryAccesses::default(),
    )]
    fn memory_accesses(#[case] instruction: Instruction, #[case] expected: MemoryAccesses) {
        assert_eq!(instruction.get_memory_accesses(), expected);
    }
}
