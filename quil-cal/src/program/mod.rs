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

use std::collections::BTreeSet;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::instruction::{Declaration, FrameDefinition, Instruction, Qubit};
use crate::parser::{parse_program_text, ParseError};
use crate::quil::Quil;

pub use self::calibration::Calibrations;
pub use self::calibration_set::CalibrationSet;
pub use self::frame::FrameSet;
pub use self::memory::{MemoryAccesses, MemoryRegion};

mod calibration;
mod calibration_set;
mod frame;
mod memory;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProgramError {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error("instruction {} expands into itself", .0.to_quil_or_debug())]
    RecursiveCalibration(Instruction),
}

type Result<T> = std::result::Result<T, ProgramError>;

/// A Quil Program instance describes a quantum program with metadata used in execution.
///
/// This contains not only instructions which are executed in turn on the quantum processor, but
/// also the "headers" used to describe and manipulate those instructions, such as calibrations,
/// frame definitions and memory declarations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub calibrations: Calibrations,
    pub frames: FrameSet,
    /// Declared memory regions, in declaration order.
    pub memory_regions: IndexMap<String, MemoryRegion>,
    instructions: Vec<Instruction>,
    num_shots: Option<u32>,
}

impl Program {
    pub fn new() -> Self {
        Program {
            calibrations: Calibrations::default(),
            frames: FrameSet::new(),
            memory_regions: IndexMap::new(),
            instructions: vec![],
            num_shots: None,
        }
    }

    /// Returns an iterator over immutable references to the instructions that make up the body of the program.
    pub fn body_instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    pub fn into_body_instructions(self) -> impl Iterator<Item = Instruction> {
        self.instructions.into_iter()
    }

    /// Like `Clone`, but does not clone the body instructions.
    pub fn clone_without_body_instructions(&self) -> Self {
        Self {
            instructions: Vec::new(),
            calibrations: self.calibrations.clone(),
            frames: self.frames.clone(),
            memory_regions: self.memory_regions.clone(),
            num_shots: self.num_shots,
        }
    }

    /// Add an instruction to the end of the program.
    ///
    /// Header instructions (`DEFCAL`, `DEFFRAME` and `DECLARE`) are filed into their
    /// collections rather than the body.
    pub fn add_instruction(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::CalibrationDefinition(calibration) => {
                self.calibrations.insert_calibration(calibration);
            }
            Instruction::FrameDefinition(FrameDefinition {
                identifier,
                attributes,
            }) => {
                self.frames.insert(identifier, attributes);
            }
            Instruction::Declaration(Declaration { name, size }) => {
                self.memory_regions.insert(name, MemoryRegion::new(size));
            }
            Instruction::MeasureCalibrationDefinition(calibration) => {
                self.calibrations
                    .insert_measurement_calibration(calibration);
            }
            other => self.instructions.push(other),
        }
    }

    pub fn add_instructions<I>(&mut self, instructions: I)
    where
        I: IntoIterator<Item = Instruction>,
    {
        instructions
            .into_iter()
            .for_each(|i| self.add_instruction(i));
    }

    /// Build a program from a list of instructions
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        let mut program = Self::default();
        program.add_instructions(instructions);
        program
    }

    /// Expand any instructions in the program which have a matching calibration, leaving the others
    /// unchanged. Recurses though each instruction while ensuring there is no cycle in the expansion
    /// graph (i.e. no calibration expands directly or indirectly into itself)
    pub fn expand_calibrations(&self) -> Result<Self> {
        let mut expanded_instructions: Vec<Instruction> = vec![];

        for instruction in &self.instructions {
            match self.calibrations.expand(instruction, &[])? {
                Some(expanded) => {
                    expanded_instructions.extend(expanded);
                }
                None => {
                    expanded_instructions.push(instruction.clone());
                }
            }
        }

        let mut new_program = self.clone_without_body_instructions();
        new_program.add_instructions(expanded_instructions);

        Ok(new_program)
    }

    /// Return every qubit the body of the program acts upon, in ascending order.
    pub fn get_used_qubits(&self) -> BTreeSet<Qubit> {
        self.instructions
            .iter()
            .flat_map(Instruction::get_qubits)
            .cloned()
            .collect()
    }

    /// Mark the program to be run `shots` times, each run producing one measurement outcome per
    /// readout.
    pub fn wrap_in_numshots_loop(&mut self, shots: u32) {
        self.num_shots = Some(shots);
    }

    /// The number of times the program is to be run. Defaults to a single shot.
    pub fn num_shots(&self) -> u32 {
        self.num_shots.unwrap_or(1)
    }

    /// Like [`Program::to_instructions`], but consumes the [`Program`].
    pub fn into_instructions(self) -> Vec<Instruction> {
        let mut instructions = self.frames.into_instructions();
        instructions.extend(
            self.memory_regions
                .into_iter()
                .map(|(name, region)| Instruction::Declaration(Declaration::new(name, region.size))),
        );
        instructions.extend(self.calibrations.into_instructions());
        instructions.extend(self.instructions);
        instructions
    }

    /// Return a copy of all of the instructions which constitute this [`Program`]: frames,
    /// declarations, calibrations and then the body.
    pub fn to_instructions(&self) -> Vec<Instruction> {
        let capacity = self.memory_regions.len()
            + self.frames.len()
            + self.calibrations.len()
            + self.instructions.len();

        let mut instructions: Vec<Instruction> = Vec::with_capacity(capacity);

        instructions.extend(self.frames.to_instructions());
        instructions.extend(self.memory_regions.iter().map(|(name, region)| {
            Instruction::Declaration(Declaration::new(name.clone(), region.size.clone()))
        }));
        instructions.extend(self.calibrations.to_instructions());
        instructions.extend(self.instructions.clone());
        instructions
    }

    /// Get a reference to the [`Instruction`] at the given index, if present.
    pub fn get_instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }
}

impl Quil for Program {
    fn write(
        &self,
        writer: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> std::result::Result<(), crate::quil::ToQuilError> {
        for instruction in self.to_instructions() {
            instruction.write(writer, fall_back_to_debug)?;
            writeln!(writer)?;
        }
        Ok(())
    }
}

impl FromStr for Program {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self> {
        let instructions = parse_program_text(s)?;
        Ok(Self::from_instructions(instructions))
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::from_instructions(instructions)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use super::{Program, ProgramError};
    use crate::instruction::{Instruction, Qubit, ScalarType};
    use crate::quil::Quil;

    const CALIBRATED: &str = r#"DEFFRAME 0 "rf":
    DIRECTION: "tx"
    INITIAL-FREQUENCY: 5000000000
    SAMPLE-RATE: 1000000000
DEFCAL RX(pi/2) 0:
    NONBLOCKING PULSE 0 "rf" drag_gaussian(duration: 6e-8, scale: 0.3)
DECLARE ro BIT[1]
RX(pi/2) 0
MEASURE 0 ro[0]
"#;

    #[test]
    fn headers_are_filed_out_of_the_body() {
        let program = Program::from_str(CALIBRATED).unwrap();
        assert_eq!(program.frames.len(), 1);
        assert_eq!(program.calibrations.len(), 1);
        assert_eq!(
            program.memory_regions["ro"].size.data_type,
            ScalarType::Bit
        );
        assert_eq!(program.body_instructions().count(), 2);
        assert_eq!(
            program.get_used_qubits().into_iter().collect::<Vec<_>>(),
            vec![Qubit::Fixed(0)]
        );
    }

    #[test]
    fn headers_are_written_before_the_body() {
        let program = Program::from_str(CALIBRATED).unwrap();
        assert_snapshot!(program.to_quil().unwrap(), @r###"
        DEFFRAME 0 "rf":
            DIRECTION: "tx"
            INITIAL-FREQUENCY: 5000000000
            SAMPLE-RATE: 1000000000
        DECLARE ro BIT[1]
        DEFCAL RX(pi/2) 0:
            NONBLOCKING PULSE 0 "rf" drag_gaussian(duration: 6e-8, scale: 0.3)
        RX(pi/2) 0
        MEASURE 0 ro[0]
        "###);
    }

    #[test]
    fn round_trip_is_stable() {
        let program = Program::from_str(CALIBRATED).unwrap();
        let reparsed = Program::from_str(&program.to_quil().unwrap()).unwrap();
        assert_eq!(program, reparsed);
    }

    #[test]
    fn expand_calibrations_replaces_calibrated_gates() {
        let program = Program::from_str(CALIBRATED)
            .unwrap()
            .expand_calibrations()
            .unwrap();
        let body: Vec<_> = program.body_instructions().collect();
        assert!(matches!(body[0], Instruction::Pulse(_)));
        assert!(matches!(body[1], Instruction::Measurement(_)));
    }

    #[test]
    fn num_shots_defaults_to_one() {
        let mut program = Program::new();
        assert_eq!(program.num_shots(), 1);
        program.wrap_in_numshots_loop(1000);
        assert_eq!(program.num_shots(), 1000);
        assert_eq!(program.clone_without_body_instructions().num_shots(), 1000);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let error = Program::from_str("DEFFRAME 0 \"rf\":\n    SAMPLE-RATE\n").unwrap_err();
        assert!(matches!(error, ProgramError::Syntax(_)));
    }
}
