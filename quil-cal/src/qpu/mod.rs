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

//! Quantum processors which compile and run calibration programs.
//!
//! A [`Qpu`] hands out its current calibrations as a [`Program`], compiles programs into
//! [`Executable`]s and runs them. Runtime parameters declared as `REAL` memory are written into
//! the [`Executable`] before each run, so a parametric program is compiled only once.

use std::collections::HashMap;

use crate::expression::{EvaluationError, Expression};
use crate::instruction::{
    FrameAttributeError, FrameIdentifier, Instruction, MemoryReference, ScalarType,
};
use crate::program::{ProgramError, Program};
use crate::quil::Quil;

mod simulated;

pub use simulated::{QubitModel, SimulatedQpu, DRIVE_FRAME, READOUT_FRAME};

#[derive(Debug, thiserror::Error)]
pub enum QpuError {
    #[error("memory region {0} is not declared")]
    UndeclaredRegion(String),

    #[error("memory region {name} holds {} values, not REAL", .data_type.to_quil_or_debug())]
    WrongRegionType { name: String, data_type: ScalarType },

    #[error("memory region {name} has length {expected}, but {actual} values were written")]
    WrongRegionLength {
        name: String,
        expected: u64,
        actual: usize,
    },

    #[error("{reference} is outside its region of length {length}")]
    IndexOutOfRange {
        reference: MemoryReference,
        length: u64,
    },

    #[error("runtime parameter {0} was never written")]
    UnsetParameter(String),

    #[error("instruction {} is not supported", .0.to_quil_or_debug())]
    UnsupportedInstruction(Instruction),

    #[error("no calibration expands {}", .0.to_quil_or_debug())]
    MissingCalibration(Instruction),

    #[error("frame {} is not defined", .0.to_quil_or_debug())]
    UndefinedFrame(FrameIdentifier),

    #[error("waveform on frame {} has no constant duration", .0.to_quil_or_debug())]
    MissingDuration(FrameIdentifier),

    #[error("readout register {0} holds no results")]
    MissingRegister(String),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    FrameAttribute(#[from] FrameAttributeError),

    #[error(transparent)]
    Program(#[from] ProgramError),
}

pub type Result<T> = std::result::Result<T, QpuError>;

/// A quantum processor, or something which behaves like one.
///
/// Runs take `&mut self`: a processor executes one program at a time.
pub trait Qpu {
    /// A name for the processor, used in logs.
    fn name(&self) -> &str;

    /// The processor's current frames and calibrations.
    fn calibration_program(&self) -> Result<Program>;

    /// Compile a program for this processor.
    fn compile(&self, program: &Program) -> Result<Executable>;

    /// Run a compiled program for the number of shots it was compiled with.
    fn run(&mut self, executable: &Executable) -> Result<ExecutionData>;
}

/// A compiled program together with the runtime memory written into it.
#[derive(Clone, Debug, PartialEq)]
pub struct Executable {
    program: Program,
    memory: HashMap<String, Vec<f64>>,
}

impl Executable {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            memory: HashMap::new(),
        }
    }

    /// The compiled program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The values written so far into each runtime parameter.
    pub fn memory(&self) -> &HashMap<String, Vec<f64>> {
        &self.memory
    }

    /// Write the values of a `REAL` memory region, to be used by every following run.
    ///
    /// # Errors
    ///
    /// The region must be declared by the program, must hold `REAL` values and must be exactly
    /// as long as `values`.
    pub fn write_memory(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        let region = self
            .program
            .memory_regions
            .get(name)
            .ok_or_else(|| QpuError::UndeclaredRegion(name.to_string()))?;
        if region.size.data_type != ScalarType::Real {
            return Err(QpuError::WrongRegionType {
                name: name.to_string(),
                data_type: region.size.data_type,
            });
        }
        if region.size.length != values.len() as u64 {
            return Err(QpuError::WrongRegionLength {
                name: name.to_string(),
                expected: region.size.length,
                actual: values.len(),
            });
        }
        self.memory.insert(name.to_string(), values);
        Ok(())
    }

    /// Check that every `REAL` region the program declares has been written.
    pub fn check_parameters(&self) -> Result<()> {
        match self
            .program
            .memory_regions
            .iter()
            .find(|(name, region)| {
                region.size.data_type == ScalarType::Real && !self.memory.contains_key(*name)
            }) {
            Some((name, _)) => Err(QpuError::UnsetParameter(name.clone())),
            None => Ok(()),
        }
    }

    /// Evaluate a real-valued operand against the runtime memory.
    pub(crate) fn evaluate_real(&self, expression: &Expression) -> Result<f64> {
        let value = expression.evaluate::<String, String>(&HashMap::new(), &self.memory)?;
        Ok(Expression::Number(value).to_real()?)
    }
}

/// The readout registers of every shot of a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionData {
    /// For each register, one row of values per shot.
    pub registers: HashMap<String, Vec<Vec<u8>>>,
}

impl ExecutionData {
    /// The fraction of shots in which the first bit of `register` read 1.
    pub fn success_probability(&self, register: &str) -> Result<f64> {
        let shots = self
            .registers
            .get(register)
            .filter(|shots| !shots.is_empty())
            .ok_or_else(|| QpuError::MissingRegister(register.to_string()))?;
        let successes = shots
            .iter()
            .filter(|shot| shot.first().copied() == Some(1))
            .count();
        Ok(successes as f64 / shots.len() as f64)
    }
}
