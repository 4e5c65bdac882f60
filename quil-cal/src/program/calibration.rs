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

use itertools::{Either, Itertools as _};

use crate::quil::Quil;
use crate::{
    expression::Expression,
    instruction::{
        CalibrationDefinition, Gate, Instruction, MeasureCalibrationDefinition, Measurement,
        Qubit,
    },
};

use super::{CalibrationSet, ProgramError};

/// A collection of Quil calibrations (`DEFCAL` instructions) with utility methods.
///
/// Gate and measurement calibrations are each held in a [`CalibrationSet`], so see the
/// documentation there for how duplicate definitions are resolved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Calibrations {
    pub calibrations: CalibrationSet<CalibrationDefinition>,
    pub measure_calibrations: CalibrationSet<MeasureCalibrationDefinition>,
}

struct MatchedCalibration<'a> {
    pub calibration: &'a CalibrationDefinition,
    pub fixed_qubit_count: usize,
}

impl<'a> MatchedCalibration<'a> {
    pub fn new(calibration: &'a CalibrationDefinition) -> Self {
        Self {
            calibration,
            fixed_qubit_count: calibration.identifier.fixed_qubit_count(),
        }
    }
}

impl Calibrations {
    /// Return the count of contained gate calibrations.
    pub fn len(&self) -> usize {
        self.calibrations.len()
    }

    /// Return true if this contains no calibrations of either kind.
    pub fn is_empty(&self) -> bool {
        self.calibrations.is_empty() && self.measure_calibrations.is_empty()
    }

    /// Insert a [`CalibrationDefinition`] into the set.
    ///
    /// If a calibration with the same [signature][crate::instruction::CalibrationSignature] already
    /// exists in the set, it will be replaced and the old calibration will be returned.
    pub fn insert_calibration(
        &mut self,
        calibration: CalibrationDefinition,
    ) -> Option<CalibrationDefinition> {
        self.calibrations.replace(calibration)
    }

    /// Insert a [`MeasureCalibrationDefinition`] into the set, replacing and returning any
    /// existing calibration with the same signature.
    pub fn insert_measurement_calibration(
        &mut self,
        calibration: MeasureCalibrationDefinition,
    ) -> Option<MeasureCalibrationDefinition> {
        self.measure_calibrations.replace(calibration)
    }

    /// Append another [`Calibrations`] onto this one.
    ///
    /// Calibrations with conflicting signatures are overwritten by the ones in `other`.
    pub fn extend(&mut self, other: Calibrations) {
        self.calibrations.extend(other.calibrations);
        self.measure_calibrations.extend(other.measure_calibrations);
    }

    /// Iterate over all [`CalibrationDefinition`]s in the set.
    pub fn iter_calibrations(&self) -> std::slice::Iter<'_, CalibrationDefinition> {
        self.calibrations.iter()
    }

    /// Iterate over all [`MeasureCalibrationDefinition`]s in the set.
    pub fn iter_measure_calibrations(&self) -> std::slice::Iter<'_, MeasureCalibrationDefinition> {
        self.measure_calibrations.iter()
    }

    /// Return the final calibration which matches the gate per the Quil-T rules:
    ///
    /// A calibration matches a gate if:
    /// 1. It has the same name
    /// 2. It has the same qubit count (any mix of fixed & variable)
    /// 3. It has the same parameter count (both specified and unspecified)
    /// 4. All fixed qubits in the calibration definition match those in the gate
    /// 5. All specified parameters in the calibration definition match those in the gate
    ///
    /// Among matches, the one with the most fixed qubits wins; ties go to the later definition.
    pub fn get_match_for_gate(&self, gate: &Gate) -> Option<&CalibrationDefinition> {
        let mut matched_calibration: Option<MatchedCalibration> = None;

        for calibration in self
            .iter_calibrations()
            .filter(|calibration| calibration.identifier.matches(gate))
        {
            matched_calibration = match matched_calibration {
                None => Some(MatchedCalibration::new(calibration)),
                Some(previous_match) => {
                    let potential_match = MatchedCalibration::new(calibration);
                    if potential_match.fixed_qubit_count >= previous_match.fixed_qubit_count {
                        Some(potential_match)
                    } else {
                        Some(previous_match)
                    }
                }
            }
        }

        matched_calibration.map(|m| m.calibration)
    }

    /// Return the last measurement calibration which matches the measurement, preferring a
    /// calibration for the exact qubit over one for a variable qubit.
    pub fn get_match_for_measurement(
        &self,
        measurement: &Measurement,
    ) -> Option<&MeasureCalibrationDefinition> {
        let (exact, wildcard): (Vec<_>, Vec<_>) = self
            .iter_measure_calibrations()
            .rev()
            .filter_map(|calibration| {
                calibration
                    .identifier
                    .matches(measurement)
                    .map(|exact| (calibration, exact))
            })
            .partition_map(|(calibration, exact)| {
                if exact {
                    Either::Left(calibration)
                } else {
                    Either::Right(calibration)
                }
            });

        exact.first().or(wildcard.first()).copied()
    }

    /// Given an instruction, return the instructions to which it is expanded if there is a match.
    /// Recursively calibrate instructions, returning an error if a calibration directly or
    /// indirectly expands into itself.
    pub fn expand(
        &self,
        instruction: &Instruction,
        previous_calibrations: &[Instruction],
    ) -> Result<Option<Vec<Instruction>>, ProgramError> {
        if previous_calibrations.contains(instruction) {
            return Err(ProgramError::RecursiveCalibration(instruction.clone()));
        }

        let expanded = match instruction {
            Instruction::Gate(gate) => self
                .get_match_for_gate(gate)
                .map(|calibration| expand_gate_calibration(calibration, gate)),
            Instruction::Measurement(measurement) => self
                .get_match_for_measurement(measurement)
                .map(|calibration| expand_measure_calibration(calibration, measurement)),
            _ => None,
        };

        let Some(instructions) = expanded else {
            return Ok(None);
        };

        let mut calibration_path = Vec::with_capacity(previous_calibrations.len() + 1);
        calibration_path.push(instruction.clone());
        calibration_path.extend_from_slice(previous_calibrations);

        let mut result = Vec::with_capacity(instructions.len());
        for instruction in instructions {
            match self.expand(&instruction, &calibration_path)? {
                Some(nested) => result.extend(nested),
                None => result.push(instruction),
            }
        }
        Ok(Some(result))
    }

    /// Return the Quil instructions which describe the contained calibrations.
    pub fn to_instructions(&self) -> Vec<Instruction> {
        self.iter_calibrations()
            .cloned()
            .map(Instruction::CalibrationDefinition)
            .chain(
                self.iter_measure_calibrations()
                    .cloned()
                    .map(Instruction::MeasureCalibrationDefinition),
            )
            .collect()
    }

    /// Return the Quil instructions which describe the contained calibrations, consuming the
    /// [`Calibrations`].
    pub fn into_instructions(self) -> Vec<Instruction> {
        self.calibrations
            .into_iter()
            .map(Instruction::CalibrationDefinition)
            .chain(
                self.measure_calibrations
                    .into_iter()
                    .map(Instruction::MeasureCalibrationDefinition),
            )
            .collect()
    }
}

/// Swap the calibration's variable qubits for the ones they are bound to.
fn substitute_qubits(instruction: &mut Instruction, qubit_expansions: &HashMap<&String, Qubit>) {
    for qubit in instruction.qubits_mut() {
        if let Qubit::Variable(name) = qubit {
            if let Some(expansion) = qubit_expansions.get(name) {
                *qubit = expansion.clone();
            }
        }
    }
}

fn expand_gate_calibration(calibration: &CalibrationDefinition, gate: &Gate) -> Vec<Instruction> {
    let qubit_expansions: HashMap<&String, Qubit> = calibration
        .identifier
        .qubits
        .iter()
        .zip(&gate.qubits)
        .filter_map(|(calibration_qubit, gate_qubit)| match calibration_qubit {
            Qubit::Variable(name) => Some((name, gate_qubit.clone())),
            Qubit::Fixed(_) => None,
        })
        .collect();

    // `DEFCAL RX(%theta)` used to expand `RX(pi)` has `%theta` replaced by `pi` throughout.
    let variable_expansions: HashMap<String, Expression> = calibration
        .identifier
        .parameters
        .iter()
        .zip(&gate.parameters)
        .filter_map(|(calibration_expression, gate_expression)| {
            if let Expression::Variable(name) = calibration_expression {
                Some((name.clone(), gate_expression.clone()))
            } else {
                None
            }
        })
        .collect();

    let mut instructions = calibration.instructions.clone();
    for instruction in instructions.iter_mut() {
        substitute_qubits(instruction, &qubit_expansions);
        instruction.apply_to_expressions(|expression| {
            *expression = expression.substitute_variables(&variable_expansions);
        });
    }
    instructions
}

fn expand_measure_calibration(
    calibration: &MeasureCalibrationDefinition,
    measurement: &Measurement,
) -> Vec<Instruction> {
    let mut qubit_expansions = HashMap::new();
    if let Qubit::Variable(name) = &calibration.identifier.qubit {
        qubit_expansions.insert(name, measurement.qubit.clone());
    }

    let mut instructions = calibration.instructions.clone();
    for instruction in instructions.iter_mut() {
        substitute_qubits(instruction, &qubit_expansions);
        match instruction {
            Instruction::Pragma(pragma) => {
                let loads_target = calibration
                    .identifier
                    .target
                    .as_deref()
                    .is_some_and(|variable| pragma.loads_memory_into(variable));
                if let (true, Some(target)) = (loads_target, &measurement.target) {
                    pragma.data = Some(target.to_string());
                }
            }
            Instruction::Capture(capture) => {
                if let Some(target) = &measurement.target {
                    capture.memory_reference = target.clone()
                }
            }
            _ => {}
        }
    }
    instructions
}
