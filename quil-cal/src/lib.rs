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

//! Parametric Quil-T programs for single-qubit calibration experiments.
//!
//! Within this crate you'll find:
//!
//! * Builders for [spectroscopy], [power Rabi] and [time Rabi] programs, built around the pulse
//!   a QPU's own calibrations use for a reference rotation
//! * The Quil-T [programs], [instructions], and [expressions] those builders produce, with a
//!   [parser] and [serializer] for the subset of Quil-T that calibration programs use
//! * A [QPU abstraction] with an in-process simulated backend, and [sweeps] which run
//!   experiments on it
//!
//! [spectroscopy]: crate::experiment::spectroscopy_program
//! [power Rabi]: crate::experiment::power_rabi_program
//! [time Rabi]: crate::experiment::time_rabi_program
//! [expressions]: crate::expression::Expression
//! [instructions]: crate::instruction::Instruction
//! [parser]: crate::program::Program#method.from_str
//! [programs]: crate::program::Program
//! [serializer]: crate::quil::Quil
//! [QPU abstraction]: crate::qpu::Qpu
//! [sweeps]: crate::experiment::sweep

pub mod config;
pub mod experiment;
pub mod expression;
pub mod instruction;
pub(crate) mod parser;
pub mod program;
pub mod qpu;
pub mod quil;
pub mod reserved;
pub mod units;
pub mod validation;

pub use parser::{ParseError, ParseErrorKind};
pub use program::Program;
