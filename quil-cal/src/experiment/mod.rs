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

//! Programs for single-qubit calibration experiments.
//!
//! Each builder starts from a QPU's calibration program, finds the pulse which implements a
//! reference rotation on the target qubit, and builds a small Quil-T program around the frame
//! that pulse plays on:
//!
//! * [`spectroscopy_program`] shifts the frame frequency by a runtime parameter,
//! * [`power_rabi_program`] sets the frame scale from a runtime parameter,
//! * [`time_rabi_program`] replays the pulse with a fixed, explicit duration.

use tracing::debug;

use crate::expression::Expression;
use crate::instruction::{
    Declaration, FrameDefinition, FrameIdentifier, Gate, GateError, Instruction, Measurement,
    MemoryReference, Pulse, Qubit, ScalarType, SetScale, ShiftFrequency, Vector,
};
use crate::program::{Program, ProgramError};
use crate::qpu::QpuError;
use crate::quil::Quil;
use crate::validation::identifier::IdentifierValidationError;

pub mod sweep;

pub use sweep::{linspace, run_parametric_sweep, run_time_rabi_sweep, Experiment, SweepPoint};

/// Shots per program unless configured otherwise.
pub const DEFAULT_SHOTS: u32 = 1000;

/// The `BIT` register every experiment measures into.
pub const READOUT_REGISTER: &str = "ro";

/// Waveform durations must be a whole multiple of this many samples.
pub const SAMPLE_ALIGNMENT: f64 = 4.0;

#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("no calibration is defined for {}", .0.to_quil_or_debug())]
    MissingCalibration(Gate),

    #[error("the calibration for {} plays no pulse", .0.to_quil_or_debug())]
    MissingPulse(Gate),

    #[error("frame {} is not defined", .0.to_quil_or_debug())]
    UndefinedFrame(FrameIdentifier),

    #[error("frame {} has no usable sample rate: {reason}", .frame.to_quil_or_debug())]
    InvalidSampleRate {
        frame: FrameIdentifier,
        reason: String,
    },

    #[error("pulse duration {0} s cannot be sampled")]
    InvalidDuration(f64),

    #[error("runtime parameter name is invalid: {0}")]
    InvalidParameter(#[from] IdentifierValidationError),

    #[error("runtime parameter {0} collides with the readout register")]
    ParameterCollision(String),

    #[error("reference gate is invalid: {0}")]
    InvalidGate(#[from] GateError),

    #[error(transparent)]
    Qpu(#[from] QpuError),

    #[error(transparent)]
    Program(#[from] ProgramError),
}

pub type Result<T> = std::result::Result<T, ExperimentError>;

/// What every experiment program shares: the qubit it targets, how often it is run, and the
/// rotation whose calibrated pulse it is built around.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgramSettings {
    pub qubit: u64,
    pub shots: u32,
    /// Name of the reference rotation, `RX` unless configured otherwise.
    pub reference_gate: String,
    /// Parameters of the reference rotation, `pi/2` unless configured otherwise.
    pub reference_parameters: Vec<Expression>,
}

impl ProgramSettings {
    pub fn new(qubit: u64) -> Self {
        Self {
            qubit,
            shots: DEFAULT_SHOTS,
            reference_gate: "RX".to_string(),
            reference_parameters: vec![Expression::PiConstant() / Expression::from(2.0)],
        }
    }

    pub fn with_shots(mut self, shots: u32) -> Self {
        self.shots = shots;
        self
    }

    /// The reference rotation applied to the target qubit.
    pub fn reference_gate(&self) -> std::result::Result<Gate, GateError> {
        Gate::new(
            &self.reference_gate,
            self.reference_parameters.clone(),
            vec![Qubit::Fixed(self.qubit)],
        )
    }
}

impl Default for ProgramSettings {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Return the first pulse among `instructions`, if there is one.
pub fn find_pulse(instructions: &[Instruction]) -> Option<&Pulse> {
    instructions.iter().find_map(|instruction| match instruction {
        Instruction::Pulse(pulse) => Some(pulse),
        _ => None,
    })
}

/// Round `duration` (seconds) to the nearest whole number of [`SAMPLE_ALIGNMENT`] samples at
/// `sample_rate` (Hz). Exact halves round to an even count.
pub fn aligned_duration(duration: f64, sample_rate: f64) -> f64 {
    (duration * sample_rate / SAMPLE_ALIGNMENT).round_ties_even() * SAMPLE_ALIGNMENT / sample_rate
}

/// The reference gate together with its calibrated pulse and the frame that pulse plays on.
#[derive(Debug)]
struct ReferencePulse {
    gate: Gate,
    pulse: Pulse,
    frame: FrameDefinition,
}

fn reference_pulse(calibration_program: &Program, settings: &ProgramSettings) -> Result<ReferencePulse> {
    let gate = settings.reference_gate()?;
    let instructions = calibration_program
        .calibrations
        .expand(&Instruction::Gate(gate.clone()), &[])?
        .ok_or_else(|| ExperimentError::MissingCalibration(gate.clone()))?;
    let pulse = find_pulse(&instructions)
        .cloned()
        .ok_or_else(|| ExperimentError::MissingPulse(gate.clone()))?;
    let frame = calibration_program
        .frames
        .get_definition(&pulse.frame)
        .ok_or_else(|| ExperimentError::UndefinedFrame(pulse.frame.clone()))?;
    Ok(ReferencePulse { gate, pulse, frame })
}

fn readout_declaration() -> Declaration {
    Declaration::new(
        READOUT_REGISTER.to_string(),
        Vector::new(ScalarType::Bit, 1),
    )
}

fn readout(qubit: u64) -> Instruction {
    Instruction::Measurement(Measurement::new(
        Qubit::Fixed(qubit),
        Some(MemoryReference::new(READOUT_REGISTER.to_string(), 0)),
    ))
}

/// Build a program which updates the reference frame from `parameter[0]` before applying the
/// reference gate and measuring.
fn parametric_program(
    calibration_program: &Program,
    settings: &ProgramSettings,
    parameter: &str,
    update: impl FnOnce(FrameIdentifier, Expression) -> Instruction,
) -> Result<Program> {
    if parameter == READOUT_REGISTER {
        return Err(ExperimentError::ParameterCollision(parameter.to_string()));
    }
    let declaration =
        Declaration::try_new(parameter.to_string(), Vector::new(ScalarType::Real, 1))?;
    let ReferencePulse { gate, frame, .. } = reference_pulse(calibration_program, settings)?;
    let operand = Expression::Address(MemoryReference::new(parameter.to_string(), 0));
    let identifier = frame.identifier.clone();

    let mut program = Program::new();
    program.add_instructions([
        Instruction::FrameDefinition(frame),
        Instruction::Declaration(readout_declaration()),
        Instruction::Declaration(declaration),
        update(identifier, operand),
        Instruction::Gate(gate),
        readout(settings.qubit),
    ]);
    program.wrap_in_numshots_loop(settings.shots);
    Ok(program)
}

/// Build a qubit spectroscopy program: the reference rotation, played after shifting its frame's
/// frequency by the runtime parameter `parameter` (Hz).
///
/// # Errors
///
/// Fails if `parameter` is not a usable memory region name, if the reference gate has no
/// calibration, if that calibration plays no pulse, or if the pulse's frame is not defined.
pub fn spectroscopy_program(
    calibration_program: &Program,
    settings: &ProgramSettings,
    parameter: &str,
) -> Result<Program> {
    let program = parametric_program(calibration_program, settings, parameter, |frame, value| {
        Instruction::ShiftFrequency(ShiftFrequency::new(frame, value))
    })?;
    debug!(qubit = settings.qubit, parameter, "built spectroscopy program");
    Ok(program)
}

/// Build a power Rabi program: the reference rotation, played after setting its frame's scale to
/// the runtime parameter `parameter`.
///
/// # Errors
///
/// As for [`spectroscopy_program`].
pub fn power_rabi_program(
    calibration_program: &Program,
    settings: &ProgramSettings,
    parameter: &str,
) -> Result<Program> {
    let program = parametric_program(calibration_program, settings, parameter, |frame, value| {
        Instruction::SetScale(SetScale::new(frame, value))
    })?;
    debug!(qubit = settings.qubit, parameter, "built power Rabi program");
    Ok(program)
}

/// Build a time Rabi program: the reference pulse alone, with its duration replaced by
/// `duration` (seconds) aligned to the frame's sample rate.
///
/// Waveform durations cannot be runtime parameters, so a sweep over durations builds and
/// compiles one program per duration.
///
/// # Errors
///
/// Besides the failures of [`spectroscopy_program`], fails if `duration` is negative or not
/// finite, or if the frame has no positive, finite `SAMPLE-RATE`.
pub fn time_rabi_program(
    calibration_program: &Program,
    settings: &ProgramSettings,
    duration: f64,
) -> Result<Program> {
    if !duration.is_finite() || duration < 0.0 {
        return Err(ExperimentError::InvalidDuration(duration));
    }
    let ReferencePulse {
        mut pulse, frame, ..
    } = reference_pulse(calibration_program, settings)?;

    let sample_rate = frame
        .sample_rate()
        .map_err(|error| ExperimentError::InvalidSampleRate {
            frame: frame.identifier.clone(),
            reason: error.to_string(),
        })?;
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(ExperimentError::InvalidSampleRate {
            frame: frame.identifier,
            reason: format!("{sample_rate} Hz is not a positive, finite rate"),
        });
    }

    let aligned = aligned_duration(duration, sample_rate);
    if !aligned.is_finite() {
        return Err(ExperimentError::InvalidDuration(duration));
    }
    pulse.waveform.set_duration(aligned);

    let mut program = Program::new();
    program.add_instructions([
        Instruction::FrameDefinition(frame),
        Instruction::Declaration(readout_declaration()),
        Instruction::Pulse(pulse),
        readout(settings.qubit),
    ]);
    program.wrap_in_numshots_loop(settings.shots);
    debug!(
        qubit = settings.qubit,
        requested = duration,
        duration = aligned,
        "built time Rabi program"
    );
    Ok(program)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::str::FromStr;

    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::instruction::{SetPhase, WaveformInvocation};

    const CALIBRATIONS: &str = r#"DEFFRAME 0 "rf":
    DIRECTION: "tx"
    INITIAL-FREQUENCY: 5000000000
    CENTER-FREQUENCY: 5000000000
    HARDWARE-OBJECT: "q0_rf"
    SAMPLE-RATE: 1000000000
DEFFRAME 0 "ro_rx":
    DIRECTION: "rx"
    INITIAL-FREQUENCY: 7200000000
    SAMPLE-RATE: 1000000000
DEFFRAME 1 "rf":
    DIRECTION: "tx"
    INITIAL-FREQUENCY: 5200000000
    HARDWARE-OBJECT: "q1_rf"
DEFCAL RX(pi/2) 0:
    FENCE 0
    NONBLOCKING PULSE 0 "rf" drag_gaussian(duration: 6e-8, fwhm: 1.5e-8, scale: 0.16, t0: 3e-8)
    FENCE 0
DEFCAL RX(pi/2) 1:
    NONBLOCKING PULSE 1 "rf" drag_gaussian(duration: 6e-8, scale: 0.2)
DEFCAL RX(pi/2) 2:
    FENCE 2
DEFCAL RX(pi/2) 3:
    NONBLOCKING PULSE 3 "rf" flat(duration: 6e-8, iq: 1)
DEFCAL MEASURE 0 addr:
    CAPTURE 0 "ro_rx" boxcar_kernel(duration: 2e-6) addr
"#;

    #[fixture]
    fn calibrations() -> Program {
        Program::from_str(CALIBRATIONS).unwrap()
    }

    fn rf(qubit: u64) -> FrameIdentifier {
        FrameIdentifier::new("rf".to_string(), vec![Qubit::Fixed(qubit)])
    }

    fn pulse(name: &str) -> Instruction {
        Instruction::Pulse(Pulse::new(
            true,
            rf(0),
            WaveformInvocation::new(name.to_string(), HashMap::new()),
        ))
    }

    #[test]
    fn find_pulse_returns_the_first_pulse() {
        let instructions = vec![
            Instruction::SetPhase(SetPhase::new(rf(0), Expression::from(0.0))),
            pulse("first"),
            pulse("second"),
        ];
        assert_eq!(
            find_pulse(&instructions).map(|pulse| pulse.waveform.name.as_str()),
            Some("first")
        );
    }

    #[test]
    fn find_pulse_without_pulses() {
        assert_eq!(find_pulse(&[]), None);
        let instructions = vec![Instruction::SetPhase(SetPhase::new(
            rf(0),
            Expression::from(0.0),
        ))];
        assert_eq!(find_pulse(&instructions), None);
    }

    #[rstest]
    fn spectroscopy(calibrations: Program) {
        let program =
            spectroscopy_program(&calibrations, &ProgramSettings::new(0), "detuning").unwrap();
        assert_eq!(program.num_shots(), DEFAULT_SHOTS);
        assert_eq!(program.frames.len(), 1);
        assert_snapshot!(program.to_quil().unwrap(), @r###"
        DEFFRAME 0 "rf":
            DIRECTION: "tx"
            INITIAL-FREQUENCY: 5000000000
            CENTER-FREQUENCY: 5000000000
            HARDWARE-OBJECT: "q0_rf"
            SAMPLE-RATE: 1000000000
        DECLARE ro BIT[1]
        DECLARE detuning REAL[1]
        SHIFT-FREQUENCY 0 "rf" detuning[0]
        RX(pi/2) 0
        MEASURE 0 ro[0]
        "###);
    }

    #[rstest]
    fn power_rabi(calibrations: Program) {
        let settings = ProgramSettings::new(1).with_shots(250);
        let program = power_rabi_program(&calibrations, &settings, "scale").unwrap();
        assert_eq!(program.num_shots(), 250);
        assert_eq!(
            program.body_instructions().next(),
            Some(&Instruction::SetScale(SetScale::new(
                rf(1),
                Expression::Address(MemoryReference::new("scale".to_string(), 0)),
            )))
        );
        assert_eq!(
            program.memory_regions.keys().collect::<Vec<_>>(),
            vec!["ro", "scale"]
        );
    }

    #[rstest]
    fn parametric_builders_are_idempotent(calibrations: Program) {
        let settings = ProgramSettings::default();
        assert_eq!(
            spectroscopy_program(&calibrations, &settings, "freq").unwrap(),
            spectroscopy_program(&calibrations, &settings, "freq").unwrap()
        );
        assert_eq!(
            power_rabi_program(&calibrations, &settings, "amp").unwrap(),
            power_rabi_program(&calibrations, &settings, "amp").unwrap()
        );
    }

    #[rstest]
    fn time_rabi(calibrations: Program) {
        let program = time_rabi_program(&calibrations, &ProgramSettings::new(0), 1e-8).unwrap();
        assert_snapshot!(program.to_quil().unwrap(), @r###"
        DEFFRAME 0 "rf":
            DIRECTION: "tx"
            INITIAL-FREQUENCY: 5000000000
            CENTER-FREQUENCY: 5000000000
            HARDWARE-OBJECT: "q0_rf"
            SAMPLE-RATE: 1000000000
        DECLARE ro BIT[1]
        NONBLOCKING PULSE 0 "rf" drag_gaussian(duration: 8e-9, fwhm: 1.5e-8, scale: 0.16, t0: 3e-8)
        MEASURE 0 ro[0]
        "###);
    }

    #[rstest]
    #[case::exact(1.6e-8, 1e9, 1.6e-8)]
    #[case::half_rounds_down_to_even(1e-8, 1e9, 8e-9)]
    #[case::half_rounds_up_to_even(6e-9, 1e9, 8e-9)]
    #[case::below_half(5e-9, 1e9, 4e-9)]
    #[case::zero(0.0, 1e9, 0.0)]
    fn alignment(#[case] duration: f64, #[case] sample_rate: f64, #[case] expected: f64) {
        approx::assert_relative_eq!(aligned_duration(duration, sample_rate), expected);
    }

    #[rstest]
    #[case::no_calibration(5)]
    #[case::no_pulse(2)]
    #[case::undefined_frame(3)]
    #[case::no_sample_rate(1)]
    fn builder_failures(calibrations: Program, #[case] qubit: u64) {
        let settings = ProgramSettings::new(qubit);
        let error = time_rabi_program(&calibrations, &settings, 4e-8).unwrap_err();
        match qubit {
            5 => assert!(matches!(error, ExperimentError::MissingCalibration(_))),
            2 => assert!(matches!(error, ExperimentError::MissingPulse(_))),
            3 => assert!(
                matches!(error, ExperimentError::UndefinedFrame(frame) if frame == rf(3))
            ),
            _ => assert!(matches!(error, ExperimentError::InvalidSampleRate { .. })),
        }
    }

    #[rstest]
    #[case::negative(-1e-9)]
    #[case::not_finite(f64::NAN)]
    #[case::overflows_when_aligned(1e300)]
    fn invalid_durations(calibrations: Program, #[case] duration: f64) {
        assert!(matches!(
            time_rabi_program(&calibrations, &ProgramSettings::new(0), duration),
            Err(ExperimentError::InvalidDuration(_))
        ));
    }

    #[rstest]
    #[case::reserved("pi")]
    #[case::malformed("2fast")]
    #[case::readout("ro")]
    fn invalid_parameter_names(calibrations: Program, #[case] parameter: &str) {
        let error =
            spectroscopy_program(&calibrations, &ProgramSettings::new(0), parameter).unwrap_err();
        assert!(matches!(
            error,
            ExperimentError::InvalidParameter(_) | ExperimentError::ParameterCollision(_)
        ));
    }

    proptest! {
        #[test]
        fn aligned_durations_are_whole_sample_blocks(
            duration in 0.0..1e-5f64,
            sample_rate in prop::sample::select(vec![5e8, 1e9, 2e9, 1.25e8]),
        ) {
            let aligned = aligned_duration(duration, sample_rate);
            let blocks = aligned * sample_rate / SAMPLE_ALIGNMENT;
            prop_assert!((blocks - blocks.round()).abs() < 1e-6);
            prop_assert!((aligned - duration).abs() <= SAMPLE_ALIGNMENT / sample_rate / 2.0 + 1e-15);
        }
    }
}
