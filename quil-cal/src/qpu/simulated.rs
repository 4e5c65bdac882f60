//! An in-process QPU: independent two-level qubits driven by the pulses of a Quil-T program.

use std::collections::HashMap;
use std::str::FromStr;

use ndarray as nd;
use num_complex::Complex64 as C64;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{Executable, ExecutionData, Qpu, QpuError, Result};
use crate::expression::Expression;
use crate::instruction::{
    attribute, real_attribute, Capture, FrameIdentifier, Instruction, Measurement,
    MemoryReference, Pulse, Qubit, ScalarType, SetFrequency, SetPhase, SetScale, ShiftFrequency,
    ShiftPhase, WaveformInvocation,
};
use crate::program::{Program, ProgramError};
use crate::quil::Quil;
use crate::units::{Cycles, Radians};

/// The frame on which pulses drive a qubit's transition.
pub const DRIVE_FRAME: &str = "rf";
/// The frame on which readout results are captured.
pub const READOUT_FRAME: &str = "ro_rx";
const READOUT_TONE_FRAME: &str = "ro_tx";

const SAMPLE_RATE: f64 = 1e9;
const READOUT_FREQUENCY: f64 = 7.2e9;
const ROTATION_DURATION: f64 = 6e-8;
const READOUT_DURATION: f64 = 2e-6;

const SCALE_PARAMETER: &str = "scale";
const PHASE_PARAMETER: &str = "phase";

/// Physical parameters of one simulated qubit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QubitModel {
    /// Frequency, in Hz, of the qubit's transition.
    pub resonance_frequency: f64,
    /// Rabi frequency, in Hz, under a drive of unit amplitude.
    pub rabi_rate: f64,
    /// Probability that readout reports the state the qubit was found in.
    pub readout_fidelity: f64,
    /// How far, in Hz, the calibrated drive frequency sits from the true resonance.
    #[serde(default)]
    pub calibration_detuning: f64,
}

impl Default for QubitModel {
    fn default() -> Self {
        Self {
            resonance_frequency: 5e9,
            rabi_rate: 25e6,
            readout_fidelity: 0.97,
            calibration_detuning: 0.0,
        }
    }
}

impl QubitModel {
    /// The waveform scale for which a calibrated pulse rotates the qubit by `turns`.
    fn calibrated_scale(&self, turns: f64) -> f64 {
        turns / (self.rabi_rate * ROTATION_DURATION)
    }
}

/// A simulated QPU with a seeded random number generator, so that runs are reproducible.
#[derive(Clone, Debug)]
pub struct SimulatedQpu {
    name: String,
    qubits: Vec<QubitModel>,
    calibration_program: Program,
    rng: StdRng,
}

impl SimulatedQpu {
    /// Build a QPU whose qubit `n` is described by `qubits[n]`, with calibrations derived from
    /// those models. Without a `seed`, the generator is seeded from entropy.
    pub fn new(qubits: Vec<QubitModel>, seed: Option<u64>) -> Result<Self> {
        let calibration_program = default_calibration_program(&qubits)?;
        let rng = seed
            .map(StdRng::seed_from_u64)
            .unwrap_or_else(StdRng::from_entropy);
        Ok(Self {
            name: "simulated-qpu".to_string(),
            qubits,
            calibration_program,
            rng,
        })
    }

    /// Replace the QPU's calibrations.
    pub fn with_calibration_program(mut self, calibration_program: Program) -> Self {
        self.calibration_program = calibration_program;
        self
    }

    pub fn qubits(&self) -> &[QubitModel] {
        &self.qubits
    }

    /// The single fixed qubit that an instruction acts on, if it is one this QPU has.
    fn target_qubit(&self, instruction: &Instruction) -> Result<usize> {
        match instruction.get_qubits().as_slice() {
            [Qubit::Fixed(index)] if (*index as usize) < self.qubits.len() => Ok(*index as usize),
            _ => Err(QpuError::UnsupportedInstruction(instruction.clone())),
        }
    }

    fn check_instruction(&self, program: &Program, instruction: &Instruction) -> Result<()> {
        if let Some(frame) = instruction.frame() {
            if program.frames.get(frame).is_none() {
                return Err(QpuError::UndefinedFrame(frame.clone()));
            }
        }
        match instruction {
            Instruction::Gate(_) => Err(QpuError::MissingCalibration(instruction.clone())),
            Instruction::Capture(_)
            | Instruction::Measurement(_)
            | Instruction::Pulse(_)
            | Instruction::SetFrequency(_)
            | Instruction::SetPhase(_)
            | Instruction::SetScale(_)
            | Instruction::ShiftFrequency(_)
            | Instruction::ShiftPhase(_) => self.target_qubit(instruction).map(|_| ()),
            Instruction::Delay(_) | Instruction::Fence(_) | Instruction::Pragma(_) => Ok(()),
            Instruction::CalibrationDefinition(_)
            | Instruction::Declaration(_)
            | Instruction::FrameDefinition(_)
            | Instruction::MeasureCalibrationDefinition(_) => {
                Err(QpuError::UnsupportedInstruction(instruction.clone()))
            }
        }
    }

    /// Resolve the program into the rotations and readouts it performs. Frame updates are the
    /// same in every shot, so they are folded in here once.
    fn schedule(&self, executable: &Executable) -> Result<Vec<Operation>> {
        let program = executable.program();
        let mut frames: HashMap<FrameIdentifier, FrameState> = HashMap::new();
        let mut operations = Vec::new();

        for instruction in program.body_instructions() {
            match instruction {
                Instruction::SetFrequency(SetFrequency { frame, frequency }) => {
                    frame_state(&mut frames, program, frame)?.frequency =
                        executable.evaluate_real(frequency)?;
                }
                Instruction::ShiftFrequency(ShiftFrequency { frame, frequency }) => {
                    frame_state(&mut frames, program, frame)?.frequency +=
                        executable.evaluate_real(frequency)?;
                }
                Instruction::SetPhase(SetPhase { frame, phase }) => {
                    frame_state(&mut frames, program, frame)?.phase =
                        executable.evaluate_real(phase)?;
                }
                Instruction::ShiftPhase(ShiftPhase { frame, phase }) => {
                    frame_state(&mut frames, program, frame)?.phase +=
                        executable.evaluate_real(phase)?;
                }
                Instruction::SetScale(SetScale { frame, scale }) => {
                    frame_state(&mut frames, program, frame)?.scale =
                        executable.evaluate_real(scale)?;
                }
                Instruction::Pulse(Pulse {
                    frame, waveform, ..
                }) if frame.name == DRIVE_FRAME => {
                    let qubit = self.target_qubit(instruction)?;
                    let state = *frame_state(&mut frames, program, frame)?;
                    let unitary =
                        self.pulse_unitary(executable, &self.qubits[qubit], frame, &state, waveform)?;
                    operations.push(Operation::Rotate { qubit, unitary });
                }
                Instruction::Capture(Capture {
                    memory_reference, ..
                }) => {
                    operations.push(Operation::Readout {
                        qubit: self.target_qubit(instruction)?,
                        target: Some(memory_reference.clone()),
                    });
                }
                Instruction::Measurement(Measurement { target, .. }) => {
                    operations.push(Operation::Readout {
                        qubit: self.target_qubit(instruction)?,
                        target: target.clone(),
                    });
                }
                Instruction::Pulse(_)
                | Instruction::Delay(_)
                | Instruction::Fence(_)
                | Instruction::Pragma(_) => {}
                other => return Err(QpuError::UnsupportedInstruction(other.clone())),
            }
        }

        Ok(operations)
    }

    fn pulse_unitary(
        &self,
        executable: &Executable,
        model: &QubitModel,
        frame: &FrameIdentifier,
        state: &FrameState,
        waveform: &WaveformInvocation,
    ) -> Result<nd::Array2<C64>> {
        let duration = waveform
            .duration()
            .ok_or_else(|| QpuError::MissingDuration(frame.clone()))??;
        let parameter = |name: &str, default: f64| {
            waveform
                .parameters
                .get(name)
                .map_or(Ok(default), |expression| executable.evaluate_real(expression))
        };
        let amplitude = state.scale * parameter(SCALE_PARAMETER, 1.0)?;
        let phase = state.phase + parameter(PHASE_PARAMETER, 0.0)?;
        let detuning = state.frequency - model.resonance_frequency;
        Ok(drive_unitary(
            model.rabi_rate * amplitude,
            detuning,
            phase,
            duration,
        ))
    }
}

impl Qpu for SimulatedQpu {
    fn name(&self) -> &str {
        &self.name
    }

    fn calibration_program(&self) -> Result<Program> {
        Ok(self.calibration_program.clone())
    }

    /// Combine the program with the QPU's calibrations and expand every gate and measurement.
    fn compile(&self, program: &Program) -> Result<Executable> {
        let mut combined = self.calibration_program.clone_without_body_instructions();
        combined.frames.merge(program.frames.clone());
        combined.calibrations.extend(program.calibrations.clone());
        combined
            .memory_regions
            .extend(program.memory_regions.clone());
        combined.add_instructions(program.body_instructions().cloned());
        combined.wrap_in_numshots_loop(program.num_shots());

        let expanded = combined.expand_calibrations()?;
        for instruction in expanded.body_instructions() {
            self.check_instruction(&expanded, instruction)?;
            let accesses = instruction.get_memory_accesses();
            if let Some(name) = accesses
                .captures
                .iter()
                .chain(&accesses.reads)
                .find(|name| !expanded.memory_regions.contains_key(*name))
            {
                return Err(QpuError::UndeclaredRegion(name.clone()));
            }
            if let Some(target) = readout_target(instruction) {
                let length = expanded
                    .memory_regions
                    .get(&target.name)
                    .map_or(0, |region| region.size.length);
                if target.index >= length {
                    return Err(QpuError::IndexOutOfRange {
                        reference: target.clone(),
                        length,
                    });
                }
            }
        }

        tracing::debug!(
            qpu = %self.name,
            instructions = expanded.body_instructions().count(),
            shots = expanded.num_shots(),
            "compiled program"
        );
        Ok(Executable::new(expanded))
    }

    fn run(&mut self, executable: &Executable) -> Result<ExecutionData> {
        executable.check_parameters()?;
        let operations = self.schedule(executable)?;
        let program = executable.program();
        let shots = program.num_shots() as usize;

        let readout_regions: Vec<(&String, usize)> = program
            .memory_regions
            .iter()
            .filter(|(_, region)| region.size.data_type != ScalarType::Real)
            .map(|(name, region)| (name, region.size.length as usize))
            .collect();
        let mut registers: HashMap<String, Vec<Vec<u8>>> = readout_regions
            .iter()
            .map(|(name, _)| ((*name).clone(), Vec::with_capacity(shots)))
            .collect();

        for _ in 0..shots {
            let mut states = vec![ground_state(); self.qubits.len()];
            let mut rows: HashMap<&str, Vec<u8>> = readout_regions
                .iter()
                .map(|(name, length)| (name.as_str(), vec![0; *length]))
                .collect();

            for operation in &operations {
                match operation {
                    Operation::Rotate { qubit, unitary } => {
                        states[*qubit] = unitary.dot(&states[*qubit]);
                    }
                    Operation::Readout { qubit, target } => {
                        let outcome =
                            read_out(&mut self.rng, &self.qubits[*qubit], &mut states[*qubit]);
                        let Some(target) = target else {
                            continue;
                        };
                        if let Some(slot) = rows
                            .get_mut(target.name.as_str())
                            .and_then(|row| row.get_mut(target.index as usize))
                        {
                            *slot = outcome;
                        }
                    }
                }
            }

            for (name, row) in rows {
                if let Some(register) = registers.get_mut(name) {
                    register.push(row);
                }
            }
        }

        tracing::trace!(qpu = %self.name, shots, "ran program");
        Ok(ExecutionData { registers })
    }
}

/// Where an instruction writes a readout result, if it does.
fn readout_target(instruction: &Instruction) -> Option<&MemoryReference> {
    match instruction {
        Instruction::Measurement(Measurement {
            target: Some(target),
            ..
        }) => Some(target),
        Instruction::Capture(capture) => Some(&capture.memory_reference),
        _ => None,
    }
}

/// One step of a shot.
#[derive(Clone, Debug)]
enum Operation {
    Rotate {
        qubit: usize,
        unitary: nd::Array2<C64>,
    },
    Readout {
        qubit: usize,
        target: Option<MemoryReference>,
    },
}

/// The accumulated frequency, phase and amplitude scale of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct FrameState {
    frequency: f64,
    phase: f64,
    scale: f64,
}

fn frame_state<'f>(
    frames: &'f mut HashMap<FrameIdentifier, FrameState>,
    program: &Program,
    frame: &FrameIdentifier,
) -> Result<&'f mut FrameState> {
    if !frames.contains_key(frame) {
        let attributes = program
            .frames
            .get(frame)
            .ok_or_else(|| QpuError::UndefinedFrame(frame.clone()))?;
        let frequency = real_attribute(attributes, attribute::INITIAL_FREQUENCY)?;
        frames.insert(
            frame.clone(),
            FrameState {
                frequency,
                phase: 0.0,
                scale: 1.0,
            },
        );
    }
    frames
        .get_mut(frame)
        .ok_or_else(|| QpuError::UndefinedFrame(frame.clone()))
}

fn ground_state() -> nd::Array1<C64> {
    nd::array![C64::new(1.0, 0.0), C64::new(0.0, 0.0)]
}

fn excited_state() -> nd::Array1<C64> {
    nd::array![C64::new(0.0, 0.0), C64::new(1.0, 0.0)]
}

/// The evolution under a constant drive of Rabi frequency `rabi_frequency` (Hz), detuned from
/// the qubit by `detuning` (Hz), about an axis at `phase` radians in the XY plane.
pub(crate) fn drive_unitary(
    rabi_frequency: f64,
    detuning: f64,
    phase: f64,
    duration: f64,
) -> nd::Array2<C64> {
    let effective = rabi_frequency.hypot(detuning);
    if effective == 0.0 {
        return nd::Array2::eye(2);
    }
    let Radians(half_angle) = Cycles(effective * duration / 2.0).into();
    let (cos, sin) = (half_angle.cos(), half_angle.sin());
    let nx = rabi_frequency * phase.cos() / effective;
    let ny = rabi_frequency * phase.sin() / effective;
    let nz = detuning / effective;
    let i = C64::i();
    nd::array![
        [C64::new(cos, 0.0) - i * sin * nz, -i * sin * C64::new(nx, -ny)],
        [-i * sin * C64::new(nx, ny), C64::new(cos, 0.0) + i * sin * nz],
    ]
}

/// Sample a projective measurement of `state`, collapse it, and report the outcome through a
/// readout which is right with probability `readout_fidelity`.
fn read_out(rng: &mut StdRng, model: &QubitModel, state: &mut nd::Array1<C64>) -> u8 {
    let excited_population = state[1].norm_sqr() / state.iter().map(C64::norm_sqr).sum::<f64>();
    let excited = rng.gen::<f64>() < excited_population;
    *state = if excited {
        excited_state()
    } else {
        ground_state()
    };
    let faithful = rng.gen::<f64>() < model.readout_fidelity;
    u8::from(excited == faithful)
}

fn number(value: f64) -> String {
    Expression::from(value).to_quil_or_debug()
}

/// Frames and calibrations for a QPU built from `qubits`: a drive frame and readout frames on
/// each qubit, `RX` rotations by quarter and half turns, `RZ`, and `MEASURE`.
fn default_calibration_program(
    qubits: &[QubitModel],
) -> std::result::Result<Program, ProgramError> {
    let mut text = String::new();
    for (qubit, model) in qubits.iter().enumerate() {
        let drive_frequency = number(model.resonance_frequency + model.calibration_detuning);
        let half_pi_scale = number(model.calibrated_scale(0.25));
        let pi_scale = number(model.calibrated_scale(0.5));
        let sample_rate = number(SAMPLE_RATE);
        let readout_frequency = number(READOUT_FREQUENCY);
        let rotation_duration = number(ROTATION_DURATION);
        let readout_duration = number(READOUT_DURATION);

        for (frame, direction, frequency) in [
            (DRIVE_FRAME, "tx", &drive_frequency),
            (READOUT_TONE_FRAME, "tx", &readout_frequency),
            (READOUT_FRAME, "rx", &readout_frequency),
        ] {
            text.push_str(&format!(
                concat!(
                    "DEFFRAME {qubit} \"{frame}\":\n",
                    "    DIRECTION: \"{direction}\"\n",
                    "    INITIAL-FREQUENCY: {frequency}\n",
                    "    CENTER-FREQUENCY: {frequency}\n",
                    "    HARDWARE-OBJECT: \"q{qubit}_{frame}\"\n",
                    "    SAMPLE-RATE: {sample_rate}\n",
                ),
                qubit = qubit,
                frame = frame,
                direction = direction,
                frequency = frequency,
                sample_rate = sample_rate,
            ));
        }

        for (angle, phase, scale) in [
            ("pi/2", "", &half_pi_scale),
            ("-pi/2", "phase: pi, ", &half_pi_scale),
            ("pi", "", &pi_scale),
        ] {
            text.push_str(&format!(
                concat!(
                    "DEFCAL RX({angle}) {qubit}:\n",
                    "    FENCE {qubit}\n",
                    "    NONBLOCKING PULSE {qubit} \"{frame}\" ",
                    "drag_gaussian(duration: {duration}, {phase}scale: {scale})\n",
                    "    FENCE {qubit}\n",
                ),
                angle = angle,
                qubit = qubit,
                frame = DRIVE_FRAME,
                duration = rotation_duration,
                phase = phase,
                scale = scale,
            ));
        }

        text.push_str(&format!(
            concat!(
                "DEFCAL RZ(%theta) {qubit}:\n",
                "    SHIFT-PHASE {qubit} \"{drive}\" -%theta\n",
                "DEFCAL MEASURE {qubit} addr:\n",
                "    FENCE {qubit}\n",
                "    NONBLOCKING PULSE {qubit} \"{tone}\" flat(duration: {duration}, iq: 1)\n",
                "    CAPTURE {qubit} \"{readout}\" boxcar_kernel(duration: {duration}) addr\n",
            ),
            qubit = qubit,
            drive = DRIVE_FRAME,
            tone = READOUT_TONE_FRAME,
            readout = READOUT_FRAME,
            duration = readout_duration,
        ));
    }
    Program::from_str(&text)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use approx::assert_relative_eq;
    use num_complex::Complex64 as C64;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::{drive_unitary, QubitModel, SimulatedQpu, DRIVE_FRAME};
    use crate::experiment::find_pulse;
    use crate::instruction::{FrameIdentifier, Gate, MemoryReference, Qubit};
    use crate::program::Program;
    use crate::qpu::{Qpu, QpuError};
    use crate::quil::Quil;

    fn ideal_qpu() -> SimulatedQpu {
        let model = QubitModel {
            readout_fidelity: 1.0,
            ..QubitModel::default()
        };
        SimulatedQpu::new(vec![model.clone(), model], Some(7)).unwrap()
    }

    fn success_probability(qpu: &mut SimulatedQpu, text: &str) -> f64 {
        let mut program = Program::from_str(text).unwrap();
        program.wrap_in_numshots_loop(2000);
        let executable = qpu.compile(&program).unwrap();
        qpu.run(&executable)
            .unwrap()
            .success_probability("ro")
            .unwrap()
    }

    #[test]
    fn calibrations_cover_every_qubit() {
        let program = ideal_qpu().calibration_program().unwrap();
        assert_eq!(program.frames.len(), 6);
        for qubit in 0..2 {
            let gate = Gate::new(
                "RX",
                vec![crate::expression::Expression::from_str("pi/2").unwrap()],
                vec![Qubit::Fixed(qubit)],
            )
            .unwrap();
            let calibration = program.calibrations.get_match_for_gate(&gate).unwrap();
            let pulse = find_pulse(&calibration.instructions).unwrap();
            assert_eq!(
                pulse.frame,
                FrameIdentifier::new(DRIVE_FRAME.to_string(), vec![Qubit::Fixed(qubit)])
            );
            assert_eq!(
                program.frames.get_definition(&pulse.frame).unwrap().sample_rate(),
                Ok(1e9)
            );
        }
    }

    #[test]
    fn calibration_program_text_round_trips() {
        let program = ideal_qpu().calibration_program().unwrap();
        let text = program.to_quil().unwrap();
        assert!(
            text.contains("    CAPTURE 1 \"ro_rx\" boxcar_kernel(duration: 2e-6) addr"),
            "{text}"
        );
        assert!(!text.contains("addr["), "{text}");
        assert_eq!(Program::from_str(&text).unwrap(), program);
    }

    #[test]
    fn calibrated_rotations() {
        let mut qpu = ideal_qpu();
        assert_eq!(
            success_probability(&mut qpu, "DECLARE ro BIT[1]\nMEASURE 0 ro[0]\n"),
            0.0
        );
        assert_eq!(
            success_probability(&mut qpu, "DECLARE ro BIT[1]\nRX(pi) 1\nMEASURE 1 ro[0]\n"),
            1.0
        );
        assert_eq!(
            success_probability(
                &mut qpu,
                "DECLARE ro BIT[1]\nRX(pi/2) 0\nRX(-pi/2) 0\nMEASURE 0 ro[0]\n"
            ),
            0.0
        );
        let half = success_probability(&mut qpu, "DECLARE ro BIT[1]\nRX(pi/2) 0\nMEASURE 0 ro[0]\n");
        assert!((half - 0.5).abs() < 0.05, "{half}");
    }

    #[test]
    fn seeded_runs_repeat() {
        let text = "DECLARE ro BIT[1]\nRX(pi/2) 0\nMEASURE 0 ro[0]\n";
        let first = success_probability(&mut ideal_qpu(), text);
        let second = success_probability(&mut ideal_qpu(), text);
        assert_eq!(first, second);
    }

    #[test]
    fn compile_rejects_uncalibrated_gates() {
        let program = Program::from_str("H 0\n").unwrap();
        assert!(matches!(
            ideal_qpu().compile(&program),
            Err(QpuError::MissingCalibration(_))
        ));
    }

    #[test]
    fn compile_rejects_unknown_qubits() {
        let program = Program::from_str("DECLARE ro BIT[1]\nMEASURE 5 ro[0]\n").unwrap();
        assert!(matches!(
            ideal_qpu().compile(&program),
            Err(QpuError::UnsupportedInstruction(_))
        ));
    }

    #[rstest]
    #[case::measurement("DECLARE ro BIT[1]\nRX(pi) 0\nMEASURE 0 ro[3]\n", "ro", 3)]
    #[case::capture(
        "DECLARE iq BIT[2]\nCAPTURE 0 \"ro_rx\" boxcar_kernel(duration: 1e-6) iq[2]\n",
        "iq",
        2
    )]
    fn compile_rejects_readout_past_the_region(
        #[case] text: &str,
        #[case] name: &str,
        #[case] index: u64,
    ) {
        let program = Program::from_str(text).unwrap();
        match ideal_qpu().compile(&program) {
            Err(QpuError::IndexOutOfRange { reference, .. }) => {
                assert_eq!(reference, MemoryReference::new(name.to_string(), index));
            }
            other => panic!("expected an out-of-range readout, found {other:?}"),
        }
    }

    #[test]
    fn run_requires_parameters() {
        let mut qpu = ideal_qpu();
        let program = Program::from_str(
            "DECLARE ro BIT[1]\nDECLARE scale REAL[1]\nSET-SCALE 0 \"rf\" scale[0]\nMEASURE 0 ro[0]\n",
        )
        .unwrap();
        let executable = qpu.compile(&program).unwrap();
        assert!(matches!(
            qpu.run(&executable),
            Err(QpuError::UnsetParameter(name)) if name == "scale"
        ));
    }

    proptest! {
        #[test]
        fn drive_is_unitary(
            rabi in 0.0..1e8f64,
            detuning in -1e8..1e8f64,
            phase in -10.0..10.0f64,
            duration in 0.0..1e-6f64,
        ) {
            let u = drive_unitary(rabi, detuning, phase, duration);
            let product = u.t().mapv(|value: C64| value.conj()).dot(&u);
            assert_relative_eq!(product[[0, 0]].re, 1.0, epsilon = 1e-9);
            assert_relative_eq!(product[[1, 1]].re, 1.0, epsilon = 1e-9);
            assert_relative_eq!(product[[0, 1]].norm(), 0.0, epsilon = 1e-9);
        }
    }
}
