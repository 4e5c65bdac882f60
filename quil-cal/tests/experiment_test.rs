use std::fs::read_to_string;
use std::path::PathBuf;
use std::str::FromStr;

use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

use quil_cal::experiment::sweep::SweepRange;
use quil_cal::experiment::{
    power_rabi_program, spectroscopy_program, time_rabi_program, Experiment, ProgramSettings,
};
use quil_cal::instruction::{Instruction, Qubit};
use quil_cal::program::Program;
use quil_cal::qpu::{Qpu, QubitModel, SimulatedQpu};
use quil_cal::quil::Quil;

fn read_program(name: &str) -> Program {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/programs")
        .join(name);
    let text =
        read_to_string(&path).unwrap_or_else(|_| panic!("Should be able to load file: {path:?}"));
    Program::from_str(&text).expect("Should be able to parse test program.")
}

#[fixture]
fn calibrations() -> Program {
    read_program("calibrations.quil")
}

/// Writing a parsed program and reading it back gives the same program.
#[rstest]
fn programs_round_trip(#[files("tests/programs/*.quil")] path: PathBuf) {
    let text = read_to_string(&path).unwrap();
    let program = Program::from_str(&text).unwrap();
    let written = program.to_quil().unwrap();
    assert_eq!(Program::from_str(&written).unwrap(), program);
}

#[rstest]
fn spectroscopy_matches_hand_written_program(calibrations: Program) {
    let program = spectroscopy_program(&calibrations, &ProgramSettings::new(0), "detuning")
        .unwrap();
    let mut expected = read_program("spectroscopy.quil");
    expected.wrap_in_numshots_loop(1000);

    // The builder copies the full frame definition.
    assert_eq!(
        program.frames.get_keys(),
        expected.frames.get_keys()
    );
    assert_eq!(
        program.body_instructions().collect::<Vec<_>>(),
        expected.body_instructions().collect::<Vec<_>>()
    );
    assert_eq!(program.memory_regions, expected.memory_regions);
    assert_eq!(program.num_shots(), 1000);
}

#[rstest]
fn time_rabi_matches_hand_written_program(calibrations: Program) {
    let settings = ProgramSettings::new(0).with_shots(1);
    let program = time_rabi_program(&calibrations, &settings, 2.5e-7).unwrap();
    let pulse = program
        .body_instructions()
        .find_map(|instruction| match instruction {
            Instruction::Pulse(pulse) => Some(pulse),
            _ => None,
        })
        .unwrap();
    // 250 samples is 62.5 blocks of four, which rounds to 62.
    assert_eq!(pulse.waveform.duration(), Some(Ok(2.48e-7)));

    let expected = read_program("time_rabi.quil");
    let expected_pulse = expected.get_instruction(0).unwrap();
    match expected_pulse {
        Instruction::Pulse(expected_pulse) => {
            assert_eq!(pulse.waveform, expected_pulse.waveform);
            assert_eq!(pulse.frame, expected_pulse.frame);
        }
        other => panic!("expected a pulse, found {}", other.to_quil_or_debug()),
    }
}

#[rstest]
fn builders_use_the_qubits_own_frame(calibrations: Program) {
    let program = power_rabi_program(&calibrations, &ProgramSettings::new(1), "amp").unwrap();
    let frames = program.frames.get_keys();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].name, "rf");
    assert_eq!(frames[0].qubits, vec![Qubit::Fixed(1)]);
}

fn simulator(model: QubitModel) -> SimulatedQpu {
    SimulatedQpu::new(vec![model], Some(2024)).unwrap()
}

#[test]
fn spectroscopy_finds_a_miscalibrated_drive() {
    let mut qpu = simulator(QubitModel {
        readout_fidelity: 1.0,
        calibration_detuning: 2e6,
        ..QubitModel::default()
    });
    let settings = ProgramSettings::new(0).with_shots(2000);
    let points = Experiment::Spectroscopy
        .run(&mut qpu, &settings, &SweepRange::new(-2e6, 6e6, 2))
        .unwrap();
    assert!((points[0].success_probability - 0.5).abs() < 0.05);
    assert!(points[1].success_probability < 0.3);
}

#[test]
fn power_rabi_sees_readout_error() {
    let mut qpu = simulator(QubitModel {
        readout_fidelity: 0.9,
        ..QubitModel::default()
    });
    let settings = ProgramSettings::new(0).with_shots(4000);
    let points = Experiment::PowerRabi
        .run(&mut qpu, &settings, &SweepRange::new(0.0, 2.0, 2))
        .unwrap();
    assert!((points[0].success_probability - 0.1).abs() < 0.03);
    assert!((points[1].success_probability - 0.9).abs() < 0.03);
}

#[test]
fn qpu_calibrations_build_every_experiment() {
    let qpu = simulator(QubitModel::default());
    let calibrations = qpu.calibration_program().unwrap();
    for experiment in [
        Experiment::Spectroscopy,
        Experiment::PowerRabi,
        Experiment::TimeRabi,
    ] {
        let program = experiment
            .program(
                &calibrations,
                &ProgramSettings::default(),
                &SweepRange::new(4e-8, 1e-7, 3),
            )
            .unwrap();
        assert!(qpu.compile(&program).is_ok(), "{experiment} did not compile");
    }
}
