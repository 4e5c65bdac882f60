use std::fs;
use std::str::FromStr;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quil_cal::experiment::{
    power_rabi_program, spectroscopy_program, time_rabi_program, ProgramSettings,
};
use quil_cal::experiment::sweep::{linspace, run_parametric_sweep};
use quil_cal::qpu::{Qpu, QubitModel, SimulatedQpu};
use quil_cal::Program;

fn calibrations() -> Program {
    let input = fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/programs/calibrations.quil"
    ))
    .expect("tests/programs/calibrations.quil should exist");
    Program::from_str(&input).expect("calibrations should parse")
}

fn benchmark_calibration_parsing(c: &mut Criterion) {
    let input = fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/programs/calibrations.quil"
    ))
    .expect("tests/programs/calibrations.quil should exist");

    c.bench_function("parse calibration program", |b| {
        b.iter(|| Program::from_str(black_box(&input)))
    });
}

fn benchmark_builders(c: &mut Criterion) {
    let calibrations = calibrations();
    let settings = ProgramSettings::new(0);

    let mut group = c.benchmark_group("build program");
    group.bench_function("spectroscopy", |b| {
        b.iter(|| spectroscopy_program(black_box(&calibrations), &settings, "detuning"))
    });
    group.bench_function("power rabi", |b| {
        b.iter(|| power_rabi_program(black_box(&calibrations), &settings, "scale"))
    });
    group.bench_function("time rabi", |b| {
        b.iter(|| time_rabi_program(black_box(&calibrations), &settings, black_box(1e-7)))
    });
    group.finish();
}

fn benchmark_simulated_sweep(c: &mut Criterion) {
    let mut qpu = SimulatedQpu::new(vec![QubitModel::default()], Some(0))
        .expect("default simulator should build");
    let calibrations = qpu.calibration_program().expect("calibrations are available");
    let settings = ProgramSettings::new(0).with_shots(100);
    let program = power_rabi_program(&calibrations, &settings, "scale")
        .expect("power Rabi program should build");
    let values = linspace(0.0, 2.0, 11);

    let mut group = c.benchmark_group("simulated sweep");
    group.sample_size(20);
    group.bench_function("power rabi, 11 points x 100 shots", |b| {
        b.iter(|| run_parametric_sweep(&mut qpu, &program, "scale", &values))
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_calibration_parsing,
    benchmark_builders,
    benchmark_simulated_sweep
);
criterion_main!(benches);
