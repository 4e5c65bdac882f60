//! Running experiments over a range of parameter values.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use super::{
    power_rabi_program, spectroscopy_program, time_rabi_program, ProgramSettings, Result,
    READOUT_REGISTER,
};
use crate::instruction::Instruction;
use crate::program::Program;
use crate::qpu::Qpu;

/// `count` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    ndarray::Array1::linspace(start, stop, count).to_vec()
}

/// The measured success probability at one value of the swept quantity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: f64,
    pub success_probability: f64,
}

/// The values an experiment sweeps over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepRange {
    /// The runtime parameter to declare. Time Rabi sweeps declare none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    pub start: f64,
    pub stop: f64,
    pub points: usize,
}

impl SweepRange {
    pub fn new(start: f64, stop: f64, points: usize) -> Self {
        Self {
            parameter: None,
            start,
            stop,
            points,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        linspace(self.start, self.stop, self.points)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Experiment {
    /// Sweep the drive frequency around the calibrated one, in Hz.
    Spectroscopy,
    /// Sweep the drive amplitude, as a frame scale.
    PowerRabi,
    /// Sweep the pulse duration, in seconds.
    TimeRabi,
}

impl Experiment {
    /// The name of the runtime parameter this experiment declares when none is configured.
    pub fn default_parameter(self) -> &'static str {
        match self {
            Experiment::Spectroscopy => "detuning",
            Experiment::PowerRabi => "scale",
            Experiment::TimeRabi => "duration",
        }
    }

    fn parameter(self, range: &SweepRange) -> &str {
        range
            .parameter
            .as_deref()
            .unwrap_or_else(|| self.default_parameter())
    }

    /// The program this experiment runs. Time Rabi programs are built for the start of the range.
    pub fn program(
        self,
        calibration_program: &Program,
        settings: &ProgramSettings,
        range: &SweepRange,
    ) -> Result<Program> {
        match self {
            Experiment::Spectroscopy => {
                spectroscopy_program(calibration_program, settings, self.parameter(range))
            }
            Experiment::PowerRabi => {
                power_rabi_program(calibration_program, settings, self.parameter(range))
            }
            Experiment::TimeRabi => time_rabi_program(calibration_program, settings, range.start),
        }
    }

    /// Run the experiment on `qpu` at every value of `range`, using the QPU's own calibrations.
    pub fn run<Q: Qpu + ?Sized>(
        self,
        qpu: &mut Q,
        settings: &ProgramSettings,
        range: &SweepRange,
    ) -> Result<Vec<SweepPoint>> {
        let calibration_program = qpu.calibration_program()?;
        let values = range.values();
        match self {
            Experiment::TimeRabi => {
                run_time_rabi_sweep(qpu, &calibration_program, settings, &values)
            }
            Experiment::Spectroscopy | Experiment::PowerRabi => {
                let program = self.program(&calibration_program, settings, range)?;
                run_parametric_sweep(qpu, &program, self.parameter(range), &values)
            }
        }
    }
}

/// Compile `program` once, then run it with `parameter[0]` set to each of `values` in turn.
pub fn run_parametric_sweep<Q: Qpu + ?Sized>(
    qpu: &mut Q,
    program: &Program,
    parameter: &str,
    values: &[f64],
) -> Result<Vec<SweepPoint>> {
    let span = info_span!("parametric_sweep", qpu = qpu.name(), parameter, points = values.len());
    let _entered = span.enter();

    let mut executable = qpu.compile(program)?;
    let mut points = Vec::with_capacity(values.len());
    for &value in values {
        executable.write_memory(parameter, vec![value])?;
        let success_probability = qpu
            .run(&executable)?
            .success_probability(READOUT_REGISTER)?;
        debug!(value, success_probability, "measured sweep point");
        points.push(SweepPoint {
            value,
            success_probability,
        });
    }

    info!("sweep finished");
    Ok(points)
}

/// Build, compile and run one time Rabi program per duration. Each point records the aligned
/// duration the program actually played.
pub fn run_time_rabi_sweep<Q: Qpu + ?Sized>(
    qpu: &mut Q,
    calibration_program: &Program,
    settings: &ProgramSettings,
    durations: &[f64],
) -> Result<Vec<SweepPoint>> {
    let span = info_span!(
        "time_rabi_sweep",
        qpu = qpu.name(),
        qubit = settings.qubit,
        points = durations.len()
    );
    let _entered = span.enter();

    let mut points = Vec::with_capacity(durations.len());
    for &duration in durations {
        let program = time_rabi_program(calibration_program, settings, duration)?;
        let value = program
            .body_instructions()
            .find_map(|instruction| match instruction {
                Instruction::Pulse(pulse) => pulse.waveform.duration().and_then(|d| d.ok()),
                _ => None,
            })
            .unwrap_or(duration);
        let executable = qpu.compile(&program)?;
        let success_probability = qpu
            .run(&executable)?
            .success_probability(READOUT_REGISTER)?;
        debug!(value, success_probability, "measured sweep point");
        points.push(SweepPoint {
            value,
            success_probability,
        });
    }

    info!("sweep finished");
    Ok(points)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::experiment::ExperimentError;
    use crate::qpu::{QpuError, QubitModel, SimulatedQpu};

    fn ideal_qpu() -> SimulatedQpu {
        let model = QubitModel {
            readout_fidelity: 1.0,
            ..QubitModel::default()
        };
        SimulatedQpu::new(vec![model], Some(11)).unwrap()
    }

    fn settings() -> ProgramSettings {
        ProgramSettings::new(0).with_shots(2000)
    }

    #[rstest]
    #[case::empty(0.0, 1.0, 0, vec![])]
    #[case::single(0.5, 1.0, 1, vec![0.5])]
    #[case::inclusive(0.0, 1.0, 5, vec![0.0, 0.25, 0.5, 0.75, 1.0])]
    #[case::descending(1.0, -1.0, 3, vec![1.0, 0.0, -1.0])]
    fn linspace_cases(
        #[case] start: f64,
        #[case] stop: f64,
        #[case] count: usize,
        #[case] expected: Vec<f64>,
    ) {
        assert_eq!(linspace(start, stop, count), expected);
    }

    #[test]
    fn experiment_names() {
        let names: Vec<String> = Experiment::iter().map(|e| e.to_string()).collect();
        assert_eq!(names, vec!["spectroscopy", "power-rabi", "time-rabi"]);
        assert_eq!(
            Experiment::from_str("power-rabi").unwrap(),
            Experiment::PowerRabi
        );
    }

    #[test]
    fn power_rabi_sweep() {
        let mut qpu = ideal_qpu();
        let points = Experiment::PowerRabi
            .run(&mut qpu, &settings(), &SweepRange::new(0.0, 2.0, 2))
            .unwrap();
        assert_eq!(
            points,
            vec![
                SweepPoint {
                    value: 0.0,
                    success_probability: 0.0
                },
                SweepPoint {
                    value: 2.0,
                    success_probability: 1.0
                },
            ]
        );
    }

    #[test]
    fn spectroscopy_sweep_peaks_on_resonance() {
        let mut qpu = ideal_qpu();
        let mut range = SweepRange::new(-1e9, 0.0, 2);
        range.parameter = Some("freq".to_string());
        let points = Experiment::Spectroscopy
            .run(&mut qpu, &settings(), &range)
            .unwrap();
        assert!(points[0].success_probability < 0.01);
        assert!((points[1].success_probability - 0.5).abs() < 0.05);
    }

    #[test]
    fn time_rabi_sweep_records_aligned_durations() {
        let mut qpu = ideal_qpu();
        let calibrations = qpu.calibration_program().unwrap();
        let points =
            run_time_rabi_sweep(&mut qpu, &calibrations, &settings(), &[0.0, 1e-8, 1.2e-7])
                .unwrap();
        let durations: Vec<f64> = points.iter().map(|point| point.value).collect();
        assert_relative_eq!(durations[1], 8e-9);
        assert_relative_eq!(durations[2], 1.2e-7);
        assert_eq!(points[0].success_probability, 0.0);
        assert_eq!(points[2].success_probability, 1.0);
    }

    #[test]
    fn parametric_sweep_needs_a_declared_parameter() {
        let mut qpu = ideal_qpu();
        let calibrations = qpu.calibration_program().unwrap();
        let program = spectroscopy_program(&calibrations, &settings(), "detuning").unwrap();
        let error = run_parametric_sweep(&mut qpu, &program, "amplitude", &[0.0]).unwrap_err();
        assert!(matches!(
            error,
            ExperimentError::Qpu(QpuError::UndeclaredRegion(name)) if name == "amplitude"
        ));
    }
}
