//! Experiment configuration.
//!
//! Values are taken from, in increasing priority:
//!
//! 1. built-in defaults,
//! 2. a YAML file (`quil-cal.yaml` in the working directory unless a path is given),
//! 3. `QUIL_CAL_*` environment variables,
//! 4. command-line flags, applied by the caller.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::experiment::sweep::SweepRange;
use crate::experiment::{Experiment, ProgramSettings, DEFAULT_SHOTS};
use crate::expression::Expression;
use crate::qpu::{QpuError, QubitModel, SimulatedQpu};

/// Read when no configuration path is given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "quil-cal.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// The qubit under calibration.
    #[serde(default)]
    pub qubit: u64,

    /// Shots per program run.
    #[serde(default = "default_shots")]
    pub shots: u32,

    /// The rotation whose calibrated pulse experiments are built around.
    #[serde(default = "default_reference_gate")]
    pub reference_gate: String,

    /// The reference rotation's angle, as a Quil expression.
    #[serde(default = "default_reference_angle")]
    pub reference_angle: String,

    #[serde(default = "default_spectroscopy")]
    pub spectroscopy: SweepRange,

    #[serde(default = "default_power_rabi")]
    pub power_rabi: SweepRange,

    #[serde(default = "default_time_rabi")]
    pub time_rabi: SweepRange,

    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            qubit: 0,
            shots: default_shots(),
            reference_gate: default_reference_gate(),
            reference_angle: default_reference_angle(),
            spectroscopy: default_spectroscopy(),
            power_rabi: default_power_rabi(),
            time_rabi: default_time_rabi(),
            simulator: SimulatorConfig::default(),
        }
    }
}

/// The simulated device experiments run on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Seed for readout sampling. Runs are not reproducible without one.
    #[serde(default)]
    pub seed: Option<u64>,

    /// One model per qubit, in qubit order.
    #[serde(default = "default_qubit_models")]
    pub qubits: Vec<QubitModel>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            qubits: default_qubit_models(),
        }
    }
}

impl SimulatorConfig {
    pub fn build(&self) -> std::result::Result<SimulatedQpu, QpuError> {
        SimulatedQpu::new(self.qubits.clone(), self.seed)
    }
}

fn default_shots() -> u32 {
    DEFAULT_SHOTS
}

fn default_reference_gate() -> String {
    "RX".into()
}

fn default_reference_angle() -> String {
    "pi/2".into()
}

fn default_spectroscopy() -> SweepRange {
    SweepRange {
        parameter: Some(Experiment::Spectroscopy.default_parameter().into()),
        ..SweepRange::new(-10e6, 10e6, 41)
    }
}

fn default_power_rabi() -> SweepRange {
    SweepRange {
        parameter: Some(Experiment::PowerRabi.default_parameter().into()),
        ..SweepRange::new(0.0, 2.0, 41)
    }
}

fn default_time_rabi() -> SweepRange {
    SweepRange::new(0.0, 2.4e-7, 41)
}

fn default_qubit_models() -> Vec<QubitModel> {
    vec![QubitModel::default()]
}

impl ExperimentConfig {
    /// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] if no path is given and
    /// that file exists, then apply environment overrides and validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let path = path.or_else(|| default_path.exists().then_some(default_path));

        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                tracing::debug!(path = %path.display(), "read configuration");
                Self::from_yaml_str(&content)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `QUIL_CAL_QUBIT`, `QUIL_CAL_SHOTS` and `QUIL_CAL_SEED`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| env::var(name).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("QUIL_CAL_QUBIT") {
            self.qubit = parse_override("QUIL_CAL_QUBIT", &value)?;
        }
        if let Some(value) = lookup("QUIL_CAL_SHOTS") {
            self.shots = parse_override("QUIL_CAL_SHOTS", &value)?;
        }
        if let Some(value) = lookup("QUIL_CAL_SEED") {
            self.simulator.seed = Some(parse_override("QUIL_CAL_SEED", &value)?);
        }
        Ok(())
    }

    /// Check that the configuration describes something that can run.
    pub fn validate(&self) -> Result<()> {
        if self.shots == 0 {
            return Err(ConfigError::Invalid("shots must be at least 1".into()));
        }
        self.reference_parameters()?;

        for (name, range) in [
            ("spectroscopy", &self.spectroscopy),
            ("power_rabi", &self.power_rabi),
            ("time_rabi", &self.time_rabi),
        ] {
            if range.points == 0 {
                return Err(ConfigError::Invalid(format!("{name} sweeps no points")));
            }
            if !range.start.is_finite() || !range.stop.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} range is not finite")));
            }
        }

        let qubits = &self.simulator.qubits;
        if self.qubit as usize >= qubits.len() {
            return Err(ConfigError::Invalid(format!(
                "qubit {} is not one of the {} simulated qubits",
                self.qubit,
                qubits.len()
            )));
        }
        for (index, model) in qubits.iter().enumerate() {
            if !(0.0..=1.0).contains(&model.readout_fidelity) {
                return Err(ConfigError::Invalid(format!(
                    "qubit {index} readout fidelity must lie between 0 and 1"
                )));
            }
            if !(model.rabi_rate.is_finite() && model.rabi_rate > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "qubit {index} Rabi rate must be positive"
                )));
            }
            if !(model.resonance_frequency.is_finite() && model.calibration_detuning.is_finite())
            {
                return Err(ConfigError::Invalid(format!(
                    "qubit {index} frequencies must be finite"
                )));
            }
        }
        Ok(())
    }

    fn reference_parameters(&self) -> Result<Vec<Expression>> {
        Expression::from_str(&self.reference_angle)
            .map(|angle| vec![angle])
            .map_err(|error| {
                ConfigError::Invalid(format!(
                    "reference angle {:?}: {error}",
                    self.reference_angle
                ))
            })
    }

    /// The settings experiment programs are built with.
    pub fn settings(&self) -> Result<ProgramSettings> {
        Ok(ProgramSettings {
            qubit: self.qubit,
            shots: self.shots,
            reference_gate: self.reference_gate.clone(),
            reference_parameters: self.reference_parameters()?,
        })
    }

    /// The range configured for `experiment`.
    pub fn range(&self, experiment: Experiment) -> &SweepRange {
        match experiment {
            Experiment::Spectroscopy => &self.spectroscopy,
            Experiment::PowerRabi => &self.power_rabi,
            Experiment::TimeRabi => &self.time_rabi,
        }
    }
}

fn parse_override<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name}={value:?} is not a valid value")))
}
