use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use quil_cal::config::ExperimentConfig;
use quil_cal::experiment::sweep::SweepRange;
use quil_cal::experiment::{Experiment, SweepPoint};
use quil_cal::qpu::Qpu;
use quil_cal::{expression::Expression, quil::Quil, Program};
use tracing_subscriber::EnvFilter;

/// Build and run qubit calibration experiments as Quil-T programs.
#[derive(Parser, Debug)]
#[command(name = "quil-cal", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Experiment configuration (YAML). Defaults to ./quil-cal.yaml when present.
    #[arg(short, long, global = true, env = "QUIL_CAL_CONFIG")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Parse a Quil-T program or expression and print it back
    Parse {
        #[arg(short = 't', long = "type")]
        input_type: Option<InputType>,
        input: String,
    },

    /// Print the simulated QPU's calibration program
    Calibrations {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the program an experiment runs
    Program {
        /// spectroscopy, power-rabi or time-rabi
        experiment: Experiment,

        /// Pulse duration in seconds, for time Rabi programs
        #[arg(long)]
        duration: Option<f64>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Run an experiment sweep on the simulated QPU
    Run {
        /// spectroscopy, power-rabi or time-rabi
        experiment: Experiment,

        /// First value of the sweep
        #[arg(long, allow_negative_numbers = true)]
        start: Option<f64>,

        /// Last value of the sweep
        #[arg(long, allow_negative_numbers = true)]
        stop: Option<f64>,

        /// Number of values swept
        #[arg(long)]
        points: Option<usize>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Do not plot the results
        #[arg(long)]
        no_plot: bool,

        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Command-line overrides of the configuration.
#[derive(Args, Clone, Debug, Default)]
pub struct Overrides {
    /// Qubit under calibration
    #[arg(short, long)]
    qubit: Option<u64>,

    /// Shots per program run
    #[arg(short, long)]
    shots: Option<u32>,

    /// Seed for the simulated readout
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum InputType {
    #[default]
    Program,
    Expression,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Parse { input_type, input } => {
            handle_parse(input_type.unwrap_or_default(), input)
        }
        Command::Calibrations { overrides } => {
            handle_calibrations(&load_config(config_path, &overrides)?)
        }
        Command::Program {
            experiment,
            duration,
            overrides,
        } => handle_program(&load_config(config_path, &overrides)?, experiment, duration),
        Command::Run {
            experiment,
            start,
            stop,
            points,
            format,
            no_plot,
            overrides,
        } => {
            let config = load_config(config_path, &overrides)?;
            let mut range = config.range(experiment).clone();
            range.start = start.unwrap_or(range.start);
            range.stop = stop.unwrap_or(range.stop);
            range.points = points.unwrap_or(range.points);
            handle_run(&config, experiment, &range, format, !no_plot)
        }
    }
}

fn load_config(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<ExperimentConfig> {
    let mut config = ExperimentConfig::load(path).context("Failed to load configuration.")?;
    if let Some(qubit) = overrides.qubit {
        config.qubit = qubit;
    }
    if let Some(shots) = overrides.shots {
        config.shots = shots;
    }
    if let Some(seed) = overrides.seed {
        config.simulator.seed = Some(seed);
    }
    config
        .validate()
        .context("Invalid command-line overrides.")?;
    tracing::info!(
        path = ?path,
        qubit = config.qubit,
        shots = config.shots,
        seed = ?config.simulator.seed,
        "loaded configuration"
    );
    Ok(config)
}

fn handle_parse(input_type: InputType, input: String) -> anyhow::Result<()> {
    let parsed = match input_type {
        InputType::Program => Program::from_str(&input)
            .context("Failed to parse program from input string.")?
            .to_quil()
            .context("Failed to convert the parsed program back to Quil.")?,
        InputType::Expression => Expression::from_str(&input)
            .context("Failed to parse expression from input string.")?
            .to_quil()
            .context("Failed to convert the parsed expression back to Quil.")?,
    };

    println!("{parsed}");

    Ok(())
}

fn handle_calibrations(config: &ExperimentConfig) -> anyhow::Result<()> {
    let qpu = config
        .simulator
        .build()
        .context("Failed to build the simulated QPU.")?;
    let calibrations = qpu.calibration_program()?;
    tracing::debug!(
        qubits = qpu.qubits().len(),
        calibrations = calibrations.calibrations.len(),
        "printing calibrations"
    );
    print!("{}", calibrations.to_quil()?);
    Ok(())
}

fn handle_program(
    config: &ExperimentConfig,
    experiment: Experiment,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    let qpu = config
        .simulator
        .build()
        .context("Failed to build the simulated QPU.")?;
    let calibrations = qpu.calibration_program()?;
    let mut range = config.range(experiment).clone();
    if let Some(duration) = duration {
        range.start = duration;
    }
    tracing::debug!(%experiment, value = range.start, "building program");
    let program = experiment
        .program(&calibrations, &config.settings()?, &range)
        .with_context(|| format!("Failed to build the {experiment} program."))?;
    print!("{}", program.to_quil()?);
    Ok(())
}

fn handle_run(
    config: &ExperimentConfig,
    experiment: Experiment,
    range: &SweepRange,
    format: OutputFormat,
    plot: bool,
) -> anyhow::Result<()> {
    let mut qpu = config
        .simulator
        .build()
        .context("Failed to build the simulated QPU.")?;
    tracing::debug!(
        %experiment,
        start = range.start,
        stop = range.stop,
        points = range.points,
        "running sweep"
    );
    let points = experiment
        .run(&mut qpu, &config.settings()?, range)
        .with_context(|| format!("Failed to run the {experiment} sweep on {}.", qpu.name()))?;

    match format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "experiment": experiment,
                "qubit": config.qubit,
                "shots": config.shots,
                "points": points,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("{:>16}  {:>19}", value_heading(experiment), "success_probability");
            for SweepPoint {
                value,
                success_probability,
            } in &points
            {
                println!("{value:>16.6e}  {success_probability:>19.4}");
            }
            if plot && !points.is_empty() {
                let probabilities = points
                    .iter()
                    .map(|point| point.success_probability)
                    .collect();
                let graph = rasciigraph::plot(
                    probabilities,
                    rasciigraph::Config::default()
                        .with_height(10)
                        .with_caption(format!(
                            "{experiment}, qubit {}: success probability",
                            config.qubit
                        )),
                );
                println!("\n{graph}");
            }
        }
    }

    Ok(())
}

fn value_heading(experiment: Experiment) -> &'static str {
    match experiment {
        Experiment::Spectroscopy => "detuning (Hz)",
        Experiment::PowerRabi => "scale",
        Experiment::TimeRabi => "duration (s)",
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_apply_after_the_configuration() {
        let overrides = Overrides {
            qubit: None,
            shots: Some(20),
            seed: Some(5),
        };
        let config = load_config(None, &overrides).unwrap();
        assert_eq!(config.shots, 20);
        assert_eq!(config.simulator.seed, Some(5));

        let overrides = Overrides {
            qubit: Some(9),
            ..Overrides::default()
        };
        assert!(load_config(None, &overrides).is_err());
    }
}
