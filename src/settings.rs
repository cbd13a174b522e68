use anyhow::{ensure, Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use log::info;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::geom::BodyConfig;

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let settings = load_default_config().unwrap();
        assert!(settings.dt > 0.0);
        assert!(settings.steps > 0);
        assert!(settings.body.build().is_ok());
    }

    #[test]
    fn reject_bad_timestep() {
        let mut settings = load_default_config().unwrap();
        settings.dt = 0.0;
        assert!(validate_config(&settings).is_err());
    }

    #[test]
    fn reject_empty_grid() {
        let mut settings = load_default_config().unwrap();
        settings.sampling.cells = [4, 0, 4];
        assert!(validate_config(&settings).is_err());
    }

    #[test]
    fn cli_overrides() {
        let mut settings = load_default_config().unwrap();
        let args = CliArgs::parse_from(["dsmc", "--dt", "0.5", "-n", "7", "--seed", "3"]);
        apply_args(&mut settings, &args);
        assert_eq!(settings.dt, 0.5);
        assert_eq!(settings.steps, 7);
        assert_eq!(settings.seed, Some(3));
    }
}

/// Time, in simulation units, that a reflected particle is advanced along
/// its new velocity to clear the surface it bounced off.
pub const REFLECTION_BIAS: f64 = 1e-9;
/// Boltzmann constant, J/K.
pub const BOLTZMANN: f64 = 1.380_649e-23;
/// Width of the injection reservoir in thermal speeds beyond the drift.
pub const RESERVOIR_SIGMAS: f64 = 3.0;

/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    pub dt: f64,
    pub steps: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_reflection_bias")]
    pub reflection_bias: f64,
    pub domain: DomainConfig,
    pub flow: FlowConfig,
    pub sampling: SamplingConfig,
    pub body: BodyConfig,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

/// Opposite corners of the simulation box.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DomainConfig {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

/// Free-stream gas state.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FlowConfig {
    pub concentration: f64,      // molecules per unit volume
    pub velocity: [f64; 3],      // drift velocity
    pub temperature: f64,        // kelvin
    pub mass: f64,               // molecular mass, kg
    pub statistical_weight: f64, // real molecules per simulated particle
}

/// Macroscopic sampling grid.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SamplingConfig {
    pub cells: [usize; 3],
    /// First step included in the time average.
    #[serde(default)]
    pub start: usize,
}

fn default_reflection_bias() -> f64 {
    REFLECTION_BIAS
}

fn default_output_dir() -> String {
    "output".to_string()
}

/// Loads `config/default.toml` without looking at the command line.
pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");

    let config: Settings = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .context("failed to load default configuration")?
        .try_deserialize()
        .context("failed to deserialise default configuration")?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the configuration file, then applies `DSMC_*` environment variables
/// and command-line overrides.
pub fn load_config() -> Result<Settings> {
    let args = CliArgs::parse();

    let config_file = match &args.config {
        Some(path) => PathBuf::from(path),
        None => {
            let root = retrieve_project_root()?;
            let local_config = root.join("config/local.toml");
            if local_config.exists() {
                local_config
            } else {
                root.join("config/default.toml")
            }
        }
    };
    info!("using configuration: {:?}", config_file);

    let mut config: Settings = Config::builder()
        .add_source(File::from(config_file.clone()).required(true))
        .add_source(Environment::with_prefix("dsmc"))
        .build()
        .with_context(|| format!("failed to load configuration from {:?}", config_file))?
        .try_deserialize()
        .context("failed to deserialise configuration")?;

    apply_args(&mut config, &args);

    validate_config(&config)?;

    Ok(config)
}

fn apply_args(config: &mut Settings, args: &CliArgs) {
    if let Some(dt) = args.dt {
        config.dt = dt;
    }
    if let Some(steps) = args.steps {
        config.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(bias) = args.bias {
        config.reflection_bias = bias;
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the DSMC_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("DSMC_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    // walk upward from the executable looking for a "config" subdirectory
    let exe_path = env::current_exe().context("failed to get current executable path")?;
    exe_path
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("config").is_dir())
        .map(|dir| dir.to_path_buf())
        .context("could not find project root directory")
}

pub fn validate_config(config: &Settings) -> Result<()> {
    ensure!(
        config.dt.is_finite() && config.dt > 0.0,
        "time step must be greater than 0, got {}",
        config.dt
    );
    ensure!(
        config.reflection_bias >= 0.0,
        "reflection bias must not be negative, got {}",
        config.reflection_bias
    );
    ensure!(
        config.sampling.cells.iter().all(|&n| n > 0),
        "sampling grid needs at least one cell per axis, got {:?}",
        config.sampling.cells
    );
    ensure!(
        config.flow.statistical_weight > 0.0,
        "statistical weight must be greater than 0"
    );
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about = "DSMC - collisionless rarefied gas flow past CSG bodies")]
pub struct CliArgs {
    /// Path to a configuration file. Defaults to config/local.toml if it
    /// exists, otherwise config/default.toml.
    #[arg(short, long)]
    config: Option<String>,

    /// Time step.
    #[arg(short = 't', long)]
    dt: Option<f64>,

    /// Number of time steps to simulate.
    #[arg(short = 'n', long)]
    steps: Option<usize>,

    /// Random seed for the simulation.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Time a reflected particle is pushed along its new velocity to clear the surface.
    #[arg(long)]
    bias: Option<f64>,

    /// Directory for output files.
    #[arg(short, long)]
    output: Option<String>,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Time step: {:e}
  - Steps: {}
  - Seed: {:?}
  - Domain: {:?} .. {:?}
  - Flow velocity: {:?}
  - Flow temperature: {}
  - Sampling cells: {:?} from step {}
  ",
            self.dt,
            self.steps,
            self.seed,
            self.domain.min,
            self.domain.max,
            self.flow.velocity,
            self.flow.temperature,
            self.sampling.cells,
            self.sampling.start,
        )
    }
}
