//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CARLA Spawner - declarative actor provisioning for the CARLA simulator
#[derive(Parser, Debug)]
#[command(
    name = "carla-spawner",
    author,
    version,
    about = "Spawn and tear down CARLA actors from an objects definition file",
    long_about = "Spawns vehicles, walkers and sensors described by an objects definition file,\n\
                  keeps them alive until shutdown, then destroys everything it created."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CARLA_SPAWNER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CARLA_SPAWNER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Spawn all objects and keep them alive until shutdown
    Run(RunArgs),

    /// Validate an objects definition file without spawning
    Validate(ValidateArgs),

    /// Display the objects tree of a definition file
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Objects definition file (JSON or TOML)
    #[arg(short = 'f', long, env = "CARLA_SPAWNER_OBJECTS")]
    pub objects_definition_file: PathBuf,

    /// Only spawn the sensors of vehicles/walkers spawned by another process
    #[arg(long, env = "CARLA_SPAWNER_SENSORS_ONLY")]
    pub spawn_sensors_only: bool,

    /// Spawn point override for one entity, repeatable.
    /// Wins over CARLA_SPAWNER_SPAWN_POINT_<ID> environment variables.
    #[arg(
        long = "spawn-point",
        value_name = "ID=X,Y,Z,ROLL,PITCH,YAW",
        value_parser = config_loader::parse_assignment
    )]
    pub spawn_points: Vec<(String, String)>,

    /// CARLA server host
    #[arg(long, default_value = "localhost", env = "CARLA_HOST")]
    pub host: String,

    /// CARLA server port
    #[arg(long, default_value = "2000", env = "CARLA_PORT")]
    pub port: u16,

    /// Delay between two spawn attempts of a vehicle/walker in milliseconds
    #[arg(long, default_value = "0", env = "CARLA_SPAWNER_RETRY_INTERVAL_MS")]
    pub retry_interval_ms: u64,

    /// Give up spawning a vehicle/walker after this many attempts (0 = never)
    #[arg(long, default_value = "0", env = "CARLA_SPAWNER_MAX_SPAWN_ATTEMPTS")]
    pub max_spawn_attempts: u32,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CARLA_SPAWNER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Load, classify and print the plan without connecting
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Objects definition file to validate
    #[arg(short = 'f', long, env = "CARLA_SPAWNER_OBJECTS")]
    pub objects_definition_file: PathBuf,

    /// Also check the sensors-only requirements
    #[arg(long, env = "CARLA_SPAWNER_SENSORS_ONLY")]
    pub spawn_sensors_only: bool,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Objects definition file
    #[arg(short = 'f', long, env = "CARLA_SPAWNER_OBJECTS")]
    pub objects_definition_file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show forwarded attributes
    #[arg(long)]
    pub attributes: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
