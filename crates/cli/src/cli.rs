//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// lapsync - Multi-rate lap telemetry alignment
#[derive(Parser, Debug)]
#[command(
    name = "lapsync",
    author,
    version,
    about = "Lap telemetry alignment for recorded driving sessions",
    long_about = "Resolves lap boundaries from cumulative timing tables, maps the chosen lap \n\
                  onto every channel's sample range, and aligns channels recorded at \n\
                  different rates onto one reference timeline."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LAPSYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "LAPSYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Align the channels of one lap and emit the telemetry points as JSON
    Analyze(AnalyzeArgs),

    /// List every lap with sector times, fastest lap and purple sectors
    Laps(LapsArgs),

    /// Validate configuration file without touching a session
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Write a synthetic session database
    Demo(DemoArgs),
}

/// Arguments for the `analyze` command
#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "lapsync.toml", env = "LAPSYNC_CONFIG")]
    pub config: PathBuf,

    /// Session database
    #[arg(short, long, env = "LAPSYNC_DB")]
    pub db: PathBuf,

    /// Lap index to analyze (default: fastest valid lap)
    #[arg(short, long, env = "LAPSYNC_LAP")]
    pub lap: Option<usize>,

    /// Override the decimation stride
    #[arg(long, env = "LAPSYNC_STRIDE")]
    pub stride: Option<usize>,

    /// Override the analysis time budget (seconds)
    #[arg(long, env = "LAPSYNC_TIMEOUT")]
    pub timeout: Option<f64>,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Do not print the statistics summary
    #[arg(long)]
    pub no_summary: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LAPSYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `laps` command
#[derive(Parser, Debug)]
pub struct LapsArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "lapsync.toml", env = "LAPSYNC_CONFIG")]
    pub config: PathBuf,

    /// Session database
    #[arg(short, long, env = "LAPSYNC_DB")]
    pub db: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "lapsync.toml", env = "LAPSYNC_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "lapsync.toml", env = "LAPSYNC_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show every channel with its table and rate
    #[arg(long)]
    pub channels: bool,
}

/// Arguments for the `demo` command
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Database file to create
    #[arg(short, long, default_value = "demo.sqlite")]
    pub output: PathBuf,

    /// Configuration describing the channels to generate (default: built-in)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also write the configuration used as TOML
    #[arg(long)]
    pub write_config: Option<PathBuf>,

    /// Lap time in seconds; repeat for more laps
    #[arg(long = "lap-time", default_values_t = [92.4, 90.1, 91.7])]
    pub lap_times: Vec<f64>,

    /// Stationary seconds before the first lap
    #[arg(long, default_value = "0")]
    pub pre_roll: f64,

    /// Overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
