use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use kaipo_meter::collectors::Direction;
use kaipo_meter::display::UnitMode;
use kaipo_meter::settings::MonitorSettings;

/// Main CLI structure for the kaipo-meter application
/// Uses clap's derive macros for automatic CLI generation
#[derive(Parser)]
#[command(author = "Kaipo Chen")]
#[command(version)] // Automatically uses version from Cargo.toml
#[command(about = "Network activity meter - turns device-wide throughput into a discrete activity level")]
#[command(long_about = "Kaipo Meter samples the system's cumulative traffic counters while something is \
listening, converts the throughput into a small activity level (0 = idle) and reports level changes. \
Settings come from built-in defaults, an optional config file and KM_* environment variables.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the monitor and print every level change until Ctrl-C
    #[command(about = "Watch the activity level and print every change")]
    #[command(long_about = "Starts the traffic monitor and prints each activity level change. \
With --text the throughput text is printed on every measured tick. The monitor only runs while \
the device has connectivity; connectivity is re-checked every few seconds. Press Ctrl-C to stop.\n\n\
Examples:\n  \
km watch                              # Level changes for download traffic\n  \
km watch --direction both --text      # Include throughput text for both directions\n  \
km watch --interval 1000 --bytes      # Poll every second, show rates in bytes")]
    Watch {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Print the throughput text on every measured tick
        #[arg(short, long, help = "Print throughput text on every measured tick")]
        text: bool,
    },

    /// Real-time dashboard with a level gauge and throughput history
    #[command(about = "Monitor the activity level with an interactive dashboard")]
    #[command(long_about = "Launches a terminal dashboard showing the current activity level as a gauge, \
the throughput text and short download/upload histories. Press 'q' or ESC to exit the dashboard.")]
    Live {
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// One-time measurement between two samples
    #[command(about = "Measure current throughput and activity level once")]
    #[command(long_about = "Takes a baseline sample, waits for the measurement duration, takes a second \
sample and prints the resulting rates and activity level.\n\n\
Examples:\n  \
km status                             # 2-second measurement\n  \
km status -m 5 --json                 # 5-second measurement as JSON")]
    Status {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Duration in seconds between the two samples (minimum 1, maximum 60)
        #[arg(
            short = 'm',
            long,
            default_value = "2",
            help = "Measurement duration in seconds (1-60s)"
        )]
        measurement_duration: u64,

        /// Emit the measurement as JSON
        #[arg(long, help = "Print the measurement as JSON")]
        json: bool,
    },

    /// Print the level threshold table
    #[command(about = "Show the configured level thresholds")]
    Levels {
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

/// Counter selection on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Down,
    Up,
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Down => Direction::Down,
            DirectionArg::Up => Direction::Up,
            DirectionArg::Both => Direction::Both,
        }
    }
}

/// Options shared by every command that builds monitor settings
#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Settings file (TOML, JSON or YAML by extension)
    #[arg(short, long, help = "Path to a settings file")]
    pub config: Option<PathBuf>,

    /// Polling interval in milliseconds
    #[arg(short, long, help = "Polling interval in milliseconds (250-32750)")]
    pub interval: Option<u64>,

    /// Counter that drives the level
    #[arg(short, long, value_enum, help = "Counter that drives the level")]
    pub direction: Option<DirectionArg>,

    /// Show rates in bytes instead of bits
    #[arg(short, long, help = "Show rates in bytes per second instead of bits")]
    pub bytes: bool,
}

impl SettingsArgs {
    /// Loads layered settings and applies command-line overrides on top
    pub fn resolve(&self) -> Result<MonitorSettings> {
        let mut settings = MonitorSettings::load(self.config.as_deref())
            .context("Failed to load monitor settings")?;

        if let Some(interval) = self.interval {
            settings.interval_ms = interval;
        }
        if let Some(direction) = self.direction {
            settings.direction = direction.into();
        }
        if self.bytes {
            settings.unit = UnitMode::Bytes;
        }

        Ok(settings)
    }
}
