use clap::Parser;
use std::path::PathBuf;

/// Reflex: closed-loop simulation of a plant driven through delayed feedback.
///
/// This struct defines the command-line arguments of the `reflex-sim` binary.
/// Flags given here override the matching scenario values.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/arm_reaching.toml")]
    pub scenario: PathBuf,

    /// Number of episodes to run.
    #[arg(short, long)]
    pub episodes: Option<usize>,

    /// Seed for the sensor-noise generator.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Default log level when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
