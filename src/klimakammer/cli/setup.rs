use clap::{Parser, Subcommand};
use klimakammer::commands::advise::MAX_TREND_DAYS;
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2025-06-01 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "klimakammer", bin_name = "klimakammer", version = get_version())]
#[command(
    about = "Serial climate sensor logger with building climate advisories",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory [default: $KLIMA_HOME, then ./sensordata]
    #[arg(long, global = true, value_name = "DIR", help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log sensor readings until interrupted
    Log {
        /// Serial port, overriding the configured one
        #[arg(long)]
        port: Option<String>,

        /// Seconds between readings, overriding the configured interval
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },

    /// Take and store a single reading
    Read {
        /// Serial port, overriding the configured one
        #[arg(long)]
        port: Option<String>,
    },

    /// Latest reading and a summary of the logged data
    Status,

    /// Interactive advisory menu
    Menu {
        /// Building address for registry-enriched analyses
        #[arg(long)]
        address: Option<String>,
    },

    /// Request a climate analysis
    #[command(subcommand)]
    Advise(AdviseCommands),

    /// Look up a building in the registry
    Building {
        /// Free-text address, e.g. "Marievej 2, 4200 Slagelse"
        #[arg(required = true, num_args = 1..)]
        address: Vec<String>,
    },

    /// List archived analyses, newest first
    History {
        /// Show at most this many entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the latest analysis
    Latest,

    /// Rebuild the current reading, rolling window and latest analysis caches
    Doctor,

    /// Get or set configuration
    Config {
        /// Configuration key
        key: Option<String>,

        /// Value to set
        value: Option<String>,
    },

    /// Create the data directory and a default config
    Init,
}

#[derive(Subcommand, Debug)]
pub enum AdviseCommands {
    /// Analyse the current reading
    Current {
        /// Building address for registry-enriched analyses
        #[arg(long)]
        address: Option<String>,
    },

    /// Analyse the readings of the last few days
    Trend {
        /// Number of calendar days, today included
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TREND_DAYS)))]
        days: u32,

        /// Building address for registry-enriched analyses
        #[arg(long)]
        address: Option<String>,
    },
}
