//! Command-line arguments.
//!
//! ```bash
//! champwiki get Ahri
//! champwiki get "Kai'Sa" --variant abilities
//! champwiki get Ahri --level 6 --deadline-ms 5000
//! champwiki cache stats
//! champwiki cache cleanup --max-age-days 7
//! ```

use std::path::PathBuf;

use champwiki_core::Variant;
use clap::{Args, Parser, Subcommand};

/// Top-level arguments for the `champwiki` binary.
#[derive(Parser, Clone, Debug)]
#[command(name = "champwiki")]
#[command(version)]
#[command(about = "champwiki - resilient champion wiki lookups", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs on stderr
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, env = "CHAMPWIKI_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Compact JSON instead of pretty-printed
    #[arg(long, global = true)]
    pub compact: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Fetch a record for one champion
    Get(GetArgs),

    /// Inspect or prune the page cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Args, Clone, Debug)]
pub struct GetArgs {
    /// Champion name, in any casing or punctuation
    pub entity: String,

    /// Which record to return
    #[arg(long, value_enum, default_value_t = VariantArg::Stats)]
    pub variant: VariantArg,

    /// Level to report stat values at (1-18, stats only)
    #[arg(short = 'l', long = "level", value_name = "LEVEL")]
    pub level: Option<u8>,

    /// Ignore fresh cache entries
    #[arg(long)]
    pub refresh: bool,

    /// Give up on live data after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,

    /// Include the counters this lookup accumulated
    #[arg(long)]
    pub with_metrics: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum CacheCommands {
    /// Entry count, expired entries and stored bytes
    Stats,
    /// Remove entries older than the configured (or given) age
    Cleanup {
        /// Override `cache.max_age_days`
        #[arg(long, value_name = "DAYS")]
        max_age_days: Option<u64>,
    },
    /// Remove every cached page
    Clear,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantArg {
    Stats,
    Abilities,
    Patches,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Stats => Self::Stats,
            VariantArg::Abilities => Self::Abilities,
            VariantArg::Patches => Self::Patches,
        }
    }
}
