use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "MWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List sport categories
    Sports,

    /// List matches
    Matches {
        /// Only this sport
        #[arg(short, long)]
        sport: Option<String>,

        /// Only matches currently live
        #[arg(long)]
        live: bool,
    },

    /// Probe and rank the streams of one source
    Streams {
        /// Source label, e.g. "alpha"
        source: String,

        /// Match id on that source
        id: String,
    },

    /// Watch one or more matches with automatic failover
    Watch {
        /// Match ids; the first one becomes the lead slot
        #[arg(required = true)]
        match_ids: Vec<String>,

        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(short, long)]
        duration: Option<u64>,
    },
}
