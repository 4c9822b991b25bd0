use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Storage directory. Holds config.yaml, the reference
    /// documents and every recorded scan.
    #[clap(short, long, default_value = "./storage")]
    pub storage: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Embed the reference documents and build the index
    Load {},

    /// Match a text against the reference documents
    Scan {
        /// Username the scan is recorded under
        #[clap(short, long)]
        user: String,

        /// The text to match
        text: Option<String>,

        /// Read the text from a file instead
        #[clap(short, long)]
        file: Option<PathBuf>,
    },

    /// Print every match recorded for a user
    Matches {
        /// Username to look up
        #[clap(short, long)]
        user: String,
    },

    /// Print a user's scans in the order they happened
    History {
        /// Username to look up
        #[clap(short, long)]
        user: String,
    },

    /// Print scan counters and the most queried topics
    Stats {},
}
