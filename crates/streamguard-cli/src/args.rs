use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// streamguard: run a record stream under the windowed failure policy
#[derive(Debug, Parser)]
#[command(name = "streamguard", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upper-case records from a file or stdin, escalating on repeated failures
    Run {
        /// Configuration file (TOML; Java .properties files are rejected).
        /// STREAMGUARD_* env vars override it
        #[arg(short, long)]
        config: PathBuf,

        /// Read records from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Call numbers on which the transform fails
        #[arg(long, value_delimiter = ',', default_values_t = [2u64, 8, 15])]
        fail_on: Vec<u64>,

        /// Also print each decision as a JSON line on stderr
        #[arg(long)]
        json: bool,
    },

    /// Write a starter configuration file
    InitConfig {
        /// Destination file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, default_value_t = 3)]
        max_failures: i64,

        #[arg(long, default_value_t = 10_000)]
        max_time_millis: i64,
    },
}
