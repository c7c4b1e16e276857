use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modrelay")]
#[command(version = "0.1.0")]
#[command(about = "Anonymous submission moderation relay bot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay bot (default)
    Run,
    /// Export the archived submissions as a gzip bundle to a local file
    Export {
        /// Output path for the bundle
        #[arg(short, long, default_value = "submissions.jsonl.gz")]
        output: PathBuf,
    },
}
