use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Run analytics jobs at several worker counts and report how they scale.
#[derive(Parser, Debug)]
#[command(name = "scaleout", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve,
    /// Execute one job from a JSON request file and print its result
    Run {
        /// Path to a job request in the same shape POST /submit-job accepts
        request: PathBuf,
    },
}
