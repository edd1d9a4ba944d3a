use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Daily Access-Window Scheduler
///
/// Gates a user's progress through sequential daily content so that at
/// most one day unlocks per reset-hour boundary.
#[derive(Parser, Debug)]
#[command(name = "daygate")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "daygate.yaml", global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether a subject may receive new content now
    Check(SubjectArgs),
    /// Record a grant for a subject (administrative; skips the eligibility check)
    Grant {
        #[command(flatten)]
        subject: SubjectArgs,

        /// Content day number being granted
        #[arg(long)]
        day: u32,
    },
    /// Show the remaining wait until the next window opens
    Remaining(SubjectArgs),
    /// Delete a subject's record, restarting the sequence from day one
    Reset(SubjectArgs),
    /// Show a subject's full access status
    Status(SubjectArgs),
}

#[derive(clap::Args, Debug)]
pub struct SubjectArgs {
    /// User identifier
    #[arg(long)]
    pub user: String,

    /// Topic identifier
    #[arg(long)]
    pub topic: u32,
}
