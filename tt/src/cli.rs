//! CLI argument parsing for tasktimer

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tt")]
#[command(author, version, about = "Per-task countdown timer engine", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a countdown for a task
    Start {
        /// Task identifier
        #[arg(required = true)]
        task_id: String,

        /// Owning user identifier
        #[arg(required = true)]
        user_id: String,

        /// Countdown length in seconds
        #[arg(required = true)]
        duration_secs: u64,
    },

    /// Pause an active countdown
    Pause {
        /// Task identifier
        #[arg(required = true)]
        task_id: String,
    },

    /// Resume a paused countdown
    Resume {
        /// Task identifier
        #[arg(required = true)]
        task_id: String,
    },

    /// Complete a task and drop its timer
    Complete {
        /// Task identifier
        #[arg(required = true)]
        task_id: String,
    },

    /// Print the seconds remaining for a task
    Remaining {
        /// Task identifier
        #[arg(required = true)]
        task_id: String,
    },

    /// List a user's active timers
    List {
        /// User identifier
        #[arg(required = true)]
        user_id: String,
    },

    /// Render live countdowns for a user until interrupted
    Watch {
        /// User identifier
        #[arg(required = true)]
        user_id: String,
    },
}
