pub mod onboard;

use crate::progress::StepId;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "roadmap",
    about = "Learning roadmap checklist with progress levels and achievements"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Onboard,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Show,
    Toggle {
        #[command(subcommand)]
        target: ToggleTarget,
    },
    Stats {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Clear {
        #[arg(long, short, default_value_t = false)]
        yes: bool,
    },
    Export {
        #[arg(long)]
        output: Option<String>,
    },
    Status,
    Doctor,
    Serve,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum ToggleTarget {
    Step { id: StepId },
    Extra { id: String },
}
