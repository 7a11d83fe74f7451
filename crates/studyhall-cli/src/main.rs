use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "studyhall-cli", version, about = "Studyhall CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a raw event-log file
    Log {
        #[command(subcommand)]
        action: commands::log::LogAction,
    },
    /// Replay a log file and print the rebuilt member table
    Replay {
        /// Log file, one line per record, oldest first
        file: PathBuf,
    },
    /// Print the live status panel for a replayed log
    Panel {
        file: PathBuf,
    },
    /// Print the weekly leaderboard for a replayed log (no reset)
    Ranking {
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Log { action } => commands::log::run(action),
        Commands::Replay { file } => commands::replay::run(commands::replay::View::Table, file),
        Commands::Panel { file } => commands::replay::run(commands::replay::View::Panel, file),
        Commands::Ranking { file } => commands::replay::run(commands::replay::View::Ranking, file),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
