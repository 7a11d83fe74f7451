//! Raw log-file inspection.

use std::path::PathBuf;

use clap::Subcommand;
use studyhall_core::Event;

#[derive(Subcommand)]
pub enum LogAction {
    /// Parse every line and report valid/ignored counts
    Check {
        file: PathBuf,
    },
    /// Print parsed events as JSON, one per line
    Show {
        file: PathBuf,
    },
}

pub fn run(action: LogAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        LogAction::Check { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let mut valid = 0usize;
            let mut ignored = 0usize;
            for line in raw.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match Event::parse_line(line) {
                    Some(_) => valid += 1,
                    None => ignored += 1,
                }
            }
            println!("{valid} event(s), {ignored} ignored line(s)");
        }
        LogAction::Show { file } => {
            let raw = std::fs::read_to_string(&file)?;
            for line in raw.lines() {
                if let Some(event) = Event::parse_line(line) {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
        }
    }
    Ok(())
}
