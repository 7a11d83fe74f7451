//! Replay a log file through the real engine and print projections.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use studyhall_core::clock::fmt_hm;
use studyhall_core::{panel, replay, settlement};
use studyhall_core::{EventLog, HallClock, LogError, Tier};

pub enum View {
    Table,
    Panel,
    Ranking,
}

/// File-backed log channel: the whole file is one community's history,
/// oldest line first.
struct FileEventLog {
    lines: Vec<String>,
}

impl FileEventLog {
    fn open(path: &Path) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self {
            lines: raw.lines().map(str::to_string).collect(),
        })
    }
}

#[async_trait]
impl EventLog for FileEventLog {
    async fn append(&self, _community_id: &str, _line: &str) -> Result<(), LogError> {
        Err(LogError::Rejected("file log is read-only".into()))
    }

    async fn history(
        &self,
        _community_id: &str,
        _since: DateTime<FixedOffset>,
    ) -> Result<Vec<String>, LogError> {
        Ok(self.lines.iter().rev().cloned().collect())
    }
}

pub fn run(view: View, file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let log = FileEventLog::open(&file)?;
    let clk = HallClock::default();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let state = runtime.block_on(replay::rebuild(
        &log,
        "local",
        clk.now(),
        replay::MAX_SCAN_WINDOW_DAYS,
    ))?;

    match view {
        View::Table => {
            if state.members.is_empty() {
                println!("no members in the replayed window");
                return Ok(());
            }
            for (uid, m) in &state.members {
                println!(
                    "{uid}\t{}\t{}\t{}\t{}\t🔥 {}d",
                    m.display_name,
                    m.status.label(),
                    fmt_hm(m.weekly_secs),
                    Tier::from_weekly_secs(m.weekly_secs).label(),
                    m.streak_days,
                );
            }
        }
        View::Panel => {
            let view = panel::project(&state, clk.now());
            println!("{}", view.text);
            println!("fingerprint: {}", view.fingerprint);
        }
        View::Ranking => {
            println!("{}", settlement::render_ranking(&state));
        }
    }
    Ok(())
}
