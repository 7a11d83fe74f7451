//! Status panel projection.
//!
//! Derives the shared "who is in the room" summary from community state,
//! plus a fingerprint so unchanged panels are never re-sent to the channel.

use chrono::{DateTime, FixedOffset};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::clock;
use crate::session::MemberStatus;
use crate::state::CommunityState;

/// Refresh cadence while at least one member is in a session.
pub const ACTIVE_REFRESH: Duration = Duration::from_secs(60);
/// Refresh cadence for an empty room.
pub const IDLE_REFRESH: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub text: String,
    pub fingerprint: String,
}

/// Render the panel text for `state` as of `now`.
pub fn project(state: &CommunityState, now: DateTime<FixedOffset>) -> PanelView {
    let mut working = Vec::new();
    let mut resting = Vec::new();
    for m in state.members.values() {
        match m.status {
            MemberStatus::Working => working.push(format!(
                "🟢 {} ({} in)",
                m.display_name,
                clock::fmt_hm(m.effective_study_secs(now))
            )),
            MemberStatus::OnBreak => resting.push(format!("🟡 {} (on break)", m.display_name)),
            MemberStatus::Off => {}
        }
    }

    let text = if working.is_empty() && resting.is_empty() {
        "Nobody is studying right now.\n\nCheck in to start a session.".to_string()
    } else {
        working
            .into_iter()
            .chain(resting)
            .collect::<Vec<_>>()
            .join(" | ")
    };
    let fingerprint = fingerprint_of(&text);
    PanelView { text, fingerprint }
}

/// Suggested delay until the next refresh. Purely a cost knob, never a
/// correctness requirement.
pub fn refresh_interval(state: &CommunityState) -> Duration {
    if state.active_members() > 0 {
        ACTIVE_REFRESH
    } else {
        IDLE_REFRESH
    }
}

fn fingerprint_of(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
