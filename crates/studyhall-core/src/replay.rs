//! Bounded state reconstruction from the durable log.
//!
//! History is consumed most-recent-first and the scan stops at the last
//! weekly reset (the checkpoint) or, failing that, at the start of the
//! current calendar week. Surviving events are folded oldest-first: append
//! order is the only total order the log guarantees, so events are never
//! re-sorted by timestamp.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone};
use tracing::debug;

use crate::channel::EventLog;
use crate::clock;
use crate::error::CoreError;
use crate::event::Event;
use crate::state::CommunityState;

/// How far back `history` is asked to reach by default.
pub const DEFAULT_SCAN_WINDOW_DAYS: i64 = 30;
pub const MAX_SCAN_WINDOW_DAYS: i64 = 180;

/// Rebuild a community purely from the log channel.
///
/// Zero usable records yields default (empty) state, not an error; malformed
/// lines are skipped. Everything before the start of the current week is
/// irrelevant to the aggregates and is never folded.
pub async fn rebuild<L: EventLog + ?Sized>(
    log: &L,
    community_id: &str,
    now: DateTime<FixedOffset>,
    scan_window_days: i64,
) -> Result<CommunityState, CoreError> {
    let days = scan_window_days.clamp(1, MAX_SCAN_WINDOW_DAYS);
    let since = now - Duration::days(days);
    let lines = log.history(community_id, since).await?;

    let week_anchor = clock::week_start(now.date_naive());
    let week_floor = now
        .timezone()
        .from_local_datetime(&week_anchor.and_time(NaiveTime::MIN))
        .single()
        .unwrap_or(now);

    let mut pending: Vec<Event> = Vec::new();
    let mut ignored = 0usize;
    for line in &lines {
        let Some(event) = Event::parse_line(line) else {
            ignored += 1;
            continue;
        };
        if event.ts() < week_floor {
            // Fallback bound: nothing older than this week matters.
            break;
        }
        let is_reset = matches!(event, Event::WeeklyReset { .. });
        pending.push(event);
        if is_reset {
            // Checkpoint found; everything before it is already settled.
            break;
        }
    }

    pending.reverse();
    let mut state = CommunityState::new(week_anchor);
    for event in &pending {
        state.apply(event);
    }
    debug!(
        community_id,
        replayed = pending.len(),
        ignored,
        "state rebuilt from log history"
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// In-memory channel double: stores oldest-first, serves newest-first.
    #[derive(Default)]
    struct MemoryLog {
        lines: Mutex<Vec<String>>,
    }

    impl MemoryLog {
        fn push(&self, line: impl Into<String>) {
            self.lines.lock().unwrap().push(line.into());
        }
    }

    #[async_trait]
    impl EventLog for MemoryLog {
        async fn append(&self, _community_id: &str, line: &str) -> Result<(), LogError> {
            self.push(line);
            Ok(())
        }

        async fn history(
            &self,
            _community_id: &str,
            _since: DateTime<FixedOffset>,
        ) -> Result<Vec<String>, LogError> {
            Ok(self.lines.lock().unwrap().iter().rev().cloned().collect())
        }
    }

    fn ts(secs: i64) -> DateTime<FixedOffset> {
        // Wednesday mid-week, so same-week bounds are unambiguous.
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 8, 5, 12, 0, 0)
            .unwrap()
            + Duration::seconds(secs)
    }

    fn checkout_line(uid: &str, at: DateTime<FixedOffset>, studied: i64) -> String {
        Event::Checkout {
            uid: uid.into(),
            name: format!("user-{uid}"),
            ts: at,
            studied_sec: studied,
            weekly_total_sec: studied,
            streak: 1,
            tier: "🥉 Bronze".into(),
        }
        .to_line()
    }

    #[tokio::test]
    async fn replays_a_full_session_from_the_log() {
        let log = MemoryLog::default();
        log.push(
            Event::Checkin {
                uid: "1".into(),
                name: "mira".into(),
                ts: ts(0),
            }
            .to_line(),
        );
        log.push(
            Event::BreakStart {
                uid: "1".into(),
                name: "mira".into(),
                ts: ts(600),
            }
            .to_line(),
        );
        log.push(
            Event::BreakEnd {
                uid: "1".into(),
                name: "mira".into(),
                ts: ts(900),
                break_sec: 300,
                total_break_sec: 300,
            }
            .to_line(),
        );
        log.push(checkout_line("1", ts(3600), 1800));

        let state = rebuild(&log, "c", ts(4000), DEFAULT_SCAN_WINDOW_DAYS)
            .await
            .unwrap();
        let m = &state.members["1"];
        assert_eq!(m.weekly_secs, 1800);
        assert_eq!(m.status, crate::session::MemberStatus::Off);
    }

    #[tokio::test]
    async fn replay_is_idempotent() {
        let log = MemoryLog::default();
        log.push(checkout_line("1", ts(0), 1200));
        log.push(checkout_line("2", ts(60), 2400));
        log.push("not an event, just chatter");
        log.push(checkout_line("1", ts(7200), 600));

        let first = rebuild(&log, "c", ts(8000), DEFAULT_SCAN_WINDOW_DAYS)
            .await
            .unwrap();
        let second = rebuild(&log, "c", ts(8000), DEFAULT_SCAN_WINDOW_DAYS)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.members["1"].weekly_secs, 1800);
    }

    #[tokio::test]
    async fn scan_stops_at_the_weekly_reset_checkpoint() {
        let log = MemoryLog::default();
        // Settled history that must never be folded again.
        log.push(checkout_line("1", ts(-7200), 90_000));
        log.push(Event::WeeklyReset { ts: ts(-3600) }.to_line());
        // Post-reset activity.
        log.push(checkout_line("1", ts(0), 500));

        let state = rebuild(&log, "c", ts(600), DEFAULT_SCAN_WINDOW_DAYS)
            .await
            .unwrap();
        assert_eq!(state.members["1"].weekly_secs, 500);
        assert_eq!(state.last_reset_at, Some(ts(-3600)));
    }

    #[tokio::test]
    async fn events_before_the_current_week_are_dropped() {
        let log = MemoryLog::default();
        // Previous week (ts(0) is Wednesday; nine days earlier is last week).
        log.push(checkout_line("1", ts(0) - Duration::days(9), 90_000));
        log.push(checkout_line("1", ts(0), 700));

        let state = rebuild(&log, "c", ts(600), MAX_SCAN_WINDOW_DAYS)
            .await
            .unwrap();
        assert_eq!(state.members["1"].weekly_secs, 700);
    }

    #[tokio::test]
    async fn empty_or_garbage_history_yields_default_state() {
        let log = MemoryLog::default();
        log.push("hello");
        log.push("[STUDYLOG] action=;;;");

        let state = rebuild(&log, "c", ts(0), DEFAULT_SCAN_WINDOW_DAYS)
            .await
            .unwrap();
        assert!(state.members.is_empty());
        assert_eq!(state.week_start, clock::week_start(ts(0).date_naive()));
    }
}
