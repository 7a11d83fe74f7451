//! Materialized per-community state and the event fold that rebuilds it.
//!
//! `CommunityState` is only ever produced two ways: folding durable events
//! with [`CommunityState::apply`], or the defensive week roll. The fold is
//! total -- out-of-order and duplicate log entries degrade to no-ops, never
//! to a panic -- because replay must survive whatever the channel holds.

use chrono::{DateTime, FixedOffset, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::event::Event;
use crate::session::{MemberSession, MemberStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityState {
    /// Member records in first-seen order; never removed.
    pub members: IndexMap<String, MemberSession>,
    /// Monday anchor of the week the aggregates belong to.
    pub week_start: NaiveDate,
    /// Week marker of the last completed settlement; guards double runs.
    #[serde(default)]
    pub last_settled_week: Option<NaiveDate>,
    /// Timestamp of the weekly reset that bounds replay.
    #[serde(default)]
    pub last_reset_at: Option<DateTime<FixedOffset>>,
    /// Fingerprint of the last rendered panel; suppresses no-op edits.
    #[serde(default)]
    pub panel_fingerprint: Option<String>,
}

impl CommunityState {
    pub fn new(week_start: NaiveDate) -> Self {
        Self {
            members: IndexMap::new(),
            week_start,
            last_settled_week: None,
            last_reset_at: None,
            panel_fingerprint: None,
        }
    }

    /// Fetch-or-create a member record, refreshing the display name when one
    /// is observed.
    pub fn member_mut(&mut self, uid: &str, name: &str) -> &mut MemberSession {
        let entry = self.members.entry(uid.to_string()).or_insert_with(|| {
            if name.is_empty() {
                MemberSession::new(format!("member-{uid}"))
            } else {
                MemberSession::new(name)
            }
        });
        if !name.is_empty() {
            entry.display_name = name.to_string();
        }
        entry
    }

    /// Members currently in a session (working or on break).
    pub fn active_members(&self) -> usize {
        self.members
            .values()
            .filter(|m| m.status != MemberStatus::Off)
            .count()
    }

    /// Lightweight per-request week check: when the Monday marker lags the
    /// calendar, zero the weekly aggregates without a full settlement run.
    pub fn roll_week_if_stale(&mut self, today: NaiveDate) -> bool {
        let current = clock::week_start(today);
        if self.week_start == current {
            return false;
        }
        self.week_start = current;
        for m in self.members.values_mut() {
            m.weekly_secs = 0;
        }
        true
    }

    /// Fold one durable event, in append order.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::Checkin { uid, name, ts } => {
                let _ = self.member_mut(uid, name).check_in(*ts);
            }
            Event::BreakStart { uid, name, ts } => {
                let _ = self.member_mut(uid, name).start_break(*ts);
            }
            Event::BreakEnd { uid, name, ts, .. } => {
                let _ = self.member_mut(uid, name).end_break(*ts);
            }
            Event::Checkout {
                uid,
                name,
                ts,
                studied_sec,
                ..
            } => {
                self.member_mut(uid, name)
                    .apply_checkout_record(*ts, *studied_sec);
            }
            Event::TimeAdjust {
                target, delta_sec, ..
            } => {
                let m = self.member_mut(target, "");
                m.weekly_secs = (m.weekly_secs + delta_sec).max(0);
            }
            Event::WeeklyReset { ts } => {
                for m in self.members.values_mut() {
                    m.weekly_secs = 0;
                }
                let week = clock::week_start(ts.date_naive());
                self.week_start = week;
                self.last_settled_week = Some(week);
                self.last_reset_at = Some(*ts);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn ts(secs: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 8, 3, 9, 0, 0)
            .unwrap()
            + Duration::seconds(secs)
    }

    fn fresh() -> CommunityState {
        CommunityState::new(clock::week_start(ts(0).date_naive()))
    }

    #[test]
    fn fold_of_one_full_session_trusts_logged_seconds() {
        let mut state = fresh();
        let uid = "1".to_string();
        let name = "mira".to_string();
        state.apply(&Event::Checkin {
            uid: uid.clone(),
            name: name.clone(),
            ts: ts(0),
        });
        state.apply(&Event::BreakStart {
            uid: uid.clone(),
            name: name.clone(),
            ts: ts(600),
        });
        state.apply(&Event::BreakEnd {
            uid: uid.clone(),
            name: name.clone(),
            ts: ts(900),
            break_sec: 300,
            total_break_sec: 300,
        });
        state.apply(&Event::Checkout {
            uid: uid.clone(),
            name,
            ts: ts(3600),
            // Deliberately different from what the timestamps would give:
            // the logged value wins.
            studied_sec: 1800,
            weekly_total_sec: 1800,
            streak: 1,
            tier: "🥉 Bronze".into(),
        });

        let m = &state.members[&uid];
        assert_eq!(m.status, MemberStatus::Off);
        assert_eq!(m.weekly_secs, 1800);
        assert_eq!(m.streak_days, 1);
    }

    #[test]
    fn duplicate_and_out_of_order_entries_are_no_ops() {
        let mut state = fresh();
        let event = Event::BreakEnd {
            uid: "1".into(),
            name: "a".into(),
            ts: ts(0),
            break_sec: 100,
            total_break_sec: 100,
        };
        // Break-end with no session open: member created, nothing else.
        state.apply(&event);
        state.apply(&event);
        let m = &state.members["1"];
        assert_eq!(m.status, MemberStatus::Off);
        assert_eq!(m.accumulated_break_secs, 0);
    }

    #[test]
    fn time_adjust_floors_at_zero_and_creates_the_target() {
        let mut state = fresh();
        state.apply(&Event::TimeAdjust {
            uid: "9".into(),
            name: "admin".into(),
            ts: ts(0),
            target: "1".into(),
            delta_sec: -3600,
        });
        assert_eq!(state.members["1"].weekly_secs, 0);

        state.apply(&Event::TimeAdjust {
            uid: "9".into(),
            name: "admin".into(),
            ts: ts(1),
            target: "1".into(),
            delta_sec: 7200,
        });
        assert_eq!(state.members["1"].weekly_secs, 7200);
    }

    #[test]
    fn weekly_reset_zeroes_everyone_and_records_the_checkpoint() {
        let mut state = fresh();
        state.member_mut("1", "a").weekly_secs = 5000;
        state.member_mut("2", "b").weekly_secs = 100;

        let reset_at = ts(10);
        state.apply(&Event::WeeklyReset { ts: reset_at });

        assert!(state.members.values().all(|m| m.weekly_secs == 0));
        assert_eq!(state.last_reset_at, Some(reset_at));
        assert_eq!(
            state.last_settled_week,
            Some(clock::week_start(reset_at.date_naive()))
        );
    }

    #[test]
    fn stale_week_marker_zeroes_defensively() {
        let mut state = fresh();
        state.member_mut("1", "a").weekly_secs = 5000;

        assert!(!state.roll_week_if_stale(ts(0).date_naive()));
        assert_eq!(state.members["1"].weekly_secs, 5000);

        let next_week = ts(0).date_naive() + Duration::days(7);
        assert!(state.roll_week_if_stale(next_week));
        assert_eq!(state.members["1"].weekly_secs, 0);
        assert_eq!(state.week_start, clock::week_start(next_week));
    }

    #[test]
    fn display_name_refreshes_on_every_observed_interaction() {
        let mut state = fresh();
        state.apply(&Event::Checkin {
            uid: "1".into(),
            name: "old-name".into(),
            ts: ts(0),
        });
        state.apply(&Event::BreakStart {
            uid: "1".into(),
            name: "new-name".into(),
            ts: ts(60),
        });
        assert_eq!(state.members["1"].display_name, "new-name");

        // A nameless adjust does not clobber the known name.
        state.apply(&Event::TimeAdjust {
            uid: "9".into(),
            name: "admin".into(),
            ts: ts(61),
            target: "1".into(),
            delta_sec: 60,
        });
        assert_eq!(state.members["1"].display_name, "new-name");
    }
}
