//! Per-member session state machine.
//!
//! Three states (`off`, `working`, `on_break`) and four member-initiated
//! transitions. All accounting is integer seconds and floors at zero, so
//! clock anomalies never produce negative durations.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    #[default]
    Off,
    Working,
    OnBreak,
}

impl MemberStatus {
    pub fn label(&self) -> &'static str {
        match self {
            MemberStatus::Off => "idle",
            MemberStatus::Working => "studying",
            MemberStatus::OnBreak => "on break",
        }
    }
}

/// Why a transition was refused. The Display text is the user-facing reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("already checked in and studying")]
    AlreadyWorking,
    #[error("on break right now; end the break or check out first")]
    StillOnBreak,
    #[error("already on break")]
    AlreadyOnBreak,
    #[error("check in first")]
    NotCheckedIn,
    #[error("no break in progress")]
    NotOnBreak,
    #[error("no open session to check out")]
    NoOpenSession,
}

/// Result of a completed check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub studied_secs: i64,
    pub weekly_total_secs: i64,
    pub streak_days: u32,
    pub tier: Tier,
}

/// One member's session record. Created lazily on first observed
/// interaction and never deleted, only reset field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSession {
    pub display_name: String,
    #[serde(default)]
    pub status: MemberStatus,
    #[serde(default)]
    pub session_start: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub break_start: Option<DateTime<FixedOffset>>,
    /// Completed break seconds within the current session.
    #[serde(default)]
    pub accumulated_break_secs: i64,
    /// Effective study seconds since the last weekly reset.
    #[serde(default)]
    pub weekly_secs: i64,
    /// Consecutive calendar days ending in a check-out.
    #[serde(default)]
    pub streak_days: u32,
    /// Calendar date of the most recent check-out.
    #[serde(default)]
    pub last_active_date: Option<NaiveDate>,
}

impl MemberSession {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            status: MemberStatus::Off,
            session_start: None,
            break_start: None,
            accumulated_break_secs: 0,
            weekly_secs: 0,
            streak_days: 0,
            last_active_date: None,
        }
    }

    /// `off -> working`. Opens a fresh session.
    pub fn check_in(&mut self, t: DateTime<FixedOffset>) -> Result<(), TransitionError> {
        match self.status {
            MemberStatus::Working => Err(TransitionError::AlreadyWorking),
            MemberStatus::OnBreak => Err(TransitionError::StillOnBreak),
            MemberStatus::Off => {
                self.status = MemberStatus::Working;
                self.session_start = Some(t);
                self.break_start = None;
                self.accumulated_break_secs = 0;
                Ok(())
            }
        }
    }

    /// `working -> on_break`.
    pub fn start_break(&mut self, t: DateTime<FixedOffset>) -> Result<(), TransitionError> {
        match self.status {
            MemberStatus::Off => Err(TransitionError::NotCheckedIn),
            MemberStatus::OnBreak => Err(TransitionError::AlreadyOnBreak),
            MemberStatus::Working => {
                self.status = MemberStatus::OnBreak;
                self.break_start = Some(t);
                Ok(())
            }
        }
    }

    /// `on_break -> working`. Returns the completed break length in seconds.
    ///
    /// A missing `break_start` still transitions with a zero-length break;
    /// the record recovers rather than wedging the member.
    pub fn end_break(&mut self, t: DateTime<FixedOffset>) -> Result<i64, TransitionError> {
        match self.status {
            MemberStatus::Off => Err(TransitionError::NotCheckedIn),
            MemberStatus::Working => Err(TransitionError::NotOnBreak),
            MemberStatus::OnBreak => {
                let delta = self
                    .break_start
                    .map(|bs| (t - bs).num_seconds().max(0))
                    .unwrap_or(0);
                self.accumulated_break_secs += delta;
                self.break_start = None;
                self.status = MemberStatus::Working;
                Ok(delta)
            }
        }
    }

    /// `{working, on_break} -> off`. Settles any open break, credits the
    /// weekly aggregate, and advances the streak.
    pub fn check_out(
        &mut self,
        t: DateTime<FixedOffset>,
    ) -> Result<CheckoutSummary, TransitionError> {
        if self.status == MemberStatus::Off {
            return Err(TransitionError::NoOpenSession);
        }
        if self.status == MemberStatus::OnBreak {
            let _ = self.end_break(t);
        }

        let studied = self.effective_study_secs(t);
        self.weekly_secs += studied;
        self.touch_streak(t.date_naive());
        self.close_session();

        Ok(CheckoutSummary {
            studied_secs: studied,
            weekly_total_secs: self.weekly_secs,
            streak_days: self.streak_days,
            tier: Tier::from_weekly_secs(self.weekly_secs),
        })
    }

    /// Fold a durably logged check-out into the record, trusting the studied
    /// seconds the original actor observed instead of recomputing from
    /// timestamps. Applies even without a preceding check-in in the replayed
    /// window (the session may have opened before the scan bound).
    pub fn apply_checkout_record(&mut self, t: DateTime<FixedOffset>, studied_secs: i64) {
        self.weekly_secs += studied_secs.max(0);
        self.touch_streak(t.date_naive());
        self.close_session();
    }

    /// Live effective study time: session elapsed minus all break time,
    /// including a still-open break. Pure read, queryable at any moment.
    pub fn effective_study_secs(&self, now: DateTime<FixedOffset>) -> i64 {
        let Some(start) = self.session_start else {
            return 0;
        };
        let mut break_total = self.accumulated_break_secs;
        if self.status == MemberStatus::OnBreak {
            if let Some(bs) = self.break_start {
                break_total += (now - bs).num_seconds().max(0);
            }
        }
        ((now - start).num_seconds() - break_total).max(0)
    }

    fn touch_streak(&mut self, today: NaiveDate) {
        let yesterday = today - Duration::days(1);
        self.streak_days = match self.last_active_date {
            Some(d) if d == yesterday => self.streak_days + 1,
            Some(d) if d == today => self.streak_days,
            _ => 1,
        };
        self.last_active_date = Some(today);
    }

    fn close_session(&mut self) {
        self.status = MemberStatus::Off;
        self.session_start = None;
        self.break_start = None;
        self.accumulated_break_secs = 0;
    }
}
