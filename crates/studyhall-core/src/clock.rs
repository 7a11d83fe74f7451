//! Fixed-timezone clock and display helpers.
//!
//! Every calendar computation in the crate (streak days, week boundaries)
//! runs in a single fixed UTC offset so aggregates stay well-defined across
//! members. The default offset is +09:00.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

/// Wall clock pinned to a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct HallClock {
    offset: FixedOffset,
}

impl HallClock {
    pub fn new(utc_offset_hours: i32) -> Self {
        let clamped = utc_offset_hours.clamp(-23, 23);
        let offset = FixedOffset::east_opt(clamped * 3600).unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

impl Default for HallClock {
    fn default() -> Self {
        Self::new(DEFAULT_UTC_OFFSET_HOURS)
    }
}

/// Monday anchor of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// RFC 3339 text for the log line `ts` field.
pub fn to_iso(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339()
}

/// Parse an RFC 3339 timestamp; anything unparseable is `None`, never a panic.
pub fn parse_iso(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}

/// `"5h 30m"` style duration, floored at zero.
pub fn fmt_hm(secs: i64) -> String {
    let secs = secs.max(0);
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    format!("{h}h {m}m")
}

/// Weekly-hours tier. Lower bounds are half-open: exactly 10.0h is Silver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Challenger,
}

impl Tier {
    pub fn from_weekly_secs(secs: i64) -> Self {
        let hours = secs.max(0) as f64 / 3600.0;
        if hours < 10.0 {
            Tier::Bronze
        } else if hours < 20.0 {
            Tier::Silver
        } else if hours < 40.0 {
            Tier::Gold
        } else {
            Tier::Challenger
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Bronze => "🥉 Bronze",
            Tier::Silver => "🥈 Silver",
            Tier::Gold => "🥇 Gold",
            Tier::Challenger => "🏆 Challenger",
        }
    }
}
