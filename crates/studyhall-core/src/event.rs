//! Domain events and the line-oriented log codec.
//!
//! Every state change is recorded as one greppable text line in an external
//! message channel:
//!
//! ```text
//! [STUDYLOG] action=checkout; uid=42; name=mira; ts=2026-08-03T21:12:44+09:00; studied_sec=3300; ...
//! ```
//!
//! The line format is the durable contract with existing history: replay
//! reconstructs all state from these lines alone. Fields are emitted in a
//! stable order (`action`, `uid`, `name`, `ts`, then action-specific keys)
//! and values are sanitized so one event is always one line with `;` free
//! for use as the pair separator.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::clock;

/// Marker prefix identifying an event line among other channel chatter.
pub const LOG_MARKER: &str = "[STUDYLOG]";

/// One durable event. Append position in the external channel is the only
/// reliable total order; `ts` is informational and may lag under clock skew.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Event {
    Checkin {
        uid: String,
        name: String,
        ts: DateTime<FixedOffset>,
    },
    BreakStart {
        uid: String,
        name: String,
        ts: DateTime<FixedOffset>,
    },
    BreakEnd {
        uid: String,
        name: String,
        ts: DateTime<FixedOffset>,
        /// Length of the break that just ended.
        break_sec: i64,
        /// Break total for the session after this break.
        total_break_sec: i64,
    },
    Checkout {
        uid: String,
        name: String,
        ts: DateTime<FixedOffset>,
        /// Effective study seconds as observed by the original actor.
        /// Replay trusts this verbatim instead of recomputing.
        studied_sec: i64,
        weekly_total_sec: i64,
        streak: u32,
        tier: String,
    },
    TimeAdjust {
        uid: String,
        name: String,
        ts: DateTime<FixedOffset>,
        target: String,
        delta_sec: i64,
    },
    /// System-issued weekly settlement checkpoint; carries no actor.
    WeeklyReset { ts: DateTime<FixedOffset> },
}

impl Event {
    /// Wire action token.
    pub fn action(&self) -> &'static str {
        match self {
            Event::Checkin { .. } => "checkin",
            Event::BreakStart { .. } => "break_start",
            Event::BreakEnd { .. } => "break_end",
            Event::Checkout { .. } => "checkout",
            Event::TimeAdjust { .. } => "time_adjust",
            Event::WeeklyReset { .. } => "weekly_reset",
        }
    }

    pub fn ts(&self) -> DateTime<FixedOffset> {
        match self {
            Event::Checkin { ts, .. }
            | Event::BreakStart { ts, .. }
            | Event::BreakEnd { ts, .. }
            | Event::Checkout { ts, .. }
            | Event::TimeAdjust { ts, .. }
            | Event::WeeklyReset { ts } => *ts,
        }
    }

    /// Serialize to one log line.
    pub fn to_line(&self) -> String {
        let mut pairs: Vec<(&str, String)> = vec![("action", self.action().to_string())];
        match self {
            Event::Checkin { uid, name, ts } | Event::BreakStart { uid, name, ts } => {
                pairs.push(("uid", uid.clone()));
                pairs.push(("name", name.clone()));
                pairs.push(("ts", clock::to_iso(ts)));
            }
            Event::BreakEnd {
                uid,
                name,
                ts,
                break_sec,
                total_break_sec,
            } => {
                pairs.push(("uid", uid.clone()));
                pairs.push(("name", name.clone()));
                pairs.push(("ts", clock::to_iso(ts)));
                pairs.push(("break_sec", break_sec.to_string()));
                pairs.push(("total_break_sec", total_break_sec.to_string()));
            }
            Event::Checkout {
                uid,
                name,
                ts,
                studied_sec,
                weekly_total_sec,
                streak,
                tier,
            } => {
                pairs.push(("uid", uid.clone()));
                pairs.push(("name", name.clone()));
                pairs.push(("ts", clock::to_iso(ts)));
                pairs.push(("studied_sec", studied_sec.to_string()));
                pairs.push(("weekly_total_sec", weekly_total_sec.to_string()));
                pairs.push(("streak", streak.to_string()));
                pairs.push(("tier", tier.clone()));
            }
            Event::TimeAdjust {
                uid,
                name,
                ts,
                target,
                delta_sec,
            } => {
                pairs.push(("uid", uid.clone()));
                pairs.push(("name", name.clone()));
                pairs.push(("ts", clock::to_iso(ts)));
                pairs.push(("target", target.clone()));
                pairs.push(("delta_sec", delta_sec.to_string()));
            }
            Event::WeeklyReset { ts } => {
                pairs.push(("ts", clock::to_iso(ts)));
            }
        }

        let body: Vec<String> = pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", sanitize(v)))
            .collect();
        format!("{LOG_MARKER} {}", body.join("; "))
    }

    /// Parse one channel line. Lines without the marker, without an `action`,
    /// with an unknown action, or without a usable timestamp are not events
    /// (`None`, never an error).
    pub fn parse_line(line: &str) -> Option<Event> {
        let body = line.trim().strip_prefix(LOG_MARKER)?;

        let mut fields: HashMap<&str, &str> = HashMap::new();
        for pair in body.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            fields.insert(key.trim(), value.trim());
        }

        let action = *fields.get("action")?;
        let ts = clock::parse_iso(fields.get("ts")?)?;
        let uid = fields.get("uid").map(|v| v.to_string());
        let name = fields
            .get("name")
            .map(|v| v.to_string())
            .unwrap_or_default();

        match action {
            "checkin" => Some(Event::Checkin { uid: uid?, name, ts }),
            "break_start" => Some(Event::BreakStart { uid: uid?, name, ts }),
            "break_end" => Some(Event::BreakEnd {
                uid: uid?,
                name,
                ts,
                break_sec: parse_sec(fields.get("break_sec")),
                total_break_sec: parse_sec(fields.get("total_break_sec")),
            }),
            "checkout" => Some(Event::Checkout {
                uid: uid?,
                name,
                ts,
                studied_sec: parse_sec(fields.get("studied_sec")),
                weekly_total_sec: parse_sec(fields.get("weekly_total_sec")),
                streak: parse_sec(fields.get("streak")).max(0) as u32,
                tier: fields.get("tier").map(|v| v.to_string()).unwrap_or_default(),
            }),
            "time_adjust" => Some(Event::TimeAdjust {
                uid: uid?,
                name,
                ts,
                target: fields.get("target")?.to_string(),
                delta_sec: parse_sec(fields.get("delta_sec")),
            }),
            "weekly_reset" => Some(Event::WeeklyReset { ts }),
            _ => None,
        }
    }
}

/// Keep a value one-line and `;`-free.
fn sanitize(raw: &str) -> String {
    raw.replace(['\n', '\r'], " ").replace(';', ",").trim().to_string()
}

/// Defensive numeric parse: accepts integer or float text, anything else is 0.
fn parse_sec(raw: Option<&&str>) -> i64 {
    raw.and_then(|v| v.parse::<f64>().ok())
        .map(|f| f as i64)
        .unwrap_or(0)
}
