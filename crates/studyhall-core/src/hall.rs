//! The single mutator: trigger handling under one exclusive lock with a
//! durability-first append protocol.
//!
//! Every state-changing trigger runs the same critical section:
//!
//! 1. stage the transition on a scratch copy of the member record,
//! 2. append the resulting event to the durable log and await the ack,
//! 3. commit the scratch copy into shared state.
//!
//! A failed append leaves shared state untouched, so the log never lags
//! behind memory. The lock is held across steps 1-3 (the append is the only
//! I/O under it) and released before any follow-up rendering.
//!
//! Helpers that run inside the critical section take `&mut CommunityState`
//! and must not touch the lock; only the public trigger methods acquire it,
//! exactly once each. This split is what keeps the non-reentrant lock safe.

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::channel::{EventLog, Presenter};
use crate::clock::{self, fmt_hm, HallClock, Tier};
use crate::error::CoreError;
use crate::event::Event;
use crate::panel::{self, PanelView};
use crate::replay;
use crate::session::{MemberSession, MemberStatus};
use crate::settlement;
use crate::state::CommunityState;

/// How long a panel edit may take before it is abandoned. The next periodic
/// refresh corrects a missed edit.
pub const PANEL_EDIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a member-initiated trigger. A rejected transition is a normal
/// reply (`accepted = false`), not an error; durability failures surface as
/// `Err(CoreError::Durability)` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerReply {
    pub accepted: bool,
    pub message: String,
    /// Text meant for the shared channel rather than just the actor.
    pub announcement: Option<String>,
}

impl TriggerReply {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message: message.into(),
            announcement: None,
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: message.into(),
            announcement: None,
        }
    }
}

/// Point-in-time view of one member, for the "my info" card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberReport {
    pub display_name: String,
    pub status: MemberStatus,
    pub weekly_secs: i64,
    pub tier: Tier,
    pub streak_days: u32,
    /// Live effective seconds of the open session; 0 when off.
    pub session_secs: i64,
}

pub struct StudyHall<L, P> {
    clock: HallClock,
    log: L,
    presenter: P,
    scan_window_days: i64,
    communities: Mutex<IndexMap<String, CommunityState>>,
}

impl<L: EventLog, P: Presenter> StudyHall<L, P> {
    /// Construct an empty hall. State arrives via [`Self::hydrate`] or the
    /// first trigger for a community.
    pub fn new(clock: HallClock, log: L, presenter: P) -> Self {
        Self {
            clock,
            log,
            presenter,
            scan_window_days: replay::DEFAULT_SCAN_WINDOW_DAYS,
            communities: Mutex::new(IndexMap::new()),
        }
    }

    pub fn with_scan_window(mut self, days: i64) -> Self {
        self.scan_window_days = days;
        self
    }

    pub fn clock(&self) -> &HallClock {
        &self.clock
    }

    /// Rebuild one community from the durable log, replacing any cached
    /// state. The history fetch happens before the lock is taken.
    pub async fn hydrate(&self, community_id: &str) -> Result<(), CoreError> {
        let state = replay::rebuild(
            &self.log,
            community_id,
            self.clock.now(),
            self.scan_window_days,
        )
        .await?;
        let mut communities = self.communities.lock().await;
        communities.insert(community_id.to_string(), state);
        Ok(())
    }

    // ── Member triggers ──────────────────────────────────────────────

    pub async fn check_in(
        &self,
        community_id: &str,
        uid: &str,
        name: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<TriggerReply, CoreError> {
        let mut communities = self.communities.lock().await;
        let state = Self::community_entry(&mut communities, community_id, now);
        state.roll_week_if_stale(now.date_naive());

        let mut staged = Self::staged_member(state, uid, name);
        if let Err(reject) = staged.check_in(now) {
            return Ok(TriggerReply::rejected(reject.to_string()));
        }
        let event = Event::Checkin {
            uid: uid.to_string(),
            name: staged.display_name.clone(),
            ts: now,
        };
        self.record(community_id, state, uid, staged, &event).await?;
        Ok(TriggerReply::ok("checked in -- have a good session"))
    }

    pub async fn break_start(
        &self,
        community_id: &str,
        uid: &str,
        name: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<TriggerReply, CoreError> {
        let mut communities = self.communities.lock().await;
        let state = Self::community_entry(&mut communities, community_id, now);
        state.roll_week_if_stale(now.date_naive());

        let mut staged = Self::staged_member(state, uid, name);
        if let Err(reject) = staged.start_break(now) {
            return Ok(TriggerReply::rejected(reject.to_string()));
        }
        let event = Event::BreakStart {
            uid: uid.to_string(),
            name: staged.display_name.clone(),
            ts: now,
        };
        self.record(community_id, state, uid, staged, &event).await?;
        Ok(TriggerReply::ok("break started"))
    }

    pub async fn break_end(
        &self,
        community_id: &str,
        uid: &str,
        name: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<TriggerReply, CoreError> {
        let mut communities = self.communities.lock().await;
        let state = Self::community_entry(&mut communities, community_id, now);
        state.roll_week_if_stale(now.date_naive());

        let mut staged = Self::staged_member(state, uid, name);
        let break_sec = match staged.end_break(now) {
            Ok(secs) => secs,
            Err(reject) => return Ok(TriggerReply::rejected(reject.to_string())),
        };
        let event = Event::BreakEnd {
            uid: uid.to_string(),
            name: staged.display_name.clone(),
            ts: now,
            break_sec,
            total_break_sec: staged.accumulated_break_secs,
        };
        self.record(community_id, state, uid, staged, &event).await?;
        Ok(TriggerReply::ok(format!(
            "back to work (break {})",
            fmt_hm(break_sec)
        )))
    }

    pub async fn check_out(
        &self,
        community_id: &str,
        uid: &str,
        name: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<TriggerReply, CoreError> {
        let mut communities = self.communities.lock().await;
        let state = Self::community_entry(&mut communities, community_id, now);
        state.roll_week_if_stale(now.date_naive());

        let mut staged = Self::staged_member(state, uid, name);
        let summary = match staged.check_out(now) {
            Ok(summary) => summary,
            Err(reject) => return Ok(TriggerReply::rejected(reject.to_string())),
        };
        let event = Event::Checkout {
            uid: uid.to_string(),
            name: staged.display_name.clone(),
            ts: now,
            studied_sec: summary.studied_secs,
            weekly_total_sec: summary.weekly_total_secs,
            streak: summary.streak_days,
            tier: summary.tier.label().to_string(),
        };
        let display_name = staged.display_name.clone();
        self.record(community_id, state, uid, staged, &event).await?;

        let announcement = format!(
            "Good work, {display_name}! {} studied today. (tier: {} / 🔥 {}-day streak)",
            fmt_hm(summary.studied_secs),
            summary.tier.label(),
            summary.streak_days,
        );
        Ok(TriggerReply {
            accepted: true,
            message: "checked out".to_string(),
            announcement: Some(announcement),
        })
    }

    // ── Privileged triggers ──────────────────────────────────────────

    /// Directly patch a member's weekly aggregate, bypassing the state
    /// machine. Durably logged as `time_adjust` and floored at zero.
    pub async fn adjust_time(
        &self,
        community_id: &str,
        actor_uid: &str,
        actor_name: &str,
        target_uid: &str,
        delta_secs: i64,
        now: DateTime<FixedOffset>,
    ) -> Result<TriggerReply, CoreError> {
        let mut communities = self.communities.lock().await;
        let state = Self::community_entry(&mut communities, community_id, now);
        state.roll_week_if_stale(now.date_naive());

        let mut staged = Self::staged_member(state, target_uid, "");
        staged.weekly_secs = (staged.weekly_secs + delta_secs).max(0);
        let new_total = staged.weekly_secs;
        let target_name = staged.display_name.clone();

        let event = Event::TimeAdjust {
            uid: actor_uid.to_string(),
            name: actor_name.to_string(),
            ts: now,
            target: target_uid.to_string(),
            delta_sec: delta_secs,
        };
        self.record(community_id, state, target_uid, staged, &event)
            .await?;

        let verb = if delta_secs >= 0 { "added" } else { "removed" };
        Ok(TriggerReply::ok(format!(
            "{verb} {} for {target_name}; weekly total is now {}",
            fmt_hm(delta_secs.abs()),
            fmt_hm(new_total),
        )))
    }

    /// Render the leaderboard, durably record the weekly reset, and zero
    /// the aggregates. The ranking text is also announced best-effort.
    pub async fn run_settlement(
        &self,
        community_id: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<String, CoreError> {
        let ranking = {
            let mut communities = self.communities.lock().await;
            let state = Self::community_entry(&mut communities, community_id, now);
            self.settle_locked(community_id, state, now).await?
        };

        // Follow-up I/O after the lock is gone.
        if let Err(err) = self.presenter.announce(community_id, &ranking).await {
            warn!(community_id, %err, "settlement announcement dropped");
        }
        Ok(ranking)
    }

    /// Scheduled-tick variant: runs the settlement at most once per week
    /// rollover, guarded by the last-settled-week marker.
    pub async fn settle_week_if_due(
        &self,
        community_id: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<Option<String>, CoreError> {
        let settled = {
            let mut communities = self.communities.lock().await;
            let Some(state) = communities.get_mut(community_id) else {
                return Ok(None);
            };
            let current = clock::week_start(now.date_naive());
            if state.week_start == current || state.last_settled_week == Some(current) {
                None
            } else {
                Some(self.settle_locked(community_id, state, now).await?)
            }
        };

        if let Some(ranking) = &settled {
            if let Err(err) = self.presenter.announce(community_id, ranking).await {
                warn!(community_id, %err, "settlement announcement dropped");
            }
        }
        Ok(settled)
    }

    // ── Reads & projections ──────────────────────────────────────────

    /// Point-in-time view of one member. Pure read: nothing is appended and
    /// no member record is created.
    pub async fn query_status(
        &self,
        community_id: &str,
        uid: &str,
        now: DateTime<FixedOffset>,
    ) -> MemberReport {
        let mut communities = self.communities.lock().await;
        let state = Self::community_entry(&mut communities, community_id, now);
        state.roll_week_if_stale(now.date_naive());

        let member = Self::staged_member(state, uid, "");
        MemberReport {
            session_secs: member.effective_study_secs(now),
            tier: Tier::from_weekly_secs(member.weekly_secs),
            status: member.status,
            weekly_secs: member.weekly_secs,
            streak_days: member.streak_days,
            display_name: member.display_name,
        }
    }

    /// Recompute the panel projection. `Some` only when the rendered text
    /// changed since the last update; the cached fingerprint advances.
    pub async fn panel_update(
        &self,
        community_id: &str,
        now: DateTime<FixedOffset>,
    ) -> Option<PanelView> {
        let mut communities = self.communities.lock().await;
        let state = communities.get_mut(community_id)?;
        state.roll_week_if_stale(now.date_naive());

        let view = panel::project(state, now);
        if state.panel_fingerprint.as_deref() == Some(view.fingerprint.as_str()) {
            return None;
        }
        state.panel_fingerprint = Some(view.fingerprint.clone());
        Some(view)
    }

    /// Push the panel to the presenter when it changed. Best-effort and
    /// bounded by [`PANEL_EDIT_TIMEOUT`]; a miss clears the cached
    /// fingerprint so the next periodic refresh retries.
    pub async fn refresh_panel(&self, community_id: &str, now: DateTime<FixedOffset>) {
        let Some(view) = self.panel_update(community_id, now).await else {
            return;
        };

        let render = self
            .presenter
            .show_panel(community_id, &view.text, &view.fingerprint);
        let failed = match timeout(PANEL_EDIT_TIMEOUT, render).await {
            Ok(Ok(())) => {
                debug!(community_id, "panel updated");
                false
            }
            Ok(Err(err)) => {
                warn!(community_id, %err, "panel render failed");
                true
            }
            Err(_) => {
                warn!(community_id, "panel render timed out; abandoned");
                true
            }
        };

        if failed {
            let mut communities = self.communities.lock().await;
            if let Some(state) = communities.get_mut(community_id) {
                state.panel_fingerprint = None;
            }
        }
    }

    /// Suggested delay until the next panel refresh for this community.
    pub async fn suggested_refresh(&self, community_id: &str) -> Duration {
        let communities = self.communities.lock().await;
        communities
            .get(community_id)
            .map(panel::refresh_interval)
            .unwrap_or(panel::IDLE_REFRESH)
    }

    // ── Critical-section helpers (lock already held) ─────────────────

    fn community_entry<'a>(
        communities: &'a mut IndexMap<String, CommunityState>,
        community_id: &str,
        now: DateTime<FixedOffset>,
    ) -> &'a mut CommunityState {
        communities
            .entry(community_id.to_string())
            .or_insert_with(|| CommunityState::new(clock::week_start(now.date_naive())))
    }

    /// Scratch copy of a member record for staging. Creation and name
    /// refresh only land in shared state if the commit happens.
    fn staged_member(state: &CommunityState, uid: &str, name: &str) -> MemberSession {
        let mut member = state.members.get(uid).cloned().unwrap_or_else(|| {
            if name.is_empty() {
                MemberSession::new(format!("member-{uid}"))
            } else {
                MemberSession::new(name)
            }
        });
        if !name.is_empty() {
            member.display_name = name.to_string();
        }
        member
    }

    /// Inner half of the durable-append protocol: append, then commit the
    /// staged record. Must not reacquire the lock.
    async fn record(
        &self,
        community_id: &str,
        state: &mut CommunityState,
        uid: &str,
        staged: MemberSession,
        event: &Event,
    ) -> Result<(), CoreError> {
        self.log.append(community_id, &event.to_line()).await?;
        state.members.insert(uid.to_string(), staged);
        debug!(community_id, uid, action = event.action(), "event recorded");
        Ok(())
    }

    /// Inner settlement: render, append the reset, fold it. The reset never
    /// touches in-memory state before the append is confirmed.
    async fn settle_locked(
        &self,
        community_id: &str,
        state: &mut CommunityState,
        now: DateTime<FixedOffset>,
    ) -> Result<String, CoreError> {
        let ranking = settlement::render_ranking(state);
        let event = Event::WeeklyReset { ts: now };
        self.log.append(community_id, &event.to_line()).await?;
        state.apply(&event);
        info!(community_id, "weekly settlement recorded");
        Ok(ranking)
    }
}
