//! Collaborator seams for the chat platform.
//!
//! The core never talks to a chat platform directly; it calls these traits
//! and treats every implementation as unreliable I/O. The log channel is
//! the durable record; the presenter is best-effort display.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;

use crate::error::{LogError, PresentError};

/// Append-only durable event log kept in an external message channel.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Durably append one serialized event line. `Ok` means the record is
    /// visible to a later `history` call; in-memory state must only mutate
    /// after this returns `Ok`.
    async fn append(&self, community_id: &str, line: &str) -> Result<(), LogError>;

    /// Raw channel lines, most recent first, bounded below by `since`.
    /// Non-event chatter may be interleaved; the caller filters.
    async fn history(
        &self,
        community_id: &str,
        since: DateTime<FixedOffset>,
    ) -> Result<Vec<String>, LogError>;
}

/// Presentation surface for the live panel and public announcements.
/// Both calls are best-effort: failures are logged by the caller and
/// dropped, never retried inline.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Replace the live status panel. Idempotent for an unchanged fingerprint.
    async fn show_panel(
        &self,
        community_id: &str,
        text: &str,
        fingerprint: &str,
    ) -> Result<(), PresentError>;

    /// Post a one-off public message (weekly ranking, notices).
    async fn announce(&self, community_id: &str, text: &str) -> Result<(), PresentError>;
}

#[async_trait]
impl<L: EventLog + ?Sized> EventLog for Arc<L> {
    async fn append(&self, community_id: &str, line: &str) -> Result<(), LogError> {
        (**self).append(community_id, line).await
    }

    async fn history(
        &self,
        community_id: &str,
        since: DateTime<FixedOffset>,
    ) -> Result<Vec<String>, LogError> {
        (**self).history(community_id, since).await
    }
}

#[async_trait]
impl<P: Presenter + ?Sized> Presenter for Arc<P> {
    async fn show_panel(
        &self,
        community_id: &str,
        text: &str,
        fingerprint: &str,
    ) -> Result<(), PresentError> {
        (**self).show_panel(community_id, text, fingerprint).await
    }

    async fn announce(&self, community_id: &str, text: &str) -> Result<(), PresentError> {
        (**self).announce(community_id, text).await
    }
}

/// Presenter that displays nothing; useful for headless tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

#[async_trait]
impl Presenter for NullPresenter {
    async fn show_panel(&self, _: &str, _: &str, _: &str) -> Result<(), PresentError> {
        Ok(())
    }

    async fn announce(&self, _: &str, _: &str) -> Result<(), PresentError> {
        Ok(())
    }
}
