//! # Studyhall Core Library
//!
//! Core business logic for Studyhall, an attendance and study-time tracker
//! for shared chat communities. Members check in, take breaks, and check
//! out through a shared control panel; this library keeps per-member
//! elapsed-time accounting, weekly aggregates, streaks, and a tiered
//! ranking, and derives the live status panel and weekly leaderboard.
//!
//! The durable record is an append-only event log kept in an external
//! message channel. Nothing else is trusted: a state-changing trigger first
//! appends its event and only then mutates in-memory state, and startup
//! reconstructs everything by replaying recent history back to the last
//! weekly-reset checkpoint.
//!
//! ## Key Components
//!
//! - [`StudyHall`]: trigger handling under the exclusive-lock discipline
//! - [`CommunityState`]: materialized per-community member table
//! - [`Event`]: the six durable event kinds and their line codec
//! - [`replay::rebuild`]: bounded replay from the log channel
//! - [`EventLog`] / [`Presenter`]: collaborator seams for the chat platform

pub mod channel;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod hall;
pub mod panel;
pub mod replay;
pub mod session;
pub mod settlement;
pub mod state;


pub use channel::{EventLog, NullPresenter, Presenter};
pub use clock::{HallClock, Tier};
pub use config::HallConfig;
pub use error::{ConfigError, CoreError, LogError, PresentError};
pub use event::Event;
pub use hall::{MemberReport, StudyHall, TriggerReply};
pub use panel::PanelView;
pub use session::{MemberSession, MemberStatus, TransitionError};
pub use state::CommunityState;
