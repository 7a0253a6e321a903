//! Visibility, completion and statistics logic for a habit tracker.
//!
//! The functions in [`schedule`], [`filter`], [`completion`] and [`stats`] are
//! pure: they take explicit snapshots of trackers, categories and the
//! completion log. [`TrackerStore`] owns that state for a host application
//! and hands out snapshots.

pub mod completion;
pub mod error;
pub mod filter;
pub mod model;
pub mod schedule;
pub mod stats;
pub mod store;

pub use crate::completion::{toggle_completion, CompletionLog, CompletionRecord, IntoDay};
pub use crate::error::{StoreError, ValidationError};
pub use crate::filter::{
    build_board, visible_trackers, Board, BoardQuery, BoardSection, EmptyState, StatusFilter,
    TrackerCard, TrackerGroup,
};
pub use crate::model::{Category, Schedule, Tracker, TrackerDraft, TrackerId};
pub use crate::schedule::is_due;
pub use crate::stats::{compute_statistics, Statistics};
pub use crate::store::{
    StoreChange, StoreObserver, StoreSnapshot, SubscriptionId, TrackerStore, TrackerStoreBuilder,
};
