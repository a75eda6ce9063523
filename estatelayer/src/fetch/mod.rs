//! Viewport fetch orchestration.
//!
//! The [`FetchController`] is the heart of the crate: it turns raw
//! viewport-change events into debounced, throttled, deduplicated and
//! cancelable listings fetches, consulting the bounds cache before the
//! network and refreshing stale entries in the background.

pub mod config;
pub mod controller;
pub mod events;
pub mod gate;
pub mod source;

use std::time::Duration;

use thiserror::Error;

pub use config::FetchConfig;
pub use controller::{FetchController, FetchHandle, ScheduleOptions};
pub use events::{ListingEvents, NullEvents};
pub use gate::{DebounceGate, PendingFetch};
pub use source::{BoundsQuery, HttpListingSource, ListingSource, SourceError};

/// Failures surfaced through the error callback.
///
/// Only genuine foreground fetch failures appear here; cache-write and
/// background-refresh failures are absorbed internally.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The listings API call failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The request exceeded the configured timeout.
    #[error("listings request timed out after {0:?}")]
    Timeout(Duration),
}
