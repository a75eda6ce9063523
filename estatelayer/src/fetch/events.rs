//! Callbacks produced for the embedding application.
//!
//! The orchestrator reports three things: fresh record sets, loading-state
//! transitions, and foreground fetch failures. Maintenance failures (cache
//! writes, background refreshes) never reach this interface.

use crate::listing::PropertyRecord;

use super::FetchError;

/// Sink for orchestration callbacks.
///
/// Implementations must tolerate being called from the orchestrator task.
/// Data updates carry the request sequence number assigned at schedule
/// time; a consumer should ignore any update whose sequence number is
/// older than the last one it applied, so a slow superseded request can
/// never clobber a newer result.
pub trait ListingEvents: Send + Sync {
    /// A record set is ready for the viewport scheduled as request `seq`.
    fn on_data(&self, records: &[PropertyRecord], seq: u64);

    /// The foreground loading state changed.
    fn on_loading(&self, loading: bool);

    /// A foreground fetch failed. Existing data remains usable.
    fn on_error(&self, error: &FetchError);
}

/// No-op sink for callers that only want the cache side effects.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvents;

impl ListingEvents for NullEvents {
    fn on_data(&self, _records: &[PropertyRecord], _seq: u64) {}

    fn on_loading(&self, _loading: bool) {}

    fn on_error(&self, _error: &FetchError) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_null_events_as_trait_object() {
        let events: Arc<dyn ListingEvents> = Arc::new(NullEvents);
        events.on_data(&[], 0);
        events.on_loading(true);
        events.on_loading(false);
    }
}
