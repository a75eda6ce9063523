//! Debounce and throttle gating for viewport fetches.
//!
//! The gate is the explicit state machine behind
//! [`FetchController`](super::FetchController): it holds at most one
//! pending request (only the latest viewport matters while the user is
//! panning) and decides when that request may execute. A request waits out
//! a debounce quiet period first; once quiet, a minimum spacing since the
//! previous execution is enforced by re-arming for the remaining wait
//! rather than dropping the request.
//!
//! Timestamps are injected as parameters, so tests drive the machine with
//! fabricated instants instead of real timers.

use std::time::{Duration, Instant};

use crate::geo::BoundingBox;
use crate::listing::ListingFilter;

/// A viewport fetch waiting to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFetch {
    /// Viewport bounds at schedule time.
    pub bounds: BoundingBox,
    /// Active filter at schedule time.
    pub filter: ListingFilter,
    /// Request sequence number assigned at schedule time.
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    /// Nothing pending.
    Idle,
    /// Waiting out the debounce quiet period.
    Pending { ready_at: Instant },
    /// Debounce elapsed but execution spacing has not; waiting the remainder.
    Throttled { ready_at: Instant },
}

/// Debounce/throttle state machine for pending fetches.
#[derive(Debug)]
pub struct DebounceGate {
    debounce: Duration,
    throttle: Duration,
    state: GateState,
    pending: Option<PendingFetch>,
    last_executed: Option<Instant>,
}

impl DebounceGate {
    /// Create a gate with the given debounce and throttle intervals.
    pub fn new(debounce: Duration, throttle: Duration) -> Self {
        Self {
            debounce,
            throttle,
            state: GateState::Idle,
            pending: None,
            last_executed: None,
        }
    }

    /// Submit a request, replacing any previously pending one.
    ///
    /// The debounce window restarts from `now`: during a pan only the
    /// latest viewport survives to execution.
    pub fn submit(&mut self, fetch: PendingFetch, now: Instant) {
        self.pending = Some(fetch);
        self.state = GateState::Pending {
            ready_at: now + self.debounce,
        };
    }

    /// The next instant at which [`poll`](Self::poll) could release a request.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            GateState::Idle => None,
            GateState::Pending { ready_at } | GateState::Throttled { ready_at } => Some(ready_at),
        }
    }

    /// Release the pending request if its wait has elapsed at `now`.
    ///
    /// If the debounce window has elapsed but the throttle spacing has
    /// not, the gate transitions to `Throttled` with a deadline at the
    /// remaining wait and returns `None`; the request executes later
    /// instead of being dropped.
    pub fn poll(&mut self, now: Instant) -> Option<PendingFetch> {
        match self.state {
            GateState::Idle => None,
            GateState::Pending { ready_at } => {
                if now < ready_at {
                    return None;
                }
                if let Some(last) = self.last_executed {
                    let since = now.saturating_duration_since(last);
                    if since < self.throttle {
                        self.state = GateState::Throttled {
                            ready_at: last + self.throttle,
                        };
                        return None;
                    }
                }
                self.take(now)
            }
            GateState::Throttled { ready_at } => {
                if now < ready_at {
                    return None;
                }
                self.take(now)
            }
        }
    }

    /// Force the pending request out now, bypassing debounce and throttle.
    ///
    /// Used on teardown and for deliberate user actions.
    pub fn flush(&mut self, now: Instant) -> Option<PendingFetch> {
        if self.pending.is_none() {
            self.state = GateState::Idle;
            return None;
        }
        self.take(now)
    }

    /// Drop the pending request and clear timers.
    ///
    /// The last-execution time survives, so throttle spacing still applies
    /// to whatever executes next.
    pub fn clear(&mut self) {
        self.pending = None;
        self.state = GateState::Idle;
    }

    /// Record an execution that bypassed the gate (an immediate fetch).
    pub fn mark_executed(&mut self, now: Instant) {
        self.last_executed = Some(now);
    }

    /// Whether a request is currently pending.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn take(&mut self, now: Instant) -> Option<PendingFetch> {
        self.state = GateState::Idle;
        self.last_executed = Some(now);
        self.pending.take()
    }
}
