//! Viewport fetch orchestration.
//!
//! [`FetchController`] translates a stream of viewport-change events into a
//! minimal, correct set of listings-API calls while always handing the
//! caller the freshest data available. It runs as a single spawned task:
//! commands arrive over an mpsc channel, timer deadlines come from the
//! debounce gate, and network completions are routed back through the same
//! channel. The task exclusively owns the cache, the in-flight marker, and
//! the last-completed key, so timer callbacks and network completions can
//! never race on them.
//!
//! Per key the request lifecycle is
//! `idle → pending (debounced) → throttled (waiting) → in-flight → idle`,
//! with cancellation reachable from any non-idle state.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::cache::{coarse_key, fine_key, BoundsCache};
use crate::geo::BoundingBox;
use crate::listing::{ListingFilter, ListingPage};
use crate::metrics::{FetchMetrics, MetricsSnapshot};

use super::config::FetchConfig;
use super::events::ListingEvents;
use super::gate::{DebounceGate, PendingFetch};
use super::source::{BoundsQuery, ListingSource};
use super::FetchError;

/// Options for a single `schedule` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleOptions {
    /// Bypass debounce and throttle.
    ///
    /// Used for deliberate user actions such as switching city or filter,
    /// where waiting out a quiet period would feel broken.
    pub immediate: bool,
}

impl ScheduleOptions {
    /// Options with the immediate flag set.
    pub fn immediate() -> Self {
        Self { immediate: true }
    }
}

/// Messages processed by the controller task.
enum Msg {
    Schedule {
        bounds: BoundingBox,
        filter: ListingFilter,
        immediate: bool,
    },
    Flush,
    Cancel,
    ClearCache,
    Shutdown,
    FetchDone {
        seq: u64,
        fine: String,
        coarse: String,
        result: Result<ListingPage, FetchError>,
    },
    RefreshDone {
        coarse: String,
        result: Result<ListingPage, FetchError>,
    },
}

/// Handle to a running [`FetchController`] task.
///
/// All operations are fire-and-forget sends into the controller's mailbox;
/// once the task has shut down they become no-ops.
pub struct FetchHandle {
    tx: mpsc::UnboundedSender<Msg>,
    task: JoinHandle<()>,
    metrics: Arc<FetchMetrics>,
}

impl FetchHandle {
    /// Schedule a fetch for the given viewport.
    pub fn schedule(&self, bounds: BoundingBox, filter: ListingFilter, options: ScheduleOptions) {
        let _ = self.tx.send(Msg::Schedule {
            bounds,
            filter,
            immediate: options.immediate,
        });
    }

    /// Force immediate execution of a pending (debounced) request.
    pub fn flush(&self) {
        let _ = self.tx.send(Msg::Flush);
    }

    /// Clear pending timers and abort any in-flight request.
    pub fn cancel(&self) {
        let _ = self.tx.send(Msg::Cancel);
    }

    /// Drop every cache entry (explicit cache-busting).
    pub fn clear_cache(&self) {
        let _ = self.tx.send(Msg::ClearCache);
    }

    /// Snapshot of the orchestration metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stop the controller task, aborting any in-flight work.
    pub async fn shutdown(self) {
        let _ = self.tx.send(Msg::Shutdown);
        let _ = self.task.await;
    }
}

/// A network request currently in flight.
struct InFlight {
    seq: u64,
    /// Fine-grained dedup key.
    key: String,
    token: CancellationToken,
}

/// The orchestrator task state.
pub struct FetchController {
    config: FetchConfig,
    cache: BoundsCache,
    source: Arc<dyn ListingSource>,
    events: Arc<dyn ListingEvents>,
    metrics: Arc<FetchMetrics>,
    gate: DebounceGate,
    rx: mpsc::UnboundedReceiver<Msg>,
    tx: mpsc::UnboundedSender<Msg>,
    next_seq: u64,
    in_flight: Option<InFlight>,
    /// Coarse key of a background refresh currently running, if any.
    refresh_in_flight: Option<String>,
    /// Fine key of the most recently completed fetch.
    last_completed: Option<String>,
}

impl FetchController {
    /// Spawn the controller task and return its handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        config: FetchConfig,
        cache: BoundsCache,
        source: Arc<dyn ListingSource>,
        events: Arc<dyn ListingEvents>,
    ) -> FetchHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(FetchMetrics::new());
        let controller = Self {
            gate: DebounceGate::new(config.debounce, config.throttle),
            config,
            cache,
            source,
            events,
            metrics: Arc::clone(&metrics),
            rx,
            tx: tx.clone(),
            next_seq: 0,
            in_flight: None,
            refresh_in_flight: None,
            last_completed: None,
        };
        let task = tokio::spawn(controller.run());
        FetchHandle { tx, task, metrics }
    }

    async fn run(mut self) {
        loop {
            let deadline = self.gate.deadline();
            let received = tokio::select! {
                msg = self.rx.recv() => Some(msg),
                _ = sleep_until(deadline) => None,
            };
            match received {
                Some(Some(Msg::Shutdown)) | Some(None) => {
                    self.abort_in_flight();
                    break;
                }
                Some(Some(msg)) => self.handle(msg),
                None => {
                    // Gate deadline elapsed.
                    if let Some(ready) = self.gate.poll(now()) {
                        self.execute(ready);
                    }
                }
            }
        }
    }

    fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::Schedule {
                bounds,
                filter,
                immediate,
            } => self.on_schedule(bounds, filter, immediate),
            Msg::Flush => {
                if let Some(ready) = self.gate.flush(now()) {
                    self.execute(ready);
                }
            }
            Msg::Cancel => {
                self.gate.clear();
                self.abort_in_flight();
            }
            Msg::ClearCache => self.cache.clear_all(),
            Msg::FetchDone {
                seq,
                fine,
                coarse,
                result,
            } => self.on_fetch_done(seq, fine, coarse, result),
            Msg::RefreshDone { coarse, result } => self.on_refresh_done(coarse, result),
            // Handled in the run loop.
            Msg::Shutdown => {}
        }
    }

    fn on_schedule(&mut self, bounds: BoundingBox, filter: ListingFilter, immediate: bool) {
        if bounds.is_degenerate(self.config.min_span_deg) {
            // The map is not laid out yet; not an error.
            trace!("Ignoring degenerate viewport bounds");
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let fetch = PendingFetch {
            bounds,
            filter,
            seq,
        };

        if immediate {
            // A deliberate action supersedes whatever pan was pending.
            self.gate.clear();
            self.gate.mark_executed(now());
            self.execute(fetch);
        } else {
            self.gate.submit(fetch, now());
        }
    }

    /// Run one released request: cache first, network only on miss.
    fn execute(&mut self, fetch: PendingFetch) {
        let now_utc = Utc::now();
        let coarse = coarse_key(&fetch.bounds, &fetch.filter);

        let hit_stale = match self.cache.get_by_key(&coarse, now_utc) {
            Some(entry) => {
                self.metrics.cache_hit();
                self.events.on_data(&entry.records, fetch.seq);
                Some(entry.is_stale(self.config.stale_after, now_utc))
            }
            None => None,
        };

        match hit_stale {
            Some(true) => self.start_refresh(&fetch, coarse),
            Some(false) => {}
            None => {
                self.metrics.cache_miss();
                self.start_fetch(fetch);
            }
        }
    }

    fn start_fetch(&mut self, fetch: PendingFetch) {
        let fine = fine_key(&fetch.bounds, &fetch.filter);

        if self.in_flight.as_ref().is_some_and(|f| f.key == fine) {
            debug!(key = %fine, "Fetch already in flight, suppressing duplicate");
            self.metrics.fetch_deduplicated();
            return;
        }
        if self.last_completed.as_deref() == Some(fine.as_str()) {
            debug!(key = %fine, "Identical to last completed fetch, suppressing");
            self.metrics.fetch_deduplicated();
            return;
        }

        // A different viewport supersedes whatever is in flight.
        if let Some(previous) = self.in_flight.take() {
            debug!(key = %previous.key, "Cancelling superseded fetch");
            previous.token.cancel();
            self.metrics.fetch_canceled();
        }

        let coarse = coarse_key(&fetch.bounds, &fetch.filter);
        let token = CancellationToken::new();
        self.in_flight = Some(InFlight {
            seq: fetch.seq,
            key: fine.clone(),
            token: token.clone(),
        });
        self.events.on_loading(true);
        self.metrics.fetch_issued();

        let query = BoundsQuery {
            bounds: fetch.bounds,
            filter: fetch.filter,
            page: 0,
            page_size: self.config.page_size,
        };
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let timeout = self.config.request_timeout;
        let seq = fetch.seq;

        tokio::spawn(async move {
            let result = tokio::select! {
                // Canceled requests vanish without delivering anything.
                _ = token.cancelled() => return,
                outcome = tokio::time::timeout(timeout, source.query(query)) => match outcome {
                    Ok(Ok(page)) => Ok(page),
                    Ok(Err(e)) => Err(FetchError::Source(e)),
                    Err(_) => Err(FetchError::Timeout(timeout)),
                },
            };
            let _ = tx.send(Msg::FetchDone {
                seq,
                fine,
                coarse,
                result,
            });
        });
    }

    fn on_fetch_done(
        &mut self,
        seq: u64,
        fine: String,
        coarse: String,
        result: Result<ListingPage, FetchError>,
    ) {
        // A completion that no longer matches the in-flight marker was
        // superseded between cancellation and delivery; drop it.
        if !self.in_flight.as_ref().is_some_and(|f| f.seq == seq) {
            debug!(seq, "Discarding result of superseded fetch");
            return;
        }
        self.in_flight = None;
        self.events.on_loading(false);

        match result {
            Ok(page) => {
                self.cache.set_by_key(coarse, page.records.clone(), Utc::now());
                self.events.on_data(&page.records, seq);
                self.last_completed = Some(fine);
                self.metrics.fetch_completed();
            }
            Err(e) => {
                // No retry here, and the cache keeps whatever it had:
                // stale data beats no data.
                warn!(error = %e, "Listings fetch failed");
                self.metrics.fetch_failed();
                self.events.on_error(&e);
            }
        }
    }

    fn start_refresh(&mut self, fetch: &PendingFetch, coarse: String) {
        if self.refresh_in_flight.is_some() {
            // Best-effort: one refresh at a time is plenty.
            return;
        }
        debug!(key = %coarse, "Refreshing stale cache entry in the background");
        self.refresh_in_flight = Some(coarse.clone());
        self.metrics.refresh_issued();

        let query = BoundsQuery {
            bounds: fetch.bounds,
            filter: fetch.filter,
            page: 0,
            page_size: self.config.page_size,
        };
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let timeout = self.config.request_timeout;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, source.query(query)).await {
                Ok(Ok(page)) => Ok(page),
                Ok(Err(e)) => Err(FetchError::Source(e)),
                Err(_) => Err(FetchError::Timeout(timeout)),
            };
            let _ = tx.send(Msg::RefreshDone { coarse, result });
        });
    }

    fn on_refresh_done(&mut self, coarse: String, result: Result<ListingPage, FetchError>) {
        self.refresh_in_flight = None;
        match result {
            Ok(page) => {
                self.cache.set_by_key(coarse, page.records, Utc::now());
                self.metrics.refresh_completed();
            }
            Err(e) => {
                // The caller already has usable data; never interrupt it.
                debug!(error = %e, key = %coarse, "Background refresh failed");
                self.metrics.refresh_failed();
            }
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.token.cancel();
            self.metrics.fetch_canceled();
            self.events.on_loading(false);
        }
    }
}

/// Current instant on the runtime clock.
///
/// Routed through tokio so paused-clock tests control it.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
        }
        None => std::future::pending::<()>().await,
    }
}
