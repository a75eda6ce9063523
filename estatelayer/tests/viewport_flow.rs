//! End-to-end viewport fetch flow.
//!
//! Drives the full pipeline the way the embedding application would:
//! schedule viewports against a mock listings backend and a quota-bounded
//! durable store, then cluster and present the delivered records.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use estatelayer::fetch::source::{BoundsQuery, BoxFuture, SourceError};
use estatelayer::fetch::{
    FetchConfig, FetchController, FetchError, ListingEvents, ListingSource, ScheduleOptions,
};
use estatelayer::geo::WebMercatorProjection;
use estatelayer::listing::ListingPage;
use estatelayer::store::MemoryStore;
use estatelayer::{
    BoundingBox, BoundsCache, ClusterConfig, ClusterEngine, GeoPoint, ListingFilter,
    MarkerPresenter, MarkerUpdate, PropertyCategory, PropertyRecord, Viewport,
};

fn bucharest_bounds() -> BoundingBox {
    BoundingBox::new(44.40, 26.00, 44.48, 26.12)
}

fn listings() -> Vec<PropertyRecord> {
    vec![
        PropertyRecord {
            id: "lst-1".to_string(),
            title: "Two-room apartment".to_string(),
            price_label: "89 000 EUR".to_string(),
            location: "Bucharest, Sector 2".to_string(),
            position: GeoPoint::new(44.4410, 26.1000),
            media: vec!["img-1.jpg".to_string()],
            category: PropertyCategory::Apartment,
            features: vec!["balcony".to_string()],
            developer: None,
        },
        PropertyRecord {
            id: "lst-2".to_string(),
            title: "Three-room apartment".to_string(),
            price_label: "120 000 EUR".to_string(),
            location: "Bucharest, Sector 2".to_string(),
            position: GeoPoint::new(44.4412, 26.1002),
            media: Vec::new(),
            category: PropertyCategory::Apartment,
            features: Vec::new(),
            developer: Some("Acme Build".to_string()),
        },
        PropertyRecord {
            id: "lst-3".to_string(),
            title: "Family house".to_string(),
            price_label: "240 000 EUR".to_string(),
            location: "Bucharest, Pipera".to_string(),
            position: GeoPoint::new(44.4413, 26.1001),
            media: Vec::new(),
            category: PropertyCategory::House,
            features: vec!["garden".to_string()],
            developer: None,
        },
        PropertyRecord {
            id: "lst-4".to_string(),
            title: "Penthouse".to_string(),
            price_label: "310 000 EUR".to_string(),
            location: "Bucharest, Floreasca".to_string(),
            position: GeoPoint::new(44.4700, 26.0900),
            media: Vec::new(),
            category: PropertyCategory::Apartment,
            features: Vec::new(),
            developer: None,
        },
    ]
}

struct CountingSource {
    calls: AtomicUsize,
    records: Vec<PropertyRecord>,
}

impl CountingSource {
    fn new(records: Vec<PropertyRecord>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            records,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ListingSource for CountingSource {
    fn query(&self, _query: BoundsQuery) -> BoxFuture<'_, Result<ListingPage, SourceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page = ListingPage {
            records: self.records.clone(),
            total: self.records.len() as u64,
            page: 0,
            page_size: 100,
        };
        Box::pin(async move { Ok(page) })
    }
}

#[derive(Default)]
struct RecordingEvents {
    data: Mutex<Vec<(Vec<PropertyRecord>, u64)>>,
    loading: Mutex<Vec<bool>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingEvents {
    fn data_len(&self) -> usize {
        self.data.lock().len()
    }
}

impl ListingEvents for RecordingEvents {
    fn on_data(&self, records: &[PropertyRecord], seq: u64) {
        self.data.lock().push((records.to_vec(), seq));
    }

    fn on_loading(&self, loading: bool) {
        self.loading.lock().push(loading);
    }

    fn on_error(&self, error: &FetchError) {
        self.errors.lock().push(error.to_string());
    }
}

/// Let the controller task catch up; sleeping advances the paused clock.
async fn settle(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached while settling");
}

#[tokio::test(start_paused = true)]
async fn test_viewport_scenario_end_to_end() {
    let source = Arc::new(CountingSource::new(listings()));
    let events = Arc::new(RecordingEvents::default());
    let store = Arc::new(MemoryStore::new());
    let config = FetchConfig::default();
    let cache = BoundsCache::with_store(config.cache_ttl, store.clone());

    let handle = FetchController::spawn(config, cache, source.clone(), events.clone());

    // Deliberate action (city switch): exactly one network call, data
    // delivered, cache populated.
    handle.schedule(
        bucharest_bounds(),
        ListingFilter::All,
        ScheduleOptions::immediate(),
    );
    settle(|| events.data_len() == 1).await;

    assert_eq!(source.call_count(), 1);
    assert_eq!(store.len(), 1, "durable store should hold the tile entry");
    {
        let data = events.data.lock();
        assert_eq!(data[0].0.len(), 4);
    }

    // Same viewport within the TTL, without `immediate`: zero further
    // network calls, cached records delivered, no background refresh
    // because the entry is fresh.
    handle.schedule(
        bucharest_bounds(),
        ListingFilter::All,
        ScheduleOptions::default(),
    );
    settle(|| events.data_len() == 2).await;

    assert_eq!(source.call_count(), 1);
    let snapshot = handle.metrics();
    assert_eq!(snapshot.cache_hits, 1);
    assert_eq!(snapshot.refreshes_issued, 0);

    // Sequence numbers are monotonically increasing across deliveries.
    {
        let data = events.data.lock();
        assert!(data[0].1 < data[1].1);
    }

    // The loading callback only ran for the network fetch.
    assert_eq!(*events.loading.lock(), vec![true, false]);
    assert!(events.errors.lock().is_empty());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_delivered_records_cluster_and_present() {
    let source = Arc::new(CountingSource::new(listings()));
    let events = Arc::new(RecordingEvents::default());
    let config = FetchConfig::default();
    let cache = BoundsCache::new(config.cache_ttl);

    let handle = FetchController::spawn(config, cache, source, events.clone());
    handle.schedule(
        bucharest_bounds(),
        ListingFilter::All,
        ScheduleOptions::immediate(),
    );
    settle(|| events.data_len() == 1).await;
    handle.shutdown().await;

    let records = events.data.lock()[0].0.clone();

    // At city zoom the three downtown listings collapse into one cluster;
    // the distant penthouse stays individual.
    let engine = ClusterEngine::new(ClusterConfig::default());
    let projection = WebMercatorProjection::new(12.0);
    let clusters = engine.build(&records, &Viewport::new(bucharest_bounds(), 12.0), &projection);
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].len(), 3);
    assert!(clusters[1].is_single());

    // Present the clusters and select the individual listing.
    let mut presenter = MarkerPresenter::new();
    let updates = presenter.sync(&clusters);
    assert_eq!(updates.len(), 2);

    let (_, updates) = presenter.activate("lst-4");
    assert_eq!(presenter.selected(), Some("lst-4"));
    assert_eq!(updates.len(), 1);

    // Re-syncing the same clusters touches nothing.
    let updates = presenter.sync(&clusters);
    assert!(updates.is_empty());

    // At street zoom everything renders individually.
    let street = WebMercatorProjection::new(16.0);
    let clusters = engine.build(&records, &Viewport::new(bucharest_bounds(), 16.0), &street);
    assert_eq!(clusters.len(), 4);

    let updates = presenter.sync(&clusters);
    // The cluster marker goes away, its three members appear.
    let removes = updates
        .iter()
        .filter(|u| matches!(u, MarkerUpdate::Remove { .. }))
        .count();
    let places = updates
        .iter()
        .filter(|u| matches!(u, MarkerUpdate::Place { .. }))
        .count();
    assert_eq!(removes, 1);
    assert_eq!(places, 3);
}

#[tokio::test(start_paused = true)]
async fn test_cache_persists_across_controller_restarts() {
    let store = Arc::new(MemoryStore::new());
    let config = FetchConfig::default();

    // First session fetches and persists.
    {
        let source = Arc::new(CountingSource::new(listings()));
        let events = Arc::new(RecordingEvents::default());
        let cache = BoundsCache::with_store(config.cache_ttl, store.clone());
        let handle = FetchController::spawn(config.clone(), cache, source.clone(), events.clone());

        handle.schedule(
            bucharest_bounds(),
            ListingFilter::All,
            ScheduleOptions::immediate(),
        );
        settle(|| events.data_len() == 1).await;
        assert_eq!(source.call_count(), 1);
        handle.shutdown().await;
    }

    // Second session (fresh in-memory cache, same store) serves the same
    // viewport without touching the network.
    let source = Arc::new(CountingSource::new(listings()));
    let events = Arc::new(RecordingEvents::default());
    let cache = BoundsCache::with_store(config.cache_ttl, store);
    let handle = FetchController::spawn(config, cache, source.clone(), events.clone());

    handle.schedule(
        bucharest_bounds(),
        ListingFilter::All,
        ScheduleOptions::immediate(),
    );
    settle(|| events.data_len() == 1).await;

    assert_eq!(source.call_count(), 0);
    assert_eq!(handle.metrics().cache_hits, 1);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_filter_change_fetches_separately() {
    let source = Arc::new(CountingSource::new(listings()));
    let events = Arc::new(RecordingEvents::default());
    let config = FetchConfig::default();
    let cache = BoundsCache::new(config.cache_ttl);
    let handle = FetchController::spawn(config, cache, source.clone(), events.clone());

    handle.schedule(
        bucharest_bounds(),
        ListingFilter::All,
        ScheduleOptions::immediate(),
    );
    settle(|| events.data_len() == 1).await;

    // Switching the filter is a deliberate action and a different cache
    // key: it must fetch again, not reuse the "all" entry.
    handle.schedule(
        bucharest_bounds(),
        ListingFilter::Category(PropertyCategory::House),
        ScheduleOptions::immediate(),
    );
    settle(|| events.data_len() == 2).await;

    assert_eq!(source.call_count(), 2);
    assert_eq!(handle.metrics().cache_hits, 0);
    handle.shutdown().await;
}
