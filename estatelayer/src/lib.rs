//! EstateLayer - map-bounds listing orchestration
//!
//! This library coordinates property-listing data for a visible map
//! viewport: it decides when to fetch listings, collapses and cancels
//! overlapping fetches, keeps a tile-keyed TTL cache with background
//! refresh, clusters nearby markers by on-screen distance, and computes
//! per-marker visual state for the map provider to draw.
//!
//! # Data flow
//!
//! Viewport change → [`fetch::FetchHandle::schedule`] → cache hit
//! (delivered synchronously, background refresh if stale) or network fetch
//! → [`cache::BoundsCache`] → [`cluster::ClusterEngine`] →
//! [`marker::MarkerPresenter`] → [`map::MarkerSurface`]. Selection and
//! hover flow from the presenter back to the application and down again as
//! marker restyles.
//!
//! Rendering, routing, authentication and the map provider itself are
//! external collaborators; this crate only orchestrates them.

pub mod cache;
pub mod cluster;
pub mod fetch;
pub mod geo;
pub mod listing;
pub mod map;
pub mod marker;
pub mod metrics;
pub mod store;

pub use cache::BoundsCache;
pub use cluster::{Cluster, ClusterConfig, ClusterEngine};
pub use fetch::{
    FetchConfig, FetchController, FetchError, FetchHandle, ListingEvents, ListingSource,
    ScheduleOptions,
};
pub use geo::{BoundingBox, GeoPoint, Viewport, WebMercatorProjection};
pub use listing::{ListingFilter, PropertyCategory, PropertyRecord};
pub use marker::{Activation, MarkerPresenter, MarkerUpdate, MarkerVisual};
