//! Tile-keyed listing cache.
//!
//! See [`bounds::BoundsCache`] for the cache itself and [`key`] for how
//! bounding boxes round onto cache tiles.

pub mod bounds;
pub mod key;

pub use bounds::{BoundsCache, CacheEntry};
pub use key::{coarse_key, fine_key, COARSE_GRID_DEG, FINE_GRID_DEG};
