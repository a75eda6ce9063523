//! Cache key derivation from bounding boxes.
//!
//! Two grid resolutions serve different purposes:
//!
//! - The **coarse** grid (~5 km) keys the bounds cache. Small pans land on
//!   the same tile, maximizing hit rate.
//! - The **fine** grid (~100 m) keys fetch deduplication. Viewport events
//!   that differ only by sub-tile coordinate jitter collapse onto one key
//!   without merging genuinely different viewports.
//!
//! Keys are plain strings (`"b:{s}:{w}:{n}:{e}|{filter}"`) so they stay
//! readable in logs and can index any string-keyed durable store. The
//! active filter is appended so different property-type filters never
//! collide.

use crate::geo::BoundingBox;
use crate::listing::ListingFilter;

/// Grid step for cache tiles, in degrees (~5 km).
pub const COARSE_GRID_DEG: f64 = 0.05;

/// Grid step for fetch deduplication, in degrees (~100 m).
pub const FINE_GRID_DEG: f64 = 0.001;

/// Derive the cache-tile key for a viewport.
pub fn coarse_key(bounds: &BoundingBox, filter: &ListingFilter) -> String {
    bounds_key(bounds, filter, COARSE_GRID_DEG)
}

/// Derive the fetch-dedup key for a viewport.
pub fn fine_key(bounds: &BoundingBox, filter: &ListingFilter) -> String {
    bounds_key(bounds, filter, FINE_GRID_DEG)
}

fn bounds_key(bounds: &BoundingBox, filter: &ListingFilter, step: f64) -> String {
    format!(
        "b:{}:{}:{}:{}|{}",
        grid_cell(bounds.south, step),
        grid_cell(bounds.west, step),
        grid_cell(bounds.north, step),
        grid_cell(bounds.east, step),
        filter.key_fragment()
    )
}

/// Snap a coordinate to its nearest grid cell index.
///
/// Integer cell indices sidestep float formatting entirely; two values
/// within half a step of the same cell center produce the same index.
fn grid_cell(value: f64, step: f64) -> i64 {
    (value / step).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bounds() -> BoundingBox {
        BoundingBox::new(44.40, 26.00, 44.48, 26.12)
    }

    #[test]
    fn test_small_pan_hits_same_coarse_tile() {
        let panned = BoundingBox::new(44.401, 26.002, 44.481, 26.122);
        assert_eq!(
            coarse_key(&bounds(), &ListingFilter::All),
            coarse_key(&panned, &ListingFilter::All)
        );
    }

    #[test]
    fn test_small_pan_changes_fine_key() {
        // The same pan that re-hits the coarse tile moves the fine key.
        let panned = BoundingBox::new(44.402, 26.002, 44.482, 26.122);
        assert_ne!(
            fine_key(&bounds(), &ListingFilter::All),
            fine_key(&panned, &ListingFilter::All)
        );
    }

    #[test]
    fn test_filter_never_collides() {
        use crate::listing::PropertyCategory;

        let all = coarse_key(&bounds(), &ListingFilter::All);
        let apartments = coarse_key(
            &bounds(),
            &ListingFilter::Category(PropertyCategory::Apartment),
        );
        let houses = coarse_key(&bounds(), &ListingFilter::Category(PropertyCategory::House));

        assert_ne!(all, apartments);
        assert_ne!(apartments, houses);
    }

    #[test]
    fn test_key_format_is_stable() {
        let key = coarse_key(&BoundingBox::new(0.0, 0.0, 0.05, 0.05), &ListingFilter::All);
        assert_eq!(key, "b:0:0:1:1|all");
    }

    proptest! {
        /// Jitter well inside a grid cell never changes the coarse key.
        #[test]
        fn prop_coarse_key_stable_under_jitter(
            south in -1000i64..1000,
            west in -1000i64..1000,
            jitter in -0.01f64..0.01,
        ) {
            let base = BoundingBox::new(
                south as f64 * COARSE_GRID_DEG,
                west as f64 * COARSE_GRID_DEG,
                (south + 2) as f64 * COARSE_GRID_DEG,
                (west + 3) as f64 * COARSE_GRID_DEG,
            );
            let mut moved = base;
            moved.south += jitter;
            moved.west += jitter;
            moved.north += jitter;
            moved.east += jitter;

            prop_assert_eq!(
                coarse_key(&base, &ListingFilter::All),
                coarse_key(&moved, &ListingFilter::All)
            );
        }
    }
}
