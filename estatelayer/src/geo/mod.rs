//! Geographic primitives and screen projection.
//!
//! Provides the latitude/longitude types shared across the crate and the
//! Web Mercator projection used to measure on-screen pixel distance when
//! grouping markers into clusters.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Pixel size of one map tile at zoom 0.
pub const TILE_SIZE: f64 = 256.0;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.05112878;

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Create a new point from latitude and longitude in degrees.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A rectangle on the map defined by its south-west and north-east corners.
///
/// Edges are stored as four numeric values so the type stays `Copy` and
/// serializes to a flat object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// South edge latitude (degrees).
    pub south: f64,
    /// West edge longitude (degrees).
    pub west: f64,
    /// North edge latitude (degrees).
    pub north: f64,
    /// East edge longitude (degrees).
    pub east: f64,
}

impl BoundingBox {
    /// Create a bounding box from its four edges.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Create a bounding box from south-west and north-east corners.
    pub fn from_corners(south_west: GeoPoint, north_east: GeoPoint) -> Self {
        Self {
            south: south_west.lat,
            west: south_west.lng,
            north: north_east.lat,
            east: north_east.lng,
        }
    }

    /// Create a degenerate box covering a single point.
    ///
    /// Useful as the seed when accumulating the extent of a point set
    /// with [`BoundingBox::extend`].
    pub fn from_point(point: GeoPoint) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    /// Height of the box in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Width of the box in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Geometric center of the box.
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.south + self.north) / 2.0,
            lng: (self.west + self.east) / 2.0,
        }
    }

    /// Whether the point lies inside the box (edges inclusive).
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lng >= self.west
            && point.lng <= self.east
    }

    /// Grow the box so it also covers `point`.
    pub fn extend(&mut self, point: GeoPoint) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
    }

    /// Whether either span of the box is below `min_span` degrees.
    ///
    /// A map that has not been laid out yet reports near-zero bounds;
    /// such viewports must not trigger fetches.
    pub fn is_degenerate(&self, min_span: f64) -> bool {
        self.width().abs() < min_span || self.height().abs() < min_span
    }
}

/// A point in world pixel coordinates at a fixed zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    /// Euclidean distance to another pixel point.
    pub fn distance(&self, other: &PixelPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Converts geographic coordinates to screen-space pixels.
///
/// The cluster engine only needs a projection for the current viewport,
/// so implementors may bake the zoom level (and any viewport offset) in.
/// [`WebMercatorProjection`] is the stock implementation; tests can supply
/// simpler linear projections.
pub trait Projection {
    /// Project a geographic point to world pixel coordinates.
    fn project(&self, point: GeoPoint) -> PixelPoint;
}

/// Standard Web Mercator projection at a fixed zoom level.
///
/// World pixel coordinates are the Mercator unit square scaled by
/// `TILE_SIZE * 2^zoom`, matching the projection used by the common
/// slippy-map providers.
#[derive(Debug, Clone, Copy)]
pub struct WebMercatorProjection {
    zoom: f64,
}

impl WebMercatorProjection {
    /// Create a projection for the given zoom level.
    pub fn new(zoom: f64) -> Self {
        Self { zoom }
    }

    /// The zoom level this projection was built for.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }
}

impl Projection for WebMercatorProjection {
    fn project(&self, point: GeoPoint) -> PixelPoint {
        let scale = TILE_SIZE * 2.0_f64.powf(self.zoom);
        let lat = point.lat.clamp(-MAX_LAT, MAX_LAT);
        let lat_rad = lat * PI / 180.0;

        let x = (point.lng + 180.0) / 360.0 * scale;
        let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * scale;

        PixelPoint { x, y }
    }
}

/// Snapshot of the visible map viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Visible bounds.
    pub bounds: BoundingBox,
    /// Current zoom level.
    pub zoom: f64,
}

impl Viewport {
    /// Create a viewport snapshot.
    pub fn new(bounds: BoundingBox, zoom: f64) -> Self {
        Self { bounds, zoom }
    }
}
