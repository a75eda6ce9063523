//! Pixel-distance marker clustering.
//!
//! Groups listings whose markers would overlap on screen into aggregate
//! markers. The merge is a single greedy pass in input order: each
//! unclaimed point opens a cluster and claims every later unclaimed point
//! within the pixel threshold of it. Claimed points are never reconsidered,
//! so the result depends on input order and is not globally optimal, an
//! accepted tradeoff for O(n²) worst-case behavior that is fast at the
//! typical tens-to-low-hundreds of markers per viewport.
//!
//! Clustering only engages below a zoom threshold and above a small point
//! count; otherwise every listing renders individually.

use crate::geo::{BoundingBox, GeoPoint, PixelPoint, Projection, Viewport};
use crate::listing::PropertyRecord;

/// A group of listings rendered as one marker.
///
/// A cluster with exactly one member renders as an individual marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Center of the members' bounding box (not the seed point).
    pub centroid: GeoPoint,
    /// Member listings, seed first.
    pub members: Vec<PropertyRecord>,
    /// Geographic extent of the members.
    pub bounds: BoundingBox,
}

impl Cluster {
    /// Number of member listings.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether this cluster renders as an individual marker.
    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }
}

/// Configuration for the cluster engine.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// On-screen distance below which two markers merge, in pixels.
    pub pixel_threshold: f64,
    /// Zoom level at or above which every listing renders individually.
    pub max_cluster_zoom: f64,
    /// Minimum point count before clustering is worth the overhead.
    pub min_points: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            pixel_threshold: 60.0,
            max_cluster_zoom: 14.0,
            min_points: 4,
        }
    }
}

impl ClusterConfig {
    /// Set the pixel merge threshold.
    pub fn with_pixel_threshold(mut self, pixels: f64) -> Self {
        self.pixel_threshold = pixels;
        self
    }

    /// Set the zoom level above which clustering is skipped.
    pub fn with_max_cluster_zoom(mut self, zoom: f64) -> Self {
        self.max_cluster_zoom = zoom;
        self
    }

    /// Set the minimum point count for clustering.
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }
}

/// Groups viewport listings for rendering.
#[derive(Debug, Clone, Default)]
pub struct ClusterEngine {
    config: ClusterConfig,
}

impl ClusterEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Build the render set for the current viewport.
    ///
    /// At or above the zoom threshold, or below the point floor, every
    /// listing becomes its own singleton cluster.
    pub fn build(
        &self,
        points: &[PropertyRecord],
        viewport: &Viewport,
        projection: &dyn Projection,
    ) -> Vec<Cluster> {
        if viewport.zoom >= self.config.max_cluster_zoom || points.len() < self.config.min_points {
            return points.iter().map(|p| singleton(p.clone())).collect();
        }
        cluster(points, projection, self.config.pixel_threshold)
    }
}

/// One greedy clustering pass over `points` in input order.
///
/// Deterministic for a fixed input order; a different order of the same
/// points can produce different groupings.
pub fn cluster(
    points: &[PropertyRecord],
    projection: &dyn Projection,
    pixel_threshold: f64,
) -> Vec<Cluster> {
    let pixels: Vec<PixelPoint> = points
        .iter()
        .map(|p| projection.project(p.position))
        .collect();

    let mut claimed = vec![false; points.len()];
    let mut clusters = Vec::new();

    for i in 0..points.len() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;
        let mut members = vec![points[i].clone()];

        for j in (i + 1)..points.len() {
            if claimed[j] {
                continue;
            }
            if pixels[i].distance(&pixels[j]) < pixel_threshold {
                claimed[j] = true;
                members.push(points[j].clone());
            }
        }

        clusters.push(build_cluster(members));
    }

    clusters
}

fn build_cluster(members: Vec<PropertyRecord>) -> Cluster {
    let mut bounds = BoundingBox::from_point(members[0].position);
    for member in &members[1..] {
        bounds.extend(member.position);
    }
    Cluster {
        // Bounding-box center, so the marker sits at the geometric center
        // instead of biased toward the seed.
        centroid: bounds.center(),
        members,
        bounds,
    }
}

fn singleton(record: PropertyRecord) -> Cluster {
    let bounds = BoundingBox::from_point(record.position);
    Cluster {
        centroid: record.position,
        members: vec![record],
        bounds,
    }
}
