//! Map-provider port.
//!
//! The crate never draws anything itself. The embedding application
//! implements [`MarkerSurface`] over its real map provider and feeds
//! presenter updates through [`apply_updates`]. Viewport snapshots and the
//! coordinate projection live in [`crate::geo`].

use crate::geo::{BoundingBox, GeoPoint};
use crate::marker::{MarkerKind, MarkerUpdate, MarkerVisual};

/// Marker drawing primitives of the external map provider.
pub trait MarkerSurface {
    /// Create a marker, or move an existing one with the same id.
    fn place_marker(&mut self, id: &str, position: GeoPoint, kind: &MarkerKind, visual: MarkerVisual);

    /// Change only the visual state of an existing marker.
    fn restyle_marker(&mut self, id: &str, visual: MarkerVisual);

    /// Remove a marker.
    fn remove_marker(&mut self, id: &str);

    /// Fit the viewport to the given bounds.
    fn fit_bounds(&mut self, bounds: BoundingBox);
}

/// Replay presenter updates onto a surface.
pub fn apply_updates(surface: &mut dyn MarkerSurface, updates: &[MarkerUpdate]) {
    for update in updates {
        match update {
            MarkerUpdate::Place {
                id,
                position,
                kind,
                visual,
            } => surface.place_marker(id, *position, kind, *visual),
            MarkerUpdate::Restyle { id, visual } => surface.restyle_marker(id, *visual),
            MarkerUpdate::Remove { id } => surface.remove_marker(id),
        }
    }
}
