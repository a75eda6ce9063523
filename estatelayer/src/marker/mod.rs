//! Marker visual state and event wiring.
//!
//! The presenter consumes cluster-engine output plus hover/selection state
//! and computes, per marker, the visual state the map provider should
//! show. Diffing is minimal: only markers whose state actually changed
//! produce updates. Full teardown is reserved for structural changes (the
//! active map surface swapping at a responsive breakpoint) via
//! [`MarkerPresenter::reset`].
//!
//! Pointer clicks and keyboard activation (Enter/Space) share one code
//! path, [`MarkerPresenter::activate`], so keyboard users get the same
//! behavior as pointer users.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cluster::Cluster;
use crate::geo::{BoundingBox, GeoPoint};

/// Visual state of a rendered marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerVisual {
    Default,
    Hovered,
    Selected,
}

/// What a marker represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerKind {
    /// An individual listing.
    Listing,
    /// An aggregate of `count` listings.
    Cluster { count: usize },
}

/// A change the map surface must apply.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerUpdate {
    /// Create or move a marker.
    Place {
        id: String,
        position: GeoPoint,
        kind: MarkerKind,
        visual: MarkerVisual,
    },
    /// Change only the visual state of an existing marker.
    Restyle { id: String, visual: MarkerVisual },
    /// Remove a marker.
    Remove { id: String },
}

/// Outcome of activating a marker (click or Enter/Space).
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// Selection toggled; carries the new selected listing id.
    SelectionChanged(Option<String>),
    /// A cluster was activated; fit the viewport to its members.
    FitBounds(BoundingBox),
    /// The marker is unknown (stale event after a re-sync).
    None,
}

/// Hover/selection-change callbacks consumed by the surrounding UI.
pub trait MarkerEvents: Send + Sync {
    /// The selected listing changed.
    fn on_selection_change(&self, selected: Option<&str>);

    /// The hovered listing changed.
    fn on_hover_change(&self, hovered: Option<&str>);
}

struct RenderedMarker {
    position: GeoPoint,
    kind: MarkerKind,
    bounds: BoundingBox,
    visual: MarkerVisual,
}

/// Computes per-marker visual state and emits minimal updates.
pub struct MarkerPresenter {
    rendered: HashMap<String, RenderedMarker>,
    selected: Option<String>,
    hovered: Option<String>,
    events: Option<Arc<dyn MarkerEvents>>,
}

impl MarkerPresenter {
    /// Create a presenter with no callbacks attached.
    pub fn new() -> Self {
        Self {
            rendered: HashMap::new(),
            selected: None,
            hovered: None,
            events: None,
        }
    }

    /// Create a presenter that reports hover/selection changes.
    pub fn with_events(events: Arc<dyn MarkerEvents>) -> Self {
        Self {
            rendered: HashMap::new(),
            selected: None,
            hovered: None,
            events: Some(events),
        }
    }

    /// Currently selected listing id.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Currently hovered marker id.
    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Diff the rendered markers against a fresh cluster set.
    ///
    /// Markers keep their identity across syncs: an individual marker is
    /// keyed by its listing id, a cluster marker by its seed member and
    /// size. An unchanged marker produces no update at all.
    pub fn sync(&mut self, clusters: &[Cluster]) -> Vec<MarkerUpdate> {
        let mut updates = Vec::new();
        let mut desired: HashMap<String, RenderedMarker> = HashMap::new();

        for cluster in clusters {
            let id = marker_id(cluster);
            let kind = if cluster.is_single() {
                MarkerKind::Listing
            } else {
                MarkerKind::Cluster {
                    count: cluster.len(),
                }
            };
            let visual = self.visual_for(&id, &kind);
            let marker = RenderedMarker {
                position: cluster.centroid,
                kind,
                bounds: cluster.bounds,
                visual,
            };

            match self.rendered.get(&id) {
                None => updates.push(MarkerUpdate::Place {
                    id: id.clone(),
                    position: marker.position,
                    kind: marker.kind.clone(),
                    visual: marker.visual,
                }),
                Some(existing)
                    if existing.position != marker.position || existing.kind != marker.kind =>
                {
                    updates.push(MarkerUpdate::Place {
                        id: id.clone(),
                        position: marker.position,
                        kind: marker.kind.clone(),
                        visual: marker.visual,
                    })
                }
                Some(existing) if existing.visual != marker.visual => {
                    updates.push(MarkerUpdate::Restyle {
                        id: id.clone(),
                        visual: marker.visual,
                    })
                }
                Some(_) => {}
            }

            desired.insert(id, marker);
        }

        for id in self.rendered.keys() {
            if !desired.contains_key(id) {
                updates.push(MarkerUpdate::Remove { id: id.clone() });
            }
        }

        self.rendered = desired;
        updates
    }

    /// Pointer entered a marker.
    pub fn pointer_enter(&mut self, id: &str) -> Vec<MarkerUpdate> {
        self.set_hover(Some(id.to_string()))
    }

    /// Pointer left a marker.
    pub fn pointer_leave(&mut self, id: &str) -> Vec<MarkerUpdate> {
        if self.hovered.as_deref() == Some(id) {
            self.set_hover(None)
        } else {
            Vec::new()
        }
    }

    /// Apply a hover change (pointer or list-side highlight).
    pub fn set_hover(&mut self, next: Option<String>) -> Vec<MarkerUpdate> {
        if self.hovered == next {
            return Vec::new();
        }
        let previous = std::mem::replace(&mut self.hovered, next);
        if let Some(events) = &self.events {
            events.on_hover_change(self.hovered.as_deref());
        }

        let mut updates = Vec::new();
        self.restyle_if_changed(previous.as_deref(), &mut updates);
        let current = self.hovered.clone();
        self.restyle_if_changed(current.as_deref(), &mut updates);
        updates
    }

    /// Activate a marker: pointer click or Enter/Space.
    ///
    /// Listings toggle selection: activating the selected listing
    /// deselects it. Activating a cluster requests a fit-to-bounds over
    /// its members and leaves selection untouched.
    pub fn activate(&mut self, id: &str) -> (Activation, Vec<MarkerUpdate>) {
        let cluster_bounds = match self.rendered.get(id) {
            None => return (Activation::None, Vec::new()),
            Some(marker) => match marker.kind {
                MarkerKind::Cluster { .. } => Some(marker.bounds),
                MarkerKind::Listing => None,
            },
        };

        if let Some(bounds) = cluster_bounds {
            return (Activation::FitBounds(bounds), Vec::new());
        }

        let next = if self.selected.as_deref() == Some(id) {
            None
        } else {
            Some(id.to_string())
        };
        let updates = self.set_selection(next.clone());
        (Activation::SelectionChanged(next), updates)
    }

    /// Apply a selection change (from activation or from the application).
    pub fn set_selection(&mut self, next: Option<String>) -> Vec<MarkerUpdate> {
        if self.selected == next {
            return Vec::new();
        }
        let previous = std::mem::replace(&mut self.selected, next);
        if let Some(events) = &self.events {
            events.on_selection_change(self.selected.as_deref());
        }

        let mut updates = Vec::new();
        self.restyle_if_changed(previous.as_deref(), &mut updates);
        let current = self.selected.clone();
        self.restyle_if_changed(current.as_deref(), &mut updates);
        updates
    }

    /// Tear down every marker.
    ///
    /// For structural changes only (e.g. the active map surface swapped);
    /// selection and hover survive so the next sync restores emphasis.
    pub fn reset(&mut self) -> Vec<MarkerUpdate> {
        let updates = self
            .rendered
            .keys()
            .map(|id| MarkerUpdate::Remove { id: id.clone() })
            .collect();
        self.rendered.clear();
        updates
    }

    fn visual_for(&self, id: &str, kind: &MarkerKind) -> MarkerVisual {
        match kind {
            // Clusters never carry selection; hover still applies.
            MarkerKind::Cluster { .. } => {
                if self.hovered.as_deref() == Some(id) {
                    MarkerVisual::Hovered
                } else {
                    MarkerVisual::Default
                }
            }
            MarkerKind::Listing => {
                // A selected marker keeps its emphasis regardless of hover.
                if self.selected.as_deref() == Some(id) {
                    MarkerVisual::Selected
                } else if self.hovered.as_deref() == Some(id) {
                    MarkerVisual::Hovered
                } else {
                    MarkerVisual::Default
                }
            }
        }
    }

    fn restyle_if_changed(&mut self, id: Option<&str>, updates: &mut Vec<MarkerUpdate>) {
        let Some(id) = id else {
            return;
        };
        let Some(marker) = self.rendered.get(id) else {
            return;
        };
        let visual = self.visual_for(id, &marker.kind);
        if marker.visual != visual {
            if let Some(marker) = self.rendered.get_mut(id) {
                marker.visual = visual;
            }
            updates.push(MarkerUpdate::Restyle {
                id: id.to_string(),
                visual,
            });
        }
    }
}

impl Default for MarkerPresenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable marker identity for a cluster.
///
/// Individual markers reuse the listing id; aggregate markers key on the
/// seed member and size so an unchanged grouping keeps its marker.
fn marker_id(cluster: &Cluster) -> String {
    if cluster.is_single() {
        cluster.members[0].id.clone()
    } else {
        format!("cluster:{}:{}", cluster.members[0].id, cluster.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{PropertyCategory, PropertyRecord};
    use parking_lot::Mutex;

    fn record(id: &str, lat: f64, lng: f64) -> PropertyRecord {
        PropertyRecord {
            id: id.to_string(),
            title: "Listing".to_string(),
            price_label: "100 000 EUR".to_string(),
            location: "Bucharest".to_string(),
            position: GeoPoint::new(lat, lng),
            media: Vec::new(),
            category: PropertyCategory::Apartment,
            features: Vec::new(),
            developer: None,
        }
    }

    fn single(id: &str, lat: f64, lng: f64) -> Cluster {
        let record = record(id, lat, lng);
        let bounds = BoundingBox::from_point(record.position);
        Cluster {
            centroid: record.position,
            members: vec![record],
            bounds,
        }
    }

    fn pair(id_a: &str, id_b: &str) -> Cluster {
        let a = record(id_a, 44.4400, 26.1000);
        let b = record(id_b, 44.4410, 26.1010);
        let mut bounds = BoundingBox::from_point(a.position);
        bounds.extend(b.position);
        Cluster {
            centroid: bounds.center(),
            members: vec![a, b],
            bounds,
        }
    }

    #[derive(Default)]
    struct RecordingMarkerEvents {
        selections: Mutex<Vec<Option<String>>>,
        hovers: Mutex<Vec<Option<String>>>,
    }

    impl MarkerEvents for RecordingMarkerEvents {
        fn on_selection_change(&self, selected: Option<&str>) {
            self.selections.lock().push(selected.map(str::to_string));
        }

        fn on_hover_change(&self, hovered: Option<&str>) {
            self.hovers.lock().push(hovered.map(str::to_string));
        }
    }

    #[test]
    fn test_sync_places_new_markers() {
        let mut presenter = MarkerPresenter::new();
        let clusters = vec![single("a", 44.44, 26.10), pair("b", "c")];

        let updates = presenter.sync(&clusters);
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| matches!(u, MarkerUpdate::Place { .. })));
    }

    #[test]
    fn test_sync_is_minimal_when_nothing_changed() {
        let mut presenter = MarkerPresenter::new();
        let clusters = vec![single("a", 44.44, 26.10), pair("b", "c")];

        presenter.sync(&clusters);
        let updates = presenter.sync(&clusters);
        assert!(updates.is_empty());
    }

    #[test]
    fn test_sync_removes_vanished_markers() {
        let mut presenter = MarkerPresenter::new();
        presenter.sync(&[single("a", 44.44, 26.10), single("b", 44.45, 26.11)]);

        let updates = presenter.sync(&[single("a", 44.44, 26.10)]);
        assert_eq!(
            updates,
            vec![MarkerUpdate::Remove {
                id: "b".to_string()
            }]
        );
    }

    #[test]
    fn test_hover_restyles_only_affected_marker() {
        let mut presenter = MarkerPresenter::new();
        presenter.sync(&[single("a", 44.44, 26.10), single("b", 44.45, 26.11)]);

        let updates = presenter.pointer_enter("a");
        assert_eq!(
            updates,
            vec![MarkerUpdate::Restyle {
                id: "a".to_string(),
                visual: MarkerVisual::Hovered
            }]
        );

        let updates = presenter.pointer_leave("a");
        assert_eq!(
            updates,
            vec![MarkerUpdate::Restyle {
                id: "a".to_string(),
                visual: MarkerVisual::Default
            }]
        );
    }

    #[test]
    fn test_selection_toggles() {
        let mut presenter = MarkerPresenter::new();
        presenter.sync(&[single("a", 44.44, 26.10)]);

        let (outcome, updates) = presenter.activate("a");
        assert_eq!(
            outcome,
            Activation::SelectionChanged(Some("a".to_string()))
        );
        assert_eq!(
            updates,
            vec![MarkerUpdate::Restyle {
                id: "a".to_string(),
                visual: MarkerVisual::Selected
            }]
        );

        // Activating the selected marker deselects it.
        let (outcome, updates) = presenter.activate("a");
        assert_eq!(outcome, Activation::SelectionChanged(None));
        assert_eq!(
            updates,
            vec![MarkerUpdate::Restyle {
                id: "a".to_string(),
                visual: MarkerVisual::Default
            }]
        );
    }

    #[test]
    fn test_selecting_another_marker_deselects_previous() {
        let mut presenter = MarkerPresenter::new();
        presenter.sync(&[single("a", 44.44, 26.10), single("b", 44.45, 26.11)]);

        presenter.activate("a");
        let (outcome, updates) = presenter.activate("b");

        assert_eq!(
            outcome,
            Activation::SelectionChanged(Some("b".to_string()))
        );
        assert!(updates.contains(&MarkerUpdate::Restyle {
            id: "a".to_string(),
            visual: MarkerVisual::Default
        }));
        assert!(updates.contains(&MarkerUpdate::Restyle {
            id: "b".to_string(),
            visual: MarkerVisual::Selected
        }));
    }

    #[test]
    fn test_selected_marker_keeps_emphasis_under_hover() {
        let mut presenter = MarkerPresenter::new();
        presenter.sync(&[single("a", 44.44, 26.10)]);
        presenter.activate("a");

        // Hovering the selected marker changes nothing visually.
        let updates = presenter.pointer_enter("a");
        assert!(updates.is_empty());
        assert_eq!(presenter.hovered(), Some("a"));
    }

    #[test]
    fn test_cluster_activation_fits_bounds_without_selecting() {
        let mut presenter = MarkerPresenter::new();
        presenter.sync(&[single("a", 44.44, 26.10)]);
        presenter.activate("a");

        let cluster = pair("b", "c");
        let expected_bounds = cluster.bounds;
        presenter.sync(&[single("a", 44.44, 26.10), cluster]);

        let (outcome, updates) = presenter.activate("cluster:b:2");
        assert_eq!(outcome, Activation::FitBounds(expected_bounds));
        assert!(updates.is_empty());
        // Selection untouched.
        assert_eq!(presenter.selected(), Some("a"));
    }

    #[test]
    fn test_activate_unknown_marker_is_noop() {
        let mut presenter = MarkerPresenter::new();
        let (outcome, updates) = presenter.activate("ghost");
        assert_eq!(outcome, Activation::None);
        assert!(updates.is_empty());
    }

    #[test]
    fn test_reset_removes_everything_but_keeps_selection() {
        let mut presenter = MarkerPresenter::new();
        presenter.sync(&[single("a", 44.44, 26.10), single("b", 44.45, 26.11)]);
        presenter.activate("a");

        let updates = presenter.reset();
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| matches!(u, MarkerUpdate::Remove { .. })));

        // Re-sync on the new surface restores the selected visual.
        let updates = presenter.sync(&[single("a", 44.44, 26.10)]);
        assert_eq!(
            updates,
            vec![MarkerUpdate::Place {
                id: "a".to_string(),
                position: GeoPoint::new(44.44, 26.10),
                kind: MarkerKind::Listing,
                visual: MarkerVisual::Selected,
            }]
        );
    }

    #[test]
    fn test_events_fire_on_selection_and_hover() {
        let events = Arc::new(RecordingMarkerEvents::default());
        let mut presenter = MarkerPresenter::with_events(events.clone());
        presenter.sync(&[single("a", 44.44, 26.10)]);

        presenter.activate("a");
        presenter.pointer_enter("a");
        presenter.pointer_leave("a");
        presenter.activate("a");

        assert_eq!(
            *events.selections.lock(),
            vec![Some("a".to_string()), None]
        );
        assert_eq!(
            *events.hovers.lock(),
            vec![Some("a".to_string()), None]
        );
    }
}
