//! Registry of rendered highlights
//!
//! Each mounted highlight registers its boxes here after every layout pass so
//! hover resolution can hit-test without touching the layout engine. One
//! registry belongs to one document view; there is no global instance.
//!
//! Boxes are stored relative to their paragraph's container. Where each
//! paragraph container sits in the view is recorded separately with
//! [`HighlightRegistry::set_parent_origin`], so a relayout that only moves a
//! paragraph does not rewrite its highlights.

use marginalia_core::{AnnotationId, ParentRef};
use marginalia_render::{Point, Rect};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One rendered highlight: an annotation's ranges on one paragraph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HighlightId {
    pub parent: ParentRef,
    pub annotation_id: AnnotationId,
}

impl HighlightId {
    /// Highlight of `annotation_id` on `parent`
    pub fn new(annotation_id: impl Into<AnnotationId>, parent: ParentRef) -> Self {
        Self {
            parent,
            annotation_id: annotation_id.into(),
        }
    }
}

impl std::fmt::Display for HighlightId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.annotation_id, self.parent)
    }
}

/// Information about a registered highlight
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredHighlight {
    pub id: HighlightId,
    /// Paragraph-relative boxes from the last layout pass
    pub boxes: Vec<Rect>,
}

impl RegisteredHighlight {
    /// Annotation the highlight renders
    pub fn annotation_id(&self) -> &str {
        &self.id.annotation_id
    }

    /// Paragraph the highlight sits in
    pub fn parent(&self) -> &ParentRef {
        &self.id.parent
    }
}

/// Highlights currently on screen for one document view
#[derive(Debug, Default)]
pub struct HighlightRegistry {
    highlights: BTreeMap<HighlightId, RegisteredHighlight>,
    origins: HashMap<ParentRef, Point>,
}

impl HighlightRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a highlight
    pub fn register(&mut self, id: HighlightId, boxes: Vec<Rect>) -> Option<RegisteredHighlight> {
        tracing::trace!(highlight = %id, boxes = boxes.len(), "register highlight");
        self.highlights
            .insert(id.clone(), RegisteredHighlight { id, boxes })
    }

    /// Replace the boxes of a registered highlight. Returns `false` if unknown.
    pub fn update(&mut self, id: &HighlightId, boxes: Vec<Rect>) -> bool {
        match self.highlights.get_mut(id) {
            Some(highlight) => {
                highlight.boxes = boxes;
                true
            }
            None => false,
        }
    }

    /// Remove a highlight, returning it
    pub fn unregister(&mut self, id: &HighlightId) -> Option<RegisteredHighlight> {
        self.highlights.remove(id)
    }

    /// Drop every highlight on `parent` and its origin; returns the removed ids
    pub fn unregister_parent(&mut self, parent: &ParentRef) -> Vec<HighlightId> {
        self.origins.remove(parent);
        let removed = self.ids_for_parent(parent);
        for id in &removed {
            self.highlights.remove(id);
        }
        removed
    }

    /// Highlight by id
    pub fn get(&self, id: &HighlightId) -> Option<&RegisteredHighlight> {
        self.highlights.get(id)
    }

    /// Every registration, in id order
    pub fn get_all(&self) -> Vec<&RegisteredHighlight> {
        self.highlights.values().collect()
    }

    /// Ids of every highlight on `parent`
    pub fn ids_for_parent(&self, parent: &ParentRef) -> Vec<HighlightId> {
        self.highlights
            .keys()
            .filter(|id| &id.parent == parent)
            .cloned()
            .collect()
    }

    /// Where `parent`'s container sits in view coordinates
    pub fn set_parent_origin(&mut self, parent: ParentRef, origin: Point) {
        self.origins.insert(parent, origin);
    }

    /// Origin of `parent` within the view, `(0, 0)` if unset
    pub fn parent_origin(&self, parent: &ParentRef) -> Point {
        self.origins.get(parent).copied().unwrap_or_default()
    }

    /// Every highlight with a box containing `point` (view coordinates,
    /// inclusive edges)
    pub fn hit_test(&self, point: Point) -> BTreeSet<HighlightId> {
        self.highlights
            .values()
            .filter(|highlight| {
                let local = point.relative_to(self.parent_origin(highlight.parent()));
                highlight.boxes.iter().any(|rect| rect.contains(local))
            })
            .map(|highlight| highlight.id.clone())
            .collect()
    }

    /// Number of registered highlights
    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    /// No highlights registered
    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    /// Drop every highlight and paragraph origin
    pub fn clear(&mut self) {
        self.highlights.clear();
        self.origins.clear();
    }
}
