//! Document view lifecycle
//!
//! A `DocumentView` lives exactly as long as one open document. It owns the
//! highlight registry and hover state for that document, tracks which
//! paragraphs are mounted, and turns store contents plus live layouts into
//! highlight registrations. Dropping the view tears everything down.

use crate::hover::{HoverConfig, HoverEvent, HoverResolver, HoveredSet};
use crate::input::{PointerSample, PointerTracker};
use crate::registry::{HighlightId, HighlightRegistry};
use marginalia_core::{Annotation, Motivation, ParentRef, ParentSelector, SharedStore};
use marginalia_render::{
    requests_for_paragraph, Point, RangeGeometryResolver, RecomputeQueue, Rect, ResolveTrigger, TextLayout,
};
use marginalia_scheduler::{CancellationRegistry, CancellationToken};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError};
use std::time::Instant;
use tokio::sync::watch;

#[derive(Debug)]
struct MountedParagraph {
    text: String,
    /// Per-bucket listings the current registrations were resolved from
    listings: Option<Vec<Arc<[Annotation]>>>,
}

/// What a layout pass changed in the registry
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOutcome {
    pub registered: usize,
    pub updated: usize,
    pub unregistered: usize,
}

/// Highlight and hover state for one open document
#[derive(Debug)]
pub struct DocumentView {
    store: SharedStore,
    selector: ParentSelector,
    resolver: RangeGeometryResolver,
    registry: HighlightRegistry,
    hover: HoverResolver,
    pointer: PointerTracker,
    tokens: CancellationRegistry<ParentRef>,
    queue: RecomputeQueue,
    paragraphs: HashMap<ParentRef, MountedParagraph>,
    /// Registrations changed since the last tick
    registry_dirty: bool,
}

impl DocumentView {
    /// `container` is the document container in client coordinates
    pub fn new(store: SharedStore, container: Rect, hover: HoverConfig) -> Self {
        Self {
            store,
            selector: ParentSelector::new(),
            resolver: RangeGeometryResolver::new(),
            registry: HighlightRegistry::new(),
            hover: HoverResolver::new(hover),
            pointer: PointerTracker::new(container),
            tokens: CancellationRegistry::new(),
            queue: RecomputeQueue::new(),
            paragraphs: HashMap::new(),
            registry_dirty: false,
        }
    }

    /// Highlights registered for mounted paragraphs
    pub fn registry(&self) -> &HighlightRegistry {
        &self.registry
    }

    /// Hover state
    pub fn hover(&self) -> &HoverResolver {
        &self.hover
    }

    /// Receiver for the hovered annotation set
    pub fn subscribe_hover(&self) -> watch::Receiver<HoveredSet> {
        self.hover.subscribe()
    }

    /// Whether `parent` is mounted
    pub fn is_mounted(&self, parent: &ParentRef) -> bool {
        self.paragraphs.contains_key(parent)
    }

    /// Mounted paragraphs, unordered
    pub fn mounted(&self) -> impl Iterator<Item = &ParentRef> {
        self.paragraphs.keys()
    }

    /// Number of memoized per-bucket listings held for mounted paragraphs
    pub fn memoized_listings(&self) -> usize {
        self.selector.len()
    }

    /// Start tracking a paragraph
    ///
    /// The returned token stays live until the paragraph is unmounted or
    /// mounted again; async work started for it (fetches) should check it
    /// before touching the view.
    pub fn mount_paragraph(&mut self, parent: ParentRef, text: impl Into<String>) -> CancellationToken {
        let token = self.tokens.issue(parent.clone());
        self.paragraphs.insert(
            parent.clone(),
            MountedParagraph {
                text: text.into(),
                listings: None,
            },
        );
        tracing::debug!(%parent, "paragraph mounted");
        self.queue.push(parent, ResolveTrigger::Mount);
        token
    }

    /// Queue a geometry pass after a resize
    pub fn request_relayout(&mut self, parent: &ParentRef) -> bool {
        if !self.is_mounted(parent) {
            return false;
        }
        self.queue.push(parent.clone(), ResolveTrigger::Resize);
        true
    }

    /// Queue a geometry pass for every mounted paragraph
    pub fn request_relayout_all(&mut self) {
        for parent in self.paragraphs.keys() {
            self.queue.push(parent.clone(), ResolveTrigger::Resize);
        }
    }

    /// Queue passes for paragraphs whose annotation listings changed since
    /// their last layout. Returns how many were queued.
    pub fn refresh_annotations(&mut self) -> usize {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let mut queued = 0;
        for (parent, paragraph) in &self.paragraphs {
            let Some(previous) = &paragraph.listings else {
                continue;
            };
            let unchanged = Motivation::ALL
                .iter()
                .zip(previous)
                .all(|(&m, listing)| Arc::ptr_eq(listing, &self.selector.select(store.bucket(m), parent)));
            if !unchanged {
                self.queue.push(parent.clone(), ResolveTrigger::AnnotationsChanged);
                queued += 1;
            }
        }
        queued
    }

    /// Take the passes queued since the last call
    pub fn pending_layouts(&mut self) -> Vec<(ParentRef, ResolveTrigger)> {
        self.queue.drain()
    }

    /// Resolve `parent` against its live layout and reconcile registrations
    ///
    /// New highlights are registered, existing ones updated in place, and
    /// ones that no longer resolve are unregistered and forgotten by hover.
    /// Returns `None` if the paragraph is not mounted.
    pub fn layout_paragraph(&mut self, parent: &ParentRef, layout: &dyn TextLayout) -> Option<LayoutOutcome> {
        let paragraph = self.paragraphs.get_mut(parent)?;
        self.queue.remove(parent);

        let listings: Vec<Arc<[Annotation]>> = {
            let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
            Motivation::ALL
                .iter()
                .map(|&m| self.selector.select(store.bucket(m), parent))
                .collect()
        };
        let requests: Vec<_> = listings
            .iter()
            .flat_map(|listing| requests_for_paragraph(parent, listing))
            .collect();
        let geometry = self.resolver.resolve(&paragraph.text, layout, &requests);
        paragraph.listings = Some(listings);

        let origin = layout
            .container_origin()
            .relative_to(self.pointer.container().origin());
        self.registry.set_parent_origin(parent.clone(), origin);

        let mut outcome = LayoutOutcome::default();
        let mut live = HashSet::with_capacity(geometry.len());
        for (annotation_id, boxes) in geometry {
            let id = HighlightId::new(annotation_id, parent.clone());
            if self.registry.update(&id, boxes.clone()) {
                outcome.updated += 1;
            } else {
                self.registry.register(id.clone(), boxes);
                outcome.registered += 1;
            }
            live.insert(id);
        }
        for id in self.registry.ids_for_parent(parent) {
            if !live.contains(&id) {
                self.registry.unregister(&id);
                self.hover.forget(&id);
                outcome.unregistered += 1;
            }
        }

        if outcome != LayoutOutcome::default() {
            self.registry_dirty = true;
        }
        tracing::debug!(
            %parent,
            registered = outcome.registered,
            updated = outcome.updated,
            unregistered = outcome.unregistered,
            "paragraph laid out"
        );
        Some(outcome)
    }

    /// Stop tracking a paragraph: its token is cancelled and its highlights
    /// are dropped without hover events
    pub fn unmount_paragraph(&mut self, parent: &ParentRef) -> bool {
        if self.paragraphs.remove(parent).is_none() {
            return false;
        }
        self.tokens.cancel(parent);
        self.queue.remove(parent);
        for id in self.registry.unregister_parent(parent) {
            self.hover.forget(&id);
        }
        let evicted = self.selector.forget(parent);
        tracing::debug!(%parent, evicted, "paragraph unmounted");
        true
    }

    /// Update the document container bounds (scroll, window resize)
    ///
    /// A size change reflows every paragraph, so all of them are queued for
    /// relayout. A pure move is not.
    pub fn set_container(&mut self, container: Rect) {
        let previous = self.pointer.container();
        self.pointer.set_container(container);
        if previous.width != container.width || previous.height != container.height {
            self.request_relayout_all();
        }
    }

    /// Pointer moved to a client position
    pub fn pointer_moved(&mut self, client: Point, now: Instant) {
        match self.pointer.on_pointer_move(client) {
            PointerSample::Inside(point) => self.hover.pointer_moved(point, now),
            PointerSample::Outside => self.hover.pointer_left(now),
        }
    }

    /// Forward the pointer leaving the document
    pub fn pointer_left(&mut self, now: Instant) {
        self.pointer.on_pointer_leave();
        self.hover.pointer_left(now);
    }

    /// When [`tick`](Self::tick) should run next
    pub fn next_deadline(&self) -> Option<Instant> {
        self.hover.next_deadline()
    }

    /// Advance hover state to `now`
    ///
    /// If a layout pass moved highlights since the last tick, a resting
    /// pointer is hit-tested again against the new boxes.
    pub fn tick(&mut self, now: Instant) -> Vec<HoverEvent> {
        let mut events = self.hover.tick(now, &self.registry);
        if std::mem::take(&mut self.registry_dirty) {
            events.extend(self.hover.refresh(now, &self.registry));
        }
        events
    }

    /// Release everything the view holds and publish an empty hover set
    pub fn teardown(&mut self) {
        self.tokens.cancel_all();
        self.queue.clear();
        self.registry.clear();
        self.hover.clear();
        self.selector.clear();
        self.paragraphs.clear();
        self.registry_dirty = false;
    }
}

impl Drop for DocumentView {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use marginalia_core::{shared_store, AnnotationBody, Creator, Selector, Target};
    use marginalia_render::MonospaceLayout;
    use std::time::Duration;

    const PANGRAM: &str = "The quick brown fox jumps over the lazy dog";

    fn comment(id: &str, element: &str, start: usize, end: usize) -> Annotation {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Annotation {
            id: id.to_string(),
            creator: Creator {
                id: "u1".to_string(),
                name: "Reader".to_string(),
                metadata: Default::default(),
            },
            motivation: Motivation::Comment,
            body: AnnotationBody::text("note"),
            target: vec![Target::with_selector(
                ParentRef::element(element),
                Selector::new("", start, end),
            )],
            created: at,
            modified: at,
        }
    }

    fn view_with(records: Vec<Annotation>) -> DocumentView {
        let store = shared_store();
        store.write().unwrap().add_many(records);
        DocumentView::new(store, Rect::new(0.0, 0.0, 800.0, 600.0), HoverConfig::default())
    }

    #[test]
    fn test_overlapping_comments_hover_together() {
        let p5 = ParentRef::element("5");
        let mut view = view_with(vec![comment("a1", "5", 10, 20), comment("a2", "5", 15, 25)]);
        let rx = view.subscribe_hover();

        view.mount_paragraph(p5.clone(), PANGRAM);
        assert_eq!(view.pending_layouts(), vec![(p5.clone(), ResolveTrigger::Mount)]);
        let outcome = view.layout_paragraph(&p5, &MonospaceLayout::new(PANGRAM, 800.0)).unwrap();
        assert_eq!(outcome.registered, 2);

        let t0 = Instant::now();
        view.pointer_moved(Point::new(140.0, 10.0), t0);
        assert_eq!(view.next_deadline(), Some(t0 + Duration::from_millis(30)));
        let events = view.tick(t0 + Duration::from_millis(30));

        assert_eq!(events.len(), 2);
        assert_eq!(
            *rx.borrow(),
            HoveredSet::from(["a1".to_string(), "a2".to_string()])
        );
    }

    #[test]
    fn test_out_of_range_comment_not_registered() {
        let p5 = ParentRef::element("5");
        let mut view = view_with(vec![comment("a1", "5", 5, 20), comment("a2", "5", 0, 5)]);

        view.mount_paragraph(p5.clone(), "Hello world");
        let outcome = view
            .layout_paragraph(&p5, &MonospaceLayout::new("Hello world", 800.0))
            .unwrap();

        assert_eq!(outcome.registered, 1);
        assert!(view.registry().get(&HighlightId::new("a1", p5.clone())).is_none());
    }

    #[test]
    fn test_refresh_detects_changed_listings() {
        let p5 = ParentRef::element("5");
        let p6 = ParentRef::element("6");
        let mut view = view_with(vec![comment("a1", "5", 0, 3), comment("b1", "6", 0, 3)]);
        view.mount_paragraph(p5.clone(), PANGRAM);
        view.mount_paragraph(p6.clone(), PANGRAM);
        let layout = MonospaceLayout::new(PANGRAM, 800.0);
        view.layout_paragraph(&p5, &layout);
        view.layout_paragraph(&p6, &layout);

        assert_eq!(view.refresh_annotations(), 0);

        view.store.write().unwrap().remove(Motivation::Comment, "a1");
        assert_eq!(view.refresh_annotations(), 1);
        assert_eq!(view.pending_layouts(), vec![(p5.clone(), ResolveTrigger::AnnotationsChanged)]);

        let outcome = view.layout_paragraph(&p5, &layout).unwrap();
        assert_eq!(outcome.unregistered, 1);
        assert_eq!(view.registry().len(), 1);
    }

    #[test]
    fn test_resize_updates_in_place() {
        let p5 = ParentRef::element("5");
        let mut view = view_with(vec![comment("a1", "5", 4, 19)]);
        view.mount_paragraph(p5.clone(), PANGRAM);
        let mut layout = MonospaceLayout::new(PANGRAM, 800.0);
        view.layout_paragraph(&p5, &layout);
        let id = HighlightId::new("a1", p5.clone());
        assert_eq!(view.registry().get(&id).unwrap().boxes.len(), 1);

        layout.set_width(80.0);
        assert!(view.request_relayout(&p5));
        let outcome = view.layout_paragraph(&p5, &layout).unwrap();

        assert_eq!(outcome, LayoutOutcome { registered: 0, updated: 1, unregistered: 0 });
        assert!(view.registry().get(&id).unwrap().boxes.len() > 1);
    }

    #[test]
    fn test_container_resize_queues_every_paragraph() {
        let p5 = ParentRef::element("5");
        let p6 = ParentRef::element("6");
        let mut view = view_with(Vec::new());
        view.mount_paragraph(p5.clone(), PANGRAM);
        view.mount_paragraph(p6.clone(), PANGRAM);
        view.pending_layouts();

        view.set_container(Rect::new(0.0, -120.0, 800.0, 600.0));
        assert!(view.pending_layouts().is_empty());

        view.set_container(Rect::new(0.0, -120.0, 400.0, 600.0));
        let mut pending = view.pending_layouts();
        pending.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            pending,
            vec![(p5, ResolveTrigger::Resize), (p6, ResolveTrigger::Resize)]
        );
    }

    #[test]
    fn test_paragraph_origin_applied_to_hit_testing() {
        let p5 = ParentRef::element("5");
        let mut view = view_with(vec![comment("a1", "5", 0, 5)]);
        view.set_container(Rect::new(50.0, 50.0, 800.0, 600.0));
        view.mount_paragraph(p5.clone(), PANGRAM);
        let layout = MonospaceLayout::new(PANGRAM, 700.0).with_origin(Point::new(50.0, 250.0));
        view.layout_paragraph(&p5, &layout);

        let t0 = Instant::now();
        view.pointer_moved(Point::new(60.0, 260.0), t0);
        view.tick(t0 + Duration::from_millis(30));

        assert_eq!(view.hover().hovered(), HoveredSet::from(["a1".to_string()]));
    }

    #[test]
    fn test_unmount_cancels_token_and_forgets() {
        let p5 = ParentRef::element("5");
        let mut view = view_with(vec![comment("a1", "5", 10, 20)]);
        let token = view.mount_paragraph(p5.clone(), PANGRAM);
        view.layout_paragraph(&p5, &MonospaceLayout::new(PANGRAM, 800.0));
        let t0 = Instant::now();
        view.pointer_moved(Point::new(100.0, 10.0), t0);
        view.tick(t0 + Duration::from_millis(30));

        assert!(view.unmount_paragraph(&p5));

        assert!(token.is_cancelled());
        assert!(view.registry().is_empty());
        assert!(view.hover().hovered().is_empty());
        assert!(view.tick(t0 + Duration::from_millis(500)).is_empty());
        assert!(!view.unmount_paragraph(&p5));
        assert!(view.layout_paragraph(&p5, &MonospaceLayout::new(PANGRAM, 800.0)).is_none());
    }

    #[test]
    fn test_unmount_releases_memoized_listings() {
        let mut view = view_with(vec![comment("a1", "5", 10, 20)]);
        let layout = MonospaceLayout::new(PANGRAM, 800.0);
        for i in 0..20 {
            let parent = ParentRef::element(i.to_string());
            view.mount_paragraph(parent.clone(), PANGRAM);
            view.layout_paragraph(&parent, &layout);
        }
        assert_eq!(view.memoized_listings(), 20 * Motivation::COUNT);

        for i in 0..20 {
            view.unmount_paragraph(&ParentRef::element(i.to_string()));
        }

        assert_eq!(view.mounted().count(), 0);
        assert_eq!(view.memoized_listings(), 0);
    }

    #[test]
    fn test_relayout_rehits_resting_pointer() {
        let p5 = ParentRef::element("5");
        let mut view = view_with(vec![comment("a1", "5", 10, 20)]);
        view.mount_paragraph(p5.clone(), PANGRAM);
        let mut layout = MonospaceLayout::new(PANGRAM, 800.0);
        view.layout_paragraph(&p5, &layout);

        // second line is empty at full width
        let t0 = Instant::now();
        view.pointer_moved(Point::new(20.0, 30.0), t0);
        view.tick(t0 + Duration::from_millis(30));
        assert!(view.hover().hovered().is_empty());

        // narrow wrap moves "brown fox" under the pointer
        layout.set_width(80.0);
        view.request_relayout(&p5);
        view.layout_paragraph(&p5, &layout);
        let events = view.tick(t0 + Duration::from_millis(40));

        assert_eq!(events, vec![HoverEvent::Entered(HighlightId::new("a1", p5.clone()))]);
        assert_eq!(view.hover().hovered(), HoveredSet::from(["a1".to_string()]));
    }

    #[test]
    fn test_remount_supersedes_token() {
        let p5 = ParentRef::element("5");
        let mut view = view_with(Vec::new());
        let first = view.mount_paragraph(p5.clone(), PANGRAM);
        let second = view.mount_paragraph(p5.clone(), PANGRAM);

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_drop_tears_down() {
        let p5 = ParentRef::element("5");
        let mut view = view_with(vec![comment("a1", "5", 10, 20)]);
        let rx = view.subscribe_hover();
        let token = view.mount_paragraph(p5.clone(), PANGRAM);
        view.layout_paragraph(&p5, &MonospaceLayout::new(PANGRAM, 800.0));
        let t0 = Instant::now();
        view.pointer_moved(Point::new(100.0, 10.0), t0);
        view.tick(t0 + Duration::from_millis(30));
        assert!(!rx.borrow().is_empty());

        drop(view);

        assert!(token.is_cancelled());
        assert!(rx.borrow().is_empty());
    }
}
