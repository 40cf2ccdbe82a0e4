//! Hover resolution with motion debounce and exit hysteresis
//!
//! Pointer samples are not hit-tested immediately: each one restarts a short
//! motion timer and only the latest sample is resolved when it expires. A
//! highlight the pointer stops touching stays hovered for a grace period, so
//! sliding across the gap between two line fragments of one highlight does
//! not flicker.
//!
//! ```text
//! Idle ──hit──▶ Hovering ──miss──▶ Grace(deadline) ──deadline──▶ Idle
//!   (Entered)      ▲                     │                    (Exited)
//!                  └───────hit───────────┘
//! ```
//!
//! Time is passed in by the owner, which calls [`HoverResolver::tick`] at
//! [`HoverResolver::next_deadline`].

use crate::registry::{HighlightId, HighlightRegistry};
use marginalia_core::{AnnotationId, MarginaliaConfig};
use marginalia_render::Point;
use marginalia_scheduler::{earliest, DebounceTimer};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Annotation ids currently hovered, as published to subscribers
pub type HoveredSet = BTreeSet<AnnotationId>;

/// Hover timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverConfig {
    pub motion_debounce: Duration,
    pub exit_grace: Duration,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            motion_debounce: Duration::from_millis(30),
            exit_grace: Duration::from_millis(60),
        }
    }
}

impl From<&MarginaliaConfig> for HoverConfig {
    fn from(config: &MarginaliaConfig) -> Self {
        Self {
            motion_debounce: config.motion_debounce(),
            exit_grace: config.exit_grace(),
        }
    }
}

/// Per-highlight hover state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverState {
    Idle,
    Hovering,
    Grace { deadline: Instant },
}

/// Transition reported by [`HoverResolver::tick`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverEvent {
    Entered(HighlightId),
    Exited(HighlightId),
}

/// Tracks which highlights the pointer is over and publishes the hovered set
#[derive(Debug)]
pub struct HoverResolver {
    config: HoverConfig,
    motion: DebounceTimer,
    /// Latest sample, `None` when the pointer is outside the container
    latest: Option<Point>,
    /// Non-idle highlights only
    states: BTreeMap<HighlightId, HoverState>,
    published: watch::Sender<HoveredSet>,
}

impl HoverResolver {
    /// Idle resolver publishing an empty set
    pub fn new(config: HoverConfig) -> Self {
        let (published, _) = watch::channel(HoveredSet::new());
        Self {
            config,
            motion: DebounceTimer::new(config.motion_debounce),
            latest: None,
            states: BTreeMap::new(),
            published,
        }
    }

    /// Timing in effect
    pub fn config(&self) -> HoverConfig {
        self.config
    }

    /// Receiver for the hovered annotation set
    pub fn subscribe(&self) -> watch::Receiver<HoveredSet> {
        self.published.subscribe()
    }

    /// The currently published set
    pub fn hovered(&self) -> HoveredSet {
        self.published.borrow().clone()
    }

    /// State of one highlight, `Idle` if untracked
    pub fn state(&self, id: &HighlightId) -> HoverState {
        self.states.get(id).copied().unwrap_or(HoverState::Idle)
    }

    /// Record a container-relative pointer position
    pub fn pointer_moved(&mut self, point: Point, now: Instant) {
        self.latest = Some(point);
        self.motion.schedule(now);
    }

    /// Record the pointer leaving the container
    pub fn pointer_left(&mut self, now: Instant) {
        self.latest = None;
        self.motion.schedule(now);
    }

    /// When the owner should call [`tick`](Self::tick) next
    pub fn next_deadline(&self) -> Option<Instant> {
        let graces = self.states.values().map(|state| match state {
            HoverState::Grace { deadline } => Some(*deadline),
            _ => None,
        });
        earliest(std::iter::once(self.motion.deadline()).chain(graces))
    }

    /// Advance to `now`: expire grace periods, resolve a settled pointer
    /// sample against `registry`, and publish the hovered set if it changed
    pub fn tick(&mut self, now: Instant, registry: &HighlightRegistry) -> Vec<HoverEvent> {
        let mut events = Vec::new();

        let expired: Vec<HighlightId> = self
            .states
            .iter()
            .filter(|(_, state)| matches!(state, HoverState::Grace { deadline } if *deadline <= now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            self.states.remove(&id);
            events.push(HoverEvent::Exited(id));
        }

        if self.motion.poll(now) {
            let hits = match self.latest {
                Some(point) => registry.hit_test(point),
                None => BTreeSet::new(),
            };
            self.apply_hits(hits, now, &mut events);
        }

        for event in &events {
            tracing::trace!(?event, "hover transition");
        }
        self.publish();
        events
    }

    fn apply_hits(&mut self, hits: BTreeSet<HighlightId>, now: Instant, events: &mut Vec<HoverEvent>) {
        let grace_deadline = now + self.config.exit_grace;

        for (id, state) in self.states.iter_mut() {
            if !hits.contains(id) && *state == HoverState::Hovering {
                *state = HoverState::Grace {
                    deadline: grace_deadline,
                };
            }
        }

        for id in hits {
            match self.states.insert(id.clone(), HoverState::Hovering) {
                None | Some(HoverState::Idle) => events.push(HoverEvent::Entered(id)),
                Some(HoverState::Hovering) | Some(HoverState::Grace { .. }) => {}
            }
        }

        // zero grace: leave immediately
        if self.config.exit_grace.is_zero() {
            let gone: Vec<HighlightId> = self
                .states
                .iter()
                .filter(|(_, state)| matches!(state, HoverState::Grace { .. }))
                .map(|(id, _)| id.clone())
                .collect();
            for id in gone {
                self.states.remove(&id);
                events.push(HoverEvent::Exited(id));
            }
        }
    }

    /// Hit-test the last settled pointer position again after the registry
    /// changed under it. A motion sample still pending takes precedence.
    pub fn refresh(&mut self, now: Instant, registry: &HighlightRegistry) -> Vec<HoverEvent> {
        if self.motion.is_pending() {
            return Vec::new();
        }
        let Some(point) = self.latest else {
            return Vec::new();
        };
        let mut events = Vec::new();
        self.apply_hits(registry.hit_test(point), now, &mut events);
        self.publish();
        events
    }

    /// Drop a highlight that was unmounted. No event is emitted.
    pub fn forget(&mut self, id: &HighlightId) {
        if self.states.remove(id).is_some() {
            self.publish();
        }
    }

    /// Cancel every timer, forget every highlight, publish the empty set
    pub fn clear(&mut self) {
        self.motion.cancel();
        self.latest = None;
        self.states.clear();
        self.publish();
    }

    fn publish(&self) {
        let hovered: HoveredSet = self
            .states
            .keys()
            .map(|id| id.annotation_id.clone())
            .collect();
        let changed = self.published.send_if_modified(|current| {
            if *current == hovered {
                return false;
            }
            *current = hovered;
            true
        });
        if changed {
            tracing::debug!(hovered = self.published.borrow().len(), "hovered set changed");
        }
    }
}

impl Default for HoverResolver {
    fn default() -> Self {
        Self::new(HoverConfig::default())
    }
}
