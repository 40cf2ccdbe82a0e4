//! Coalescing of geometry recompute triggers
//!
//! Several things can ask for a paragraph to be re-resolved within one frame.
//! Only one pass per paragraph runs; the strongest reason wins.

use marginalia_core::ParentRef;

/// Why a paragraph needs a new geometry pass, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResolveTrigger {
    /// Container size changed; the annotation list did not
    Resize,
    /// The parent's annotation listing changed
    AnnotationsChanged,
    /// First layout after mounting
    Mount,
}

impl ResolveTrigger {
    /// Triggers that change what is resolved, not only where
    pub fn is_content(&self) -> bool {
        !matches!(self, ResolveTrigger::Resize)
    }
}

/// Pending triggers per paragraph, in first-request order
#[derive(Debug, Default, Clone)]
pub struct RecomputeQueue {
    pending: Vec<(ParentRef, ResolveTrigger)>,
}

impl RecomputeQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a pass for `parent`
    ///
    /// A content trigger supersedes a pending resize; a resize arriving after
    /// a content trigger is absorbed. Returns `true` if nothing was pending
    /// for `parent` before.
    pub fn push(&mut self, parent: ParentRef, trigger: ResolveTrigger) -> bool {
        if let Some((_, pending)) = self.pending.iter_mut().find(|(p, _)| *p == parent) {
            *pending = (*pending).max(trigger);
            return false;
        }
        self.pending.push((parent, trigger));
        true
    }

    /// Trigger queued for `parent`, if any
    pub fn pending(&self, parent: &ParentRef) -> Option<ResolveTrigger> {
        self.pending
            .iter()
            .find(|(p, _)| p == parent)
            .map(|(_, trigger)| *trigger)
    }

    /// Drop a pending pass, e.g. on unmount
    pub fn remove(&mut self, parent: &ParentRef) -> Option<ResolveTrigger> {
        let index = self.pending.iter().position(|(p, _)| p == parent)?;
        Some(self.pending.remove(index).1)
    }

    /// Take everything queued this frame
    pub fn drain(&mut self) -> Vec<(ParentRef, ResolveTrigger)> {
        std::mem::take(&mut self.pending)
    }

    /// Number of queued paragraphs
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Nothing queued
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop everything queued
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
