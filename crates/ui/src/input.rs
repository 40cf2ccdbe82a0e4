//! Pointer input for the document container
//!
//! Converts client-space pointer events into container-relative samples. A
//! pointer outside the container bounds is reported the same way as one that
//! left the window.

use marginalia_render::{Point, Rect};

/// What hover resolution should see for a pointer event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerSample {
    /// Inside the container, relative to its origin
    Inside(Point),
    Outside,
}

/// Pointer position relative to the document container
#[derive(Debug, Clone)]
pub struct PointerTracker {
    /// Container bounds in client coordinates
    container: Rect,

    /// Last client position, `None` once the pointer left
    position: Option<Point>,
}

impl PointerTracker {
    /// Tracker with no pointer inside `container`
    pub fn new(container: Rect) -> Self {
        Self {
            container,
            position: None,
        }
    }

    /// Update the container bounds (scroll, resize)
    pub fn set_container(&mut self, container: Rect) {
        self.container = container;
    }

    /// Container bounds in client coordinates
    pub fn container(&self) -> Rect {
        self.container
    }

    /// Last client position, if the pointer is inside
    pub fn position(&self) -> Option<Point> {
        self.position
    }

    /// Handle pointer motion at a client position
    pub fn on_pointer_move(&mut self, client: Point) -> PointerSample {
        self.position = Some(client);
        self.sample()
    }

    /// Handle the pointer leaving the container
    pub fn on_pointer_leave(&mut self) -> PointerSample {
        self.position = None;
        PointerSample::Outside
    }

    /// The last position re-evaluated against the current container bounds
    pub fn sample(&self) -> PointerSample {
        match self.position {
            Some(client) if self.container.contains(client) => {
                PointerSample::Inside(client.relative_to(self.container.origin()))
            }
            _ => PointerSample::Outside,
        }
    }
}
