//! Marginalia UI Library
//!
//! Highlight interaction for an open document: registration of rendered
//! highlights, pointer tracking, and debounced hover resolution.

pub mod hover;
pub mod input;
pub mod registry;
pub mod view;

pub use hover::{HoverConfig, HoverEvent, HoverResolver, HoverState, HoveredSet};
pub use input::{PointerSample, PointerTracker};
pub use registry::{HighlightId, HighlightRegistry, RegisteredHighlight};
pub use view::{DocumentView, LayoutOutcome};
