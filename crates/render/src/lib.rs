//! Marginalia Render Library
//!
//! Turns annotation character ranges into paragraph-relative rectangles.

pub mod error;
pub mod geometry;
pub mod layout;
pub mod recompute;
pub mod resolver;

pub use error::{GeometryError, GeometryResult};
pub use geometry::{Point, Rect};
pub use layout::{MonospaceLayout, TextLayout};
pub use recompute::{RecomputeQueue, ResolveTrigger};
pub use resolver::{requests_for_paragraph, RangeGeometry, RangeGeometryResolver, RangeRequest};
