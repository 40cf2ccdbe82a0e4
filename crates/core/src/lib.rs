//! Marginalia Core Library
//!
//! Annotation data model and the normalized multi-bucket store.

pub mod annotation;
pub mod config;
pub mod error;
pub mod logging;
pub mod reference;
pub mod selection;
pub mod selectors;
pub mod store;
pub mod utf16;

pub use annotation::{
    Annotation, AnnotationBody, AnnotationDraft, AnnotationId, AnnotationPatch, Creator, LinkBody,
    Motivation, Selector, Target, TextRange,
};
pub use config::{ConfigError, MarginaliaConfig};
pub use error::{CoreError, CoreResult};
pub use reference::ParentRef;
pub use selection::{quote_matches, TextSelection};
pub use selectors::{reply_thread, ParentSelector, ReplyThread};
pub use store::{shared_store, AnnotationStore, BucketStore, SharedStore};
pub use utf16::{utf16_len, utf16_slice};
