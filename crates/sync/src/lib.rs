//! Marginalia Sync Library
//!
//! Keeps the client-side annotation store consistent with the annotation
//! API. Every operation is one request followed by at most one store
//! mutation, and the store is never touched before the server answers.

pub mod api;
pub mod error;
pub mod sync;

pub use api::{AnnotationApi, AnnotationQuery, HttpAnnotationApi};
pub use error::{ApiError, ApiResult, SyncError, SyncResult};
pub use sync::{AnnotationSync, BucketSync, RemoveOutcome};
