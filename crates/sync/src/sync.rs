//! Per-bucket synchronization
//!
//! Each bucket operation validates locally, makes exactly one request, and
//! only then mutates the store. Store locks are never held across a request.

use crate::api::{AnnotationApi, AnnotationQuery};
use crate::error::{SyncError, SyncResult};
use marginalia_core::{
    Annotation, AnnotationDraft, AnnotationId, AnnotationPatch, CoreError, Motivation, ParentRef, SharedStore,
};
use marginalia_scheduler::CancellationToken;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Acknowledged by the server and removed from the store
    Removed,
    /// A delete for this id is already in flight; no request was made
    AlreadyPending,
}

type PendingDeletes = Arc<Mutex<HashSet<(Motivation, AnnotationId)>>>;

/// Entry point shared by every bucket of one store
#[derive(Clone)]
pub struct AnnotationSync {
    api: Arc<dyn AnnotationApi>,
    store: SharedStore,
    pending_deletes: PendingDeletes,
}

impl AnnotationSync {
    /// Sync over `api` into `store`
    pub fn new(api: Arc<dyn AnnotationApi>, store: SharedStore) -> Self {
        Self {
            api,
            store,
            pending_deletes: Arc::default(),
        }
    }

    /// The store every bucket writes to
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Operations scoped to one motivation bucket
    pub fn bucket(&self, motivation: Motivation) -> BucketSync {
        BucketSync {
            motivation,
            api: Arc::clone(&self.api),
            store: Arc::clone(&self.store),
            pending_deletes: Arc::clone(&self.pending_deletes),
        }
    }
}

impl std::fmt::Debug for AnnotationSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationSync").finish_non_exhaustive()
    }
}

/// Sync operations for one bucket; cheap to clone and `'static`
#[derive(Clone)]
pub struct BucketSync {
    motivation: Motivation,
    api: Arc<dyn AnnotationApi>,
    store: SharedStore,
    pending_deletes: PendingDeletes,
}

impl BucketSync {
    /// Bucket this handle operates on
    pub fn motivation(&self) -> Motivation {
        self.motivation
    }

    /// Fetch this bucket's records on `parent` and merge them into the store
    ///
    /// Only document elements can be queried. Records the server returns
    /// with another motivation are refused by the bucket and left out of the
    /// result. Concurrent fetches for one parent resolve in arrival order:
    /// the later response is merged last.
    pub async fn fetch(&self, parent: &ParentRef, classroom_id: Option<&str>) -> SyncResult<Vec<Annotation>> {
        let ParentRef::DocumentElement(element_id) = parent else {
            return Err(CoreError::validation(format!("cannot fetch annotations of {parent}")).into());
        };
        let query = AnnotationQuery::new(self.motivation, element_id.as_str()).with_classroom(classroom_id);

        let records = self.api.list(&query).await?;
        tracing::info!(
            motivation = %self.motivation,
            %parent,
            received = records.len(),
            "fetched annotations"
        );

        let records: Vec<Annotation> = records
            .into_iter()
            .filter(|record| {
                let ours = record.motivation == self.motivation;
                if !ours {
                    tracing::warn!(
                        id = %record.id,
                        motivation = %record.motivation,
                        bucket = %self.motivation,
                        "skipping record from another bucket"
                    );
                }
                ours
            })
            .collect();

        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        store.bucket_mut(self.motivation).add_many(records.iter().cloned());
        Ok(records)
    }

    /// [`fetch`](Self::fetch), returning `None` if `token` was cancelled
    /// while the request was in flight
    ///
    /// The store is updated either way; only the caller's continuation is
    /// suppressed.
    pub async fn fetch_guarded(
        &self,
        parent: &ParentRef,
        classroom_id: Option<&str>,
        token: &CancellationToken,
    ) -> SyncResult<Option<Vec<Annotation>>> {
        let records = self.fetch(parent, classroom_id).await?;
        let guarded = token.guard(records);
        if guarded.is_none() {
            tracing::debug!(%parent, "fetch finished after its view went away");
        }
        Ok(guarded)
    }

    /// Create an annotation and store the server's canonical record
    pub async fn save(&self, draft: &AnnotationDraft) -> SyncResult<Annotation> {
        if draft.motivation != self.motivation {
            return Err(CoreError::validation(format!(
                "{} draft submitted to the {} bucket",
                draft.motivation, self.motivation
            ))
            .into());
        }
        draft.validate()?;

        let record = self.api.create(draft).await?;
        tracing::info!(id = %record.id, motivation = %self.motivation, "annotation created");

        self.store_record(&record);
        Ok(record)
    }

    /// Update an annotation's body and upsert the returned record
    pub async fn patch(&self, id: &str, patch: &AnnotationPatch) -> SyncResult<Annotation> {
        let Some(body) = &patch.body else {
            return Err(CoreError::validation(format!("empty patch for {id}")).into());
        };
        if self.motivation == Motivation::Link {
            body.as_link()?;
        }

        let record = self.api.patch(id, patch).await?;
        tracing::info!(id = %record.id, motivation = %self.motivation, "annotation patched");

        self.store_record(&record);
        Ok(record)
    }

    /// Delete an annotation, removing it from the store once acknowledged
    ///
    /// A second call for an id whose delete is still in flight returns
    /// [`RemoveOutcome::AlreadyPending`] without a request. A 404 means the
    /// server no longer has it, so the local copy is dropped too. Replies
    /// targeting the removed annotation are left alone.
    pub async fn remove(&self, id: &str) -> SyncResult<RemoveOutcome> {
        let Some(_pending) = PendingDelete::claim(&self.pending_deletes, self.motivation, id) else {
            tracing::debug!(%id, "delete already in flight");
            return Ok(RemoveOutcome::AlreadyPending);
        };

        match self.api.delete(id).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                tracing::warn!(%id, "annotation already gone on the server");
            }
            Err(err) => return Err(SyncError::Transport(err)),
        }

        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        store.bucket_mut(self.motivation).remove(id);
        tracing::info!(%id, motivation = %self.motivation, "annotation removed");
        Ok(RemoveOutcome::Removed)
    }

    /// Whether a delete for `id` is in flight
    pub fn is_removing(&self, id: &str) -> bool {
        self.pending_deletes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(self.motivation, id.to_string()))
    }

    fn store_record(&self, record: &Annotation) {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        store.bucket_mut(self.motivation).add_one(record.clone());
    }
}

impl std::fmt::Debug for BucketSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketSync")
            .field("motivation", &self.motivation)
            .finish_non_exhaustive()
    }
}

/// Marks a delete in flight; released on drop, including when the request
/// future is dropped
struct PendingDelete {
    set: PendingDeletes,
    key: (Motivation, AnnotationId),
}

impl PendingDelete {
    fn claim(set: &PendingDeletes, motivation: Motivation, id: &str) -> Option<Self> {
        let key = (motivation, id.to_string());
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        inserted.then(|| Self {
            set: Arc::clone(set),
            key,
        })
    }
}

impl Drop for PendingDelete {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
