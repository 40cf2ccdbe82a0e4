//! Normalized multi-bucket annotation store
//!
//! One [`BucketStore`] per [`Motivation`], each indexing its records by id and
//! by every parent they target. [`AnnotationStore`] is the fixed map of
//! buckets the rest of the application shares.
//!
//! Every mutation bumps a per-parent revision so memoized views (see
//! [`crate::selectors`]) can tell whether a parent's listing changed without
//! comparing records.

use crate::annotation::{Annotation, AnnotationId, Motivation};
use crate::reference::ParentRef;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Canonical in-memory copy of the annotations of one motivation
#[derive(Debug)]
pub struct BucketStore {
    /// Distinguishes stores so memoized views never mix two of them
    instance: u64,

    motivation: Motivation,

    by_id: HashMap<AnnotationId, Annotation>,

    /// Parent keys are kept once created, even when their set empties
    by_parent: HashMap<ParentRef, BTreeSet<AnnotationId>>,

    /// Monotonic, never reset, so a cleared store cannot replay an old revision
    parent_revisions: HashMap<ParentRef, u64>,

    revision: u64,
}

impl BucketStore {
    /// Create an empty bucket for one motivation
    pub fn new(motivation: Motivation) -> Self {
        Self {
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            motivation,
            by_id: HashMap::new(),
            by_parent: HashMap::new(),
            parent_revisions: HashMap::new(),
            revision: 0,
        }
    }

    /// Motivation this bucket holds
    pub fn motivation(&self) -> Motivation {
        self.motivation
    }

    /// Identity of this store instance
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Bumped by every effective mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bumped whenever the listing for `parent` may have changed
    pub fn parent_revision(&self, parent: &ParentRef) -> u64 {
        self.parent_revisions.get(parent).copied().unwrap_or(0)
    }

    /// Upsert many records
    ///
    /// Returns how many records actually changed the store. Re-adding a
    /// record identical to the stored one is a no-op.
    pub fn add_many(&mut self, records: impl IntoIterator<Item = Annotation>) -> usize {
        records
            .into_iter()
            .map(|record| self.add_one(record))
            .filter(|changed| *changed)
            .count()
    }

    /// Upsert one record, returning whether the store changed
    ///
    /// Records of another motivation or without targets are refused.
    pub fn add_one(&mut self, record: Annotation) -> bool {
        if record.motivation != self.motivation {
            tracing::warn!(
                id = %record.id,
                motivation = %record.motivation,
                bucket = %self.motivation,
                "refusing record from another bucket"
            );
            return false;
        }
        if record.target.is_empty() {
            tracing::warn!(id = %record.id, bucket = %self.motivation, "refusing record without targets");
            return false;
        }

        let old_parents: BTreeSet<ParentRef> = match self.by_id.get(&record.id) {
            Some(existing) if existing == &record => return false,
            Some(existing) => existing.parents().cloned().collect(),
            None => BTreeSet::new(),
        };
        let new_parents: BTreeSet<ParentRef> = record.parents().cloned().collect();

        for stale in old_parents.difference(&new_parents) {
            if let Some(ids) = self.by_parent.get_mut(stale) {
                ids.remove(&record.id);
            }
            self.bump_parent(stale);
        }
        for parent in &new_parents {
            self.by_parent
                .entry(parent.clone())
                .or_default()
                .insert(record.id.clone());
            self.bump_parent(parent);
        }

        tracing::debug!(id = %record.id, bucket = %self.motivation, parents = new_parents.len(), "stored annotation");
        self.by_id.insert(record.id.clone(), record);
        self.revision += 1;
        true
    }

    /// Remove a record and every parent membership it had
    ///
    /// Unknown ids are a no-op. Parent sets that become empty stay in the
    /// index as empty sets.
    pub fn remove(&mut self, id: &str) -> Option<Annotation> {
        let record = self.by_id.remove(id)?;
        let parents: BTreeSet<ParentRef> = record.parents().cloned().collect();
        for parent in &parents {
            if let Some(ids) = self.by_parent.get_mut(parent) {
                ids.remove(id);
            }
            self.bump_parent(parent);
        }

        tracing::debug!(id, bucket = %self.motivation, "removed annotation");
        self.revision += 1;
        Some(record)
    }

    /// Record by id
    pub fn get_by_id(&self, id: &str) -> Option<&Annotation> {
        self.by_id.get(id)
    }

    /// Whether `id` is stored
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Current records for a parent, oldest first; empty for unknown parents
    pub fn get_by_parent(&self, parent: &ParentRef) -> Vec<&Annotation> {
        let mut records: Vec<&Annotation> = self
            .by_parent
            .get(parent)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default();
        records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        records
    }

    /// Raw id set indexed under a parent
    pub fn parent_ids(&self, parent: &ParentRef) -> Option<&BTreeSet<AnnotationId>> {
        self.by_parent.get(parent)
    }

    /// Every parent that has ever been indexed
    pub fn parents(&self) -> impl Iterator<Item = &ParentRef> {
        self.by_parent.keys()
    }

    /// Every record, oldest first
    pub fn get_all(&self) -> Vec<&Annotation> {
        let mut records: Vec<&Annotation> = self.by_id.values().collect();
        records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// No records stored
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Drop every record, e.g. when switching documents
    pub fn clear(&mut self) {
        if self.by_id.is_empty() {
            return;
        }
        self.by_id.clear();
        let parents: Vec<ParentRef> = self.by_parent.keys().cloned().collect();
        for parent in &parents {
            self.bump_parent(parent);
        }
        for ids in self.by_parent.values_mut() {
            ids.clear();
        }
        self.revision += 1;
    }

    fn bump_parent(&mut self, parent: &ParentRef) {
        *self.parent_revisions.entry(parent.clone()).or_insert(0) += 1;
    }
}

/// The fixed registry of buckets, one per motivation
#[derive(Debug)]
pub struct AnnotationStore {
    buckets: [BucketStore; Motivation::COUNT],
}

impl AnnotationStore {
    /// One empty bucket per motivation
    pub fn new() -> Self {
        Self {
            buckets: Motivation::ALL.map(BucketStore::new),
        }
    }

    /// Bucket for `motivation`
    pub fn bucket(&self, motivation: Motivation) -> &BucketStore {
        &self.buckets[motivation as usize]
    }

    /// Mutable bucket for `motivation`
    pub fn bucket_mut(&mut self, motivation: Motivation) -> &mut BucketStore {
        &mut self.buckets[motivation as usize]
    }

    /// Every bucket, in `Motivation::ALL` order
    pub fn buckets(&self) -> impl Iterator<Item = &BucketStore> {
        self.buckets.iter()
    }

    /// Route records to the bucket of their motivation
    pub fn add_many(&mut self, records: impl IntoIterator<Item = Annotation>) -> usize {
        records
            .into_iter()
            .map(|record| self.add_one(record))
            .filter(|changed| *changed)
            .count()
    }

    /// Route one record to its bucket, returning whether the store changed
    pub fn add_one(&mut self, record: Annotation) -> bool {
        self.bucket_mut(record.motivation).add_one(record)
    }

    /// Remove `id` from the `motivation` bucket
    pub fn remove(&mut self, motivation: Motivation, id: &str) -> Option<Annotation> {
        self.bucket_mut(motivation).remove(id)
    }

    /// Look an id up across every bucket
    pub fn find(&self, id: &str) -> Option<&Annotation> {
        self.buckets.iter().find_map(|bucket| bucket.get_by_id(id))
    }

    /// Total number of records across buckets
    pub fn len(&self) -> usize {
        self.buckets.iter().map(BucketStore::len).sum()
    }

    /// Every bucket is empty
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(BucketStore::is_empty)
    }

    /// Empty every bucket
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Store handle shared between the sync layer and views
pub type SharedStore = Arc<RwLock<AnnotationStore>>;

/// Create an empty shared store
pub fn shared_store() -> SharedStore {
    Arc::new(RwLock::new(AnnotationStore::new()))
}
