//! Derived views over the store
//!
//! Pure functions of a store snapshot. [`ParentSelector`] memoizes the
//! per-parent listing on (store instance, parent revision) so repeated reads
//! hand back the same `Arc` and downstream geometry can skip recomputation
//! with a pointer comparison.

use crate::annotation::{Annotation, Motivation};
use crate::reference::ParentRef;
use crate::store::{AnnotationStore, BucketStore};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Memoized `get_by_parent`
#[derive(Debug, Default)]
pub struct ParentSelector {
    cache: Mutex<HashMap<(u64, ParentRef), (u64, Arc<[Annotation]>)>>,
}

impl ParentSelector {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Records for `parent`, pointer-equal to the previous result while the
    /// parent's listing is unchanged
    pub fn select(&self, bucket: &BucketStore, parent: &ParentRef) -> Arc<[Annotation]> {
        let revision = bucket.parent_revision(parent);
        let key = (bucket.instance(), parent.clone());
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((cached_revision, records)) = cache.get(&key) {
            if *cached_revision == revision {
                return Arc::clone(records);
            }
        }

        let records: Arc<[Annotation]> = bucket.get_by_parent(parent).into_iter().cloned().collect();
        cache.insert(key, (revision, Arc::clone(&records)));
        records
    }

    /// Number of memoized listings
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// No memoized listings
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every memoized listing for `parent`, across all buckets.
    /// Returns how many were dropped.
    pub fn forget(&self, parent: &ParentRef) -> usize {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let before = cache.len();
        cache.retain(|(_, cached), _| cached != parent);
        before - cache.len()
    }

    /// Drop every memoized listing
    pub fn clear(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// An annotation with its replies, recursively
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ReplyThread {
    pub annotation: Annotation,
    pub replies: Vec<ReplyThread>,
}

impl ReplyThread {
    /// Number of replies below this node, at any depth
    pub fn reply_count(&self) -> usize {
        self.replies.iter().map(|r| 1 + r.reply_count()).sum()
    }

    /// Longest path below this node, 0 for a leaf
    pub fn depth(&self) -> usize {
        self.replies.iter().map(|r| 1 + r.depth()).max().unwrap_or(0)
    }
}

/// Build the reply tree under `root_id`
///
/// Replies are found in the reply bucket by their `Annotation/<id>` targets.
/// The walk stops at `max_depth` levels and skips any reply already on the
/// current path, so a cyclic chain of replies terminates.
pub fn reply_thread(store: &AnnotationStore, root_id: &str, max_depth: usize) -> Option<ReplyThread> {
    let root = store.find(root_id)?;
    let mut path = HashSet::new();
    Some(build_thread(store.bucket(Motivation::Reply), root, &mut path, max_depth))
}

fn build_thread<'a>(
    replies: &'a BucketStore,
    node: &'a Annotation,
    path: &mut HashSet<&'a str>,
    remaining_depth: usize,
) -> ReplyThread {
    path.insert(node.id.as_str());

    let children = replies.get_by_parent(&ParentRef::annotation(node.id.as_str()));
    let mut thread = ReplyThread {
        annotation: node.clone(),
        replies: Vec::with_capacity(children.len()),
    };

    if remaining_depth == 0 {
        if !children.is_empty() {
            tracing::warn!(id = %node.id, skipped = children.len(), "reply thread depth limit reached");
        }
    } else {
        for child in children {
            if path.contains(child.id.as_str()) {
                tracing::warn!(id = %child.id, parent = %node.id, "reply cycle detected, skipping");
                continue;
            }
            thread
                .replies
                .push(build_thread(replies, child, path, remaining_depth - 1));
        }
    }

    path.remove(node.id.as_str());
    thread
}
