//! Relevance tokens
//!
//! A token is handed to work whose result only matters while some view is
//! alive (a paragraph's fetch, a layout pass). The work itself is never
//! interrupted; when it completes, the continuation checks the token and
//! drops the result if the view has gone away.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

#[derive(Debug)]
struct TokenState {
    cancelled: AtomicBool,
    parent: Option<CancellationToken>,
}

/// Shared "still relevant" flag
///
/// Clones observe the same state. A child token is also cancelled when any
/// ancestor is.
///
/// ```
/// use marginalia_scheduler::CancellationToken;
///
/// let view = CancellationToken::new();
/// let paragraph = view.child_token();
///
/// view.cancel();
/// assert!(paragraph.is_cancelled());
/// assert_eq!(paragraph.guard(42), None);
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    /// Live root token
    pub fn new() -> Self {
        Self {
            state: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                parent: None,
            }),
        }
    }

    /// A token cancelled together with `self` but cancellable on its own
    pub fn child_token(&self) -> Self {
        Self {
            state: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Mark this token and every clone as no longer relevant. Idempotent.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
    }

    /// Whether this token or any ancestor was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
            || self
                .state
                .parent
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
    }

    /// `Some(value)` while the token is live, `None` once cancelled
    pub fn guard<T>(&self, value: T) -> Option<T> {
        (!self.is_cancelled()).then_some(value)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokens keyed by the thing they guard
///
/// Issuing a token for a key that already has one cancels the old token, so a
/// remounted paragraph never receives results started by its previous mount.
#[derive(Debug)]
pub struct CancellationRegistry<K> {
    root: CancellationToken,
    tokens: Mutex<HashMap<K, CancellationToken>>,
}

impl<K: Hash + Eq> CancellationRegistry<K> {
    /// Registry with a live root
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn tokens(&self) -> std::sync::MutexGuard<'_, HashMap<K, CancellationToken>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh token for `key`, cancelling any previous one
    pub fn issue(&self, key: K) -> CancellationToken {
        let token = self.root.child_token();
        if let Some(previous) = self.tokens().insert(key, token.clone()) {
            tracing::trace!("superseding relevance token");
            previous.cancel();
        }
        token
    }

    /// Cancel and forget the token for `key`. Returns `true` if one existed.
    pub fn cancel(&self, key: &K) -> bool {
        match self.tokens().remove(key) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every token, including ones issued later through this registry
    /// until [`reset`](Self::reset)
    pub fn cancel_all(&self) -> usize {
        self.root.cancel();
        let mut tokens = self.tokens();
        let count = tokens.len();
        tokens.clear();
        count
    }

    /// Start over with a live root after [`cancel_all`](Self::cancel_all)
    pub fn reset(&mut self) {
        self.cancel_all();
        self.root = CancellationToken::new();
    }

    /// Current token for `key`
    pub fn get(&self, key: &K) -> Option<CancellationToken> {
        self.tokens().get(key).cloned()
    }

    /// Whether `key` has a token that is not cancelled
    pub fn is_live(&self, key: &K) -> bool {
        self.get(key).is_some_and(|token| !token.is_cancelled())
    }

    /// Number of keys with a token
    pub fn len(&self) -> usize {
        self.tokens().len()
    }

    /// No tokens issued
    pub fn is_empty(&self) -> bool {
        self.tokens().is_empty()
    }
}

impl<K: Hash + Eq> Default for CancellationRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}
