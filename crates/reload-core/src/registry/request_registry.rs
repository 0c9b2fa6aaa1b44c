//! In-memory registry of pending reload requests.

use crate::request::{ReloadRequest, RequestId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A live registry slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub request: ReloadRequest,
    /// Sequence number of the latest (re-)registration.
    pub recency: u64,
}

impl RegistryEntry {
    /// Winner ordering: lower priority first, then most recent first.
    fn rank(&self, other: &Self) -> Ordering {
        self.request
            .priority
            .cmp(&other.request.priority)
            .then_with(|| other.recency.cmp(&self.recency))
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: HashMap<RequestId, RegistryEntry>,
    sequence: u64,
}

impl RegistryState {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn winner(&self) -> Option<RequestId> {
        self.entries
            .iter()
            .min_by(|(_, a), (_, b)| a.rank(b))
            .map(|(id, _)| *id)
    }
}

/// Registry of outstanding reload requests keyed by fingerprint.
///
/// Clones share the same state. The entry map and the sequence counter sit
/// behind one mutex, so every winner query sees a consistent snapshot and
/// calls are linearizable.
#[derive(Debug, Clone, Default)]
pub struct RequestRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl RequestRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // Registry operations are total; a panic in another holder leaves the
    // map itself intact, so a poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a request and return the current winner.
    ///
    /// Re-registering an identical request only refreshes its recency. The
    /// returned id is the winner across all live entries, which is not
    /// necessarily the request just registered.
    pub fn register(&self, request: ReloadRequest) -> Option<RequestId> {
        let id = request.id();
        let mut state = self.lock();
        let recency = state.next_sequence();
        match state.entries.get_mut(&id) {
            Some(entry) => {
                entry.recency = recency;
                debug!(%id, recency, "Refreshed reload request");
            }
            None => {
                debug!(
                    %id,
                    recency,
                    path = %request.file_path,
                    priority = request.priority,
                    "Registered reload request"
                );
                state.entries.insert(id, RegistryEntry { request, recency });
            }
        }
        state.winner()
    }

    /// Evict a request whose build failed and return the new winner.
    ///
    /// Unknown ids leave the registry unchanged.
    pub fn report_load_failure(&self, id: RequestId) -> Option<RequestId> {
        let mut state = self.lock();
        if state.entries.remove(&id).is_some() {
            debug!(%id, remaining = state.entries.len(), "Evicted failed reload request");
        }
        state.winner()
    }

    /// Current winner, or `None` when nothing is pending.
    pub fn winner(&self) -> Option<RequestId> {
        self.lock().winner()
    }

    /// Request registered under `id`, if still live.
    pub fn get(&self, id: RequestId) -> Option<ReloadRequest> {
        self.lock().entries.get(&id).map(|entry| entry.request.clone())
    }

    /// Full entry for `id`, including its recency.
    pub fn entry(&self, id: RequestId) -> Option<RegistryEntry> {
        self.lock().entries.get(&id).cloned()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.lock().entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Drop every pending request. The sequence keeps counting up.
    pub fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        debug!(dropped, "Cleared reload registry");
    }
}
