//! Latest-request-wins bookkeeping for date-driven views
//!
//! Every fetch begins with a `Ticket`. Only the ticket issued last may
//! publish its result; anything older is stale and dropped. Closing the
//! guard drops everything still in flight.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identifies one fetch for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K> {
    sequence: u64,
    key: K,
}

impl<K> Ticket<K> {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn key(&self) -> &K {
        &self.key
    }
}

/// What became of a fetch once it resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<V> {
    /// The result is now the displayed one
    Applied(V),
    /// A newer selection or teardown superseded the fetch
    Discarded,
}

impl<V> FetchOutcome<V> {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied(_))
    }

    pub fn applied(self) -> Option<V> {
        match self {
            FetchOutcome::Applied(value) => Some(value),
            FetchOutcome::Discarded => None,
        }
    }
}

#[derive(Debug)]
struct GuardState<K, V> {
    latest: u64,
    selected: Option<K>,
    displayed: Option<(K, V)>,
    closed: bool,
}

#[derive(Debug)]
pub struct SelectionGuard<K, V> {
    state: Mutex<GuardState<K, V>>,
}

impl<K: Clone, V: Clone> SelectionGuard<K, V> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GuardState {
                latest: 0,
                selected: None,
                displayed: None,
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuardState<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select `key` and issue the ticket its fetch must present
    pub fn begin(&self, key: K) -> Ticket<K> {
        let mut state = self.lock();
        state.latest += 1;
        state.selected = Some(key.clone());
        Ticket { sequence: state.latest, key }
    }

    /// Whether the ticket may still publish
    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        let state = self.lock();
        !state.closed && state.latest == ticket.sequence
    }

    /// Publish `value` for the ticket's key. Returns false, leaving the
    /// displayed value alone, when the ticket is stale or the guard closed.
    pub fn complete(&self, ticket: &Ticket<K>, value: V) -> bool {
        let mut state = self.lock();
        if state.closed || state.latest != ticket.sequence {
            return false;
        }
        state.displayed = Some((ticket.key.clone(), value));
        true
    }

    /// The key most recently selected
    pub fn selected(&self) -> Option<K> {
        self.lock().selected.clone()
    }

    /// The key and value currently shown
    pub fn displayed(&self) -> Option<(K, V)> {
        self.lock().displayed.clone()
    }

    /// Tear down: every outstanding and future ticket is stale
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl<K: Clone, V: Clone> Default for SelectionGuard<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
