//! Optimistic updates with exact rollback.
//!
//! An [`OptimisticStore`] owns a piece of component state plus the set of
//! controls whose commit is still in flight. A mutation is planned against
//! the current state, applied before the network call starts, and reverted
//! through the same `write` transition if the commit fails.
//!
//! `write(state, from, to)` must move every dependent value by the difference
//! between `from` and `to` rather than assigning absolute values. Rollback is
//! `write(state, next, previous)`, which keeps counters exact when several
//! controls touch the same counter at once.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::hash::Hash;

use parking_lot::Mutex;
use thiserror::Error;

use crate::api::ApiError;

/// The two ends of one optimistic transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation<P> {
    pub previous: P,
    pub next: P,
}

impl<P> Mutation<P> {
    pub fn new(previous: P, next: P) -> Self {
        Self { previous, next }
    }
}

impl Mutation<bool> {
    pub fn toggle(current: bool) -> Self {
        Self::new(current, !current)
    }
}

/// Why a mutation was refused before anything changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("a request for this control is already in flight")]
    InFlight,
    #[error("target has been deleted")]
    Tombstoned,
    #[error("cannot target your own account")]
    SelfTarget,
    #[error("sign in required")]
    SignedOut,
    #[error("target is not loaded")]
    UnknownTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    Committed,
    RolledBack(ApiError),
}

impl Settled {
    pub fn is_committed(&self) -> bool {
        matches!(self, Settled::Committed)
    }
}

/// A mutation that has been applied locally and awaits its commit result.
///
/// Must be handed back to [`OptimisticStore::settle`]; until then the key
/// stays in flight and further mutations on it are rejected.
#[must_use = "an applied mutation must be settled or its control stays locked"]
#[derive(Debug)]
pub struct PendingMutation<K, P> {
    key: K,
    mutation: Mutation<P>,
}

impl<K, P> PendingMutation<K, P> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn mutation(&self) -> &Mutation<P> {
        &self.mutation
    }
}

/// Counts the mutations begun on one key. A server read taken at one epoch
/// is only applied while the key is still at that epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

struct Inner<S, K> {
    state: S,
    in_flight: HashSet<K>,
    epochs: HashMap<K, Epoch>,
}

pub struct OptimisticStore<S, K> {
    inner: Mutex<Inner<S, K>>,
}

impl<S, K> OptimisticStore<S, K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new(state: S) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                in_flight: HashSet::new(),
                epochs: HashMap::new(),
            }),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.lock().state)
    }

    pub fn snapshot(&self) -> S
    where
        S: Clone,
    {
        self.inner.lock().state.clone()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.inner.lock().in_flight.contains(key)
    }

    /// Local edits that are not part of the protocol (new comments, edits).
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.inner.lock().state)
    }

    /// Read before issuing a server query whose answer goes to [`reconcile`].
    ///
    /// [`reconcile`]: OptimisticStore::reconcile
    pub fn epoch(&self, key: &K) -> Epoch {
        self.inner
            .lock()
            .epochs
            .get(key)
            .copied()
            .unwrap_or_default()
    }

    /// Applies server truth for `key` read at epoch `seen`. Skipped while a
    /// mutation on the key is in flight or if one began after `seen`.
    /// Returns whether `f` ran.
    pub fn reconcile(&self, key: &K, seen: Epoch, f: impl FnOnce(&mut S)) -> bool {
        let mut inner = self.inner.lock();
        if inner.in_flight.contains(key) {
            tracing::debug!(?key, "skipping reconcile while mutation in flight");
            return false;
        }
        let current = inner.epochs.get(key).copied().unwrap_or_default();
        if current != seen {
            tracing::debug!(?key, ?seen, ?current, "skipping reconcile, answer predates a mutation");
            return false;
        }
        f(&mut inner.state);
        true
    }

    pub fn begin<P>(
        &self,
        key: K,
        plan: impl FnOnce(&S) -> Result<Mutation<P>, Rejected>,
        write: impl FnOnce(&mut S, &P, &P),
    ) -> Result<PendingMutation<K, P>, Rejected> {
        let mut inner = self.inner.lock();
        if inner.in_flight.contains(&key) {
            tracing::debug!(?key, "mutation ignored, already in flight");
            return Err(Rejected::InFlight);
        }
        let mutation = plan(&inner.state).map_err(|reason| {
            tracing::debug!(?key, %reason, "mutation rejected");
            reason
        })?;
        write(&mut inner.state, &mutation.previous, &mutation.next);
        inner.in_flight.insert(key.clone());
        let epoch = inner.epochs.entry(key.clone()).or_default();
        epoch.0 += 1;
        tracing::debug!(?key, "optimistic update applied");
        Ok(PendingMutation { key, mutation })
    }

    pub fn settle<P>(
        &self,
        pending: PendingMutation<K, P>,
        outcome: Result<(), ApiError>,
        write: impl FnOnce(&mut S, &P, &P),
    ) -> Settled {
        let PendingMutation { key, mutation } = pending;
        let mut inner = self.inner.lock();
        inner.in_flight.remove(&key);
        match outcome {
            Ok(()) => {
                tracing::debug!(?key, "mutation committed");
                Settled::Committed
            }
            Err(err) => {
                write(&mut inner.state, &mutation.next, &mutation.previous);
                tracing::warn!(?key, %err, "commit failed, rolled back");
                Settled::RolledBack(err)
            }
        }
    }

    /// Plans, applies, commits, and settles in one go.
    ///
    /// The lock is released while `commit` runs, so other controls on the same
    /// store stay responsive.
    pub async fn mutate<P, W, C, Fut>(
        &self,
        key: K,
        plan: impl FnOnce(&S) -> Result<Mutation<P>, Rejected>,
        write: W,
        commit: C,
    ) -> Result<Settled, Rejected>
    where
        W: Fn(&mut S, &P, &P),
        C: FnOnce(&Mutation<P>) -> Fut,
        Fut: Future<Output = Result<(), ApiError>>,
    {
        let pending = self.begin(key, plan, &write)?;
        let outcome = commit(pending.mutation()).await;
        Ok(self.settle(pending, outcome, &write))
    }
}

impl<S: fmt::Debug, K: fmt::Debug> fmt::Debug for OptimisticStore<S, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("OptimisticStore")
            .field("state", &inner.state)
            .field("in_flight", &inner.in_flight)
            .finish()
    }
}
