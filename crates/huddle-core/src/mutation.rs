use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::PendingIds;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(pub(crate) u64);

impl MutationId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happens to a pending mutation when a fresh value arrives from the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reconcile {
    /// The fetched value wins; the mutation is considered resolved.
    /// Use for derived data the server recomputes (counts, totals).
    #[default]
    DiscardOnRefresh,
    /// The mutation is replayed on top of the fetched value and stays pending.
    /// Use for user commands the server has not echoed back yet.
    ReapplyOnRefresh,
}

/// A named, pure transform over a cached value.
///
/// The transform must be total over `T`, and replaying it against a value
/// that already reflects it should be harmless: it will run again on every
/// reconciliation until it is resolved.
pub struct Mutation<T> {
    name: Cow<'static, str>,
    transform: Rc<dyn Fn(&T) -> T>,
    reconcile: Reconcile,
}

impl<T> Mutation<T> {
    pub fn new(name: impl Into<Cow<'static, str>>, transform: impl Fn(&T) -> T + 'static) -> Self {
        Self {
            name: name.into(),
            transform: Rc::new(transform),
            reconcile: Reconcile::default(),
        }
    }

    pub fn reapply_on_refresh(mut self) -> Self {
        self.reconcile = Reconcile::ReapplyOnRefresh;
        self
    }

    pub fn discard_on_refresh(mut self) -> Self {
        self.reconcile = Reconcile::DiscardOnRefresh;
        self
    }

    pub fn with_reconcile(mut self, reconcile: Reconcile) -> Self {
        self.reconcile = reconcile;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reconcile(&self) -> Reconcile {
        self.reconcile
    }

    pub fn run(&self, value: &T) -> T {
        (self.transform)(value)
    }
}

impl<T> Clone for Mutation<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            transform: self.transform.clone(),
            reconcile: self.reconcile,
        }
    }
}

impl<T> fmt::Debug for Mutation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("name", &self.name)
            .field("reconcile", &self.reconcile)
            .finish_non_exhaustive()
    }
}

/// Mutations applied to one key and not yet resolved, in submission order.
///
/// A confirmed mutation keeps its slot until every older one is resolved, so
/// replays always run in submission order. Only then is it folded into the
/// authoritative value.
pub(crate) struct PendingMutations<T> {
    entries: Vec<Slot<T>>,
}

struct Slot<T> {
    id: MutationId,
    mutation: Mutation<T>,
    confirmed: bool,
}

impl<T> Default for PendingMutations<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> PendingMutations<T> {
    pub(crate) fn push(&mut self, id: MutationId, mutation: Mutation<T>) {
        self.entries.push(Slot {
            id,
            mutation,
            confirmed: false,
        });
    }

    fn position(&self, id: MutationId) -> Option<usize> {
        self.entries.iter().position(|s| s.id == id && !s.confirmed)
    }

    /// Withdraws an unconfirmed mutation.
    pub(crate) fn remove(&mut self, id: MutationId) -> Option<Mutation<T>> {
        let idx = self.position(id)?;
        Some(self.entries.remove(idx).mutation)
    }

    /// Marks an unconfirmed mutation as accepted. It stays in place for replay.
    pub(crate) fn confirm(&mut self, id: MutationId) -> Option<&Mutation<T>> {
        let idx = self.position(id)?;
        let slot = &mut self.entries[idx];
        slot.confirmed = true;
        Some(&slot.mutation)
    }

    /// Unconfirmed ids, oldest first.
    pub(crate) fn ids(&self) -> PendingIds {
        self.entries
            .iter()
            .filter(|s| !s.confirmed)
            .map(|s| s.id)
            .collect()
    }

    /// Drops every confirmed mutation (the fetched value reflects it) and
    /// every `DiscardOnRefresh` one. Returns how many were dropped.
    pub(crate) fn retain_reapplied(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|s| !s.confirmed && s.mutation.reconcile() == Reconcile::ReapplyOnRefresh);
        before - self.entries.len()
    }

    /// Folds the confirmed mutations at the front of the queue into `base`.
    /// Returns the new base, or `None` when the front is unconfirmed.
    pub(crate) fn fold_confirmed(&mut self, base: &Rc<T>) -> Option<Rc<T>> {
        let n = self.entries.iter().take_while(|s| s.confirmed).count();
        if n == 0 {
            return None;
        }
        let folded = self.entries.drain(..n).fold(None, |acc: Option<T>, s| {
            Some(s.mutation.run(acc.as_ref().unwrap_or(&**base)))
        });
        folded.map(Rc::new)
    }

    /// Replays all mutations, confirmed or not, oldest first, on top of `base`.
    /// With nothing queued this hands back `base` itself.
    pub(crate) fn replay(&self, base: &Rc<T>) -> Rc<T> {
        let mut iter = self.entries.iter();
        let Some(first) = iter.next() else {
            return base.clone();
        };
        let mut value = first.mutation.run(base);
        for s in iter {
            value = s.mutation.run(&value);
        }
        Rc::new(value)
    }
}
