//! Optimistic mutations on top of [`ResourceStore`].
//!
//! A mutation changes the cached value right away and stays *pending* until
//! the caller learns what the backend did with it:
//!
//! - [`ResourceStore::confirm`] when the backend accepted it,
//! - [`ResourceStore::revert`] when the backend rejected it.
//!
//! Meanwhile every fetch reconciles it according to its [`Reconcile`] rule.
//!
//! [`Reconcile`]: crate::Reconcile

use std::rc::Rc;

use crate::store::{Delivery, Entry};
use crate::{Mutation, MutationId, ResourceKey, ResourceState, ResourceStore, StoreError};

impl ResourceStore {
    /// Applies `mutation` to the current value of `key` and notifies subscribers
    /// before returning.
    ///
    /// Only a `Success` value can be mutated. Anything else is an
    /// [`StoreError::InvalidState`] and leaves the state untouched; screens
    /// should disable the triggering action while a resource is not loaded.
    pub fn apply<T: 'static>(
        &self,
        key: &ResourceKey<T>,
        mutation: Mutation<T>,
    ) -> Result<MutationId, StoreError> {
        let (id, delivery) = {
            let mut st = self.shared.state.borrow_mut();
            let id = MutationId(st.next_mutation);
            let entry = st
                .entry_mut::<T>(key.name())?
                .ok_or_else(|| invalid_state(key, "idle"))?;
            let ResourceState::Success {
                value, fetched_at, ..
            } = &entry.state
            else {
                return Err(invalid_state(key, entry.state.label()));
            };
            let next = Rc::new(mutation.run(value));
            let fetched_at = *fetched_at;
            log::debug!("apply {id} `{}` to `{key}`", mutation.name());
            entry.pending.push(id, mutation);
            entry.state = ResourceState::Success {
                value: next,
                fetched_at,
                pending: entry.pending.ids(),
            };
            let delivery = entry.delivery();
            st.next_mutation += 1;
            (id, delivery)
        };
        self.publish(delivery);
        Ok(id)
    }

    /// Withdraws a pending mutation, e.g. after the backend rejected it.
    ///
    /// The value is rebuilt by replaying the remaining pending mutations on
    /// the last fetched value, so reverting one mutation never compounds the
    /// others. Works while a refresh is in flight or after a failed one too.
    pub fn revert<T: 'static>(&self, key: &ResourceKey<T>, id: MutationId) -> Result<(), StoreError> {
        let delivery = {
            let mut st = self.shared.state.borrow_mut();
            let Some(entry) = st.entry_mut::<T>(key.name())? else {
                return Err(conflict(key, id));
            };
            if entry.pending.remove(id).is_none() {
                return Err(conflict(key, id));
            }
            log::debug!("revert {id} on `{key}`");
            fold_confirmed(entry);
            if let Some((base, _)) = &entry.authoritative {
                let value = entry.pending.replay(base);
                replace_value(entry, value);
            }
            entry.delivery()
        };
        self.publish(delivery);
        Ok(())
    }

    /// Marks a pending mutation as accepted by the backend.
    ///
    /// It leaves the pending list at once and the displayed value is
    /// unchanged. It keeps being replayed in its original position until every
    /// older mutation is resolved, then it is folded into the last fetched
    /// value. The next refresh drops it, since the server already reflects it.
    pub fn confirm<T: 'static>(&self, key: &ResourceKey<T>, id: MutationId) -> Result<(), StoreError> {
        let delivery = {
            let mut st = self.shared.state.borrow_mut();
            let Some(entry) = st.entry_mut::<T>(key.name())? else {
                return Err(conflict(key, id));
            };
            let Some(mutation) = entry.pending.confirm(id) else {
                return Err(conflict(key, id));
            };
            log::debug!("confirm {id} `{}` on `{key}`", mutation.name());
            fold_confirmed(entry);
            if let ResourceState::Success { pending, .. } = &mut entry.state {
                *pending = entry.pending.ids();
            }
            entry.delivery()
        };
        self.publish(delivery);
        Ok(())
    }

    /// Ids of the mutations still pending on `key`, oldest first. Unlike
    /// `ResourceState::pending`, this also reports them while loading or failed.
    pub fn pending_mutations<T: 'static>(&self, key: &ResourceKey<T>) -> Vec<MutationId> {
        let mut st = self.shared.state.borrow_mut();
        match st.entry_mut::<T>(key.name()) {
            Ok(Some(entry)) => entry.pending.ids().into_vec(),
            _ => Vec::new(),
        }
    }

    fn publish<T: 'static>(&self, delivery: Option<Delivery<T>>) {
        if let Some((snapshot, subscribers)) = delivery {
            self.shared.bus.deliver(snapshot, subscribers);
        }
    }
}

/// Moves leading confirmed mutations into the authoritative value.
fn fold_confirmed<T>(entry: &mut Entry<T>) {
    if let Some((base, fetched_at)) = &entry.authoritative
        && let Some(folded) = entry.pending.fold_confirmed(base)
    {
        entry.authoritative = Some((folded, *fetched_at));
    }
}

/// Swaps the carried value while keeping the state's tag.
fn replace_value<T>(entry: &mut Entry<T>, value: Rc<T>) {
    entry.state = match &entry.state {
        ResourceState::Idle => ResourceState::Idle,
        ResourceState::Loading { .. } => ResourceState::Loading {
            previous: Some(value),
        },
        ResourceState::Success { fetched_at, .. } => ResourceState::Success {
            value,
            fetched_at: *fetched_at,
            pending: entry.pending.ids(),
        },
        ResourceState::Error { message, .. } => ResourceState::Error {
            message: message.clone(),
            last_known: Some(value),
        },
    };
}

fn invalid_state<T>(key: &ResourceKey<T>, state: &'static str) -> StoreError {
    StoreError::InvalidState {
        key: key.name().to_string(),
        state,
    }
}

fn conflict<T>(key: &ResourceKey<T>, id: MutationId) -> StoreError {
    let err = StoreError::MutationConflict {
        key: key.name().to_string(),
        id,
    };
    log::warn!("{err}");
    err
}
