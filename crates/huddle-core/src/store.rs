use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::task::{LocalSpawn, LocalSpawnExt, SpawnError};
use web_time::{Duration, Instant};

use crate::bus::{Callback, NotificationBus};
use crate::mutation::PendingMutations;
use crate::{
    Clock, FetchError, FetchOptions, ResourceKey, ResourceState, StoreConfig, StoreError,
    Subscription, SubscriptionId, SystemClock,
};

/// Keyed cache of remote-backed values.
///
/// Holds one [`ResourceState`] per key, runs at most one fetch per key at a
/// time, and notifies subscribers synchronously on every transition. The
/// handle is cheap to clone; clones share the same cache.
///
/// Everything runs on one thread. Fetch futures are spawned on the
/// [`LocalSpawn`] executor the store was built with and report back into the
/// store when they complete.
#[derive(Clone)]
pub struct ResourceStore {
    pub(crate) shared: Rc<Shared>,
}

pub(crate) struct Shared {
    pub(crate) state: RefCell<StoreState>,
    pub(crate) bus: NotificationBus,
    spawner: Box<dyn LocalSpawn>,
    clock: Rc<dyn Clock>,
    config: StoreConfig,
}

#[derive(Default)]
pub(crate) struct StoreState {
    entries: HashMap<Rc<str>, Box<dyn ErasedEntry>>,
    next_epoch: u64,
    pub(crate) next_mutation: u64,
}

/// What the store keeps per key.
pub(crate) struct Entry<T> {
    pub(crate) state: ResourceState<T>,
    /// Last value produced by the server, with the time it was fetched.
    /// Optimistic values are always recomputed from this, never from each other.
    pub(crate) authoritative: Option<(Rc<T>, Instant)>,
    pub(crate) pending: PendingMutations<T>,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
    stale: bool,
    in_flight: bool,
    ttl: Duration,
    idle_since: Option<Instant>,
    epoch: u64,
}

pub(crate) type Delivery<T> = (ResourceState<T>, Vec<(SubscriptionId, Callback<T>)>);

impl<T: 'static> Entry<T> {
    fn new(ttl: Duration, epoch: u64) -> Self {
        Self {
            state: ResourceState::Idle,
            authoritative: None,
            pending: PendingMutations::default(),
            subscribers: Vec::new(),
            stale: false,
            in_flight: false,
            ttl,
            idle_since: None,
            epoch,
        }
    }

    fn needs_fetch(&self, now: Instant, force: bool) -> bool {
        if self.in_flight {
            return false;
        }
        if force || self.stale {
            return true;
        }
        match &self.state {
            ResourceState::Idle => true,
            ResourceState::Success { fetched_at, .. } => {
                now.saturating_duration_since(*fetched_at) > self.ttl
            }
            // failures are retried by the caller, never by the store
            ResourceState::Loading { .. } | ResourceState::Error { .. } => false,
        }
    }

    /// Installs a freshly fetched value and reconciles pending mutations against it.
    fn settle(&mut self, fresh: Rc<T>, now: Instant) -> usize {
        let discarded = self.pending.retain_reapplied();
        let value = self.pending.replay(&fresh);
        self.authoritative = Some((fresh, now));
        self.state = ResourceState::Success {
            value,
            fetched_at: now,
            pending: self.pending.ids(),
        };
        discarded
    }

    fn fail(&mut self, error: FetchError) {
        self.state = ResourceState::Error {
            message: error.message,
            last_known: self.state.value().cloned(),
        };
    }

    /// Snapshot plus subscribers, or `None` when nobody is listening.
    pub(crate) fn delivery(&self) -> Option<Delivery<T>> {
        if self.subscribers.is_empty() {
            return None;
        }
        Some((self.state.clone(), self.subscribers.clone()))
    }
}

/// Type-erased view of an [`Entry`], for operations that do not touch the value.
trait ErasedEntry {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Returns the removed callback so the caller can drop it outside the borrow.
    fn remove_subscriber(&mut self, id: SubscriptionId, now: Instant) -> Option<Box<dyn Any>>;
    fn mark_stale(&mut self);
    fn evictable(&self, now: Instant) -> bool;
}

impl<T: 'static> ErasedEntry for Entry<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove_subscriber(&mut self, id: SubscriptionId, now: Instant) -> Option<Box<dyn Any>> {
        let idx = self.subscribers.iter().position(|(s, _)| *s == id)?;
        let (_, callback) = self.subscribers.remove(idx);
        if self.subscribers.is_empty() {
            self.idle_since = Some(now);
        }
        Some(Box::new(callback))
    }

    fn mark_stale(&mut self) {
        self.stale = true;
    }

    fn evictable(&self, now: Instant) -> bool {
        self.subscribers.is_empty()
            && !self.in_flight
            && self
                .idle_since
                .is_some_and(|since| now.saturating_duration_since(since) >= self.ttl)
    }
}

impl StoreState {
    pub(crate) fn entry_mut<T: 'static>(
        &mut self,
        name: &str,
    ) -> Result<Option<&mut Entry<T>>, StoreError> {
        match self.entries.get_mut(name) {
            None => Ok(None),
            Some(erased) => erased
                .as_any_mut()
                .downcast_mut::<Entry<T>>()
                .map(Some)
                .ok_or_else(|| StoreError::TypeMismatch {
                    key: name.to_string(),
                }),
        }
    }

    fn entry<T: 'static>(&self, name: &str) -> Result<Option<&Entry<T>>, StoreError> {
        match self.entries.get(name) {
            None => Ok(None),
            Some(erased) => erased
                .as_any()
                .downcast_ref::<Entry<T>>()
                .map(Some)
                .ok_or_else(|| StoreError::TypeMismatch {
                    key: name.to_string(),
                }),
        }
    }

    fn evict_if_idle(&mut self, name: &str, now: Instant) -> Option<Box<dyn ErasedEntry>> {
        if self.entries.get(name)?.evictable(now) {
            log::debug!("evicting `{name}`");
            return self.entries.remove(name);
        }
        None
    }
}

pub struct StoreBuilder {
    spawner: Box<dyn LocalSpawn>,
    clock: Rc<dyn Clock>,
    config: StoreConfig,
}

impl StoreBuilder {
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Rc::new(clock);
        self
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> ResourceStore {
        ResourceStore {
            shared: Rc::new(Shared {
                state: RefCell::new(StoreState::default()),
                bus: NotificationBus::default(),
                spawner: self.spawner,
                clock: self.clock,
                config: self.config,
            }),
        }
    }
}

impl ResourceStore {
    /// A store with the system clock and default config.
    pub fn new(spawner: impl LocalSpawn + 'static) -> Self {
        Self::builder(spawner).build()
    }

    pub fn builder(spawner: impl LocalSpawn + 'static) -> StoreBuilder {
        StoreBuilder {
            spawner: Box::new(spawner),
            clock: Rc::new(SystemClock),
            config: StoreConfig::default(),
        }
    }

    pub fn config(&self) -> StoreConfig {
        self.shared.config
    }

    pub(crate) fn now(&self) -> Instant {
        self.shared.clock.now()
    }

    /// Registers interest in `key` and fetches it if needed.
    ///
    /// A fetch starts only when none is in flight for the key and the key is
    /// idle, older than its TTL, invalidated, or `options.force_refresh` is
    /// set. A key in `Error` is not refetched unless forced or invalidated.
    ///
    /// `on_change` receives every later transition of the key. If this call
    /// did not start a fetch, it first receives the current state once.
    pub fn request<T, F, Fut, E>(
        &self,
        key: &ResourceKey<T>,
        fetcher: F,
        options: FetchOptions,
        on_change: impl Fn(&ResourceState<T>) + 'static,
    ) -> Subscription
    where
        T: 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<FetchError>,
    {
        let ttl = options.ttl.unwrap_or(self.shared.config.default_ttl);
        let callback: Callback<T> = Rc::new(on_change);
        let subscription = self.attach(key, Some(ttl), callback.clone());
        if !self.start_fetch(key, fetcher, options.force_refresh) {
            self.replay_current(key, subscription.id(), callback);
        }
        subscription
    }

    /// Observes `key` without fetching it. `on_change` first receives the current state.
    pub fn subscribe<T: 'static>(
        &self,
        key: &ResourceKey<T>,
        on_change: impl Fn(&ResourceState<T>) + 'static,
    ) -> Subscription {
        let callback: Callback<T> = Rc::new(on_change);
        let subscription = self.attach(key, None, callback.clone());
        self.replay_current(key, subscription.id(), callback);
        subscription
    }

    /// Synchronous read. An entry whose idle TTL has run out is evicted first.
    pub fn peek<T: 'static>(&self, key: &ResourceKey<T>) -> ResourceState<T> {
        let now = self.now();
        let (state, evicted) = {
            let mut st = self.shared.state.borrow_mut();
            let evicted = st.evict_if_idle(key.name(), now);
            let state = match st.entry::<T>(key.name()) {
                Ok(Some(entry)) => entry.state.clone(),
                Ok(None) => ResourceState::Idle,
                Err(err) => {
                    log::warn!("peek: {err}");
                    ResourceState::Idle
                }
            };
            (state, evicted)
        };
        drop(evicted);
        state
    }

    /// Marks `key` stale so the next `request` refetches. The value is kept.
    pub fn invalidate<T>(&self, key: &ResourceKey<T>) {
        if let Some(entry) = self.shared.state.borrow_mut().entries.get_mut(key.name()) {
            entry.mark_stale();
        }
    }

    /// Invalidates every key whose name starts with `prefix`. Returns how many matched.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut st = self.shared.state.borrow_mut();
        let mut n = 0;
        for (name, entry) in st.entries.iter_mut() {
            if name.starts_with(prefix) {
                entry.mark_stale();
                n += 1;
            }
        }
        n
    }

    /// Evicts every unobserved entry whose idle TTL has run out.
    ///
    /// This also happens on every subscribe and unsubscribe, so calling it is
    /// only needed to release memory while subscriptions stay unchanged.
    pub fn sweep(&self) -> usize {
        self.take_expired().len()
    }

    pub fn is_fetching<T: 'static>(&self, key: &ResourceKey<T>) -> bool {
        let st = self.shared.state.borrow();
        st.entries
            .get(key.name())
            .and_then(|e| e.as_any().downcast_ref::<Entry<T>>().map(|e| e.in_flight))
            .unwrap_or(false)
    }

    /// Whether `key` holds an entry. Expired entries count as gone, as in `peek`.
    pub fn contains<T>(&self, key: &ResourceKey<T>) -> bool {
        let now = self.now();
        self.shared
            .state
            .borrow()
            .entries
            .get(key.name())
            .is_some_and(|e| !e.evictable(now))
    }

    /// Number of live entries, not counting expired ones.
    pub fn len(&self) -> usize {
        let now = self.now();
        self.shared
            .state
            .borrow()
            .entries
            .values()
            .filter(|e| !e.evictable(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.bus.live_count()
    }

    /// Runs a side task on the store's executor.
    pub fn spawn(&self, task: impl Future<Output = ()> + 'static) -> Result<(), SpawnError> {
        self.shared.spawner.spawn_local(task)
    }

    fn attach<T: 'static>(
        &self,
        key: &ResourceKey<T>,
        ttl: Option<Duration>,
        callback: Callback<T>,
    ) -> Subscription {
        let expired = self.take_expired();
        let name = key.shared_name();
        let id = self.shared.bus.register(name.clone());
        let replaced = {
            let mut st = self.shared.state.borrow_mut();
            let replaced = if st.entry::<T>(&name).is_err() {
                log::warn!("`{name}` reused with a different value type; replacing");
                st.entries.remove(&name)
            } else {
                None
            };
            if !st.entries.contains_key(&name) {
                let epoch = st.next_epoch;
                st.next_epoch += 1;
                let ttl = ttl.unwrap_or(self.shared.config.default_ttl);
                st.entries
                    .insert(name.clone(), Box::new(Entry::<T>::new(ttl, epoch)));
            }
            if let Ok(Some(entry)) = st.entry_mut::<T>(&name) {
                if let Some(ttl) = ttl {
                    entry.ttl = ttl;
                }
                entry.idle_since = None;
                entry.subscribers.push((id, callback));
            }
            replaced
        };
        drop((expired, replaced));

        let weak = Rc::downgrade(&self.shared);
        Subscription::new(id, move || {
            if let Some(shared) = weak.upgrade() {
                ResourceStore { shared }.unsubscribe(id);
            }
        })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let Some(name) = self.shared.bus.release(id) else {
            return;
        };
        let now = self.now();
        let removed = {
            let mut st = self.shared.state.borrow_mut();
            st.entries
                .get_mut(&name)
                .and_then(|entry| entry.remove_subscriber(id, now))
        };
        drop(removed);
        drop(self.take_expired());
    }

    /// Removes expired entries. The caller drops them after the borrow is released.
    fn take_expired(&self) -> Vec<Box<dyn ErasedEntry>> {
        let now = self.now();
        let mut st = self.shared.state.borrow_mut();
        let names: Vec<Rc<str>> = st
            .entries
            .iter()
            .filter(|(_, e)| e.evictable(now))
            .map(|(name, _)| name.clone())
            .collect();
        let expired: Vec<Box<dyn ErasedEntry>> = names
            .iter()
            .filter_map(|name| st.entries.remove(name))
            .collect();
        if !expired.is_empty() {
            log::debug!("evicted {} expired entries", expired.len());
        }
        expired
    }

    fn replay_current<T: 'static>(
        &self,
        key: &ResourceKey<T>,
        id: SubscriptionId,
        callback: Callback<T>,
    ) {
        let state = self.peek(key);
        self.shared.bus.deliver(state, vec![(id, callback)]);
    }

    /// Returns whether a fetch was started (and a `Loading` transition published).
    fn start_fetch<T, F, Fut, E>(&self, key: &ResourceKey<T>, fetcher: F, force: bool) -> bool
    where
        T: 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<FetchError>,
    {
        let now = self.now();
        let (epoch, delivery) = {
            let mut st = self.shared.state.borrow_mut();
            let Ok(Some(entry)) = st.entry_mut::<T>(key.name()) else {
                return false;
            };
            if !entry.needs_fetch(now, force) {
                return false;
            }
            entry.in_flight = true;
            entry.stale = false;
            entry.state = ResourceState::Loading {
                previous: entry.state.value().cloned(),
            };
            (entry.epoch, entry.delivery())
        };
        log::debug!("fetching `{key}`");
        if let Some((snapshot, subscribers)) = delivery {
            self.shared.bus.deliver(snapshot, subscribers);
        }

        let pending = fetcher();
        let weak: Weak<Shared> = Rc::downgrade(&self.shared);
        let task_key = key.clone();
        let task = async move {
            let result = pending.await.map_err(Into::into);
            if let Some(shared) = weak.upgrade() {
                ResourceStore { shared }.finish_fetch(&task_key, epoch, result);
            }
        };
        if let Err(err) = self.spawn(task) {
            log::warn!("could not schedule fetch for `{key}`: {err}");
            self.finish_fetch(
                key,
                epoch,
                Err(FetchError::new(format!("could not schedule fetch: {err}"))),
            );
        }
        true
    }

    fn finish_fetch<T: 'static>(
        &self,
        key: &ResourceKey<T>,
        epoch: u64,
        result: Result<T, FetchError>,
    ) {
        let now = self.now();
        let delivery = {
            let mut st = self.shared.state.borrow_mut();
            let entry = match st.entry_mut::<T>(key.name()) {
                Ok(Some(entry)) if entry.epoch == epoch => entry,
                _ => {
                    log::warn!("dropping fetch result for `{key}`: entry was replaced");
                    return;
                }
            };
            entry.in_flight = false;
            match result {
                Ok(value) => {
                    let discarded = entry.settle(Rc::new(value), now);
                    log::debug!(
                        "fetched `{key}` ({} pending reapplied, {discarded} resolved)",
                        entry.state.pending().len()
                    );
                }
                Err(err) => {
                    log::debug!("fetch failed for `{key}`: {err}");
                    entry.fail(err);
                }
            }
            let delivery = entry.delivery();
            if delivery.is_none() {
                log::debug!("`{key}` has no subscribers; result stored silently");
            }
            delivery
        };
        if let Some((snapshot, subscribers)) = delivery {
            self.shared.bus.deliver(snapshot, subscribers);
        }
    }
}
