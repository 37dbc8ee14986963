use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::{ResourceState, Scope};

new_key_type! {
    /// Identifies one subscriber. Ids are generational: a released id never
    /// matches a later subscription.
    pub struct SubscriptionId;
}

pub(crate) type Callback<T> = Rc<dyn Fn(&ResourceState<T>)>;

type Job = Box<dyn FnOnce(&NotificationBus)>;

/// Delivers state transitions to subscribers.
///
/// Delivery is synchronous. A transition published while another is being
/// delivered (a callback that applies a mutation, say) is queued and runs once
/// the current one has reached every subscriber, so each subscriber observes
/// a key's transitions in order.
#[derive(Default)]
pub(crate) struct NotificationBus {
    // subscription -> key name
    live: RefCell<SlotMap<SubscriptionId, Rc<str>>>,
    queue: RefCell<VecDeque<Job>>,
    draining: Cell<bool>,
}

impl NotificationBus {
    pub(crate) fn register(&self, key: Rc<str>) -> SubscriptionId {
        self.live.borrow_mut().insert(key)
    }

    pub(crate) fn release(&self, id: SubscriptionId) -> Option<Rc<str>> {
        self.live.borrow_mut().remove(id)
    }

    pub(crate) fn is_live(&self, id: SubscriptionId) -> bool {
        self.live.borrow().contains_key(id)
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    /// Notifies `subscribers` in order. Must not be called while the store's
    /// state is borrowed.
    pub(crate) fn deliver<T: 'static>(
        &self,
        snapshot: ResourceState<T>,
        subscribers: Vec<(SubscriptionId, Callback<T>)>,
    ) {
        self.queue.borrow_mut().push_back(Box::new(move |bus: &NotificationBus| {
            for (id, callback) in subscribers {
                // unsubscribed by an earlier callback of this same delivery
                if bus.is_live(id) {
                    callback(&snapshot);
                }
            }
        }));
        self.drain();
    }

    fn drain(&self) {
        if self.draining.replace(true) {
            return;
        }
        let _reset = DrainGuard(&self.draining);
        loop {
            let job = self.queue.borrow_mut().pop_front();
            let Some(job) = job else { break };
            job(self);
        }
    }
}

struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Keeps a callback registered. Dropping it (or calling [`unsubscribe`]) removes it.
///
/// [`unsubscribe`]: Subscription::unsubscribe
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    id: SubscriptionId,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, release: impl FnOnce() + 'static) -> Self {
        Self {
            id,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.run();
    }

    /// Hands the subscription to `scope`; it is removed when the scope is disposed.
    pub fn bind(self, scope: &Scope) {
        scope.add_disposer(move || drop(self));
    }

    /// Keeps the subscription for the rest of the store's life.
    pub fn detach(mut self) {
        self.release = None;
    }

    /// Runs at most once.
    fn run(&mut self) {
        if let Some(f) = self.release.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}
