//! # Resources, Mutations, and Subscriptions
//!
//! Every screen in Huddle shows some remote-backed value: a community list, a
//! feed, a room roster. Instead of each screen growing its own
//! loading/success/error state machine, they share one [`ResourceStore`]:
//!
//! - [`ResourceState<T>`]: `Idle`, `Loading`, `Success` or `Error`, always
//!   carrying the best value seen so far.
//! - [`ResourceStore`]: one state per [`ResourceKey`], at most one fetch in
//!   flight per key, synchronous notifications.
//! - [`Mutation`]: optimistic edits (like, ready, join) applied immediately
//!   and reconciled with the next fetch.
//!
//! ## Requesting a resource
//!
//! ```ignore
//! use futures::executor::LocalPool;
//! use huddle_core::*;
//!
//! let mut pool = LocalPool::new();
//! let store = ResourceStore::new(pool.spawner());
//! let feed: ResourceKey<Vec<Post>> = ResourceKey::new("feed:c1");
//!
//! let sub = store.request(
//!     &feed,
//!     || api.feed("c1"),
//!     FetchOptions::default(),
//!     |state| match state {
//!         ResourceState::Loading { previous } => show_spinner(previous),
//!         ResourceState::Success { value, .. } => show_posts(value),
//!         ResourceState::Error { message, last_known } => show_error(message, last_known),
//!         ResourceState::Idle => {}
//!     },
//! );
//! pool.run_until_stalled();
//! ```
//!
//! Requesting the same key again while the fetch is running only adds a
//! subscriber. A later request refetches once the key is older than its TTL,
//! was [invalidated](ResourceStore::invalidate), or when
//! [`FetchOptions::force`] is passed.
//!
//! ## Optimistic mutations
//!
//! ```ignore
//! let id = store.apply(&feed, Mutation::new("like", |posts| like(posts, 0)).reapply_on_refresh())?;
//! // later, from the network layer:
//! store.confirm(&feed, id)?; // or store.revert(&feed, id)?
//! ```
//!
//! ## Unmounting
//!
//! Dropping a [`Subscription`] unsubscribes it. Screens usually bind their
//! subscriptions to a [`Scope`] and dispose the scope when they go away. Keys
//! nobody observes are evicted once their TTL has passed.

pub mod bus;
pub mod clock;
pub mod config;
pub mod error;
pub mod key;
pub mod mutation;
pub mod mutator;
pub mod scope;
pub mod state;
pub mod store;
mod tests;

pub use bus::{Subscription, SubscriptionId};
pub use clock::*;
pub use config::*;
pub use error::*;
pub use key::ResourceKey;
pub use mutation::{Mutation, MutationId, Reconcile};
pub use scope::Scope;
pub use state::*;
pub use store::{ResourceStore, StoreBuilder};
