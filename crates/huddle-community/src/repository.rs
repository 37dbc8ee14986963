use std::rc::Rc;

use anyhow::{Context, anyhow};
use huddle_core::{
    FetchError, FetchOptions, MutationId, ResourceKey, ResourceState, ResourceStore, Subscription,
};

use crate::backend::{ApiFuture, Backend};
use crate::models::{Campaign, Community, Match, Post, Room, User};
use crate::{keys, mutations};

/// What the screens talk to: loads community resources through the shared
/// store and sends user actions to the backend optimistically.
///
/// Every action is applied to the cache first. When the backend answers, the
/// mutation is confirmed or, if the call failed, reverted.
#[derive(Clone)]
pub struct CommunityRepository {
    store: ResourceStore,
    backend: Rc<dyn Backend>,
}

impl CommunityRepository {
    pub fn new(store: ResourceStore, backend: Rc<dyn Backend>) -> Self {
        Self { store, backend }
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn communities(
        &self,
        options: FetchOptions,
        on_change: impl Fn(&ResourceState<Vec<Community>>) + 'static,
    ) -> Subscription {
        let backend = self.backend.clone();
        self.load(&keys::communities(), move || backend.communities(), options, on_change)
    }

    pub fn feed(
        &self,
        community_id: &str,
        options: FetchOptions,
        on_change: impl Fn(&ResourceState<Vec<Post>>) + 'static,
    ) -> Subscription {
        let backend = self.backend.clone();
        let id = community_id.to_string();
        self.load(&keys::feed(community_id), move || backend.feed(&id), options, on_change)
    }

    pub fn room(
        &self,
        room_id: &str,
        options: FetchOptions,
        on_change: impl Fn(&ResourceState<Room>) + 'static,
    ) -> Subscription {
        let backend = self.backend.clone();
        let id = room_id.to_string();
        self.load(&keys::room(room_id), move || backend.room(&id), options, on_change)
    }

    pub fn user(
        &self,
        user_id: &str,
        options: FetchOptions,
        on_change: impl Fn(&ResourceState<User>) + 'static,
    ) -> Subscription {
        let backend = self.backend.clone();
        let id = user_id.to_string();
        self.load(&keys::user(user_id), move || backend.user(&id), options, on_change)
    }

    pub fn matches(
        &self,
        community_id: &str,
        options: FetchOptions,
        on_change: impl Fn(&ResourceState<Vec<Match>>) + 'static,
    ) -> Subscription {
        let backend = self.backend.clone();
        let id = community_id.to_string();
        self.load(&keys::matches(community_id), move || backend.matches(&id), options, on_change)
    }

    pub fn campaigns(
        &self,
        options: FetchOptions,
        on_change: impl Fn(&ResourceState<Vec<Campaign>>) + 'static,
    ) -> Subscription {
        let backend = self.backend.clone();
        self.load(&keys::campaigns(), move || backend.campaigns(), options, on_change)
    }

    /// Likes or unlikes a post in a loaded feed.
    pub fn toggle_like(&self, community_id: &str, post_id: &str) -> anyhow::Result<MutationId> {
        let key = keys::feed(community_id);
        let liked = self
            .store
            .peek(&key)
            .value()
            .and_then(|posts| posts.iter().find(|p| p.id == post_id).map(|p| p.liked))
            .ok_or_else(|| anyhow!("post {post_id} is not in feed {community_id}"))?;

        let id = self
            .store
            .apply(&key, mutations::set_liked(post_id, !liked))
            .with_context(|| format!("liking post {post_id}"))?;
        self.settle_later(key, id, self.backend.set_liked(post_id, !liked));
        Ok(id)
    }

    /// Flips `user_id`'s ready flag in a loaded room roster.
    pub fn toggle_ready(&self, room_id: &str, user_id: &str) -> anyhow::Result<MutationId> {
        let key = keys::room(room_id);
        let ready = self
            .store
            .peek(&key)
            .value()
            .and_then(|room| {
                room.participants
                    .iter()
                    .find(|p| p.user_id == user_id)
                    .map(|p| p.ready)
            })
            .ok_or_else(|| anyhow!("{user_id} is not in room {room_id}"))?;

        let id = self
            .store
            .apply(&key, mutations::set_ready(user_id, !ready))
            .with_context(|| format!("toggling ready in room {room_id}"))?;
        self.settle_later(key, id, self.backend.set_ready(room_id, user_id, !ready));
        Ok(id)
    }

    pub fn join(&self, community_id: &str) -> anyhow::Result<MutationId> {
        self.set_membership(community_id, true)
    }

    pub fn leave(&self, community_id: &str) -> anyhow::Result<MutationId> {
        self.set_membership(community_id, false)
    }

    fn set_membership(&self, community_id: &str, joined: bool) -> anyhow::Result<MutationId> {
        let key = keys::communities();
        let id = self
            .store
            .apply(&key, mutations::set_joined(community_id, joined))
            .with_context(|| format!("updating membership of {community_id}"))?;
        self.settle_later(key, id, self.backend.set_joined(community_id, joined));
        Ok(id)
    }

    fn load<T: 'static>(
        &self,
        key: &ResourceKey<T>,
        call: impl FnOnce() -> ApiFuture<T>,
        options: FetchOptions,
        on_change: impl Fn(&ResourceState<T>) + 'static,
    ) -> Subscription {
        self.store.request(
            key,
            move || {
                let pending = call();
                async move { pending.await.map_err(|e| FetchError::new(format!("{e:#}"))) }
            },
            options,
            on_change,
        )
    }

    /// Confirms or reverts `id` once the backend call finishes.
    fn settle_later<T: 'static>(&self, key: ResourceKey<T>, id: MutationId, call: ApiFuture<()>) {
        let store = self.store.clone();
        let task_key = key.clone();
        let task = async move {
            let outcome = match call.await {
                Ok(()) => store.confirm(&task_key, id),
                Err(err) => {
                    log::warn!("backend rejected {id} on `{task_key}`: {err:#}");
                    store.revert(&task_key, id)
                }
            };
            // a refresh may have resolved it already
            if let Err(err) = outcome {
                log::debug!("{err}");
            }
        };
        if let Err(err) = self.store.spawn(task) {
            log::warn!("could not send {id} for `{key}`: {err}");
            if let Err(err) = self.store.revert(&key, id) {
                log::debug!("{err}");
            }
        }
    }
}
