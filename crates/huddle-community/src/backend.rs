use futures::future::LocalBoxFuture;

use crate::models::{Campaign, Community, Match, Post, Room, User};

pub type ApiFuture<T> = LocalBoxFuture<'static, anyhow::Result<T>>;

/// What the network layer provides. Implementations own transport, auth and
/// decoding; the repository only sees values and failures.
pub trait Backend {
    fn communities(&self) -> ApiFuture<Vec<Community>>;
    fn feed(&self, community_id: &str) -> ApiFuture<Vec<Post>>;
    fn room(&self, room_id: &str) -> ApiFuture<Room>;
    fn user(&self, user_id: &str) -> ApiFuture<User>;
    fn matches(&self, community_id: &str) -> ApiFuture<Vec<Match>>;
    fn campaigns(&self) -> ApiFuture<Vec<Campaign>>;

    fn set_liked(&self, post_id: &str, liked: bool) -> ApiFuture<()>;
    fn set_ready(&self, room_id: &str, user_id: &str, ready: bool) -> ApiFuture<()>;
    fn set_joined(&self, community_id: &str, joined: bool) -> ApiFuture<()>;
}
