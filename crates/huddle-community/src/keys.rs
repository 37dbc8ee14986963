//! Resource keys used by the screens.

use huddle_core::ResourceKey;

use crate::models::{Campaign, Community, Match, Post, Room, User};

pub fn communities() -> ResourceKey<Vec<Community>> {
    ResourceKey::new("communities:all")
}

pub fn feed(community_id: &str) -> ResourceKey<Vec<Post>> {
    ResourceKey::new(format!("feed:{community_id}"))
}

pub fn room(room_id: &str) -> ResourceKey<Room> {
    ResourceKey::new(format!("room:{room_id}"))
}

pub fn user(user_id: &str) -> ResourceKey<User> {
    ResourceKey::new(format!("user:{user_id}"))
}

pub fn matches(community_id: &str) -> ResourceKey<Vec<Match>> {
    ResourceKey::new(format!("matches:{community_id}"))
}

pub fn campaigns() -> ResourceKey<Vec<Campaign>> {
    ResourceKey::new("campaigns:all")
}

pub const FEED_PREFIX: &str = "feed:";
