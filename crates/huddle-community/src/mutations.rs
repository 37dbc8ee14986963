//! Optimistic edits the screens make before the backend answers.
//!
//! Each one *sets* a flag rather than flipping it, so replaying it on a fetched
//! value that already reflects the change leaves that value alone. They are
//! all replayed on refresh until the backend confirms or rejects them.

use huddle_core::Mutation;

use crate::models::{Community, Post, Room};

pub fn set_liked(post_id: &str, liked: bool) -> Mutation<Vec<Post>> {
    let post_id = post_id.to_string();
    Mutation::new(
        if liked { "like" } else { "unlike" },
        move |posts: &Vec<Post>| {
            let mut posts = posts.clone();
            if let Some(post) = posts.iter_mut().find(|p| p.id == post_id)
                && post.liked != liked
            {
                post.liked = liked;
                post.likes = if liked {
                    post.likes.saturating_add(1)
                } else {
                    post.likes.saturating_sub(1)
                };
            }
            posts
        },
    )
    .reapply_on_refresh()
}

pub fn set_ready(user_id: &str, ready: bool) -> Mutation<Room> {
    let user_id = user_id.to_string();
    Mutation::new("set_ready", move |room: &Room| {
        let mut room = room.clone();
        if let Some(p) = room.participants.iter_mut().find(|p| p.user_id == user_id) {
            p.ready = ready;
        }
        room
    })
    .reapply_on_refresh()
}

pub fn set_joined(community_id: &str, joined: bool) -> Mutation<Vec<Community>> {
    let community_id = community_id.to_string();
    Mutation::new(
        if joined { "join" } else { "leave" },
        move |communities: &Vec<Community>| {
            let mut communities = communities.clone();
            if let Some(c) = communities.iter_mut().find(|c| c.id == community_id)
                && c.joined != joined
            {
                c.joined = joined;
                c.member_count = if joined {
                    c.member_count.saturating_add(1)
                } else {
                    c.member_count.saturating_sub(1)
                };
            }
            communities
        },
    )
    .reapply_on_refresh()
}
