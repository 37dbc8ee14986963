use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: String,
    pub name: String,
    pub sport: String,
    pub member_count: u32,
    /// Whether the signed-in user is a member.
    #[serde(default)]
    pub joined: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub community_id: String,
    pub author: String,
    pub body: String,
    pub likes: u32,
    /// Whether the signed-in user liked it.
    #[serde(default)]
    pub liked: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub ready: bool,
}

/// A chat/match room and its roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub title: String,
    pub participants: Vec<Participant>,
}

impl Room {
    pub fn ready_count(&self) -> usize {
        self.participants.iter().filter(|p| p.ready).count()
    }

    pub fn all_ready(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(|p| p.ready)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub home: String,
    pub away: String,
    /// RFC 3339 kickoff time, as sent by the backend.
    pub kickoff: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub title: String,
    pub goal: u32,
    pub raised: u32,
}

impl Campaign {
    /// Progress towards the goal in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.goal == 0 {
            return 1.0;
        }
        (self.raised as f32 / self.goal as f32).min(1.0)
    }
}
