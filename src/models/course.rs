//! Course and forum models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserRef;

/// An enrolled course.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub instructor: Option<UserRef>,
}

/// A discussion thread in a course forum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumThread {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub author: UserRef,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub post_count: u32,
}

/// A post inside a forum thread. `likes` is the set of user ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: String,
    pub thread_id: String,
    pub author: UserRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: Vec<String>,
}
