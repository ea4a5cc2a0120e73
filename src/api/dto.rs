//! Request and response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Post, User};

/// POST /api/v1/users request body
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

/// POST /api/v1/posts request body
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub author_id: String,
    pub content: String,
}

/// POST/DELETE /api/v1/follows request body
#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    /// The user being followed
    pub user_id: String,
    /// The user who follows
    pub follower_id: String,
}

/// GET /api/v1/timelines/home query parameters
#[derive(Debug, Deserialize)]
pub struct TimelineParams {
    pub user_id: String,
    pub start: Option<u32>,
    pub limit: Option<u32>,
}

/// User representation returned by the API
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// Post representation returned by the API
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            content: post.content,
            created_at: post.created_at,
        }
    }
}
