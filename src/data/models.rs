//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Post
// =============================================================================

/// A post authored by a user
///
/// `created_at` doubles as the timeline ordering key: fanout scores
/// follower timelines with it, never with processing time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Follower relationship
// =============================================================================

/// A follower edge: `follower_id` follows `user_id`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follower {
    pub id: String,
    /// The user being followed
    pub user_id: String,
    /// The user who follows
    pub follower_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Fanout queue
// =============================================================================

/// Fanout job state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutStatus {
    Pending,
    Done,
    Failed,
}

impl FanoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One unit of pending fanout work, tied to one post.
///
/// Created in the same transaction as its post; only the fanout worker
/// mutates it afterwards. Delivery is at-least-once: a job still marked
/// `pending` after a crash is simply re-run from the top.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FanoutJob {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    /// "pending", "done" or "failed"
    pub status: String,
    /// Processing passes so far; bounded by fanout.max_attempts
    pub attempts: i64,
    /// Post creation time, used as the timeline score
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl FanoutJob {
    /// Build the pending job for a freshly created post.
    pub fn for_post(post: &Post) -> Self {
        Self {
            id: EntityId::new().0,
            post_id: post.id.clone(),
            author_id: post.author_id.clone(),
            status: FanoutStatus::Pending.as_str().to_string(),
            attempts: 0,
            created_at: post.created_at,
            processed_at: None,
        }
    }
}

// =============================================================================
// Timeline
// =============================================================================

/// One durable (follower, post) timeline membership.
///
/// Unique on (user_id, post_id) so that re-processing a job after a crash
/// cannot produce duplicate rows.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimelineEntry {
    pub id: String,
    /// The receiving follower
    pub user_id: String,
    pub post_id: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn fanout_status_round_trips_through_strings() {
        for status in [
            FanoutStatus::Pending,
            FanoutStatus::Done,
            FanoutStatus::Failed,
        ] {
            assert_eq!(FanoutStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FanoutStatus::parse("unknown"), None);
    }

    #[test]
    fn job_for_post_carries_post_creation_time() {
        let post = Post {
            id: EntityId::new().0,
            author_id: EntityId::new().0,
            content: "hello".to_string(),
            created_at: Utc::now(),
        };

        let job = FanoutJob::for_post(&post);
        assert_eq!(job.post_id, post.id);
        assert_eq!(job.author_id, post.author_id);
        assert_eq!(job.status, "pending");
        assert_eq!(job.attempts, 0);
        assert_eq!(job.created_at, post.created_at);
        assert!(job.processed_at.is_none());
    }
}
