//! Collaborator interfaces consumed by the fanout worker.
//!
//! The worker never touches concrete backends; everything it needs is
//! injected through these traits so the pipeline can be exercised against
//! in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::data::{FanoutJob, TimelineEntry};
use crate::error::AppError;

/// Resolves the follower ids of an author.
#[async_trait]
pub trait FollowerLookup: Send + Sync {
    async fn followers_of(&self, author_id: &str) -> Result<Vec<String>, AppError>;
}

/// Durable queue of fanout jobs.
///
/// Job insertion happens on the post-creation path, not here; the worker
/// only reads pending rows and finalizes them.
#[async_trait]
pub trait FanoutQueueStore: Send + Sync {
    /// Fetch up to `limit` jobs still marked pending.
    async fn pending_jobs(&self, limit: i64) -> Result<Vec<FanoutJob>, AppError>;

    /// Transition a job to its terminal `done` state.
    async fn mark_done(&self, job_id: &str) -> Result<(), AppError>;

    /// Transition a job to its terminal `failed` state.
    async fn mark_failed(&self, job_id: &str) -> Result<(), AppError>;

    /// Count a failed processing pass; returns the new attempt count.
    async fn record_attempt(&self, job_id: &str) -> Result<i64, AppError>;
}

/// Fast read-path index of follower timelines.
#[async_trait]
pub trait TimelineCacheStore: Send + Sync {
    /// Add `post_id`, scored by `posted_at`, to each follower's ordered
    /// index. Must be safe to call repeatedly with the same arguments.
    async fn push_post(
        &self,
        post_id: &str,
        posted_at: DateTime<Utc>,
        follower_ids: &[String],
    ) -> Result<(), AppError>;
}

/// Durable, authoritative record of timeline memberships.
#[async_trait]
pub trait TimelineStore: Send + Sync {
    /// Append a batch of rows; duplicates of existing (user, post) pairs
    /// must be ignored, not errors.
    async fn append_batch(&self, entries: &[TimelineEntry]) -> Result<(), AppError>;
}
