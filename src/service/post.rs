//! Post service
//!
//! Creating a post also enqueues its fanout job; distribution itself is
//! asynchronous and never blocks the request path.

use std::sync::Arc;

use chrono::Utc;

use crate::data::{Database, EntityId, FanoutJob, Post};
use crate::error::AppError;

/// Post service
pub struct PostService {
    db: Arc<Database>,
}

impl PostService {
    /// Create new post service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a post and its pending fanout job.
    ///
    /// The two rows are written in one transaction: exactly one fanout job
    /// exists per post, and a post without a job (or vice versa) cannot be
    /// observed.
    ///
    /// # Errors
    /// Returns `Validation` for empty content, `NotFound` for an unknown
    /// author.
    pub async fn create_post(&self, author_id: &str, content: &str) -> Result<Post, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("post content is empty".to_string()));
        }

        self.db
            .get_user(author_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let post = Post {
            id: EntityId::new().0,
            author_id: author_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let job = FanoutJob::for_post(&post);

        self.db.insert_post_with_fanout(&post, &job).await?;

        tracing::info!(
            post_id = %post.id,
            author_id = %post.author_id,
            job_id = %job.id,
            "post created and queued for fanout"
        );

        Ok(post)
    }
}
