//! SQLite database operations
//!
//! All database access goes through this module.
//! Owns the user/post/follower tables, the durable fanout queue and the
//! durable timeline store.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        // Create connection string
        let connection_string = format!("sqlite:{}?mode=rwc", path.display());

        // Create connection pool
        let pool = SqlitePool::connect(&connection_string).await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user
    ///
    /// # Errors
    /// Returns `Conflict` if the username is already taken.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let result = sqlx::query(
            "INSERT INTO users (id, username, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "username already taken: {}",
                user.username
            )));
        }

        Ok(())
    }

    /// Get user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a post together with its pending fanout job.
    ///
    /// Both rows are written in one transaction so that exactly one fanout
    /// job exists per post.
    pub async fn insert_post_with_fanout(
        &self,
        post: &Post,
        job: &FanoutJob,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO posts (id, author_id, content, created_at) VALUES (?, ?, ?, ?)")
            .bind(&post.id)
            .bind(&post.author_id)
            .bind(&post.content)
            .bind(post.created_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO fanout_queue (id, post_id, author_id, status, attempts, created_at, processed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&job.id)
        .bind(&job.post_id)
        .bind(&job.author_id)
        .bind(&job.status)
        .bind(job.attempts)
        .bind(job.created_at)
        .bind(job.processed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Get post by ID
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Fetch posts for a set of IDs.
    ///
    /// Result order is store-determined; callers that need a specific
    /// order re-sort against their own ID list.
    pub async fn get_posts_by_ids(&self, ids: &[String]) -> Result<Vec<Post>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new("SELECT * FROM posts WHERE id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for id in ids {
                separated.push_bind(id);
            }
        }
        query_builder.push(")");

        let posts = query_builder
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    // =========================================================================
    // Followers
    // =========================================================================

    /// Record that `follower_id` follows `user_id`.
    ///
    /// Following twice is a no-op.
    pub async fn insert_follower(&self, follower: &Follower) -> Result<(), AppError> {
        sqlx::query(
            "INSERT OR IGNORE INTO followers (id, user_id, follower_id, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&follower.id)
        .bind(&follower.user_id)
        .bind(&follower.follower_id)
        .bind(follower.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a follower edge
    pub async fn delete_follower(&self, user_id: &str, follower_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM followers WHERE user_id = ? AND follower_id = ?")
            .bind(user_id)
            .bind(follower_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// List the follower ids of a user
    pub async fn follower_ids_of(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT follower_id FROM followers WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Whether `follower_id` currently follows `user_id`
    pub async fn is_following(&self, user_id: &str, follower_id: &str) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM followers WHERE user_id = ? AND follower_id = ?",
        )
        .bind(user_id)
        .bind(follower_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    // =========================================================================
    // Fanout queue
    // =========================================================================

    /// Fetch up to `limit` pending fanout jobs, oldest first.
    pub async fn pending_fanout_jobs(&self, limit: i64) -> Result<Vec<FanoutJob>, AppError> {
        let jobs = sqlx::query_as::<_, FanoutJob>(
            "SELECT * FROM fanout_queue WHERE status = 'pending' ORDER BY created_at LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    /// Mark a fanout job done and stamp its processing time.
    pub async fn mark_fanout_done(&self, job_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE fanout_queue SET status = 'done', processed_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Mark a fanout job failed (terminal).
    pub async fn mark_fanout_failed(&self, job_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE fanout_queue SET status = 'failed', processed_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Count a failed processing pass against a pending job.
    ///
    /// # Returns
    /// The new attempt count.
    pub async fn record_fanout_attempt(&self, job_id: &str) -> Result<i64, AppError> {
        let attempts = sqlx::query_scalar::<_, i64>(
            "UPDATE fanout_queue SET attempts = attempts + 1 \
             WHERE id = ? AND status = 'pending' RETURNING attempts",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        attempts.ok_or(AppError::NotFound)
    }

    /// Get fanout job by ID
    pub async fn get_fanout_job(&self, job_id: &str) -> Result<Option<FanoutJob>, AppError> {
        let job = sqlx::query_as::<_, FanoutJob>("SELECT * FROM fanout_queue WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(job)
    }

    // =========================================================================
    // Timeline store
    // =========================================================================

    /// Append a batch of timeline rows.
    ///
    /// Idempotent: rows whose (user_id, post_id) pair already exists are
    /// silently skipped, so re-running a fanout job cannot duplicate them.
    ///
    /// # Returns
    /// Number of rows actually inserted.
    pub async fn append_timeline_batch(
        &self,
        entries: &[TimelineEntry],
    ) -> Result<u64, AppError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new(
            "INSERT OR IGNORE INTO timeline (id, user_id, post_id, created_at) ",
        );
        query_builder.push_values(entries, |mut row, entry| {
            row.push_bind(&entry.id)
                .push_bind(&entry.user_id)
                .push_bind(&entry.post_id)
                .push_bind(entry.created_at);
        });

        let result = query_builder.build().execute(&self.pool).await?;

        Ok(result.rows_affected())
    }

    /// Reverse-chronological page of post ids for a user's timeline.
    ///
    /// Durable read path used when the cache has nothing for the user.
    pub async fn timeline_page(
        &self,
        user_id: &str,
        start: u32,
        limit: u32,
    ) -> Result<Vec<String>, AppError> {
        let post_ids = sqlx::query_scalar::<_, String>(
            "SELECT post_id FROM timeline WHERE user_id = ? \
             ORDER BY created_at DESC, post_id DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(start)
        .fetch_all(&self.pool)
        .await?;

        Ok(post_ids)
    }

    /// Count timeline rows for a user
    pub async fn timeline_entry_count(&self, user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM timeline WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Fanout port implementations
// =============================================================================

#[async_trait::async_trait]
impl crate::fanout::FollowerLookup for Database {
    async fn followers_of(&self, author_id: &str) -> Result<Vec<String>, AppError> {
        self.follower_ids_of(author_id).await
    }
}

#[async_trait::async_trait]
impl crate::fanout::FanoutQueueStore for Database {
    async fn pending_jobs(&self, limit: i64) -> Result<Vec<FanoutJob>, AppError> {
        self.pending_fanout_jobs(limit).await
    }

    async fn mark_done(&self, job_id: &str) -> Result<(), AppError> {
        self.mark_fanout_done(job_id).await
    }

    async fn mark_failed(&self, job_id: &str) -> Result<(), AppError> {
        self.mark_fanout_failed(job_id).await
    }

    async fn record_attempt(&self, job_id: &str) -> Result<i64, AppError> {
        self.record_fanout_attempt(job_id).await
    }
}

#[async_trait::async_trait]
impl crate::fanout::TimelineStore for Database {
    async fn append_batch(&self, entries: &[TimelineEntry]) -> Result<(), AppError> {
        let inserted = self.append_timeline_batch(entries).await?;
        crate::metrics::TIMELINE_ENTRIES_WRITTEN
            .with_label_values(&["store"])
            .inc_by(inserted);
        Ok(())
    }
}
