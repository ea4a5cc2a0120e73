//! Timeline service
//!
//! Read path for follower timelines: the volatile cache first, the
//! durable timeline store when the cache has nothing for the user.

use std::sync::Arc;

use crate::data::{Database, Post, TimelineCache};
use crate::error::AppError;

/// Timeline service
pub struct TimelineService {
    db: Arc<Database>,
    timeline_cache: Arc<TimelineCache>,
}

impl TimelineService {
    /// Create new timeline service
    pub fn new(db: Arc<Database>, timeline_cache: Arc<TimelineCache>) -> Self {
        Self { db, timeline_cache }
    }

    /// Get a user's home timeline, newest post first.
    ///
    /// # Arguments
    /// * `user_id` - The reading user
    /// * `start` - Offset into the timeline
    /// * `limit` - Maximum results
    ///
    /// # Returns
    /// Hydrated posts in reverse-chronological order. Posts whose rows
    /// have since been deleted are skipped.
    pub async fn home_timeline(
        &self,
        user_id: &str,
        start: u32,
        limit: u32,
    ) -> Result<Vec<Post>, AppError> {
        let post_ids = match self
            .timeline_cache
            .get_timeline(user_id, start as usize, limit as usize)
            .await
        {
            Some(ids) if ids.len() == limit as usize => ids,
            // Miss, or a short page: the cache holds at most the newest
            // `timeline_max_items` entries per user, so an underfilled page
            // may have run past that horizon. The store is authoritative.
            _ => self.db.timeline_page(user_id, start, limit).await?,
        };

        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let posts = self.db.get_posts_by_ids(&post_ids).await?;

        // Restore the timeline order; the IN query returns store order.
        let mut by_id: std::collections::HashMap<String, Post> =
            posts.into_iter().map(|post| (post.id.clone(), post)).collect();
        let ordered = post_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();

        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Database, EntityId, FanoutJob, TimelineEntry, User};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    async fn create_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().expect("create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db = Database::connect(&db_path).await.expect("connect test db");
        (db, temp_dir)
    }

    /// Seeds `count` posts by one author, a timeline row per post for
    /// `reader`, and a cache push per post. Returns post ids oldest first.
    async fn seed_timeline(
        db: &Database,
        cache: &TimelineCache,
        reader: &str,
        count: usize,
    ) -> Vec<String> {
        let author = User {
            id: EntityId::new().0,
            username: "author".to_string(),
            created_at: Utc::now(),
        };
        db.insert_user(&author).await.expect("insert author");

        let base = Utc::now();
        let mut post_ids = Vec::new();
        for i in 0..count {
            let post = Post {
                id: EntityId::new().0,
                author_id: author.id.clone(),
                content: format!("post {i}"),
                created_at: base + Duration::seconds(i as i64),
            };
            let job = FanoutJob::for_post(&post);
            db.insert_post_with_fanout(&post, &job)
                .await
                .expect("insert post");

            let entry = TimelineEntry {
                id: EntityId::new().0,
                user_id: reader.to_string(),
                post_id: post.id.clone(),
                created_at: post.created_at,
            };
            db.append_timeline_batch(&[entry]).await.expect("append");
            cache
                .push_post(&post.id, post.created_at, &[reader.to_string()])
                .await;

            post_ids.push(post.id);
        }
        post_ids
    }

    #[tokio::test]
    async fn full_cache_pages_are_served_without_the_store() {
        let (db, _dir) = create_test_db().await;
        let cache = Arc::new(TimelineCache::new(10));
        let post_ids = seed_timeline(&db, &cache, "reader", 4).await;

        let service = TimelineService::new(Arc::new(db), cache);
        let page = service
            .home_timeline("reader", 0, 2)
            .await
            .expect("first page");

        let ids: Vec<&str> = page.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![post_ids[3].as_str(), post_ids[2].as_str()]);
    }

    #[tokio::test]
    async fn pages_past_the_cache_cap_fall_back_to_the_store() {
        let (db, _dir) = create_test_db().await;
        // Cap of 2: the cache keeps only the newest two of four posts.
        let cache = Arc::new(TimelineCache::new(2));
        let post_ids = seed_timeline(&db, &cache, "reader", 4).await;

        let service = TimelineService::new(Arc::new(db), cache);
        let page = service
            .home_timeline("reader", 2, 2)
            .await
            .expect("deep page");

        // The cache has nothing at offset 2; the older posts still come back.
        let ids: Vec<&str> = page.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![post_ids[1].as_str(), post_ids[0].as_str()]);
    }

    #[tokio::test]
    async fn short_final_page_is_not_padded() {
        let (db, _dir) = create_test_db().await;
        let cache = Arc::new(TimelineCache::new(10));
        let post_ids = seed_timeline(&db, &cache, "reader", 3).await;

        let service = TimelineService::new(Arc::new(db), cache);
        let page = service
            .home_timeline("reader", 2, 2)
            .await
            .expect("final page");

        let ids: Vec<&str> = page.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![post_ids[0].as_str()]);
    }
}
