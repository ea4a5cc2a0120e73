//! In-memory timeline cache
//!
//! Volatile, rebuildable read-path index: one ordered set of post ids per
//! user, scored by post creation time. Uses Moka for the per-user handles.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Per-user ordered index: post id -> score (post creation time).
///
/// Re-inserting a member only updates its score, which is what makes
/// cache pushes idempotent under at-least-once fanout.
#[derive(Debug, Default)]
struct UserTimeline {
    scores: HashMap<String, DateTime<Utc>>,
}

impl UserTimeline {
    fn insert(&mut self, post_id: &str, score: DateTime<Utc>, max_items: usize) {
        self.scores.insert(post_id.to_string(), score);

        // Evict lowest-scored members once over capacity.
        while self.scores.len() > max_items {
            let oldest = self
                .scores
                .iter()
                .min_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)))
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    self.scores.remove(&id);
                }
                None => break,
            }
        }
    }

    fn page(&self, start: usize, limit: usize) -> Vec<String> {
        let mut members: Vec<(&String, &DateTime<Utc>)> = self.scores.iter().collect();
        // Reverse-chronological; post id breaks score ties deterministically.
        members.sort_by(|a, b| (b.1, b.0).cmp(&(a.1, a.0)));
        members
            .into_iter()
            .skip(start)
            .take(limit)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Timeline cache (volatile)
///
/// One ordered set per user id. Users idle for 7 days are dropped and
/// rebuilt from the durable timeline store on demand.
pub struct TimelineCache {
    timelines: Cache<String, Arc<RwLock<UserTimeline>>>,
    /// Maximum members kept per user
    max_items: usize,
}

impl TimelineCache {
    /// Create new timeline cache
    ///
    /// # Arguments
    /// * `max_items` - Maximum post ids kept per user
    pub fn new(max_items: usize) -> Self {
        let timelines = Cache::builder()
            .time_to_idle(Duration::from_secs(3600 * 24 * 7))
            .build();

        Self {
            timelines,
            max_items,
        }
    }

    /// Add a post to each follower's ordered index.
    ///
    /// `posted_at` is the post's creation time, so delayed fanout cannot
    /// reorder timelines. Safe to call repeatedly with the same arguments.
    pub async fn push_post(
        &self,
        post_id: &str,
        posted_at: DateTime<Utc>,
        follower_ids: &[String],
    ) {
        for follower_id in follower_ids {
            let timeline = self
                .timelines
                .get_with(follower_id.clone(), async {
                    Arc::new(RwLock::new(UserTimeline::default()))
                })
                .await;

            timeline
                .write()
                .await
                .insert(post_id, posted_at, self.max_items);
        }

        use crate::metrics::{CACHE_SIZE, TIMELINE_ENTRIES_WRITTEN};
        TIMELINE_ENTRIES_WRITTEN
            .with_label_values(&["cache"])
            .inc_by(follower_ids.len() as u64);
        CACHE_SIZE
            .with_label_values(&["timeline"])
            .set(self.timelines.entry_count() as i64);
    }

    /// Reverse-chronological page of post ids for a user.
    ///
    /// Returns `None` when the user has no cached timeline at all, so the
    /// caller can fall back to the durable store.
    pub async fn get_timeline(
        &self,
        user_id: &str,
        start: usize,
        limit: usize,
    ) -> Option<Vec<String>> {
        let result = self.timelines.get(user_id).await;

        use crate::metrics::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL};
        match result {
            Some(timeline) => {
                CACHE_HITS_TOTAL.with_label_values(&["timeline"]).inc();
                Some(timeline.read().await.page(start, limit))
            }
            None => {
                CACHE_MISSES_TOTAL.with_label_values(&["timeline"]).inc();
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl crate::fanout::TimelineCacheStore for TimelineCache {
    async fn push_post(
        &self,
        post_id: &str,
        posted_at: DateTime<Utc>,
        follower_ids: &[String],
    ) -> Result<(), crate::error::AppError> {
        TimelineCache::push_post(self, post_id, posted_at, follower_ids).await;
        Ok(())
    }
}
