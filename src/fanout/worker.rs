//! Fanout worker
//!
//! A polling producer plus a fixed pool of workers coordinated through a
//! bounded channel. The producer drains pending jobs from the durable
//! queue; each worker resolves followers, writes them out in batches and
//! finalizes the job.
//!
//! Delivery is at-least-once: a crash between the batch writes and the
//! final status update re-runs the whole job on a later poll, and the
//! idempotent cache/store writes absorb the repetition.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::FanoutConfig;
use crate::data::{EntityId, FanoutJob, TimelineEntry};
use crate::metrics::{FANOUT_BATCHES_TOTAL, FANOUT_JOBS_TOTAL, FANOUT_QUEUE_PENDING};

use super::{FanoutQueueStore, FollowerLookup, TimelineCacheStore, TimelineStore};

/// Fanout worker: producer loop plus worker pool.
///
/// All collaborators are injected; the worker holds no global state.
pub struct FanoutWorker {
    queue: Arc<dyn FanoutQueueStore>,
    followers: Arc<dyn FollowerLookup>,
    cache: Arc<dyn TimelineCacheStore>,
    store: Arc<dyn TimelineStore>,
    batch_size: usize,
    concurrency: usize,
    poll_interval: Duration,
    max_attempts: i64,
    /// Job ids currently held by a worker. The producer skips these even
    /// though their rows are still pending, so no two workers ever process
    /// the same job concurrently.
    in_flight: Mutex<HashSet<String>>,
}

impl FanoutWorker {
    /// Create new fanout worker
    pub fn new(
        queue: Arc<dyn FanoutQueueStore>,
        followers: Arc<dyn FollowerLookup>,
        cache: Arc<dyn TimelineCacheStore>,
        store: Arc<dyn TimelineStore>,
        config: &FanoutConfig,
    ) -> Self {
        Self {
            queue,
            followers,
            cache,
            store,
            batch_size: config.batch_size.max(1),
            concurrency: config.concurrency.max(1),
            poll_interval: config.poll_interval(),
            max_attempts: config.max_attempts.max(1),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Run the pipeline until `cancel` fires.
    ///
    /// On cancellation the producer stops fetching and aborts any blocked
    /// enqueue; the channel is then closed and workers drain the jobs
    /// already buffered before exiting. No job is abandoned mid-flight.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            concurrency = self.concurrency,
            batch_size = self.batch_size,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "fanout worker started"
        );

        // Bounded queue: a full channel back-pressures the producer.
        let (tx, rx) = mpsc::channel::<FanoutJob>(self.concurrency * 2);
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(self.concurrency);
        for worker_id in 0..self.concurrency {
            let worker = Arc::clone(&self);
            let rx = Arc::clone(&rx);
            handles.push(tokio::spawn(async move {
                loop {
                    let job = rx.lock().await.recv().await;
                    let Some(job) = job else { break };

                    let job_id = job.id.clone();
                    worker.process_job(job).await;
                    worker.in_flight.lock().await.remove(&job_id);
                }
                debug!(worker_id, "fanout worker slot exiting");
            }));
        }

        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        'producer: loop {
            tokio::select! {
                _ = cancel.cancelled() => break 'producer,
                _ = tick.tick() => {
                    let jobs = match self.queue.pending_jobs(self.batch_size as i64).await {
                        Ok(jobs) => jobs,
                        Err(error) => {
                            // Jobs stay pending; retried on the next tick.
                            warn!(%error, "failed to fetch pending fanout jobs");
                            continue;
                        }
                    };
                    FANOUT_QUEUE_PENDING.set(jobs.len() as i64);

                    for job in jobs {
                        // Still pending in the store but already handed to a
                        // worker: skip until that pass finalizes.
                        if !self.in_flight.lock().await.insert(job.id.clone()) {
                            continue;
                        }

                        let job_id = job.id.clone();
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                self.in_flight.lock().await.remove(&job_id);
                                break 'producer;
                            }
                            sent = tx.send(job) => {
                                if sent.is_err() {
                                    self.in_flight.lock().await.remove(&job_id);
                                    break 'producer;
                                }
                            }
                        }
                    }
                }
            }
        }

        // Closing the channel lets workers drain buffered jobs and exit.
        drop(tx);
        futures::future::join_all(handles).await;
        info!("fanout worker stopped");
    }

    /// Process one fanout job end to end.
    async fn process_job(&self, job: FanoutJob) {
        if job.post_id.is_empty() || job.author_id.is_empty() {
            warn!(job_id = %job.id, "dropping malformed fanout job");
            if let Err(error) = self.queue.mark_failed(&job.id).await {
                warn!(job_id = %job.id, %error, "could not mark malformed job failed");
            }
            FANOUT_JOBS_TOTAL.with_label_values(&["invalid"]).inc();
            return;
        }

        debug!(
            job_id = %job.id,
            post_id = %job.post_id,
            author_id = %job.author_id,
            "processing fanout job"
        );

        let followers = match self.followers.followers_of(&job.author_id).await {
            Ok(followers) => followers,
            Err(error) => {
                warn!(job_id = %job.id, %error, "failed to resolve followers");
                self.record_failed_pass(&job).await;
                return;
            }
        };

        if followers.is_empty() {
            debug!(job_id = %job.id, "author has no followers; nothing to distribute");
            self.finalize(&job).await;
            return;
        }

        let mut failed_batches = 0usize;
        for batch in followers.chunks(self.batch_size) {
            let mut batch_ok = true;

            // Scored by the post's creation time so that delayed fanout
            // cannot reorder follower timelines.
            if let Err(error) = self
                .cache
                .push_post(&job.post_id, job.created_at, batch)
                .await
            {
                warn!(
                    job_id = %job.id,
                    batch_len = batch.len(),
                    %error,
                    "cache push failed"
                );
                batch_ok = false;
            }

            let entries: Vec<TimelineEntry> = batch
                .iter()
                .map(|follower_id| TimelineEntry {
                    id: EntityId::new().0,
                    user_id: follower_id.clone(),
                    post_id: job.post_id.clone(),
                    created_at: job.created_at,
                })
                .collect();

            if let Err(error) = self.store.append_batch(&entries).await {
                warn!(
                    job_id = %job.id,
                    batch_len = batch.len(),
                    %error,
                    "timeline store append failed"
                );
                batch_ok = false;
            }

            FANOUT_BATCHES_TOTAL
                .with_label_values(&[if batch_ok { "ok" } else { "error" }])
                .inc();
            if !batch_ok {
                failed_batches += 1;
            }
        }

        if failed_batches == 0 {
            self.finalize(&job).await;
        } else {
            warn!(
                job_id = %job.id,
                failed_batches,
                "fanout incomplete; job left pending for retry"
            );
            self.record_failed_pass(&job).await;
        }
    }

    /// Mark a fully distributed job done.
    async fn finalize(&self, job: &FanoutJob) {
        match self.queue.mark_done(&job.id).await {
            Ok(()) => {
                debug!(job_id = %job.id, "fanout job done");
                FANOUT_JOBS_TOTAL.with_label_values(&["done"]).inc();
            }
            Err(error) => {
                // The job stays pending and will be re-run; idempotent
                // writes make the repeat harmless.
                warn!(job_id = %job.id, %error, "could not mark fanout job done");
            }
        }
    }

    /// Count a failed pass; exhausting the attempt budget fails the job.
    async fn record_failed_pass(&self, job: &FanoutJob) {
        match self.queue.record_attempt(&job.id).await {
            Ok(attempts) if attempts >= self.max_attempts => {
                warn!(
                    job_id = %job.id,
                    attempts,
                    "fanout job exhausted its attempts; marking failed"
                );
                if let Err(error) = self.queue.mark_failed(&job.id).await {
                    warn!(job_id = %job.id, %error, "could not mark fanout job failed");
                }
                FANOUT_JOBS_TOTAL.with_label_values(&["failed"]).inc();
            }
            Ok(attempts) => {
                debug!(job_id = %job.id, attempts, "fanout job will be retried");
                FANOUT_JOBS_TOTAL.with_label_values(&["retried"]).inc();
            }
            Err(error) => {
                warn!(job_id = %job.id, %error, "could not record fanout attempt");
            }
        }
    }
}
