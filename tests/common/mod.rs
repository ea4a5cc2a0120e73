//! Shared end-to-end test harness
//!
//! Boots a full server (HTTP API plus fanout worker) against a fresh
//! SQLite file in a temp directory, on an ephemeral port.

use std::path::PathBuf;
use std::sync::{Arc, Once};
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use driftline::config::{
    AppConfig, CacheConfig, DatabaseConfig, FanoutConfig, LoggingConfig, ServerConfig,
};
use driftline::data::Database;
use driftline::{AppState, build_router};

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub db: Arc<Database>,
    cancel: CancellationToken,
    _temp_dir: TempDir,
}

impl TestServer {
    /// Start a server with a fast-polling fanout worker.
    pub async fn spawn() -> Self {
        static METRICS: Once = Once::new();
        METRICS.call_once(driftline::metrics::init_metrics);

        let temp_dir = TempDir::new().expect("create temp dir");

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                path: temp_dir.path().join("e2e.db"),
            },
            fanout: FanoutConfig {
                // Short interval so tests observe fanout quickly
                poll_interval_ms: 50,
                batch_size: 100,
                concurrency: 4,
                max_attempts: 5,
            },
            cache: CacheConfig {
                timeline_max_items: 500,
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
                format: "pretty".to_string(),
            },
        };

        let state = AppState::new(config).await.expect("build app state");
        let db = state.db.clone();

        let cancel = CancellationToken::new();
        let worker = state.fanout_worker();
        tokio::spawn(worker.run(cancel.clone()));

        let app = build_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            db,
            cancel,
            _temp_dir: temp_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a user and return its id.
    pub async fn create_user(&self, username: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/v1/users"))
            .json(&serde_json::json!({ "username": username }))
            .send()
            .await
            .expect("create user request");
        assert!(response.status().is_success(), "create user failed");

        let body: serde_json::Value = response.json().await.expect("user body");
        body["id"].as_str().expect("user id").to_string()
    }

    /// Make `follower_id` follow `user_id`.
    pub async fn follow(&self, user_id: &str, follower_id: &str) {
        let response = self
            .client
            .post(self.url("/api/v1/follows"))
            .json(&serde_json::json!({
                "user_id": user_id,
                "follower_id": follower_id,
            }))
            .send()
            .await
            .expect("follow request");
        assert!(response.status().is_success(), "follow failed");
    }

    /// Create a post and return its id.
    pub async fn create_post(&self, author_id: &str, content: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/v1/posts"))
            .json(&serde_json::json!({
                "author_id": author_id,
                "content": content,
            }))
            .send()
            .await
            .expect("create post request");
        assert!(response.status().is_success(), "create post failed");

        let body: serde_json::Value = response.json().await.expect("post body");
        body["id"].as_str().expect("post id").to_string()
    }

    /// Fetch a user's home timeline as raw JSON.
    pub async fn home_timeline(&self, user_id: &str) -> serde_json::Value {
        let response = self
            .client
            .get(self.url("/api/v1/timelines/home"))
            .query(&[("user_id", user_id)])
            .send()
            .await
            .expect("timeline request");
        assert!(response.status().is_success(), "timeline failed");

        response.json().await.expect("timeline body")
    }

    /// Poll until `check` passes or the deadline expires.
    pub async fn wait_until<F, Fut>(&self, deadline: Duration, mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let start = tokio::time::Instant::now();
        loop {
            if check().await {
                return;
            }
            if start.elapsed() > deadline {
                panic!("condition not met within {deadline:?}");
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    #[allow(dead_code)]
    pub fn db_path(&self) -> PathBuf {
        self._temp_dir.path().join("e2e.db")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
