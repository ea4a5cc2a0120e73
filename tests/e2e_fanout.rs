mod common;

use std::time::Duration;

use common::TestServer;

#[tokio::test]
async fn post_reaches_follower_timelines() {
    let server = TestServer::spawn().await;

    let author = server.create_user("author").await;
    let reader_a = server.create_user("reader_a").await;
    let reader_b = server.create_user("reader_b").await;
    server.follow(&author, &reader_a).await;
    server.follow(&author, &reader_b).await;

    let post_id = server.create_post(&author, "hello, followers").await;

    for reader in [&reader_a, &reader_b] {
        server
            .wait_until(Duration::from_secs(5), || async {
                let timeline = server.home_timeline(reader).await;
                timeline
                    .as_array()
                    .is_some_and(|posts| posts.iter().any(|p| p["id"] == post_id.as_str()))
            })
            .await;
    }

    // The author follows nobody, so their own home timeline stays empty.
    let own = server.home_timeline(&author).await;
    assert_eq!(own.as_array().map(|p| p.len()), Some(0));
}

#[tokio::test]
async fn timelines_order_posts_by_creation_time() {
    let server = TestServer::spawn().await;

    let author = server.create_user("chronological_author").await;
    let reader = server.create_user("chronological_reader").await;
    server.follow(&author, &reader).await;

    let first = server.create_post(&author, "first").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = server.create_post(&author, "second").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let third = server.create_post(&author, "third").await;

    server
        .wait_until(Duration::from_secs(5), || async {
            let timeline = server.home_timeline(&reader).await;
            timeline.as_array().is_some_and(|posts| posts.len() == 3)
        })
        .await;

    let timeline = server.home_timeline(&reader).await;
    let ids: Vec<&str> = timeline
        .as_array()
        .expect("timeline array")
        .iter()
        .map(|p| p["id"].as_str().expect("post id"))
        .collect();
    assert_eq!(ids, vec![third.as_str(), second.as_str(), first.as_str()]);
}

#[tokio::test]
async fn fanout_jobs_are_marked_done_and_store_rows_are_unique() {
    let server = TestServer::spawn().await;

    let author = server.create_user("durable_author").await;
    let reader = server.create_user("durable_reader").await;
    server.follow(&author, &reader).await;

    let post_id = server.create_post(&author, "durable").await;

    server
        .wait_until(Duration::from_secs(5), || async {
            server
                .db
                .pending_fanout_jobs(10)
                .await
                .expect("pending jobs")
                .is_empty()
        })
        .await;

    let rows = server
        .db
        .timeline_entry_count(&reader)
        .await
        .expect("timeline count");
    assert_eq!(rows, 1);

    let page = server
        .db
        .timeline_page(&reader, 0, 10)
        .await
        .expect("timeline page");
    assert_eq!(page, vec![post_id]);
}

#[tokio::test]
async fn unknown_user_timeline_is_not_found() {
    let server = TestServer::spawn().await;

    let response = server
        .client
        .get(server.url("/api/v1/timelines/home"))
        .query(&[("user_id", "no-such-user")])
        .send()
        .await
        .expect("timeline request");

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let server = TestServer::spawn().await;

    server.create_user("taken").await;

    let response = server
        .client
        .post(server.url("/api/v1/users"))
        .json(&serde_json::json!({ "username": "taken" }))
        .send()
        .await
        .expect("create user request");

    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
}
