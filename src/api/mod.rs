//! API layer
//!
//! HTTP handlers for:
//! - User, post and follow management
//! - Timeline reads

mod dto;
mod follows;
mod posts;
mod timelines;
mod users;

pub use dto::*;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

/// Create the application API router, nested under `/api`.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/users", post(users::create_user))
        .route("/v1/users/:id", get(users::get_user))
        .route(
            "/v1/follows",
            post(follows::follow).delete(follows::unfollow),
        )
        .route("/v1/posts", post(posts::create_post))
        .route("/v1/posts/:id", get(posts::get_post))
        .route("/v1/timelines/home", get(timelines::home_timeline))
        .with_state(state)
}
