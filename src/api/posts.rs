//! Post endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::{CreatePostRequest, PostResponse};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::HTTP_REQUESTS_TOTAL;
use crate::service::PostService;

/// POST /api/v1/posts
///
/// Creates the post and enqueues its fanout job; follower timelines are
/// filled in asynchronously by the fanout worker.
pub async fn create_post(
    State(state): State<AppState>,
    Json(request): Json<CreatePostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let post_service = PostService::new(state.db.clone());
    let post = post_service
        .create_post(&request.author_id, &request.content)
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/posts", "200"])
        .inc();

    Ok(Json(post.into()))
}

/// GET /api/v1/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, AppError> {
    let post = state.db.get_post(&id).await?.ok_or(AppError::NotFound)?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/posts/:id", "200"])
        .inc();

    Ok(Json(post.into()))
}
