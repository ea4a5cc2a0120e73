//! Follow relationship endpoints

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;

use super::FollowRequest;
use crate::AppState;
use crate::data::{EntityId, Follower};
use crate::error::AppError;
use crate::metrics::HTTP_REQUESTS_TOTAL;

/// POST /api/v1/follows
pub async fn follow(
    State(state): State<AppState>,
    Json(request): Json<FollowRequest>,
) -> Result<StatusCode, AppError> {
    if request.user_id == request.follower_id {
        return Err(AppError::Validation(
            "users cannot follow themselves".to_string(),
        ));
    }

    for id in [&request.user_id, &request.follower_id] {
        state.db.get_user(id).await?.ok_or(AppError::NotFound)?;
    }

    let follower = Follower {
        id: EntityId::new().0,
        user_id: request.user_id.clone(),
        follower_id: request.follower_id.clone(),
        created_at: Utc::now(),
    };
    state.db.insert_follower(&follower).await?;

    tracing::info!(
        user_id = %request.user_id,
        follower_id = %request.follower_id,
        "follow recorded"
    );
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/follows", "200"])
        .inc();

    Ok(StatusCode::OK)
}

/// DELETE /api/v1/follows
pub async fn unfollow(
    State(state): State<AppState>,
    Json(request): Json<FollowRequest>,
) -> Result<StatusCode, AppError> {
    state
        .db
        .delete_follower(&request.user_id, &request.follower_id)
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["DELETE", "/api/v1/follows", "200"])
        .inc();

    Ok(StatusCode::OK)
}
