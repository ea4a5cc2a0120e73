//! User endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Utc;

use super::{CreateUserRequest, UserResponse};
use crate::AppState;
use crate::data::{EntityId, User};
use crate::error::AppError;
use crate::metrics::HTTP_REQUESTS_TOTAL;

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("username is empty".to_string()));
    }

    let user = User {
        id: EntityId::new().0,
        username: username.to_string(),
        created_at: Utc::now(),
    };
    state.db.insert_user(&user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user created");
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/users", "200"])
        .inc();

    Ok(Json(user.into()))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.db.get_user(&id).await?.ok_or(AppError::NotFound)?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/users/:id", "200"])
        .inc();

    Ok(Json(user.into()))
}
