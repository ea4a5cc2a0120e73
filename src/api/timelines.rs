//! Timeline endpoints

use axum::{
    extract::{Query, State},
    response::Json,
};

use super::{PostResponse, TimelineParams};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::HTTP_REQUESTS_TOTAL;
use crate::service::TimelineService;

/// GET /api/v1/timelines/home
pub async fn home_timeline(
    State(state): State<AppState>,
    Query(params): Query<TimelineParams>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    state
        .db
        .get_user(&params.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let start = params.start.unwrap_or(0);
    let limit = params.limit.unwrap_or(20).min(40);

    let timeline_service = TimelineService::new(state.db.clone(), state.timeline_cache.clone());
    let posts = timeline_service
        .home_timeline(&params.user_id, start, limit)
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/timelines/home", "200"])
        .inc();

    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}
