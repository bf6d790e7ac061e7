use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::PipelineError;
use crate::models::{Category, ChannelQuery, ChannelsResponse, RefreshResponse};
use crate::services::query;
use crate::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn pipeline_error(err: PipelineError) -> ApiError {
    tracing::error!("Failed to load channels: {}", err);
    (
        StatusCode::BAD_GATEWAY,
        Json(serde_json::json!({
            "success": false,
            "error": "Failed to load channels",
            "details": err.to_string(),
        })),
    )
}

/// GET /api/channels - Channels matching optional nameContains/groupContains/category
pub async fn list_channels(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<ChannelQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.cache.get().await.map_err(pipeline_error)?;
    let channels = query::query(&snapshot, &filters);

    Ok(Json(ChannelsResponse {
        success: true,
        total: channels.len(),
        last_update: snapshot.fetched_at,
        channels,
    }))
}

/// GET /api/channels/only - Live channels with VOD-looking entries removed
pub async fn channels_only(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.cache.get().await.map_err(pipeline_error)?;
    let channels = query::channels_only(&snapshot);

    Ok(Json(ChannelsResponse {
        success: true,
        total: channels.len(),
        last_update: snapshot.fetched_at,
        channels,
    }))
}

/// GET /api/categories - Every category with its channels and counts
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.cache.get().await.map_err(pipeline_error)?;
    Ok(Json(query::partition(&snapshot)))
}

/// GET /api/categories/:category - Channels of one category
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if category.parse::<Category>().is_err() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": format!("Unknown category: {}", category),
            })),
        ));
    }

    let snapshot = state.cache.get().await.map_err(pipeline_error)?;
    let filters = ChannelQuery {
        category: Some(category),
        ..Default::default()
    };
    let channels = query::query(&snapshot, &filters);

    Ok(Json(ChannelsResponse {
        success: true,
        total: channels.len(),
        last_update: snapshot.fetched_at,
        channels,
    }))
}

/// POST /api/refresh - Refresh from upstream now
pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.cache.force_refresh().await.map_err(pipeline_error)?;

    Ok(Json(RefreshResponse {
        success: true,
        last_update: snapshot.fetched_at,
        stats: snapshot.stats(),
    }))
}
