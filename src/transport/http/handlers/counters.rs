use crate::domain::CounterSnapshot;
use crate::transport::http::auth::require_identity;
use crate::transport::http::error::ApiResult;
use crate::transport::http::types::{ApiResponse, AppState};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

fn snapshot_response(snapshot: CounterSnapshot) -> Json<ApiResponse> {
    Json(ApiResponse {
        success: true,
        data: Some(serde_json::json!({
            "all": snapshot.all,
            "published": snapshot.published,
        })),
        error: None,
    })
}

#[utoipa::path(
    get,
    path = "/admin/counters",
    responses(
        (status = 200, description = "Current counter values", body = ApiResponse),
        (status = 401, description = "Missing or invalid Authorization header", body = String)
    ),
    security(("bearer" = []))
)]
pub async fn get_counters_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ApiResponse>> {
    require_identity(&state, &headers).await?;
    let snapshot = state.catalog.counters().await?;
    Ok(snapshot_response(snapshot))
}

/// Recounts the catalog and overwrites both counters.
#[utoipa::path(
    post,
    path = "/admin/counters/reconcile",
    responses(
        (status = 200, description = "Counters recounted from the store", body = ApiResponse),
        (status = 400, description = "Store failure", body = String),
        (status = 401, description = "Missing or invalid Authorization header", body = String)
    ),
    security(("bearer" = []))
)]
pub async fn reconcile_counters_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ApiResponse>> {
    let identity = require_identity(&state, &headers).await?;
    tracing::info!(uid = %identity.uid, "counter reconciliation requested");
    let snapshot = state.catalog.reconcile_counters().await?;
    Ok(snapshot_response(snapshot))
}
