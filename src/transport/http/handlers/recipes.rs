use crate::domain::recipe::{parse_recipe_payload, ValidationError};
use crate::domain::{ListParams, RecipeId};
use crate::transport::http::auth::{caller_from_headers, require_identity};
use crate::transport::http::error::{ApiError, ApiResult};
use crate::transport::http::types::{
    AppState, RecipeDocument, RecipeIdResponse, RecipeListResponse, RecipeWriteRequest,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::Value as JsonValue;

fn validated(
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult<crate::domain::Recipe> {
    let Json(body) = payload
        .map_err(|_| ApiError::ValidationFailed(ValidationError::missing("recipe").to_string()))?;
    parse_recipe_payload(&body).map_err(|e| ApiError::ValidationFailed(e.to_string()))
}

#[utoipa::path(
    post,
    path = "/recipes",
    request_body = RecipeWriteRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipeIdResponse),
        (status = 400, description = "Missing/invalid fields or store failure", body = String),
        (status = 401, description = "Missing or invalid Authorization header", body = String)
    ),
    security(("bearer" = []))
)]
pub async fn create_recipe_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RecipeIdResponse>)> {
    require_identity(&state, &headers).await?;
    let recipe = validated(payload)?;

    let id = state.catalog.create(recipe).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecipeIdResponse { id: id.to_string() }),
    ))
}

#[utoipa::path(
    get,
    path = "/recipes",
    params(ListParams),
    responses(
        (status = 200, description = "A page of recipes plus the count for the caller's visibility", body = RecipeListResponse),
        (status = 400, description = "Invalid query parameters or store failure", body = String)
    )
)]
pub async fn list_recipes_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<RecipeListResponse>> {
    let caller = caller_from_headers(&state, &headers).await;
    let page = state.catalog.list(&caller, &params).await?;

    Ok(Json(RecipeListResponse {
        recipe_count: page.recipe_count,
        documents: page.documents.into_iter().map(RecipeDocument::from).collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/recipes/{id}",
    params(("id" = String, Path, description = "Recipe id")),
    request_body = RecipeWriteRequest,
    responses(
        (status = 200, description = "Recipe written", body = RecipeIdResponse),
        (status = 400, description = "Missing/invalid fields or store failure", body = String),
        (status = 401, description = "Missing or invalid Authorization header", body = String)
    ),
    security(("bearer" = []))
)]
pub async fn replace_recipe_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult<Json<RecipeIdResponse>> {
    require_identity(&state, &headers).await?;
    let recipe = validated(payload)?;

    let id = RecipeId::new(id);
    state.catalog.replace(&id, recipe).await?;
    Ok(Json(RecipeIdResponse { id: id.to_string() }))
}

#[utoipa::path(
    delete,
    path = "/recipes/{id}",
    params(("id" = String, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Recipe deleted (or did not exist)"),
        (status = 400, description = "Store failure", body = String),
        (status = 401, description = "Missing or invalid Authorization header", body = String)
    ),
    security(("bearer" = []))
)]
pub async fn delete_recipe_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    require_identity(&state, &headers).await?;
    state.catalog.delete(&RecipeId::new(id)).await?;
    Ok(StatusCode::OK)
}
