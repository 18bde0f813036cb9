use crate::domain::{Category, CounterSnapshot, OrderDirection};
use crate::transport::http::handlers::{counters, health, recipes};
use crate::transport::http::types::{
    ApiResponse, AppState, RecipeDocument, RecipeIdResponse, RecipeListResponse, RecipeWriteRequest,
};
use axum::routing::{get, post, put};
use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        recipes::create_recipe_handler,
        recipes::list_recipes_handler,
        recipes::replace_recipe_handler,
        recipes::delete_recipe_handler,
        counters::get_counters_handler,
        counters::reconcile_counters_handler
    ),
    components(schemas(
        ApiResponse,
        Category,
        CounterSnapshot,
        OrderDirection,
        RecipeDocument,
        RecipeIdResponse,
        RecipeListResponse,
        RecipeWriteRequest
    )),
    modifiers(&BearerAuth)
)]
#[allow(dead_code)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route(
            "/recipes",
            post(recipes::create_recipe_handler).get(recipes::list_recipes_handler),
        )
        .route(
            "/recipes/:id",
            put(recipes::replace_recipe_handler).delete(recipes::delete_recipe_handler),
        )
        .route("/admin/counters", get(counters::get_counters_handler))
        .route(
            "/admin/counters/reconcile",
            post(counters::reconcile_counters_handler),
        )
        .with_state(app_state)
}
