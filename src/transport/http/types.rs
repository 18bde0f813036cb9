use crate::app::catalog_service::CatalogService;
use crate::domain::{Category, StoredRecipe};
use crate::infra::identity::TokenVerifier;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub verifier: Arc<dyn TokenVerifier>,
}

/// Envelope used by the operational endpoints (health, admin).
#[derive(Serialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `POST /recipes` and `PUT /recipes/{id}`.
///
/// Validation happens on the raw JSON so every missing field is reported;
/// this type only documents the shape.
#[derive(Deserialize, Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeWriteRequest {
    pub name: String,
    pub category: Category,
    pub directions: String,
    pub ingredients: Vec<String>,
    /// Epoch seconds.
    pub publish_date: i64,
    pub is_published: bool,
    pub image_url: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct RecipeIdResponse {
    pub id: String,
}

/// A recipe as returned by `GET /recipes`.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDocument {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub directions: String,
    pub ingredients: Vec<String>,
    /// Epoch seconds.
    pub publish_date: i64,
    pub is_published: bool,
    pub image_url: Option<String>,
}

impl From<StoredRecipe> for RecipeDocument {
    fn from(doc: StoredRecipe) -> Self {
        let StoredRecipe { id, recipe } = doc;
        Self {
            id: id.to_string(),
            name: recipe.name,
            category: recipe.category,
            directions: recipe.directions,
            ingredients: recipe.ingredients,
            publish_date: recipe.publish_date.timestamp(),
            is_published: recipe.is_published,
            image_url: recipe.image_url,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeListResponse {
    pub recipe_count: u64,
    pub documents: Vec<RecipeDocument>,
}
