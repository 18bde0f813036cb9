//! Recipe documents and write-time validation.

use chrono::{DateTime, TimeZone, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Length of store-assigned recipe ids.
const RECIPE_ID_LEN: usize = 20;

/// Opaque, store-assigned document id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(String);

impl RecipeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random alphanumeric id.
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RECIPE_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fixed set of recipe categories.
///
/// Wire values match what existing clients send, including the historical
/// `vegatables` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Category {
    #[serde(rename = "breadsSandwichesAndPizza")]
    BreadsSandwichesAndPizza,
    #[serde(rename = "eggsAndBreakfast")]
    EggsAndBreakfast,
    #[serde(rename = "dessertsAndBakedGoods")]
    DessertsAndBakedGoods,
    #[serde(rename = "fishAndSeafood")]
    FishAndSeafood,
    #[serde(rename = "vegatables", alias = "vegetables")]
    Vegetables,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::BreadsSandwichesAndPizza,
        Category::EggsAndBreakfast,
        Category::DessertsAndBakedGoods,
        Category::FishAndSeafood,
        Category::Vegetables,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BreadsSandwichesAndPizza => "breadsSandwichesAndPizza",
            Category::EggsAndBreakfast => "eggsAndBreakfast",
            Category::DessertsAndBakedGoods => "dessertsAndBakedGoods",
            Category::FishAndSeafood => "fishAndSeafood",
            Category::Vegetables => "vegatables",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "vegetables" {
            return Ok(Category::Vegetables);
        }
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// A recipe as persisted in the document store (without its id).
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub category: Category,
    pub directions: String,
    pub ingredients: Vec<String>,
    pub publish_date: DateTime<Utc>,
    pub is_published: bool,
    pub image_url: Option<String>,
}

impl Recipe {
    /// Whether the publish time has elapsed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.publish_date <= now
    }
}

/// A recipe together with its store id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecipe {
    pub id: RecipeId,
    pub recipe: Recipe,
}

/// Missing or invalid fields in a create/replace payload, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Recipe is not valid. Missing/invalid fields: {}", .fields.join(","))]
pub struct ValidationError {
    pub fields: Vec<&'static str>,
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self { fields: vec![field] }
    }
}

/// Validates a raw JSON write payload and turns it into a [`Recipe`].
///
/// Every field is checked so the error names all offending fields at once.
/// `publishDate` is epoch seconds; zero counts as missing.
pub fn parse_recipe_payload(payload: &JsonValue) -> Result<Recipe, ValidationError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ValidationError::missing("recipe"))?;
    let mut fields = Vec::new();

    let name = non_empty_str(obj.get("name"));
    if name.is_none() {
        fields.push("name");
    }

    let category = obj
        .get("category")
        .and_then(JsonValue::as_str)
        .and_then(|s| s.parse::<Category>().ok());
    if category.is_none() {
        fields.push("category");
    }

    let directions = non_empty_str(obj.get("directions"));
    if directions.is_none() {
        fields.push("directions");
    }

    let is_published = obj.get("isPublished").and_then(JsonValue::as_bool);
    if is_published.is_none() {
        fields.push("isPublished");
    }

    let publish_date = obj.get("publishDate").and_then(epoch_seconds);
    if publish_date.is_none() {
        fields.push("publishDate");
    }

    let ingredients = obj.get("ingredients").and_then(|v| {
        let items = v.as_array()?;
        let strings: Option<Vec<String>> = items
            .iter()
            .map(|i| i.as_str().map(str::to_string))
            .collect();
        strings.filter(|s| !s.is_empty())
    });
    if ingredients.is_none() {
        fields.push("ingredients");
    }

    let image_url = non_empty_str(obj.get("imageUrl"));
    if image_url.is_none() {
        fields.push("imageUrl");
    }

    match (name, category, directions, is_published, publish_date, ingredients, image_url) {
        (
            Some(name),
            Some(category),
            Some(directions),
            Some(is_published),
            Some(publish_date),
            Some(ingredients),
            Some(image_url),
        ) => Ok(Recipe {
            name,
            category,
            directions,
            ingredients,
            publish_date,
            is_published,
            image_url: Some(image_url),
        }),
        _ => Err(ValidationError { fields }),
    }
}

fn non_empty_str(v: Option<&JsonValue>) -> Option<String> {
    v.and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn epoch_seconds(v: &JsonValue) -> Option<DateTime<Utc>> {
    let secs = if let Some(i) = v.as_i64() {
        i
    } else {
        // fractional seconds are truncated
        v.as_f64().filter(|f| f.is_finite())? as i64
    };
    if secs == 0 {
        return None;
    }
    Utc.timestamp_opt(secs, 0).single()
}
