//! Write payload validation and category wire names.

use chrono::{TimeZone, Utc};
use recipe_catalog::domain::recipe::parse_recipe_payload;
use recipe_catalog::domain::{Category, RecipeId};
use serde_json::json;

#[test]
fn complete_payload_parses() {
    let recipe = parse_recipe_payload(&json!({
        "name": "Clam chowder",
        "category": "fishAndSeafood",
        "directions": "Simmer gently.",
        "ingredients": ["clams", "potatoes", "cream"],
        "publishDate": 1_700_000_000,
        "isPublished": false,
        "imageUrl": "https://storage.example.com/o/images%2Fchowder.jpg?alt=media",
    }))
    .unwrap();

    assert_eq!(recipe.name, "Clam chowder");
    assert_eq!(recipe.category, Category::FishAndSeafood);
    assert_eq!(recipe.ingredients.len(), 3);
    assert_eq!(recipe.publish_date, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
    assert!(!recipe.is_published);
    assert!(recipe.image_url.is_some());
}

#[test]
fn every_offending_field_is_reported_in_order() {
    let err = parse_recipe_payload(&json!({
        "name": "",
        "category": "soups",
        "isPublished": "yes",
        "publishDate": 0,
        "ingredients": [],
    }))
    .unwrap_err();
    assert_eq!(
        err.fields,
        vec![
            "name",
            "category",
            "directions",
            "isPublished",
            "publishDate",
            "ingredients",
            "imageUrl"
        ]
    );
    assert_eq!(
        err.to_string(),
        "Recipe is not valid. Missing/invalid fields: name,category,directions,isPublished,publishDate,ingredients,imageUrl"
    );
}

#[test]
fn non_object_payload_is_rejected() {
    let err = parse_recipe_payload(&json!(["not", "a", "recipe"])).unwrap_err();
    assert_eq!(err.fields, vec!["recipe"]);
}

#[test]
fn ingredients_must_all_be_strings() {
    let err = parse_recipe_payload(&json!({
        "name": "Tiramisu",
        "category": "dessertsAndBakedGoods",
        "directions": "Layer and chill.",
        "ingredients": ["mascarpone", 3],
        "publishDate": 1_700_000_000,
        "isPublished": true,
        "imageUrl": "https://storage.example.com/o/t.jpg",
    }))
    .unwrap_err();
    assert_eq!(err.fields, vec!["ingredients"]);
}

#[test]
fn categories_keep_their_wire_names() {
    assert_eq!("vegatables".parse::<Category>(), Ok(Category::Vegetables));
    assert_eq!("vegetables".parse::<Category>(), Ok(Category::Vegetables));
    assert_eq!(Category::Vegetables.as_str(), "vegatables");
    assert_eq!(
        serde_json::to_value(Category::BreadsSandwichesAndPizza).unwrap(),
        json!("breadsSandwichesAndPizza")
    );
    assert!("Desserts".parse::<Category>().is_err());
    for category in Category::ALL {
        assert_eq!(category.as_str().parse::<Category>(), Ok(category));
    }
}

#[test]
fn generated_ids_are_alphanumeric() {
    let a = RecipeId::generate();
    let b = RecipeId::generate();
    assert_eq!(a.as_str().len(), 20);
    assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(a, b);
}
