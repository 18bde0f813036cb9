//! Visibility query planner for recipe listings.
//!
//! Turns the caller's visibility class and the raw listing parameters into a
//! store-agnostic [`QueryPlan`] plus the [`CounterKey`] whose value accompanies
//! the page. Rules are applied in a fixed order:
//!
//! 1. Anonymous callers are forced onto `isPublished == true` and the
//!    `published` counter; authenticated callers see everything and `all`.
//! 2. `category` adds an equality filter on the canonical category name.
//! 3. `orderByField` adds an ordering (ascending unless `desc`).
//! 4. `perPage` caps the page size.
//! 5. `pageNumber > 0` together with `perPage` sets the offset.
//!
//! Pagination is offset based, so concurrent inserts can shift rows between
//! pages.

use crate::domain::counter::CounterKey;
use crate::domain::recipe::Category;
use crate::infra::identity::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};

/// Who is asking, after token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Authenticated(Identity),
    Anonymous,
}

impl Caller {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Caller::Authenticated(_))
    }
}

/// Raw listing parameters as they arrive on the query string.
///
/// Empty values are treated as absent.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Category equality filter.
    pub category: Option<String>,
    /// Field to order by (`name`, `category`, `directions`, `publishDate`, `isPublished`, `imageUrl`).
    pub order_by_field: Option<String>,
    /// `asc` (default) or `desc`.
    pub order_by_direction: Option<String>,
    /// 1-based page number; requires `perPage`.
    pub page_number: Option<String>,
    /// Page size.
    pub per_page: Option<String>,
}

/// Recipe fields a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeField {
    Name,
    Category,
    Directions,
    PublishDate,
    IsPublished,
    ImageUrl,
}

impl RecipeField {
    pub fn wire_name(&self) -> &'static str {
        match self {
            RecipeField::Name => "name",
            RecipeField::Category => "category",
            RecipeField::Directions => "directions",
            RecipeField::PublishDate => "publishDate",
            RecipeField::IsPublished => "isPublished",
            RecipeField::ImageUrl => "imageUrl",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            RecipeField::Name => "name",
            RecipeField::Category => "category",
            RecipeField::Directions => "directions",
            RecipeField::PublishDate => "publish_date",
            RecipeField::IsPublished => "is_published",
            RecipeField::ImageUrl => "image_url",
        }
    }
}

impl FromStr for RecipeField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(RecipeField::Name),
            "category" => Ok(RecipeField::Category),
            "directions" => Ok(RecipeField::Directions),
            "publishDate" => Ok(RecipeField::PublishDate),
            "isPublished" => Ok(RecipeField::IsPublished),
            "imageUrl" => Ok(RecipeField::ImageUrl),
            other => Err(QueryError::UnknownOrderField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for OrderDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(OrderDirection::Asc),
            "desc" => Ok(OrderDirection::Desc),
            other => Err(QueryError::InvalidDirection(other.to_string())),
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => f.write_str("ASC"),
            OrderDirection::Desc => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFilter {
    IsPublished(bool),
    /// Canonical category name; a value outside the enumeration is kept as
    /// given and matches nothing.
    Category(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: RecipeField,
    pub direction: OrderDirection,
}

/// Store-agnostic listing query. Offset is applied before limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryPlan {
    /// Every recipe not yet published, in store order.
    pub fn unpublished() -> Self {
        Self {
            filters: vec![FieldFilter::IsPublished(false)],
            ..Self::default()
        }
    }

    pub fn published_only(&self) -> bool {
        self.filters.contains(&FieldFilter::IsPublished(true))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Cannot order by unknown field '{0}'")]
    UnknownOrderField(String),
    #[error("Invalid orderByDirection '{0}', expected 'asc' or 'desc'")]
    InvalidDirection(String),
    #[error("Invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("perPage must be at least 1")]
    EmptyPage,
}

/// Builds the listing plan for `caller` and names the counter that goes with it.
pub fn plan(caller: &Caller, params: &ListParams) -> Result<(QueryPlan, CounterKey), QueryError> {
    let mut query = QueryPlan::default();

    let counter_key = if caller.is_authenticated() {
        CounterKey::All
    } else {
        query.filters.push(FieldFilter::IsPublished(true));
        CounterKey::Published
    };

    if let Some(category) = present(&params.category) {
        // Aliases accepted on write are stored under the canonical name.
        let canonical = category
            .parse::<Category>()
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|_| category.to_string());
        query.filters.push(FieldFilter::Category(canonical));
    }

    if let Some(field) = present(&params.order_by_field) {
        let direction = match present(&params.order_by_direction) {
            Some(d) => d.parse()?,
            None => OrderDirection::Asc,
        };
        query.order_by = Some(OrderBy {
            field: field.parse()?,
            direction,
        });
    }

    let per_page = present(&params.per_page)
        .map(|v| parse_number::<u64>("perPage", v))
        .transpose()?;
    if per_page == Some(0) {
        return Err(QueryError::EmptyPage);
    }
    query.limit = per_page;

    let page_number = present(&params.page_number)
        .map(|v| parse_number::<i64>("pageNumber", v))
        .transpose()?;
    if let (Some(page), Some(per_page)) = (page_number, per_page) {
        if page > 0 {
            query.offset = Some((page as u64 - 1).saturating_mul(per_page));
        }
    }

    Ok((query, counter_key))
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number<T: FromStr>(field: &'static str, value: &str) -> Result<T, QueryError> {
    value.parse().map_err(|_| QueryError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
