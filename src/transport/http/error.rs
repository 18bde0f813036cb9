//! HTTP error taxonomy.
//!
//! Store failures answer 400 like validation failures; existing clients only
//! distinguish 401 from 400.

use crate::app::catalog_service::CatalogError;
use crate::infra::identity::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing Authorization Header")]
    AuthMissing,
    #[error("{0}")]
    AuthInvalid(String),
    #[error("{0}")]
    ValidationFailed(String),
    #[error("{0}")]
    StoreOperationFailed(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthMissing | ApiError::AuthInvalid(_) => StatusCode::UNAUTHORIZED,
            ApiError::ValidationFailed(_) | ApiError::StoreOperationFailed(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Missing => ApiError::AuthMissing,
            other => ApiError::AuthInvalid(other.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Validation(v) => ApiError::ValidationFailed(v.to_string()),
            CatalogError::Query(q) => ApiError::ValidationFailed(q.to_string()),
            CatalogError::Store(s) => {
                warn!(error = %format!("{:#}", s), "store operation failed");
                ApiError::StoreOperationFailed(s.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
