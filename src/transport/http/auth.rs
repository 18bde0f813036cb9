use crate::domain::Caller;
use crate::infra::identity::{bearer_token, AuthError, Identity};
use crate::transport::http::types::AppState;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use tracing::debug;

/// Verifies the `Authorization` header; required by every write endpoint.
pub async fn require_identity(state: &AppState, headers: &HeaderMap) -> Result<Identity, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::Missing)?
        .to_str()
        .map_err(|_| AuthError::Malformed)?;
    let token = bearer_token(header)?;
    state.verifier.verify(token).await
}

/// Resolves the visibility class for read endpoints.
///
/// A missing header and a failed verification both fall back to anonymous.
pub async fn caller_from_headers(state: &AppState, headers: &HeaderMap) -> Caller {
    match require_identity(state, headers).await {
        Ok(identity) => Caller::Authenticated(identity),
        Err(AuthError::Missing) => Caller::Anonymous,
        Err(e) => {
            debug!(error = %e, "treating caller as anonymous");
            Caller::Anonymous
        }
    }
}
