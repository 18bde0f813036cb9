//! Bearer-token verification against the identity service.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization Header")]
    Missing,
    #[error("Malformed Authorization Header")]
    Malformed,
    #[error("Invalid token: {0}")]
    Rejected(String),
    #[error("Identity service unavailable: {0}")]
    Unavailable(String),
}

/// The identity collaborator: `verify(token) -> Identity | Error`.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Extracts the token from an `Authorization` header value (`Bearer <token>`).
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::Malformed),
    }
}

/// Fixed token table, for development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            tokens: pairs.into_iter().collect(),
        }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .get(token)
            .map(|uid| Identity { uid: uid.clone() })
            .ok_or_else(|| AuthError::Rejected("unknown token".to_string()))
    }
}

#[derive(Deserialize)]
struct VerifyResponse {
    uid: String,
}

/// Verifies tokens by POSTing `{"token": ...}` to a remote endpoint.
///
/// Any 2xx with a `uid` is a valid identity; any other status rejects the token.
pub struct RemoteTokenVerifier {
    client: reqwest::Client,
    verify_url: String,
}

impl RemoteTokenVerifier {
    pub fn new(verify_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            verify_url: verify_url.into(),
        })
    }
}

#[async_trait]
impl TokenVerifier for RemoteTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let resp = self
            .client
            .post(&self.verify_url)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AuthError::Rejected(format!(
                "identity service answered {}",
                resp.status()
            )));
        }

        let body: VerifyResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Rejected(e.to_string()))?;
        Ok(Identity { uid: body.uid })
    }
}

/// Token verifier that rejects everything. Used when nothing is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllVerifier;

#[async_trait]
impl TokenVerifier for DenyAllVerifier {
    async fn verify(&self, _token: &str) -> Result<Identity, AuthError> {
        Err(AuthError::Rejected("no identity provider configured".to_string()))
    }
}
