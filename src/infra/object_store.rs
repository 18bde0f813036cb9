//! Object store holding recipe images.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::time::Duration;

/// The object store collaborator; only deletion is consumed.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn delete(&self, path: &str) -> anyhow::Result<()>;
}

/// Derives the object path from a stored download URL.
///
/// The URL is percent-decoded and the segment between `/o/` and the next `?`
/// (or the end of the URL) is returned. Returns `None` when the URL has no
/// `/o/` segment or the segment is empty.
pub fn object_path_from_url(url: &str) -> Option<String> {
    let decoded = urlencoding::decode(url).ok()?;
    let start = decoded.find("/o/")? + 3;
    let rest = &decoded[start..];
    let path = match rest.find('?') {
        Some(end) => &rest[..end],
        None => rest,
    };
    (!path.is_empty()).then(|| path.to_string())
}

/// Deletes objects with `DELETE {base_url}/o/{percent-encoded path}`.
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        let url = format!("{}/o/{}", self.base_url, urlencoding::encode(path));
        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("DELETE {} failed", url))?;
        if !resp.status().is_success() {
            return Err(anyhow!("DELETE {} answered {}", url, resp.status()));
        }
        Ok(())
    }
}

/// Object store used when none is configured: every deletion fails loudly in logs.
#[derive(Debug, Default)]
pub struct UnconfiguredObjectStore;

#[async_trait]
impl ObjectStore for UnconfiguredObjectStore {
    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        Err(anyhow!("no object store configured, cannot delete '{}'", path))
    }
}
