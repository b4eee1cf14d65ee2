//! Origin handlers: the caller-supplied async functions that fetch what the cache lacks.

use async_trait::async_trait;
use std::future::Future;

/// Fetches many items at once. Receives the missing identifiers in request order,
/// duplicates included.
#[async_trait]
pub trait BatchOriginHandler<T>: Send + Sync {
    async fn fetch_many(&self, ids: Vec<String>) -> anyhow::Result<Vec<T>>;
}

/// Fetches one item. The identifier is `None` for keyless (prefix-only) entries.
#[async_trait]
pub trait OriginHandler<T>: Send + Sync {
    async fn fetch_one(&self, id: Option<String>) -> anyhow::Result<T>;
}

#[async_trait]
impl<T, F, Fut> BatchOriginHandler<T> for F
where
    T: Send + 'static,
    F: Fn(Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<T>>> + Send,
{
    async fn fetch_many(&self, ids: Vec<String>) -> anyhow::Result<Vec<T>> {
        self(ids).await
    }
}

#[async_trait]
impl<T, F, Fut> OriginHandler<T> for F
where
    T: Send + 'static,
    F: Fn(Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<T>> + Send,
{
    async fn fetch_one(&self, id: Option<String>) -> anyhow::Result<T> {
        self(id).await
    }
}
