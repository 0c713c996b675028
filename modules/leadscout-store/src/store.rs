use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::query::Query;

/// Document CRUD over the hierarchical layout `users/{uid}/{collection}/{id}`.
///
/// The production backend is an external collaborator; this trait is the
/// integration point. `MemoryStore` ships in-process for tests, the CLI, and
/// single-node deployments.
#[async_trait]
pub trait DocStore: Send + Sync {
    async fn get(&self, user_id: &str, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Insert or fully replace a document. Last-writer-wins; callers needing
    /// field-level guards go through `update_if`.
    async fn put(&self, user_id: &str, collection: &str, id: &str, doc: Value) -> Result<()>;

    async fn delete(&self, user_id: &str, collection: &str, id: &str) -> Result<()>;

    async fn query(&self, user_id: &str, collection: &str, query: Query) -> Result<Vec<Value>>;

    /// Compare-and-set: replace the document only if `guard_field` currently
    /// equals `expected` (`None` = field absent or document missing). Returns
    /// false on mismatch. This is the primitive behind the §5 serialization
    /// rules (learning-pattern updates, insight status guard).
    async fn update_if(
        &self,
        user_id: &str,
        collection: &str,
        id: &str,
        guard_field: &str,
        expected: Option<Value>,
        doc: Value,
    ) -> Result<bool>;
}
