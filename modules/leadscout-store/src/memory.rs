use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::query::{compare_values, field_value, matches_filter, Query};
use crate::store::DocStore;

/// In-memory document store. BTreeMap per collection keeps iteration order
/// stable, which makes un-ordered query results deterministic in tests.
#[derive(Default)]
pub struct MemoryStore {
    // (user_id, collection) → id → document
    data: Mutex<HashMap<(String, String), BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total document count across all users and collections.
    pub async fn len(&self) -> usize {
        self.data.lock().await.values().map(|c| c.len()).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DocStore for MemoryStore {
    async fn get(&self, user_id: &str, collection: &str, id: &str) -> Result<Option<Value>> {
        let data = self.data.lock().await;
        Ok(data
            .get(&(user_id.to_string(), collection.to_string()))
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn put(&self, user_id: &str, collection: &str, id: &str, doc: Value) -> Result<()> {
        let mut data = self.data.lock().await;
        data.entry((user_id.to_string(), collection.to_string()))
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn delete(&self, user_id: &str, collection: &str, id: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        if let Some(c) = data.get_mut(&(user_id.to_string(), collection.to_string())) {
            c.remove(id);
        }
        Ok(())
    }

    async fn query(&self, user_id: &str, collection: &str, query: Query) -> Result<Vec<Value>> {
        let data = self.data.lock().await;
        let mut results: Vec<Value> = data
            .get(&(user_id.to_string(), collection.to_string()))
            .map(|c| {
                c.values()
                    .filter(|doc| query.filters.iter().all(|f| matches_filter(doc, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            results.sort_by(|a, b| {
                let va = field_value(a, &order.field).unwrap_or(&Value::Null);
                let vb = field_value(b, &order.field).unwrap_or(&Value::Null);
                let ord = compare_values(va, vb);
                match order.direction {
                    crate::query::Direction::Asc => ord,
                    crate::query::Direction::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        Ok(results)
    }

    async fn update_if(
        &self,
        user_id: &str,
        collection: &str,
        id: &str,
        guard_field: &str,
        expected: Option<Value>,
        doc: Value,
    ) -> Result<bool> {
        let mut data = self.data.lock().await;
        let coll = data
            .entry((user_id.to_string(), collection.to_string()))
            .or_default();

        let current = coll.get(id).and_then(|d| field_value(d, guard_field).cloned());
        if current != expected {
            return Ok(false);
        }
        coll.insert(id.to_string(), doc);
        Ok(true)
    }
}
