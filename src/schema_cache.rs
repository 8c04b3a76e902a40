//! Process-lifetime cache of feature type schemas.
//!
//! The catalog is static at runtime, so entries are never evicted. A failed
//! catalog fetch is not cached and the next call retries.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::models::SchemaProperty;
use crate::ports::SchemaCatalog;

pub struct SchemaCache {
    catalog: Arc<dyn SchemaCatalog>,
    entries: RwLock<HashMap<String, Arc<Vec<SchemaProperty>>>>,
}

impl SchemaCache {
    pub fn new(catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self {
            catalog,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Ordered schema properties for `feature_type`, fetched at most once per
    /// successful lookup.
    pub async fn get_properties(&self, feature_type: &str) -> Result<Arc<Vec<SchemaProperty>>> {
        if let Some(cached) = self.entries.read().await.get(feature_type) {
            debug!(feature_type, "schema cache hit");
            return Ok(Arc::clone(cached));
        }

        debug!(feature_type, "schema cache miss");
        let fetched = Arc::new(self.catalog.fetch_properties(feature_type).await?);

        // Two concurrent misses may both fetch; the first insert wins.
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(feature_type.to_string())
            .or_insert_with(|| Arc::clone(&fetched));
        Ok(Arc::clone(entry))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
