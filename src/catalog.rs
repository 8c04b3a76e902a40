//! JSON file backed schema catalog.
//!
//! Document shape: `{ "<feature type>": [SchemaProperty, ...], ... }`.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{Result, SubmissionError};
use crate::models::SchemaProperty;
use crate::ports::SchemaCatalog;

#[derive(Debug, Clone, Default)]
pub struct FileSchemaCatalog {
    feature_types: HashMap<String, Vec<SchemaProperty>>,
}

impl FileSchemaCatalog {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let feature_types = serde_json::from_str(json)
            .map_err(|e| SubmissionError::Catalog(format!("invalid schema catalog: {e}")))?;
        Ok(Self { feature_types })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SubmissionError::Catalog(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_feature_type(
        mut self,
        feature_type: impl Into<String>,
        properties: Vec<SchemaProperty>,
    ) -> Self {
        self.feature_types.insert(feature_type.into(), properties);
        self
    }
}

#[async_trait]
impl SchemaCatalog for FileSchemaCatalog {
    async fn fetch_properties(&self, feature_type: &str) -> Result<Vec<SchemaProperty>> {
        Ok(self
            .feature_types
            .get(feature_type)
            .cloned()
            .unwrap_or_default())
    }
}
