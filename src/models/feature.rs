//! Submission feature models: the nested intake payload and its persisted rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One node of a submission payload as received at intake.
///
/// `id` is caller-supplied and only needs to be unique within one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureNodeInput {
    pub id: String,
    #[serde(rename = "type")]
    pub feature_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub child_features: Vec<FeatureNodeInput>,
}

impl FeatureNodeInput {
    pub fn new(id: impl Into<String>, feature_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            feature_type: feature_type.into(),
            properties: Map::new(),
            child_features: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_child(mut self, child: FeatureNodeInput) -> Self {
        self.child_features.push(child);
        self
    }

    /// Parse a submission payload from JSON.
    ///
    /// Nesting depth is unbounded: serde_json's recursion limit is lifted and
    /// `serde_stacker` grows the stack on demand for deep chains.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        let mut de = serde_json::Deserializer::from_str(json);
        de.disable_recursion_limit();
        let node = Self::deserialize(serde_stacker::Deserializer::new(&mut de))?;
        de.end()?;
        Ok(node)
    }

    /// Total number of nodes in this subtree, root included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.child_features.iter());
        }
        count
    }
}

/// Row handed to a `FeatureWriter` for insertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSubmissionFeature {
    pub submission_id: i64,
    pub feature_type: String,
    pub source_id: String,
    pub parent_submission_feature_id: Option<i64>,
    pub data: Map<String, Value>,
}

/// A persisted submission feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct SubmissionFeature {
    pub submission_feature_id: i64,
    pub submission_id: i64,
    pub feature_type: String,
    pub source_id: String,
    pub parent_submission_feature_id: Option<i64>,
    pub data: Value,
    pub create_date: DateTime<Utc>,
}

/// Caller id to persisted id mapping produced by one tree insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertedFeature {
    pub source_id: String,
    pub submission_feature_id: i64,
    pub parent_submission_feature_id: Option<i64>,
}
