//! Schema-driven validation of feature properties
//!
//! Every property a feature type declares is checked for presence, whether or
//! not it is marked required, and then for its semantic type:
//! - `string`, `number`, `boolean`: the JSON value kind must match
//! - `object`: a JSON object or array (`null` is not an object)
//! - `spatial`: a structurally valid GeoJSON FeatureCollection
//! - `datetime`: a string naming a real calendar date/time

mod datetime;
mod spatial;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, SubmissionError, ValidationError};
use crate::models::{FeatureNodeInput, SchemaProperty, SemanticType};
use crate::schema_cache::SchemaCache;

pub use datetime::is_valid_datetime;
pub use spatial::check_feature_collection;

/// Validate `data` against `schema`. Returns `Ok(true)` or the first failing
/// property's error, in schema order.
pub fn validate_properties(
    schema: &[SchemaProperty],
    data: &Map<String, Value>,
) -> std::result::Result<bool, ValidationError> {
    for property in schema {
        let value = data
            .get(&property.name)
            .ok_or_else(|| ValidationError::MissingProperty {
                property: property.name.clone(),
            })?;
        validate_value(property, value)?;
    }
    Ok(true)
}

fn validate_value(property: &SchemaProperty, value: &Value) -> std::result::Result<(), ValidationError> {
    let matches = match property.semantic_type {
        SemanticType::String => value.is_string(),
        SemanticType::Number => value.is_number(),
        SemanticType::Boolean => value.is_boolean(),
        SemanticType::Object => value.is_object() || value.is_array(),
        SemanticType::Spatial => {
            return check_feature_collection(value).map_err(|reason| {
                ValidationError::InvalidSpatial {
                    property: property.name.clone(),
                    reason,
                }
            });
        }
        SemanticType::Datetime => {
            let text = value.as_str().ok_or_else(|| type_mismatch(property, value))?;
            if !is_valid_datetime(text) {
                return Err(ValidationError::InvalidDate {
                    property: property.name.clone(),
                });
            }
            true
        }
    };

    if matches {
        Ok(())
    } else {
        Err(type_mismatch(property, value))
    }
}

fn type_mismatch(property: &SchemaProperty, value: &Value) -> ValidationError {
    ValidationError::TypeMismatch {
        property: property.name.clone(),
        expected: property.semantic_type.to_string(),
        found: json_kind(value).to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One feature that failed validation, located by its child index path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureFailure {
    pub path: Vec<usize>,
    pub source_id: String,
    pub feature_type: String,
    pub error: String,
}

/// Validates features against the schemas held by a `SchemaCache`.
#[derive(Clone)]
pub struct ValidationEngine {
    schemas: Arc<SchemaCache>,
}

impl ValidationEngine {
    pub fn new(schemas: Arc<SchemaCache>) -> Self {
        Self { schemas }
    }

    pub fn schemas(&self) -> &Arc<SchemaCache> {
        &self.schemas
    }

    /// Validate one node's own properties. Child features are not part of the
    /// validated payload.
    pub async fn validate_submission_feature(&self, node: &FeatureNodeInput) -> Result<bool> {
        let schema = self.schemas.get_properties(&node.feature_type).await?;
        if schema.is_empty() {
            debug!(feature_type = %node.feature_type, "no schema properties declared");
        }
        Ok(validate_properties(&schema, &node.properties)?)
    }

    /// Validate every node of the tree. Any property failure yields `Ok(false)`;
    /// catalog failures still propagate.
    pub async fn validate_submission_features(&self, root: &FeatureNodeInput) -> Result<bool> {
        match self.collect_failures(root, true).await?.into_iter().next() {
            None => Ok(true),
            Some(failure) => {
                warn!(
                    feature_id = %failure.source_id,
                    feature_type = %failure.feature_type,
                    error = %failure.error,
                    "submission feature failed validation"
                );
                Ok(false)
            }
        }
    }

    /// Every failing node of the tree, in depth-first order.
    pub async fn invalid_features(&self, root: &FeatureNodeInput) -> Result<Vec<FeatureFailure>> {
        self.collect_failures(root, false).await
    }

    async fn collect_failures(
        &self,
        root: &FeatureNodeInput,
        stop_at_first: bool,
    ) -> Result<Vec<FeatureFailure>> {
        let mut failures = Vec::new();
        let mut stack: Vec<(Vec<usize>, &FeatureNodeInput)> = vec![(Vec::new(), root)];

        while let Some((path, node)) = stack.pop() {
            match self.validate_submission_feature(node).await {
                Ok(_) => {}
                Err(SubmissionError::Validation(error)) => {
                    failures.push(FeatureFailure {
                        path: path.clone(),
                        source_id: node.id.clone(),
                        feature_type: node.feature_type.clone(),
                        error: error.to_string(),
                    });
                    if stop_at_first {
                        break;
                    }
                }
                Err(other) => return Err(other),
            }

            for (index, child) in node.child_features.iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(index);
                stack.push((child_path, child));
            }
        }

        Ok(failures)
    }
}
