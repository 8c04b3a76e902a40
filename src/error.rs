//! Error types for submission ingestion and security handling
//!
//! Validation failures, store failures and malformed trees each get their own
//! variant so callers can tell a rejected submission from a broken store.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubmissionError>;

/// Main error type for the submission core
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Integrity violation: {0}")]
    Integrity(#[from] IntegrityViolation),

    #[error("Submission {submission_id} was rejected: one or more features failed validation")]
    SubmissionRejected { submission_id: i64 },

    #[error("Unknown or inactive security rule(s): {0:?}")]
    UnknownSecurityRule(Vec<i64>),

    #[error("Security rule(s) {0:?} named for both apply and remove in one patch")]
    OverlappingPatch(Vec<i64>),

    #[error("Unknown feature type '{feature_type}'")]
    UnknownFeatureType { feature_type: String },

    #[error("Schema catalog error: {0}")]
    Catalog(String),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SubmissionError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::SubmissionRejected { .. } => 422,
            Self::UnknownSecurityRule(_) | Self::OverlappingPatch(_) => 422,
            Self::UnknownFeatureType { .. } => 422,
            Self::Integrity(_) => 400,
            Self::Persistence(_) | Self::Catalog(_) | Self::Internal(_) => 500,
            #[cfg(feature = "database")]
            Self::Database(_) => 500,
        }
    }

    /// Expected-one-row helper used by store adapters.
    pub fn unexpected_rows(operation: &str, expected: u64, actual: u64) -> Self {
        Self::Persistence(format!(
            "{operation}: expected {expected} row(s) affected, got {actual}"
        ))
    }
}

/// A feature's properties do not satisfy its schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Property {property} is missing")]
    MissingProperty { property: String },

    #[error("Property {property} is not of type {expected} (found {found})")]
    TypeMismatch {
        property: String,
        expected: String,
        found: String,
    },

    #[error("Property {property} is not a valid date")]
    InvalidDate { property: String },

    #[error("Property {property} is not a valid GeoJSON FeatureCollection: {reason}")]
    InvalidSpatial { property: String, reason: String },
}

impl ValidationError {
    /// Name of the property that failed.
    pub fn property(&self) -> &str {
        match self {
            Self::MissingProperty { property }
            | Self::TypeMismatch { property, .. }
            | Self::InvalidDate { property }
            | Self::InvalidSpatial { property, .. } => property,
        }
    }
}

/// The nested feature payload cannot be turned into parent-linked rows
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    #[error("parent path {parent_path:?} of feature '{feature_id}' was never inserted")]
    UnresolvedParent {
        feature_id: String,
        parent_path: Vec<usize>,
    },

    #[error("feature id '{feature_id}' appears more than once in the submission")]
    DuplicateFeatureId { feature_id: String },
}
