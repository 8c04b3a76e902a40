//! Dataset review reporting rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-dataset outstanding review count as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct DatasetReviewRow {
    pub dataset_id: i64,
    pub name: String,
    pub keywords: Vec<String>,
    pub artifacts_to_review: i64,
    pub last_updated: Option<DateTime<Utc>>,
    /// Datasets whose outstanding counts roll up into this one.
    pub related_project_ids: Vec<i64>,
}

/// One line of the "datasets requiring review" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub dataset_id: i64,
    pub name: String,
    pub keywords: Vec<String>,
    pub artifacts_to_review: i64,
    pub last_updated: Option<DateTime<Utc>>,
    pub oldest_outstanding: Option<DateTime<Utc>>,
}
