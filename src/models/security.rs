//! Security rules, their assignments to nodes, and the derived status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of node a security assignment attaches to.
///
/// Each kind is stored in its own assignment table with the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityTarget {
    SubmissionFeature,
    Artifact,
}

impl SecurityTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmissionFeature => "submission_feature",
            Self::Artifact => "artifact",
        }
    }
}

impl fmt::Display for SecurityTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct SecurityCategory {
    pub security_category_id: i64,
    pub name: String,
    pub description: String,
    pub record_effective_date: DateTime<Utc>,
    pub record_end_date: Option<DateTime<Utc>>,
}

impl SecurityCategory {
    pub fn is_active(&self) -> bool {
        self.record_end_date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct SecurityRule {
    pub security_rule_id: i64,
    pub name: String,
    pub description: String,
    pub security_category_id: i64,
    pub record_effective_date: DateTime<Utc>,
    pub record_end_date: Option<DateTime<Utc>>,
}

impl SecurityRule {
    /// A rule is active until it is end-dated.
    pub fn is_active(&self) -> bool {
        self.record_end_date.is_none()
    }
}

/// Join row between a node and a security rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct SecurityAssignment {
    pub node_id: i64,
    pub security_rule_id: i64,
    pub record_effective_date: DateTime<Utc>,
    pub record_end_date: Option<DateTime<Utc>>,
}

impl SecurityAssignment {
    pub fn is_active(&self) -> bool {
        self.record_end_date.is_none()
    }
}

/// Result of a combined apply + remove request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOutcome {
    pub applied: Vec<SecurityAssignment>,
    pub removed: Vec<SecurityAssignment>,
}

/// Aggregate security state of a submission, dataset or group of datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityStatus {
    Secured,
    Unsecured,
    PartiallySecured,
    Pending,
}

impl SecurityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secured => "SECURED",
            Self::Unsecured => "UNSECURED",
            Self::PartiallySecured => "PARTIALLY_SECURED",
            Self::Pending => "PENDING",
        }
    }
}

impl fmt::Display for SecurityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active rule ids carried by one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSecurity {
    pub node_id: i64,
    pub rule_ids: Vec<i64>,
}

impl NodeSecurity {
    pub fn is_secured(&self) -> bool {
        !self.rule_ids.is_empty()
    }
}

/// Everything the classifier needs to know about one submission (or a merge
/// of several).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySnapshot {
    pub security_review_timestamp: Option<DateTime<Utc>>,
    pub nodes: Vec<NodeSecurity>,
}

/// Security rule specialised to a sensitive taxonomic unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct PersecutionHarmRule {
    pub persecution_or_harm_id: i64,
    pub name: String,
    pub description: String,
    pub taxonomy_id: i64,
}

/// Grants one user visibility of data restricted by one persecution/harm rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct PersecutionHarmException {
    pub persecution_or_harm_id: i64,
    pub system_user_id: i64,
    pub record_effective_date: DateTime<Utc>,
    pub record_end_date: Option<DateTime<Utc>>,
}

impl PersecutionHarmException {
    pub fn is_active(&self) -> bool {
        self.record_end_date.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&SecurityStatus::PartiallySecured).unwrap();
        assert_eq!(json, "\"PARTIALLY_SECURED\"");
        assert_eq!(SecurityStatus::Pending.to_string(), "PENDING");
    }

    #[test]
    fn rule_activity_follows_end_date() {
        let mut rule = SecurityRule {
            security_rule_id: 1,
            name: "Caribou locations".into(),
            description: String::new(),
            security_category_id: 1,
            record_effective_date: Utc::now(),
            record_end_date: None,
        };
        assert!(rule.is_active());
        rule.record_end_date = Some(Utc::now());
        assert!(!rule.is_active());
    }
}
