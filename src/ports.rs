//! Storage port traits.
//!
//! Services depend only on these traits. `MemoryStore` implements all of them
//! in-process; the `database` feature adds the Postgres adapters.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    DatasetReviewRow, NewSubmissionFeature, PatchOutcome, PersecutionHarmException,
    PersecutionHarmRule, SchemaProperty, SecurityAssignment, SecurityCategory, SecurityRule,
    SecuritySnapshot, SecurityTarget, SubmissionFeature,
};

/// Backing catalog of feature type schemas.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Ordered expected properties for a feature type. Unknown types yield an
    /// empty list.
    async fn fetch_properties(&self, feature_type: &str) -> Result<Vec<SchemaProperty>>;
}

/// Unit of work for inserting one submission's features.
///
/// Dropping a writer without calling `commit` discards everything it wrote.
#[async_trait]
pub trait FeatureWriter: Send {
    /// Insert one feature row and return its persisted id.
    ///
    /// The Postgres writer fails with `UnknownFeatureType` when the type is
    /// not registered in `feature_type`; `MemoryStore` keeps no type registry
    /// and accepts any type.
    async fn insert_feature(&mut self, feature: NewSubmissionFeature) -> Result<i64>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Open a new transactional writer.
    async fn begin(&self) -> Result<Box<dyn FeatureWriter>>;

    /// Features of a submission in insertion order.
    async fn list_features(&self, submission_id: i64) -> Result<Vec<SubmissionFeature>>;
}

/// Many-to-many association between nodes and security rules.
///
/// Every method is atomic: on error nothing it attempted is left applied.
#[async_trait]
pub trait SecurityStore: Send + Sync {
    /// Create an active assignment for every (node, rule) pair. Pairs that
    /// are already active are skipped and absent from the result.
    async fn apply(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        rule_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>>;

    /// End-date every active assignment of the given nodes.
    async fn remove_all(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>>;

    /// End-date active assignments whose (node, rule) pair is in the given sets.
    async fn remove_specific(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        rule_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>>;

    /// `apply` then `remove_specific` against the same nodes, in one transaction.
    /// The two rule sets are expected to be disjoint; `SecurityRuleService`
    /// rejects overlapping requests before they reach the store.
    async fn patch(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        apply_rule_ids: &[i64],
        remove_rule_ids: &[i64],
    ) -> Result<PatchOutcome>;

    async fn active_assignments(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>>;

    /// All rules, active and end-dated.
    async fn list_rules(&self) -> Result<Vec<SecurityRule>>;

    /// All rule categories, active and end-dated.
    async fn list_categories(&self) -> Result<Vec<SecurityCategory>>;
}

/// Read side used by the classifier and the review listing.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Review timestamp plus the active rule ids of every feature of a submission.
    async fn submission_snapshot(&self, submission_id: i64) -> Result<SecuritySnapshot>;

    async fn dataset_submission_ids(&self, dataset_id: i64) -> Result<Vec<i64>>;

    async fn dataset_review_rows(&self) -> Result<Vec<DatasetReviewRow>>;
}

#[async_trait]
pub trait ExceptionStore: Send + Sync {
    /// Exceptions recorded for a user, including end-dated ones.
    async fn exceptions_for_user(&self, system_user_id: i64)
        -> Result<Vec<PersecutionHarmException>>;

    /// Persecution/harm rules attached to a taxonomic unit.
    async fn rules_for_taxon(&self, taxonomy_id: i64) -> Result<Vec<PersecutionHarmRule>>;
}

/// Search index collaborator.
#[async_trait]
pub trait SearchIndexer: Send + Sync {
    async fn reindex_submission(&self, submission_id: i64) -> Result<()>;
}

/// Indexer that only logs the signal.
#[derive(Debug, Default, Clone)]
pub struct LoggingIndexer;

#[async_trait]
impl SearchIndexer for LoggingIndexer {
    async fn reindex_submission(&self, submission_id: i64) -> Result<()> {
        tracing::info!(submission_id, "reindex requested");
        Ok(())
    }
}
