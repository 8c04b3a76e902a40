//! Submission intake: validate, insert the feature tree, signal reindexing.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, SubmissionError};
use crate::feature_tree;
use crate::models::{FeatureNodeInput, InsertedFeature};
use crate::ports::{FeatureStore, SearchIndexer};
use crate::validation::ValidationEngine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub submission_id: i64,
    pub inserted: Vec<InsertedFeature>,
}

#[derive(Clone)]
pub struct SubmissionIntakeService {
    validator: ValidationEngine,
    features: Arc<dyn FeatureStore>,
    indexer: Arc<dyn SearchIndexer>,
    reindex_on_ingest: bool,
}

impl SubmissionIntakeService {
    pub fn new(
        validator: ValidationEngine,
        features: Arc<dyn FeatureStore>,
        indexer: Arc<dyn SearchIndexer>,
        reindex_on_ingest: bool,
    ) -> Self {
        Self {
            validator,
            features,
            indexer,
            reindex_on_ingest,
        }
    }

    pub fn validator(&self) -> &ValidationEngine {
        &self.validator
    }

    /// Validate the whole tree, then insert it in one unit of work. Nothing is
    /// written when any feature fails validation.
    pub async fn ingest(&self, submission_id: i64, root: &FeatureNodeInput) -> Result<IngestReport> {
        if !self.validator.validate_submission_features(root).await? {
            return Err(SubmissionError::SubmissionRejected { submission_id });
        }

        let inserted = self.insert_tree(submission_id, root).await?;

        if self.reindex_on_ingest {
            self.signal_reindex(submission_id);
        }

        Ok(IngestReport {
            submission_id,
            inserted,
        })
    }

    /// Insert the tree without validating it. Either every feature is
    /// committed or none is.
    pub async fn insert_tree(
        &self,
        submission_id: i64,
        root: &FeatureNodeInput,
    ) -> Result<Vec<InsertedFeature>> {
        let mut writer = self.features.begin().await?;
        let inserted = feature_tree::insert_tree(writer.as_mut(), submission_id, root).await?;
        writer.commit().await?;

        info!(submission_id, features = inserted.len(), "submission features inserted");
        Ok(inserted)
    }

    /// Fire-and-continue: the intake result never waits on the indexer.
    fn signal_reindex(&self, submission_id: i64) {
        let indexer = Arc::clone(&self.indexer);
        tokio::spawn(async move {
            if let Err(e) = indexer.reindex_submission(submission_id).await {
                warn!(submission_id, error = %e, "reindex signal failed");
            }
        });
    }
}
