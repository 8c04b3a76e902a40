//! Submission feature rows.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{Result, SubmissionError};
use crate::models::{NewSubmissionFeature, SubmissionFeature};
use crate::ports::{FeatureStore, FeatureWriter};

#[derive(Clone, Debug)]
pub struct PgFeatureStore {
    pool: PgPool,
}

impl PgFeatureStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Inserts features inside one transaction; dropped without `commit` the
/// transaction rolls back.
pub struct PgFeatureWriter {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl FeatureWriter for PgFeatureWriter {
    async fn insert_feature(&mut self, feature: NewSubmissionFeature) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO submission_feature (
                submission_id, feature_type_id, source_id, parent_submission_feature_id, data
            )
            SELECT $1, ft.feature_type_id, $3, $4, $5
            FROM feature_type ft
            WHERE ft.name = $2
            RETURNING submission_feature_id
            "#,
        )
        .bind(feature.submission_id)
        .bind(&feature.feature_type)
        .bind(&feature.source_id)
        .bind(feature.parent_submission_feature_id)
        .bind(serde_json::Value::Object(feature.data))
        .fetch_optional(&mut *self.tx)
        .await?;

        // The INSERT ... SELECT yields no row when the type is not in feature_type.
        id.ok_or(SubmissionError::UnknownFeatureType {
            feature_type: feature.feature_type,
        })
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl FeatureStore for PgFeatureStore {
    async fn begin(&self) -> Result<Box<dyn FeatureWriter>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgFeatureWriter { tx }))
    }

    async fn list_features(&self, submission_id: i64) -> Result<Vec<SubmissionFeature>> {
        let rows = sqlx::query_as::<_, SubmissionFeature>(
            r#"
            SELECT sf.submission_feature_id, sf.submission_id, ft.name AS feature_type,
                   sf.source_id, sf.parent_submission_feature_id, sf.data, sf.create_date
            FROM submission_feature sf
            JOIN feature_type ft ON ft.feature_type_id = sf.feature_type_id
            WHERE sf.submission_id = $1
            ORDER BY sf.submission_feature_id
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
