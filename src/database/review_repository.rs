//! Read queries behind security classification and the review listing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::Result;
use crate::models::{DatasetReviewRow, NodeSecurity, SecuritySnapshot};
use crate::ports::ReviewStore;

#[derive(Clone, Debug)]
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn submission_snapshot(&self, submission_id: i64) -> Result<SecuritySnapshot> {
        let mut tx = self.pool.begin().await?;

        let security_review_timestamp = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            r#"
            SELECT security_review_timestamp
            FROM submission
            WHERE submission_id = $1
            "#,
        )
        .bind(submission_id)
        .fetch_optional(&mut *tx)
        .await?
        .flatten();

        let rows = sqlx::query_as::<_, (i64, Vec<i64>)>(
            r#"
            SELECT sf.submission_feature_id,
                   COALESCE(
                       array_agg(sfs.security_rule_id ORDER BY sfs.security_rule_id)
                           FILTER (WHERE sfs.security_rule_id IS NOT NULL),
                       '{}'
                   ) AS rule_ids
            FROM submission_feature sf
            LEFT JOIN submission_feature_security sfs
              ON sfs.submission_feature_id = sf.submission_feature_id
             AND sfs.record_end_date IS NULL
            WHERE sf.submission_id = $1
            GROUP BY sf.submission_feature_id
            ORDER BY sf.submission_feature_id
            "#,
        )
        .bind(submission_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SecuritySnapshot {
            security_review_timestamp,
            nodes: rows
                .into_iter()
                .map(|(node_id, rule_ids)| NodeSecurity { node_id, rule_ids })
                .collect(),
        })
    }

    async fn dataset_submission_ids(&self, dataset_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT submission_id
            FROM submission
            WHERE dataset_id = $1
            ORDER BY submission_id
            "#,
        )
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn dataset_review_rows(&self) -> Result<Vec<DatasetReviewRow>> {
        let rows = sqlx::query_as::<_, DatasetReviewRow>(
            r#"
            SELECT d.dataset_id,
                   d.name,
                   d.keywords,
                   COUNT(a.artifact_id) FILTER (WHERE a.security_review_timestamp IS NULL)
                       AS artifacts_to_review,
                   MAX(a.create_date) FILTER (WHERE a.security_review_timestamp IS NULL)
                       AS last_updated,
                   COALESCE(
                       (SELECT array_agg(rp.related_dataset_id ORDER BY rp.related_dataset_id)
                        FROM dataset_related_project rp
                        WHERE rp.dataset_id = d.dataset_id),
                       '{}'
                   ) AS related_project_ids
            FROM dataset d
            LEFT JOIN artifact a ON a.dataset_id = d.dataset_id
            GROUP BY d.dataset_id, d.name, d.keywords
            ORDER BY d.dataset_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
