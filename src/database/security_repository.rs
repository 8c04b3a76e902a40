//! Security rule assignments for submission features and artifacts.
//!
//! A partial unique index on `(node, security_rule_id) WHERE record_end_date
//! IS NULL` backs the one-active-assignment invariant; apply relies on it via
//! `ON CONFLICT ... DO NOTHING`. Removal end-dates rows.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::error::Result;
use crate::models::{
    PatchOutcome, SecurityAssignment, SecurityCategory, SecurityRule, SecurityTarget,
};
use crate::ports::SecurityStore;

/// Assignment table and node column for a target kind.
fn table_of(target: SecurityTarget) -> (&'static str, &'static str) {
    match target {
        SecurityTarget::SubmissionFeature => ("submission_feature_security", "submission_feature_id"),
        SecurityTarget::Artifact => ("artifact_security", "artifact_id"),
    }
}

async fn apply_in(
    conn: &mut PgConnection,
    target: SecurityTarget,
    node_ids: &[i64],
    rule_ids: &[i64],
) -> Result<Vec<SecurityAssignment>> {
    let (table, node_col) = table_of(target);
    let sql = format!(
        r#"
        INSERT INTO {table} ({node_col}, security_rule_id)
        SELECT n.node_id, r.rule_id
        FROM UNNEST($1::bigint[]) AS n(node_id)
        CROSS JOIN UNNEST($2::bigint[]) AS r(rule_id)
        ON CONFLICT ({node_col}, security_rule_id) WHERE record_end_date IS NULL
        DO NOTHING
        RETURNING {node_col} AS node_id, security_rule_id, record_effective_date, record_end_date
        "#
    );

    let rows = sqlx::query_as::<_, SecurityAssignment>(&sql)
        .bind(node_ids)
        .bind(rule_ids)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

async fn end_date_in(
    conn: &mut PgConnection,
    target: SecurityTarget,
    node_ids: &[i64],
    rule_ids: Option<&[i64]>,
) -> Result<Vec<SecurityAssignment>> {
    let (table, node_col) = table_of(target);
    let rule_filter = if rule_ids.is_some() {
        "AND security_rule_id = ANY($2)"
    } else {
        ""
    };
    let sql = format!(
        r#"
        UPDATE {table}
        SET record_end_date = now()
        WHERE {node_col} = ANY($1)
          AND record_end_date IS NULL
          {rule_filter}
        RETURNING {node_col} AS node_id, security_rule_id, record_effective_date, record_end_date
        "#
    );

    let mut query = sqlx::query_as::<_, SecurityAssignment>(&sql).bind(node_ids);
    if let Some(rule_ids) = rule_ids {
        query = query.bind(rule_ids);
    }
    Ok(query.fetch_all(conn).await?)
}

#[derive(Clone, Debug)]
pub struct PgSecurityStore {
    pool: PgPool,
}

impl PgSecurityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecurityStore for PgSecurityStore {
    async fn apply(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        rule_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        let mut conn = self.pool.acquire().await?;
        apply_in(&mut conn, target, node_ids, rule_ids).await
    }

    async fn remove_all(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        let mut conn = self.pool.acquire().await?;
        end_date_in(&mut conn, target, node_ids, None).await
    }

    async fn remove_specific(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        rule_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        let mut conn = self.pool.acquire().await?;
        end_date_in(&mut conn, target, node_ids, Some(rule_ids)).await
    }

    async fn patch(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        apply_rule_ids: &[i64],
        remove_rule_ids: &[i64],
    ) -> Result<PatchOutcome> {
        let mut tx = self.pool.begin().await?;

        let applied = apply_in(&mut tx, target, node_ids, apply_rule_ids).await?;
        let removed = end_date_in(&mut tx, target, node_ids, Some(remove_rule_ids)).await?;

        tx.commit().await?;
        Ok(PatchOutcome { applied, removed })
    }

    async fn active_assignments(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        let (table, node_col) = table_of(target);
        let sql = format!(
            r#"
            SELECT {node_col} AS node_id, security_rule_id, record_effective_date, record_end_date
            FROM {table}
            WHERE {node_col} = ANY($1)
              AND record_end_date IS NULL
            ORDER BY {node_col}, security_rule_id
            "#
        );

        let rows = sqlx::query_as::<_, SecurityAssignment>(&sql)
            .bind(node_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_rules(&self) -> Result<Vec<SecurityRule>> {
        let rules = sqlx::query_as::<_, SecurityRule>(
            r#"
            SELECT security_rule_id, name, description, security_category_id,
                   record_effective_date, record_end_date
            FROM security_rule
            ORDER BY security_rule_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rules)
    }

    async fn list_categories(&self) -> Result<Vec<SecurityCategory>> {
        let categories = sqlx::query_as::<_, SecurityCategory>(
            r#"
            SELECT security_category_id, name, description,
                   record_effective_date, record_end_date
            FROM security_category
            ORDER BY security_category_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }
}
