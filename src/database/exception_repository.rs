//! Persecution/harm exceptions granted to users.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::{PersecutionHarmException, PersecutionHarmRule};
use crate::ports::ExceptionStore;

#[derive(Clone, Debug)]
pub struct PgExceptionStore {
    pool: PgPool,
}

impl PgExceptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExceptionStore for PgExceptionStore {
    async fn exceptions_for_user(
        &self,
        system_user_id: i64,
    ) -> Result<Vec<PersecutionHarmException>> {
        let rows = sqlx::query_as::<_, PersecutionHarmException>(
            r#"
            SELECT persecution_or_harm_id, system_user_id, record_effective_date, record_end_date
            FROM persecution_or_harm_exception
            WHERE system_user_id = $1
            ORDER BY persecution_or_harm_id
            "#,
        )
        .bind(system_user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn rules_for_taxon(&self, taxonomy_id: i64) -> Result<Vec<PersecutionHarmRule>> {
        let rows = sqlx::query_as::<_, PersecutionHarmRule>(
            r#"
            SELECT persecution_or_harm_id, name, description, taxonomy_id
            FROM persecution_or_harm
            WHERE taxonomy_id = $1
            ORDER BY persecution_or_harm_id
            "#,
        )
        .bind(taxonomy_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
