//! Feature type schema lookups.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{Result, SubmissionError};
use crate::models::SchemaProperty;
use crate::ports::SchemaCatalog;

#[derive(Debug, sqlx::FromRow)]
struct SchemaPropertyRow {
    name: String,
    display_name: String,
    description: String,
    semantic_type: String,
    required: bool,
}

impl TryFrom<SchemaPropertyRow> for SchemaProperty {
    type Error = SubmissionError;

    fn try_from(row: SchemaPropertyRow) -> Result<Self> {
        let semantic_type = row.semantic_type.parse().map_err(|e| {
            SubmissionError::Catalog(format!("property {}: {e}", row.name))
        })?;
        Ok(SchemaProperty {
            name: row.name,
            display_name: row.display_name,
            description: row.description,
            semantic_type,
            required: row.required,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgSchemaCatalog {
    pool: PgPool,
}

impl PgSchemaCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaCatalog for PgSchemaCatalog {
    async fn fetch_properties(&self, feature_type: &str) -> Result<Vec<SchemaProperty>> {
        let rows = sqlx::query_as::<_, SchemaPropertyRow>(
            r#"
            SELECT fp.name, fp.display_name, fp.description,
                   fpt.name AS semantic_type,
                   ftp.required_value AS required
            FROM feature_type ft
            JOIN feature_type_property ftp ON ftp.feature_type_id = ft.feature_type_id
            JOIN feature_property fp ON fp.feature_property_id = ftp.feature_property_id
            JOIN feature_property_type fpt ON fpt.feature_property_type_id = fp.feature_property_type_id
            WHERE ft.name = $1
              AND ftp.record_end_date IS NULL
            ORDER BY ftp.sort, fp.name
            "#,
        )
        .bind(feature_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SubmissionError::Catalog(e.to_string()))?;

        rows.into_iter().map(SchemaProperty::try_from).collect()
    }
}
