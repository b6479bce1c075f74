use super::Page;
use crate::error::RepositoryError;
use crate::models::{AuditEntry, AuditFilter, AuditLog};
use sqlx::PgPool;

/// Append-only store for audit records
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: &AuditEntry) -> Result<AuditLog, RepositoryError> {
        let log = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (user_id, action, resource_type, resource_id, description, details, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(entry.resource_type)
        .bind(entry.resource_id)
        .bind(&entry.description)
        .bind(&entry.details)
        .bind(entry.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    pub async fn list(&self, filter: &AuditFilter, page: Page) -> Result<Vec<AuditLog>, RepositoryError> {
        let logs = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE ($1::text IS NULL OR resource_type = $1)
              AND ($2::uuid IS NULL OR resource_id = $2)
              AND ($3::uuid IS NULL OR user_id = $3)
            ORDER BY created_at DESC
            OFFSET $4 LIMIT $5
            "#,
        )
        .bind(super::filter_text(&filter.resource_type))
        .bind(filter.resource_id)
        .bind(filter.user_id)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
