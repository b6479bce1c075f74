use super::Page;
use crate::error::RepositoryError;
use crate::models::Department;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for departments
pub struct DepartmentRepository {
    pool: PgPool,
}

impl DepartmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, department: &Department) -> Result<Department, RepositoryError> {
        let created = sqlx::query_as::<_, Department>(
            r#"
            INSERT INTO departments (
                id, name, code, department_type, floor_id, head_doctor_id, contact_number,
                email, status, is_emergency_department, is_24x7, description, created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(department.id)
        .bind(&department.name)
        .bind(&department.code)
        .bind(&department.department_type)
        .bind(department.floor_id)
        .bind(department.head_doctor_id)
        .bind(&department.contact_number)
        .bind(&department.email)
        .bind(&department.status)
        .bind(department.is_emergency_department)
        .bind(department.is_24x7)
        .bind(&department.description)
        .bind(department.created_at)
        .bind(department.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Department>, RepositoryError> {
        let department = sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(department)
    }

    pub async fn list(
        &self,
        status: Option<String>,
        page: Page,
    ) -> Result<Vec<Department>, RepositoryError> {
        let departments = sqlx::query_as::<_, Department>(
            r#"
            SELECT * FROM departments
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY name
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(status)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(departments)
    }

    pub async fn update(&self, department: &Department) -> Result<Department, RepositoryError> {
        let updated = sqlx::query_as::<_, Department>(
            r#"
            UPDATE departments SET
                name = $2, department_type = $3, floor_id = $4, head_doctor_id = $5,
                contact_number = $6, email = $7, status = $8, is_emergency_department = $9,
                is_24x7 = $10, description = $11, updated_at = $12
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(department.id)
        .bind(&department.name)
        .bind(&department.department_type)
        .bind(department.floor_id)
        .bind(department.head_doctor_id)
        .bind(&department.contact_number)
        .bind(&department.email)
        .bind(&department.status)
        .bind(department.is_emergency_department)
        .bind(department.is_24x7)
        .bind(&department.description)
        .bind(department.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Department not found".to_string()))?;

        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}
