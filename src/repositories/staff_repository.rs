use super::{filter_text, Page};
use crate::error::RepositoryError;
use crate::models::{Staff, StaffFilter};
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for non-physician staff
pub struct StaffRepository {
    pool: PgPool,
}

impl StaffRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, staff: &Staff) -> Result<Staff, RepositoryError> {
        let created = sqlx::query_as::<_, Staff>(
            r#"
            INSERT INTO staff (
                id, user_id, staff_code, first_name, last_name, email, phone, employee_id,
                designation, department, role, joining_date, shift, salary, qualification,
                experience_years, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19)
            RETURNING *
            "#,
        )
        .bind(staff.id)
        .bind(staff.user_id)
        .bind(&staff.staff_code)
        .bind(&staff.first_name)
        .bind(&staff.last_name)
        .bind(&staff.email)
        .bind(&staff.phone)
        .bind(&staff.employee_id)
        .bind(&staff.designation)
        .bind(&staff.department)
        .bind(&staff.role)
        .bind(staff.joining_date)
        .bind(&staff.shift)
        .bind(staff.salary)
        .bind(&staff.qualification)
        .bind(staff.experience_years)
        .bind(&staff.status)
        .bind(staff.created_at)
        .bind(staff.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Staff>, RepositoryError> {
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }

    pub async fn list(&self, filter: &StaffFilter, page: Page) -> Result<Vec<Staff>, RepositoryError> {
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            SELECT * FROM staff
            WHERE ($1::text IS NULL OR department ILIKE $1)
              AND ($2::text IS NULL OR role = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY last_name, first_name
            OFFSET $4 LIMIT $5
            "#,
        )
        .bind(filter_text(&filter.department))
        .bind(filter_text(&filter.role))
        .bind(filter_text(&filter.status))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(staff)
    }

    pub async fn update(&self, staff: &Staff) -> Result<Staff, RepositoryError> {
        let updated = sqlx::query_as::<_, Staff>(
            r#"
            UPDATE staff SET
                first_name = $2, last_name = $3, email = $4, phone = $5, designation = $6,
                department = $7, role = $8, shift = $9, salary = $10, qualification = $11,
                experience_years = $12, status = $13, updated_at = $14
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(staff.id)
        .bind(&staff.first_name)
        .bind(&staff.last_name)
        .bind(&staff.email)
        .bind(&staff.phone)
        .bind(&staff.designation)
        .bind(&staff.department)
        .bind(&staff.role)
        .bind(&staff.shift)
        .bind(staff.salary)
        .bind(&staff.qualification)
        .bind(staff.experience_years)
        .bind(&staff.status)
        .bind(staff.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Staff member not found".to_string()))?;

        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query("DELETE FROM staff WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}
