use super::{filter_text, Page};
use crate::error::RepositoryError;
use crate::models::{Doctor, DoctorFilter};
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for doctors
pub struct DoctorRepository {
    pool: PgPool,
}

impl DoctorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, doctor: &Doctor) -> Result<Doctor, RepositoryError> {
        let created = sqlx::query_as::<_, Doctor>(
            r#"
            INSERT INTO doctors (
                id, user_id, doctor_code, first_name, middle_name, last_name, specialization,
                qualification, medical_license_number, years_of_experience, email, phone,
                department_id, consultation_fee, average_consultation_time, is_available,
                max_appointments_per_day, rating, status, bio, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22)
            RETURNING *
            "#,
        )
        .bind(doctor.id)
        .bind(doctor.user_id)
        .bind(&doctor.doctor_code)
        .bind(&doctor.first_name)
        .bind(&doctor.middle_name)
        .bind(&doctor.last_name)
        .bind(&doctor.specialization)
        .bind(&doctor.qualification)
        .bind(&doctor.medical_license_number)
        .bind(doctor.years_of_experience)
        .bind(&doctor.email)
        .bind(&doctor.phone)
        .bind(doctor.department_id)
        .bind(doctor.consultation_fee)
        .bind(doctor.average_consultation_time)
        .bind(doctor.is_available)
        .bind(doctor.max_appointments_per_day)
        .bind(doctor.rating)
        .bind(&doctor.status)
        .bind(&doctor.bio)
        .bind(doctor.created_at)
        .bind(doctor.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Doctor>, RepositoryError> {
        let doctor = sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doctor)
    }

    pub async fn list(&self, filter: &DoctorFilter, page: Page) -> Result<Vec<Doctor>, RepositoryError> {
        let doctors = sqlx::query_as::<_, Doctor>(
            r#"
            SELECT * FROM doctors
            WHERE ($1::uuid IS NULL OR department_id = $1)
              AND ($2::text IS NULL OR specialization ILIKE '%' || $2 || '%')
              AND ($3::bool IS NULL OR is_available = $3)
              AND ($4::text IS NULL OR status = $4)
            ORDER BY last_name, first_name
            OFFSET $5 LIMIT $6
            "#,
        )
        .bind(filter.department_id)
        .bind(filter_text(&filter.specialization))
        .bind(filter.is_available)
        .bind(filter_text(&filter.status))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(doctors)
    }

    pub async fn update(&self, doctor: &Doctor) -> Result<Doctor, RepositoryError> {
        let updated = sqlx::query_as::<_, Doctor>(
            r#"
            UPDATE doctors SET
                first_name = $2, middle_name = $3, last_name = $4, specialization = $5,
                qualification = $6, years_of_experience = $7, email = $8, phone = $9,
                department_id = $10, consultation_fee = $11, average_consultation_time = $12,
                max_appointments_per_day = $13, rating = $14, status = $15, bio = $16,
                updated_at = $17
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(doctor.id)
        .bind(&doctor.first_name)
        .bind(&doctor.middle_name)
        .bind(&doctor.last_name)
        .bind(&doctor.specialization)
        .bind(&doctor.qualification)
        .bind(doctor.years_of_experience)
        .bind(&doctor.email)
        .bind(&doctor.phone)
        .bind(doctor.department_id)
        .bind(doctor.consultation_fee)
        .bind(doctor.average_consultation_time)
        .bind(doctor.max_appointments_per_day)
        .bind(doctor.rating)
        .bind(&doctor.status)
        .bind(&doctor.bio)
        .bind(doctor.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Doctor not found".to_string()))?;

        Ok(updated)
    }

    pub async fn set_availability(&self, id: Uuid, is_available: bool) -> Result<Doctor, RepositoryError> {
        let doctor = sqlx::query_as::<_, Doctor>(
            r#"
            UPDATE doctors
            SET is_available = $2, updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_available)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Doctor not found".to_string()))?;

        Ok(doctor)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query("DELETE FROM doctors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}
