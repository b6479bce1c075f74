use super::{filter_text, Page};
use crate::error::RepositoryError;
use crate::models::{Schedule, ScheduleFilter, WorkShift};
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for shift definitions and roster entries
pub struct RosterRepository {
    pool: PgPool,
}

impl RosterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Shifts

    pub async fn insert_shift(&self, shift: &WorkShift) -> Result<WorkShift, RepositoryError> {
        let created = sqlx::query_as::<_, WorkShift>(
            r#"
            INSERT INTO shifts (
                id, shift_name, shift_code, shift_type, start_time, end_time, duration_hours,
                break_duration_minutes, applicable_days, grace_period_minutes,
                overtime_applicable, overtime_rate_multiplier, status, description, created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(shift.id)
        .bind(&shift.shift_name)
        .bind(&shift.shift_code)
        .bind(&shift.shift_type)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.duration_hours)
        .bind(shift.break_duration_minutes)
        .bind(&shift.applicable_days)
        .bind(shift.grace_period_minutes)
        .bind(shift.overtime_applicable)
        .bind(shift.overtime_rate_multiplier)
        .bind(&shift.status)
        .bind(&shift.description)
        .bind(shift.created_at)
        .bind(shift.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_shift(&self, id: Uuid) -> Result<Option<WorkShift>, RepositoryError> {
        let shift = sqlx::query_as::<_, WorkShift>("SELECT * FROM shifts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(shift)
    }

    pub async fn list_shifts(
        &self,
        status: Option<String>,
        page: Page,
    ) -> Result<Vec<WorkShift>, RepositoryError> {
        let shifts = sqlx::query_as::<_, WorkShift>(
            r#"
            SELECT * FROM shifts
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY start_time, shift_name
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(status)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    pub async fn update_shift(&self, shift: &WorkShift) -> Result<WorkShift, RepositoryError> {
        let updated = sqlx::query_as::<_, WorkShift>(
            r#"
            UPDATE shifts SET
                shift_name = $2, shift_type = $3, start_time = $4, end_time = $5,
                duration_hours = $6, break_duration_minutes = $7, applicable_days = $8,
                grace_period_minutes = $9, overtime_applicable = $10,
                overtime_rate_multiplier = $11, status = $12, description = $13, updated_at = $14
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(shift.id)
        .bind(&shift.shift_name)
        .bind(&shift.shift_type)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.duration_hours)
        .bind(shift.break_duration_minutes)
        .bind(&shift.applicable_days)
        .bind(shift.grace_period_minutes)
        .bind(shift.overtime_applicable)
        .bind(shift.overtime_rate_multiplier)
        .bind(&shift.status)
        .bind(&shift.description)
        .bind(shift.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Shift not found".to_string()))?;

        Ok(updated)
    }

    /// Delete a shift that no upcoming roster entry still uses
    pub async fn delete_shift(&self, id: Uuid, today: NaiveDate) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM shifts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(false);
        }

        let upcoming: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM schedules
            WHERE shift_id = $1 AND schedule_date >= $2 AND status = 'scheduled'
            "#,
        )
        .bind(id)
        .bind(today)
        .fetch_one(&mut *tx)
        .await?;
        if upcoming > 0 {
            return Err(RepositoryError::BusinessRule(format!(
                "Shift is still used by {} upcoming roster entries",
                upcoming
            )));
        }

        sqlx::query("DELETE FROM shifts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    // Schedules

    pub async fn insert_schedule(&self, schedule: &Schedule) -> Result<Schedule, RepositoryError> {
        let created = sqlx::query_as::<_, Schedule>(
            r#"
            INSERT INTO schedules (
                id, schedule_date, doctor_id, shift_id, department_id, start_time, end_time,
                is_available, max_appointments, status, day_type, is_on_call, notes, created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(schedule.id)
        .bind(schedule.schedule_date)
        .bind(schedule.doctor_id)
        .bind(schedule.shift_id)
        .bind(schedule.department_id)
        .bind(schedule.start_time)
        .bind(schedule.end_time)
        .bind(schedule.is_available)
        .bind(schedule.max_appointments)
        .bind(&schedule.status)
        .bind(&schedule.day_type)
        .bind(schedule.is_on_call)
        .bind(&schedule.notes)
        .bind(schedule.created_at)
        .bind(schedule.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_schedule(&self, id: Uuid) -> Result<Option<Schedule>, RepositoryError> {
        let schedule = sqlx::query_as::<_, Schedule>("SELECT * FROM schedules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(schedule)
    }

    pub async fn list_schedules(
        &self,
        filter: &ScheduleFilter,
        page: Page,
    ) -> Result<Vec<Schedule>, RepositoryError> {
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT s.* FROM schedules s
            JOIN shifts sh ON sh.id = s.shift_id
            WHERE ($1::uuid IS NULL OR s.doctor_id = $1)
              AND ($2::uuid IS NULL OR s.shift_id = $2)
              AND ($3::uuid IS NULL OR s.department_id = $3)
              AND ($4::date IS NULL OR s.schedule_date >= $4)
              AND ($5::date IS NULL OR s.schedule_date <= $5)
              AND ($6::text IS NULL OR s.status = $6)
            ORDER BY s.schedule_date, COALESCE(s.start_time, sh.start_time)
            OFFSET $7 LIMIT $8
            "#,
        )
        .bind(filter.doctor_id)
        .bind(filter.shift_id)
        .bind(filter.department_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter_text(&filter.status))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(schedules)
    }

    pub async fn update_schedule(&self, schedule: &Schedule) -> Result<Schedule, RepositoryError> {
        let updated = sqlx::query_as::<_, Schedule>(
            r#"
            UPDATE schedules SET
                schedule_date = $2, shift_id = $3, department_id = $4, start_time = $5,
                end_time = $6, is_available = $7, max_appointments = $8, status = $9,
                day_type = $10, is_on_call = $11, notes = $12, updated_at = $13
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(schedule.id)
        .bind(schedule.schedule_date)
        .bind(schedule.shift_id)
        .bind(schedule.department_id)
        .bind(schedule.start_time)
        .bind(schedule.end_time)
        .bind(schedule.is_available)
        .bind(schedule.max_appointments)
        .bind(&schedule.status)
        .bind(&schedule.day_type)
        .bind(schedule.is_on_call)
        .bind(&schedule.notes)
        .bind(schedule.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Schedule not found".to_string()))?;

        Ok(updated)
    }

    pub async fn delete_schedule(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query("DELETE FROM schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    /// Roster entries for one doctor and date, read inside a booking transaction
    pub(crate) async fn doctor_day(
        tx: &mut Transaction<'_, Postgres>,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Schedule>, RepositoryError> {
        let entries = sqlx::query_as::<_, Schedule>(
            "SELECT * FROM schedules WHERE doctor_id = $1 AND schedule_date = $2",
        )
        .bind(doctor_id)
        .bind(date)
        .fetch_all(&mut **tx)
        .await?;
        Ok(entries)
    }
}
