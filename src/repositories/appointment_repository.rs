use super::{Page, RosterRepository};
use crate::error::RepositoryError;
use crate::models::{
    Appointment, AppointmentFilter, AppointmentPaymentStatus, AppointmentStatus, RosterDay,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Statuses that no longer hold a doctor's slot
fn freed_statuses() -> Vec<String> {
    AppointmentStatus::ALL
        .iter()
        .filter(|status| !status.occupies_slot())
        .map(|status| status.as_str().to_string())
        .collect()
}

/// Repository for appointments
///
/// Booking serialises on the doctor row so that the daily limit and the
/// overlap check see every concurrent booking for that doctor.
pub struct AppointmentRepository {
    pool: PgPool,
}

impl AppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the doctor and verify the roster and the slot allow the booking
    async fn check_slot(
        tx: &mut Transaction<'_, Postgres>,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i32,
    ) -> Result<(), RepositoryError> {
        let max_per_day: i32 = sqlx::query_scalar(
            "SELECT max_appointments_per_day FROM doctors WHERE id = $1 FOR UPDATE",
        )
        .bind(doctor_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Doctor not found".to_string()))?;

        let roster = RosterDay::from_entries(&RosterRepository::doctor_day(tx, doctor_id, date).await?);
        let max_per_day = roster.daily_limit(max_per_day).ok_or_else(|| {
            RepositoryError::BusinessRule(format!(
                "Doctor is not rostered as available on {}",
                date
            ))
        })?;

        let booked = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM appointments
            WHERE doctor_id = $1 AND appointment_date = $2 AND status <> ALL($3)
            ORDER BY appointment_time
            "#,
        )
        .bind(doctor_id)
        .bind(date)
        .bind(freed_statuses())
        .fetch_all(&mut **tx)
        .await?;

        if booked.len() as i64 >= i64::from(max_per_day) {
            return Err(RepositoryError::BusinessRule(format!(
                "Doctor has reached the maximum of {} appointments on {}",
                max_per_day, date
            )));
        }

        if let Some(clash) = booked.iter().find(|a| a.overlaps(time, duration_minutes)) {
            return Err(RepositoryError::Duplicate(format!(
                "Doctor already has appointment {} at {} on {}",
                clash.appointment_number,
                clash.appointment_time.format("%H:%M"),
                date
            )));
        }

        Ok(())
    }

    async fn insert_tx(
        tx: &mut Transaction<'_, Postgres>,
        appointment: &Appointment,
    ) -> Result<Appointment, RepositoryError> {
        let created = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (
                id, appointment_number, appointment_date, appointment_time, patient_id,
                doctor_id, department_id, appointment_type, status, duration_minutes, reason,
                symptoms, rescheduled_from, is_follow_up, parent_appointment_id,
                consultation_fee, payment_status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19)
            RETURNING *
            "#,
        )
        .bind(appointment.id)
        .bind(&appointment.appointment_number)
        .bind(appointment.appointment_date)
        .bind(appointment.appointment_time)
        .bind(appointment.patient_id)
        .bind(appointment.doctor_id)
        .bind(appointment.department_id)
        .bind(&appointment.appointment_type)
        .bind(&appointment.status)
        .bind(appointment.duration_minutes)
        .bind(&appointment.reason)
        .bind(&appointment.symptoms)
        .bind(appointment.rescheduled_from)
        .bind(appointment.is_follow_up)
        .bind(appointment.parent_appointment_id)
        .bind(appointment.consultation_fee)
        .bind(&appointment.payment_status)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(created)
    }

    async fn lock(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Appointment, RepositoryError> {
        sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Appointment not found".to_string()))
    }

    fn ensure_transition(
        appointment: &Appointment,
        next: AppointmentStatus,
    ) -> Result<(), RepositoryError> {
        if appointment.status_enum().can_transition_to(next) {
            Ok(())
        } else {
            Err(RepositoryError::BusinessRule(format!(
                "Cannot change appointment from {} to {}",
                appointment.status, next
            )))
        }
    }

    /// Book a new appointment once the doctor's slot has been checked
    pub async fn book(&self, appointment: &Appointment) -> Result<Appointment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        Self::check_slot(
            &mut tx,
            appointment.doctor_id,
            appointment.appointment_date,
            appointment.appointment_time,
            appointment.duration_minutes,
        )
        .await?;
        let created = Self::insert_tx(&mut tx, appointment).await?;

        tx.commit().await?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, RepositoryError> {
        let appointment =
            sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(appointment)
    }

    pub async fn list(
        &self,
        filter: &AppointmentFilter,
        page: Page,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM appointments
            WHERE ($1::uuid IS NULL OR doctor_id = $1)
              AND ($2::uuid IS NULL OR patient_id = $2)
              AND ($3::date IS NULL OR appointment_date = $3)
              AND ($4::text IS NULL OR status = $4)
            ORDER BY appointment_date DESC, appointment_time DESC
            OFFSET $5 LIMIT $6
            "#,
        )
        .bind(filter.doctor_id)
        .bind(filter.patient_id)
        .bind(filter.date)
        .bind(super::filter_text(&filter.status))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    /// A doctor's non-cancelled appointments for one day, earliest first
    pub async fn day_schedule(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM appointments
            WHERE doctor_id = $1 AND appointment_date = $2 AND status <> 'cancelled'
            ORDER BY appointment_time
            "#,
        )
        .bind(doctor_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    /// Move an appointment along its lifecycle
    ///
    /// Check-in and completion stamp their timestamps; notes are only
    /// overwritten when provided.
    pub async fn transition(
        &self,
        id: Uuid,
        next: AppointmentStatus,
        doctor_notes: Option<String>,
    ) -> Result<Appointment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = Self::lock(&mut tx, id).await?;
        Self::ensure_transition(&current, next)?;

        let updated = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments SET
                status = $2,
                checked_in_at = CASE WHEN $2 = 'checked_in'
                    THEN (NOW() AT TIME ZONE 'utc') ELSE checked_in_at END,
                checked_out_at = CASE WHEN $2 = 'completed'
                    THEN (NOW() AT TIME ZONE 'utc') ELSE checked_out_at END,
                doctor_notes = COALESCE($3, doctor_notes),
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .bind(doctor_notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        reason: Option<String>,
        cancelled_by: &str,
    ) -> Result<Appointment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = Self::lock(&mut tx, id).await?;
        Self::ensure_transition(&current, AppointmentStatus::Cancelled)?;

        let cancelled = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments SET
                status = 'cancelled', cancelled_by = $2, cancellation_reason = $3,
                cancelled_at = (NOW() AT TIME ZONE 'utc'),
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(cancelled_by)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(cancelled)
    }

    /// Replace an appointment with a new slot, linking old and new
    ///
    /// `replacement` must already carry `rescheduled_from = old_id`.
    pub async fn reschedule(
        &self,
        old_id: Uuid,
        replacement: &Appointment,
    ) -> Result<Appointment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = Self::lock(&mut tx, old_id).await?;
        Self::ensure_transition(&current, AppointmentStatus::Rescheduled)?;

        // Release the old slot first so moving within the same day never clashes with itself
        sqlx::query(
            r#"
            UPDATE appointments
            SET status = 'rescheduled', updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            "#,
        )
        .bind(old_id)
        .execute(&mut *tx)
        .await?;

        Self::check_slot(
            &mut tx,
            replacement.doctor_id,
            replacement.appointment_date,
            replacement.appointment_time,
            replacement.duration_minutes,
        )
        .await?;
        let created = Self::insert_tx(&mut tx, replacement).await?;

        sqlx::query("UPDATE appointments SET rescheduled_to = $2 WHERE id = $1")
            .bind(old_id)
            .bind(created.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    pub async fn set_payment_status(
        &self,
        id: Uuid,
        status: AppointmentPaymentStatus,
    ) -> Result<(), RepositoryError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE appointments
            SET payment_status = $2, updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound("Appointment not found".to_string()));
        }
        Ok(())
    }

    /// Mark scheduled or confirmed appointments whose slot ended before `cutoff`
    pub async fn mark_no_shows(&self, cutoff: NaiveDateTime) -> Result<u64, RepositoryError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE appointments
            SET status = 'no_show', updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE status IN ('scheduled', 'confirmed')
              AND appointment_date + appointment_time
                  + make_interval(mins => duration_minutes) < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}
