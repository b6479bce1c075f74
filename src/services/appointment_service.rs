use super::{normalise_enum, parse_enum, AuditService};
use crate::error::{AppError, AppResult};
use crate::models::{
    utc_now, Appointment, AppointmentFilter, AppointmentStatus, AppointmentType, AuditAction,
    AuditEntry, BookAppointment, Doctor, RescheduleAppointment,
};
use crate::repositories::{AppointmentRepository, DoctorRepository, Page, PatientRepository};
use crate::validation::require_text;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Emergencies may be booked for a slot that has already started
fn check_not_past(
    appointment_type: AppointmentType,
    starts_at: NaiveDateTime,
    now: NaiveDateTime,
) -> AppResult<()> {
    if appointment_type != AppointmentType::Emergency && starts_at < now {
        return Err(AppError::Validation(
            "Appointment cannot be scheduled in the past".to_string(),
        ));
    }
    Ok(())
}

fn check_duration(duration_minutes: i32) -> AppResult<()> {
    if !(1..=480).contains(&duration_minutes) {
        return Err(AppError::Validation(
            "Duration must be between 1 and 480 minutes".to_string(),
        ));
    }
    Ok(())
}

/// Appointment booking and lifecycle
pub struct AppointmentService {
    appointments: Arc<AppointmentRepository>,
    patients: Arc<PatientRepository>,
    doctors: Arc<DoctorRepository>,
    audit: Arc<AuditService>,
}

impl AppointmentService {
    pub fn new(
        appointments: Arc<AppointmentRepository>,
        patients: Arc<PatientRepository>,
        doctors: Arc<DoctorRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            appointments,
            patients,
            doctors,
            audit,
        }
    }

    async fn bookable_doctor(&self, doctor_id: Uuid) -> AppResult<Doctor> {
        let doctor = self
            .doctors
            .find_by_id(doctor_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))?;
        if !doctor.can_take_appointments() {
            return Err(AppError::BusinessLogic(format!(
                "{} is not accepting appointments",
                doctor.display_name()
            )));
        }
        Ok(doctor)
    }

    async fn record(&self, action: AuditAction, appointment: &Appointment, what: &str, actor: Uuid) {
        self.audit
            .record(
                AuditEntry::new(action, "appointment", Some(appointment.id), what)
                    .by(actor)
                    .with_details(serde_json::json!({
                        "appointment_number": appointment.appointment_number,
                        "status": appointment.status,
                    })),
            )
            .await;
    }

    pub async fn book(&self, input: BookAppointment, actor: Uuid) -> AppResult<Appointment> {
        require_text("Reason", &input.reason)?;
        let appointment_type = match input.appointment_type.as_deref() {
            Some(t) => parse_enum::<AppointmentType>(t)?,
            None => AppointmentType::Consultation,
        };
        check_not_past(
            appointment_type,
            input.appointment_date.and_time(input.appointment_time),
            utc_now(),
        )?;

        let patient = self
            .patients
            .find_by_id(input.patient_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;
        if !patient.is_active() {
            return Err(AppError::BusinessLogic(format!(
                "Patient is {} and cannot book appointments",
                patient.status
            )));
        }

        let doctor = self.bookable_doctor(input.doctor_id).await?;
        let duration = input
            .duration_minutes
            .unwrap_or(doctor.average_consultation_time);
        check_duration(duration)?;

        if let Some(parent_id) = input.parent_appointment_id {
            self.get(parent_id).await?;
        }

        let appointment = Appointment::new(
            &input,
            appointment_type,
            duration,
            doctor.department_id,
            doctor.consultation_fee,
        );
        let appointment = self.appointments.book(&appointment).await?;
        info!(
            "Booked {} with {} on {} at {}",
            appointment.appointment_number,
            doctor.display_name(),
            appointment.appointment_date,
            appointment.appointment_time
        );
        self.record(AuditAction::Create, &appointment, "Appointment booked", actor)
            .await;
        Ok(appointment)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Appointment> {
        self.appointments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))
    }

    pub async fn list(&self, mut filter: AppointmentFilter, page: Page) -> AppResult<Vec<Appointment>> {
        filter.status = normalise_enum::<AppointmentStatus>(filter.status.take())?;
        Ok(self.appointments.list(&filter, page).await?)
    }

    pub async fn day_schedule(&self, doctor_id: Uuid, date: NaiveDate) -> AppResult<Vec<Appointment>> {
        if self.doctors.find_by_id(doctor_id).await?.is_none() {
            return Err(AppError::NotFound("Doctor not found".to_string()));
        }
        Ok(self.appointments.day_schedule(doctor_id, date).await?)
    }

    async fn transition(
        &self,
        id: Uuid,
        next: AppointmentStatus,
        doctor_notes: Option<String>,
        actor: Uuid,
    ) -> AppResult<Appointment> {
        let appointment = self.appointments.transition(id, next, doctor_notes).await?;
        info!("Appointment {} is now {}", appointment.appointment_number, next);
        self.record(
            AuditAction::Update,
            &appointment,
            &format!("Appointment {}", next),
            actor,
        )
        .await;
        Ok(appointment)
    }

    pub async fn confirm(&self, id: Uuid, actor: Uuid) -> AppResult<Appointment> {
        self.transition(id, AppointmentStatus::Confirmed, None, actor).await
    }

    pub async fn check_in(&self, id: Uuid, actor: Uuid) -> AppResult<Appointment> {
        self.transition(id, AppointmentStatus::CheckedIn, None, actor).await
    }

    pub async fn start(&self, id: Uuid, actor: Uuid) -> AppResult<Appointment> {
        self.transition(id, AppointmentStatus::InProgress, None, actor).await
    }

    pub async fn complete(&self, id: Uuid, doctor_notes: Option<String>, actor: Uuid) -> AppResult<Appointment> {
        let notes = doctor_notes.filter(|n| !n.trim().is_empty());
        self.transition(id, AppointmentStatus::Completed, notes, actor).await
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        reason: Option<String>,
        cancelled_by: &str,
        actor: Uuid,
    ) -> AppResult<Appointment> {
        let appointment = self.appointments.cancel(id, reason, cancelled_by).await?;
        info!("Appointment {} cancelled by {}", appointment.appointment_number, cancelled_by);
        self.record(AuditAction::Cancel, &appointment, "Appointment cancelled", actor)
            .await;
        Ok(appointment)
    }

    /// Book the same visit in a new slot; the old one is marked rescheduled
    pub async fn reschedule(
        &self,
        id: Uuid,
        request: RescheduleAppointment,
        actor: Uuid,
    ) -> AppResult<Appointment> {
        let current = self.get(id).await?;
        let appointment_type = current.type_enum();
        check_not_past(
            appointment_type,
            request.appointment_date.and_time(request.appointment_time),
            utc_now(),
        )?;
        self.bookable_doctor(current.doctor_id).await?;

        let input = BookAppointment {
            patient_id: current.patient_id,
            doctor_id: current.doctor_id,
            appointment_date: request.appointment_date,
            appointment_time: request.appointment_time,
            appointment_type: Some(current.appointment_type.clone()),
            duration_minutes: Some(current.duration_minutes),
            reason: current.reason.clone(),
            symptoms: current.symptoms.clone(),
            parent_appointment_id: current.parent_appointment_id,
        };
        let mut replacement = Appointment::new(
            &input,
            appointment_type,
            current.duration_minutes,
            current.department_id,
            current.consultation_fee,
        );
        replacement.rescheduled_from = Some(current.id);

        let created = self.appointments.reschedule(id, &replacement).await?;
        info!(
            "Rescheduled {} to {} ({} at {})",
            current.appointment_number,
            created.appointment_number,
            created.appointment_date,
            created.appointment_time
        );
        self.record(AuditAction::Update, &created, "Appointment rescheduled", actor)
            .await;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_past_slots_rejected_except_emergencies() {
        let now = utc_now();
        let earlier = now - Duration::minutes(5);
        assert!(check_not_past(AppointmentType::Consultation, earlier, now).is_err());
        assert!(check_not_past(AppointmentType::Emergency, earlier, now).is_ok());
        assert!(check_not_past(AppointmentType::FollowUp, now + Duration::hours(1), now).is_ok());
    }

    #[test]
    fn test_duration_bounds() {
        assert!(check_duration(30).is_ok());
        assert!(check_duration(0).is_err());
        assert!(check_duration(481).is_err());
    }
}
