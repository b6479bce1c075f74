use super::{reference_number, utc_now};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    AppointmentType ("appointment type") {
        Consultation => "consultation",
        FollowUp => "follow_up",
        Emergency => "emergency",
        RoutineCheckup => "routine_checkup",
        Procedure => "procedure",
        Vaccination => "vaccination",
        Telemedicine => "telemedicine",
    }
}

text_enum! {
    AppointmentStatus ("appointment status") {
        Scheduled => "scheduled",
        Confirmed => "confirmed",
        CheckedIn => "checked_in",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no_show",
        Rescheduled => "rescheduled",
    }
}

impl AppointmentStatus {
    /// Allowed next states
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (*self, next),
            (Scheduled, Confirmed | CheckedIn | Cancelled | NoShow | Rescheduled)
                | (Confirmed, CheckedIn | Cancelled | NoShow | Rescheduled)
                | (CheckedIn, InProgress | Completed)
                | (InProgress, Completed)
        )
    }

    /// Statuses that still hold the doctor's time slot
    pub fn occupies_slot(&self) -> bool {
        !matches!(
            self,
            AppointmentStatus::Cancelled
                | AppointmentStatus::NoShow
                | AppointmentStatus::Rescheduled
        )
    }
}

text_enum! {
    AppointmentPaymentStatus ("payment status") {
        Pending => "pending",
        Paid => "paid",
        Waived => "waived",
        Refunded => "refunded",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub appointment_number: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub department_id: Option<Uuid>,
    pub appointment_type: String,
    pub status: String,
    pub duration_minutes: i32,
    pub reason: String,
    pub symptoms: Option<String>,
    pub doctor_notes: Option<String>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub rescheduled_from: Option<Uuid>,
    pub rescheduled_to: Option<Uuid>,
    pub is_follow_up: bool,
    pub parent_appointment_id: Option<Uuid>,
    pub consultation_fee: Option<Decimal>,
    pub payment_status: String,
    pub checked_in_at: Option<NaiveDateTime>,
    pub checked_out_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub appointment_type: Option<String>,
    pub duration_minutes: Option<i32>,
    pub reason: String,
    pub symptoms: Option<String>,
    pub parent_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelAppointment {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleAppointment {
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteAppointment {
    pub doctor_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
}

/// Half-open interval `[start, start + duration)` on one day
pub fn slots_overlap(
    a_start: NaiveTime,
    a_minutes: i32,
    b_start: NaiveTime,
    b_minutes: i32,
) -> bool {
    let minute_of_day = |t: NaiveTime| i64::from(t.num_seconds_from_midnight()) / 60;
    let a_begin = minute_of_day(a_start);
    let b_begin = minute_of_day(b_start);
    let a_end = a_begin + i64::from(a_minutes);
    let b_end = b_begin + i64::from(b_minutes);
    a_begin < b_end && b_begin < a_end
}

impl Appointment {
    pub fn new(
        input: &BookAppointment,
        appointment_type: AppointmentType,
        duration_minutes: i32,
        department_id: Option<Uuid>,
        consultation_fee: Option<Decimal>,
    ) -> Self {
        let now = utc_now();
        Self {
            id: Uuid::new_v4(),
            appointment_number: reference_number("APT"),
            appointment_date: input.appointment_date,
            appointment_time: input.appointment_time,
            patient_id: input.patient_id,
            doctor_id: input.doctor_id,
            department_id,
            appointment_type: appointment_type.as_str().to_string(),
            status: AppointmentStatus::Scheduled.as_str().to_string(),
            duration_minutes,
            reason: input.reason.trim().to_string(),
            symptoms: input.symptoms.clone(),
            doctor_notes: None,
            cancelled_by: None,
            cancellation_reason: None,
            cancelled_at: None,
            rescheduled_from: None,
            rescheduled_to: None,
            is_follow_up: input.parent_appointment_id.is_some()
                || appointment_type == AppointmentType::FollowUp,
            parent_appointment_id: input.parent_appointment_id,
            consultation_fee,
            payment_status: AppointmentPaymentStatus::Pending.as_str().to_string(),
            checked_in_at: None,
            checked_out_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status_enum(&self) -> AppointmentStatus {
        self.status.parse().unwrap_or(AppointmentStatus::Scheduled)
    }

    pub fn type_enum(&self) -> AppointmentType {
        self.appointment_type
            .parse()
            .unwrap_or(AppointmentType::Consultation)
    }

    pub fn overlaps(&self, time: NaiveTime, duration_minutes: i32) -> bool {
        slots_overlap(self.appointment_time, self.duration_minutes, time, duration_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_transition_table() {
        use AppointmentStatus::*;
        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Scheduled.can_transition_to(NoShow));
        assert!(Confirmed.can_transition_to(CheckedIn));
        assert!(CheckedIn.can_transition_to(InProgress));
        assert!(CheckedIn.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Completed));

        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Scheduled));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Confirmed));
    }

    #[test]
    fn test_slot_overlap() {
        assert!(slots_overlap(t(10, 0), 30, t(10, 15), 30));
        assert!(slots_overlap(t(10, 15), 30, t(10, 0), 30));
        assert!(slots_overlap(t(10, 0), 60, t(10, 15), 10));
        // Back to back is fine
        assert!(!slots_overlap(t(10, 0), 30, t(10, 30), 30));
        assert!(!slots_overlap(t(11, 0), 30, t(10, 30), 30));
    }

    #[test]
    fn test_slot_overlap_near_midnight() {
        assert!(slots_overlap(t(23, 45), 30, t(23, 50), 5));
        assert!(!slots_overlap(t(23, 45), 30, t(9, 0), 30));
    }

    #[test]
    fn test_terminal_statuses_free_the_slot() {
        assert!(AppointmentStatus::Scheduled.occupies_slot());
        assert!(AppointmentStatus::InProgress.occupies_slot());
        assert!(!AppointmentStatus::Cancelled.occupies_slot());
        assert!(!AppointmentStatus::Rescheduled.occupies_slot());
    }
}
