//! Doctor duty roster: one entry per doctor, shift and date.

use super::{utc_now, WorkShift};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    ScheduleStatus ("schedule status") {
        Scheduled => "scheduled",
        Completed => "completed",
        Cancelled => "cancelled",
        OnLeave => "on_leave",
        Rescheduled => "rescheduled",
    }
}

text_enum! {
    DayType ("day type") {
        Working => "working",
        Holiday => "holiday",
        Weekend => "weekend",
        OnCall => "on_call",
        Emergency => "emergency",
    }
}

impl DayType {
    /// Day types on which a rostered doctor sees patients
    pub fn is_duty(&self) -> bool {
        matches!(self, DayType::Working | DayType::OnCall | DayType::Emergency)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Schedule {
    pub id: Uuid,
    pub schedule_date: NaiveDate,
    pub doctor_id: Option<Uuid>,
    pub shift_id: Uuid,
    pub department_id: Option<Uuid>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_available: bool,
    pub max_appointments: Option<i32>,
    pub status: String,
    pub day_type: String,
    pub is_on_call: bool,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSchedule {
    pub schedule_date: NaiveDate,
    pub shift_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_available: Option<bool>,
    pub max_appointments: Option<i32>,
    pub day_type: Option<String>,
    #[serde(default)]
    pub is_on_call: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSchedule {
    pub schedule_date: Option<NaiveDate>,
    pub shift_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_available: Option<bool>,
    pub max_appointments: Option<i32>,
    pub status: Option<String>,
    pub day_type: Option<String>,
    pub is_on_call: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleFilter {
    pub doctor_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<String>,
}

/// Roster entry with the shift timings it resolves to
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleDetail {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub shift_name: String,
    pub effective_start: NaiveTime,
    pub effective_end: NaiveTime,
}

impl Schedule {
    pub fn new(input: CreateSchedule, day_type: DayType) -> Self {
        let now = utc_now();
        Self {
            id: Uuid::new_v4(),
            schedule_date: input.schedule_date,
            doctor_id: input.doctor_id,
            shift_id: input.shift_id,
            department_id: input.department_id,
            start_time: input.start_time,
            end_time: input.end_time,
            is_available: input.is_available.unwrap_or(true),
            max_appointments: input.max_appointments,
            status: ScheduleStatus::Scheduled.as_str().to_string(),
            day_type: day_type.as_str().to_string(),
            is_on_call: input.is_on_call || day_type == DayType::OnCall,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateSchedule) {
        if let Some(v) = update.schedule_date {
            self.schedule_date = v;
        }
        if let Some(v) = update.shift_id {
            self.shift_id = v;
        }
        if update.department_id.is_some() {
            self.department_id = update.department_id;
        }
        if update.start_time.is_some() {
            self.start_time = update.start_time;
        }
        if update.end_time.is_some() {
            self.end_time = update.end_time;
        }
        if let Some(v) = update.is_available {
            self.is_available = v;
        }
        if update.max_appointments.is_some() {
            self.max_appointments = update.max_appointments;
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        if let Some(v) = update.day_type {
            self.day_type = v;
        }
        if let Some(v) = update.is_on_call {
            self.is_on_call = v;
        }
        if self.day_type == DayType::OnCall.as_str() {
            self.is_on_call = true;
        }
        if update.notes.is_some() {
            self.notes = update.notes;
        }
        self.updated_at = utc_now();
    }

    pub fn status_enum(&self) -> ScheduleStatus {
        self.status.parse().unwrap_or(ScheduleStatus::Scheduled)
    }

    pub fn day_type_enum(&self) -> DayType {
        self.day_type.parse().unwrap_or(DayType::Working)
    }

    /// Whether the entry puts its doctor on duty for appointments
    pub fn is_bookable(&self) -> bool {
        self.is_available
            && self.status_enum() == ScheduleStatus::Scheduled
            && self.day_type_enum().is_duty()
    }

    /// Override timings fall back to the shift's own
    pub fn with_shift(self, shift: &WorkShift) -> ScheduleDetail {
        ScheduleDetail {
            effective_start: self.start_time.unwrap_or(shift.start_time),
            effective_end: self.end_time.unwrap_or(shift.end_time),
            shift_name: shift.shift_name.clone(),
            schedule: self,
        }
    }
}

/// What a doctor's roster says about one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterDay {
    /// No roster entries; the doctor's own daily limit applies
    Unrostered,
    /// On leave, a holiday, or every entry unavailable or cancelled
    Off,
    /// On duty, optionally capped by the roster
    OnDuty { max_appointments: Option<i32> },
}

impl RosterDay {
    pub fn from_entries(entries: &[Schedule]) -> Self {
        let live: Vec<&Schedule> = entries
            .iter()
            .filter(|s| s.status_enum() != ScheduleStatus::Cancelled)
            .collect();
        if live.is_empty() {
            return RosterDay::Unrostered;
        }
        if live.iter().any(|s| s.status_enum() == ScheduleStatus::OnLeave) {
            return RosterDay::Off;
        }

        let bookable: Vec<&&Schedule> = live.iter().filter(|s| s.is_bookable()).collect();
        if bookable.is_empty() {
            return RosterDay::Off;
        }
        let caps: Vec<i32> = bookable.iter().filter_map(|s| s.max_appointments).collect();
        RosterDay::OnDuty {
            max_appointments: (!caps.is_empty()).then(|| caps.iter().sum()),
        }
    }

    /// Daily appointment limit given the doctor's default
    pub fn daily_limit(&self, doctor_max: i32) -> Option<i32> {
        match self {
            RosterDay::Unrostered => Some(doctor_max),
            RosterDay::Off => None,
            RosterDay::OnDuty { max_appointments } => Some(max_appointments.unwrap_or(doctor_max)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: ScheduleStatus, day_type: DayType, max: Option<i32>) -> Schedule {
        let mut schedule = Schedule::new(
            CreateSchedule {
                schedule_date: NaiveDate::from_ymd_opt(2030, 3, 4).unwrap(),
                shift_id: Uuid::new_v4(),
                doctor_id: Some(Uuid::new_v4()),
                department_id: None,
                start_time: None,
                end_time: None,
                is_available: None,
                max_appointments: max,
                day_type: None,
                is_on_call: false,
                notes: None,
            },
            day_type,
        );
        schedule.status = status.as_str().to_string();
        schedule
    }

    #[test]
    fn test_on_call_day_sets_flag() {
        let schedule = entry(ScheduleStatus::Scheduled, DayType::OnCall, None);
        assert!(schedule.is_on_call);
        assert!(schedule.is_bookable());
    }

    #[test]
    fn test_roster_day_resolution() {
        use DayType::*;
        use ScheduleStatus::*;

        assert_eq!(RosterDay::from_entries(&[]), RosterDay::Unrostered);
        assert_eq!(
            RosterDay::from_entries(&[entry(Cancelled, Working, Some(3))]),
            RosterDay::Unrostered
        );
        assert_eq!(
            RosterDay::from_entries(&[entry(Scheduled, Working, Some(5)), entry(OnLeave, Working, None)]),
            RosterDay::Off
        );
        assert_eq!(RosterDay::from_entries(&[entry(Scheduled, Holiday, None)]), RosterDay::Off);

        let mut unavailable = entry(Scheduled, Working, None);
        unavailable.is_available = false;
        assert_eq!(RosterDay::from_entries(&[unavailable]), RosterDay::Off);

        assert_eq!(
            RosterDay::from_entries(&[entry(Scheduled, Working, Some(4)), entry(Scheduled, OnCall, Some(2))]),
            RosterDay::OnDuty { max_appointments: Some(6) }
        );
        assert_eq!(
            RosterDay::from_entries(&[entry(Scheduled, Working, None)]),
            RosterDay::OnDuty { max_appointments: None }
        );
    }

    #[test]
    fn test_daily_limit() {
        assert_eq!(RosterDay::Unrostered.daily_limit(20), Some(20));
        assert_eq!(RosterDay::Off.daily_limit(20), None);
        assert_eq!(RosterDay::OnDuty { max_appointments: Some(3) }.daily_limit(20), Some(3));
        assert_eq!(RosterDay::OnDuty { max_appointments: None }.daily_limit(20), Some(20));
    }
}
