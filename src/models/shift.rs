//! Work shift definitions used by the duty roster.

use super::utc_now;
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

const MINUTES_PER_DAY: i32 = 24 * 60;

text_enum! {
    ShiftType ("shift type") {
        Morning => "morning",
        Evening => "evening",
        Night => "night",
        General => "general",
        Rotating => "rotating",
        Split => "split",
    }
}

text_enum! {
    ShiftStatus ("shift status") {
        Active => "active",
        Inactive => "inactive",
    }
}

text_enum! {
    Weekday ("weekday") {
        Mon => "mon",
        Tue => "tue",
        Wed => "wed",
        Thu => "thu",
        Fri => "fri",
        Sat => "sat",
        Sun => "sun",
    }
}

/// Minutes from `start` to `end`, wrapping past midnight for night shifts
pub fn shift_span_minutes(start: NaiveTime, end: NaiveTime) -> i32 {
    let minute_of_day = |t: NaiveTime| (t.num_seconds_from_midnight() / 60) as i32;
    (minute_of_day(end) - minute_of_day(start)).rem_euclid(MINUTES_PER_DAY)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkShift {
    pub id: Uuid,
    pub shift_name: String,
    pub shift_code: String,
    pub shift_type: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_hours: i32,
    pub break_duration_minutes: i32,
    pub applicable_days: Vec<String>,
    pub grace_period_minutes: i32,
    pub overtime_applicable: bool,
    pub overtime_rate_multiplier: Option<Decimal>,
    pub status: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateShift {
    pub shift_name: String,
    pub shift_code: String,
    pub shift_type: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Derived from the start and end times when omitted
    pub duration_hours: Option<i32>,
    pub break_duration_minutes: Option<i32>,
    #[serde(default)]
    pub applicable_days: Vec<String>,
    pub grace_period_minutes: Option<i32>,
    pub overtime_applicable: Option<bool>,
    pub overtime_rate_multiplier: Option<Decimal>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateShift {
    pub shift_name: Option<String>,
    pub shift_type: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub duration_hours: Option<i32>,
    pub break_duration_minutes: Option<i32>,
    pub applicable_days: Option<Vec<String>>,
    pub grace_period_minutes: Option<i32>,
    pub overtime_applicable: Option<bool>,
    pub overtime_rate_multiplier: Option<Decimal>,
    pub status: Option<String>,
    pub description: Option<String>,
}

impl WorkShift {
    pub fn new(input: CreateShift, shift_type: ShiftType) -> Self {
        let now = utc_now();
        let duration_hours = input
            .duration_hours
            .unwrap_or_else(|| default_duration_hours(input.start_time, input.end_time));
        Self {
            id: Uuid::new_v4(),
            shift_name: input.shift_name.trim().to_string(),
            shift_code: input.shift_code.trim().to_string(),
            shift_type: shift_type.as_str().to_string(),
            start_time: input.start_time,
            end_time: input.end_time,
            duration_hours,
            break_duration_minutes: input.break_duration_minutes.unwrap_or(30),
            applicable_days: input.applicable_days,
            grace_period_minutes: input.grace_period_minutes.unwrap_or(15),
            overtime_applicable: input.overtime_applicable.unwrap_or(true),
            overtime_rate_multiplier: input
                .overtime_rate_multiplier
                .or_else(|| Some(Decimal::new(15, 1))),
            status: ShiftStatus::Active.as_str().to_string(),
            description: input.description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateShift) {
        if let Some(v) = update.shift_name {
            self.shift_name = v.trim().to_string();
        }
        if let Some(v) = update.shift_type {
            self.shift_type = v;
        }
        if let Some(v) = update.start_time {
            self.start_time = v;
        }
        if let Some(v) = update.end_time {
            self.end_time = v;
        }
        if let Some(v) = update.duration_hours {
            self.duration_hours = v;
        }
        if let Some(v) = update.break_duration_minutes {
            self.break_duration_minutes = v;
        }
        if let Some(v) = update.applicable_days {
            self.applicable_days = v;
        }
        if let Some(v) = update.grace_period_minutes {
            self.grace_period_minutes = v;
        }
        if let Some(v) = update.overtime_applicable {
            self.overtime_applicable = v;
        }
        if update.overtime_rate_multiplier.is_some() {
            self.overtime_rate_multiplier = update.overtime_rate_multiplier;
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        self.updated_at = utc_now();
    }

    pub fn is_active(&self) -> bool {
        self.status == ShiftStatus::Active.as_str()
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end_time <= self.start_time
    }
}

/// Whole hours covered by the shift, rounded up
fn default_duration_hours(start: NaiveTime, end: NaiveTime) -> i32 {
    (shift_span_minutes(start, end) + 59) / 60
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn input(start: NaiveTime, end: NaiveTime) -> CreateShift {
        CreateShift {
            shift_name: " Night cover ".into(),
            shift_code: "NGT".into(),
            shift_type: "night".into(),
            start_time: start,
            end_time: end,
            duration_hours: None,
            break_duration_minutes: None,
            applicable_days: vec!["mon".into(), "tue".into()],
            grace_period_minutes: None,
            overtime_applicable: None,
            overtime_rate_multiplier: None,
            description: None,
        }
    }

    #[test]
    fn test_span_wraps_midnight() {
        assert_eq!(shift_span_minutes(t(8, 0), t(16, 0)), 480);
        assert_eq!(shift_span_minutes(t(22, 0), t(6, 0)), 480);
        assert_eq!(shift_span_minutes(t(9, 0), t(9, 0)), 0);
    }

    #[test]
    fn test_new_shift_defaults() {
        let shift = WorkShift::new(input(t(22, 0), t(6, 30)), ShiftType::Night);
        assert_eq!(shift.shift_name, "Night cover");
        assert_eq!(shift.duration_hours, 9);
        assert_eq!(shift.break_duration_minutes, 30);
        assert_eq!(shift.grace_period_minutes, 15);
        assert_eq!(shift.overtime_rate_multiplier, Some(Decimal::new(15, 1)));
        assert!(shift.is_active());
        assert!(shift.crosses_midnight());
    }
}
