use super::{normalise_enum, parse_enum, AuditService};
use crate::error::{AppError, AppResult};
use crate::models::{
    utc_now, AuditAction, AuditEntry, CreateSchedule, CreateShift, DayType, Schedule, ScheduleDetail,
    ScheduleFilter, ScheduleStatus, ShiftStatus, ShiftType, UpdateSchedule, UpdateShift, Weekday,
    WorkShift,
};
use crate::repositories::{DepartmentRepository, DoctorRepository, Page, RosterRepository};
use crate::validation::{fits_numeric, require_text};
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Digits of the `NUMERIC(4, 2)` overtime multiplier column
const MULTIPLIER_DIGITS: u32 = 4;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShiftFilter {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn check_shift_code(code: &str) -> AppResult<String> {
    let code = require_text("Shift code", code)?;
    let valid = code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid {
        return Err(AppError::Validation(
            "Shift code must use uppercase letters, digits, '-' or '_'".to_string(),
        ));
    }
    Ok(code)
}

fn check_duration_hours(hours: i32) -> AppResult<()> {
    if !(1..=24).contains(&hours) {
        return Err(AppError::Validation(
            "Shift duration must be between 1 and 24 hours".to_string(),
        ));
    }
    Ok(())
}

fn check_minutes(field: &str, minutes: Option<i32>) -> AppResult<()> {
    if matches!(minutes, Some(m) if m < 0) {
        return Err(AppError::Validation(format!("{} cannot be negative", field)));
    }
    Ok(())
}

fn check_multiplier(multiplier: Option<Decimal>) -> AppResult<()> {
    if let Some(rate) = multiplier {
        if rate < Decimal::ONE {
            return Err(AppError::Validation(
                "Overtime rate multiplier must be at least 1".to_string(),
            ));
        }
        fits_numeric("Overtime rate multiplier", rate, MULTIPLIER_DIGITS)?;
    }
    Ok(())
}

/// Canonical, de-duplicated weekday names
fn normalise_days(days: Vec<String>) -> AppResult<Vec<String>> {
    let mut canonical: Vec<String> = Vec::with_capacity(days.len());
    for day in days {
        let day: String = parse_enum::<Weekday>(day.trim())?.into();
        if !canonical.contains(&day) {
            canonical.push(day);
        }
    }
    Ok(canonical)
}

fn check_max_appointments(max: Option<i32>) -> AppResult<()> {
    if matches!(max, Some(m) if m < 0) {
        return Err(AppError::Validation(
            "Max appointments cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// A shift limited to some weekdays only runs on those days
fn check_runs_on(shift: &WorkShift, date: NaiveDate) -> AppResult<()> {
    let weekday = date.weekday().to_string().to_lowercase();
    if !shift.applicable_days.is_empty() && !shift.applicable_days.contains(&weekday) {
        return Err(AppError::BusinessLogic(format!(
            "Shift {} does not run on {}",
            shift.shift_code, weekday
        )));
    }
    Ok(())
}

/// Shift definitions and the doctor duty roster
pub struct RosterService {
    repo: Arc<RosterRepository>,
    doctors: Arc<DoctorRepository>,
    departments: Arc<DepartmentRepository>,
    audit: Arc<AuditService>,
}

impl RosterService {
    pub fn new(
        repo: Arc<RosterRepository>,
        doctors: Arc<DoctorRepository>,
        departments: Arc<DepartmentRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            repo,
            doctors,
            departments,
            audit,
        }
    }

    async fn record(&self, entry: AuditEntry, actor: Uuid) {
        self.audit.record(entry.by(actor)).await;
    }

    // Shifts

    pub async fn create_shift(&self, mut input: CreateShift, actor: Uuid) -> AppResult<WorkShift> {
        require_text("Shift name", &input.shift_name)?;
        input.shift_code = check_shift_code(&input.shift_code)?;
        let shift_type: ShiftType = parse_enum(&input.shift_type)?;
        if let Some(hours) = input.duration_hours {
            check_duration_hours(hours)?;
        }
        check_minutes("Break duration", input.break_duration_minutes)?;
        check_minutes("Grace period", input.grace_period_minutes)?;
        check_multiplier(input.overtime_rate_multiplier)?;
        input.applicable_days = normalise_days(std::mem::take(&mut input.applicable_days))?;

        let shift = WorkShift::new(input, shift_type);
        // derived from the times when not given
        check_duration_hours(shift.duration_hours)?;

        let shift = self.repo.insert_shift(&shift).await?;
        info!(
            "Created shift {} ({} to {})",
            shift.shift_code, shift.start_time, shift.end_time
        );
        self.record(
            AuditEntry::new(AuditAction::Create, "shift", Some(shift.id), "Shift created"),
            actor,
        )
        .await;
        Ok(shift)
    }

    pub async fn get_shift(&self, id: Uuid) -> AppResult<WorkShift> {
        self.repo
            .find_shift(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))
    }

    pub async fn list_shifts(&self, filter: ShiftFilter, page: Page) -> AppResult<Vec<WorkShift>> {
        let status = normalise_enum::<ShiftStatus>(filter.status)?;
        Ok(self.repo.list_shifts(status, page).await?)
    }

    pub async fn update_shift(
        &self,
        id: Uuid,
        mut update: UpdateShift,
        actor: Uuid,
    ) -> AppResult<WorkShift> {
        if let Some(name) = &update.shift_name {
            require_text("Shift name", name)?;
        }
        update.shift_type = normalise_enum::<ShiftType>(update.shift_type)?;
        update.status = normalise_enum::<ShiftStatus>(update.status)?;
        if let Some(hours) = update.duration_hours {
            check_duration_hours(hours)?;
        }
        check_minutes("Break duration", update.break_duration_minutes)?;
        check_minutes("Grace period", update.grace_period_minutes)?;
        check_multiplier(update.overtime_rate_multiplier)?;
        update.applicable_days = update.applicable_days.map(normalise_days).transpose()?;

        let mut shift = self.get_shift(id).await?;
        shift.apply(update);
        let shift = self.repo.update_shift(&shift).await?;
        self.record(AuditEntry::new(AuditAction::Update, "shift", Some(id), "Shift updated"), actor)
            .await;
        Ok(shift)
    }

    pub async fn delete_shift(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        let today = utc_now().date();
        if !self.repo.delete_shift(id, today).await? {
            return Err(AppError::NotFound("Shift not found".to_string()));
        }
        self.record(AuditEntry::new(AuditAction::Delete, "shift", Some(id), "Shift deleted"), actor)
            .await;
        Ok(())
    }

    // Schedules

    async fn rosterable_shift(&self, shift_id: Uuid) -> AppResult<WorkShift> {
        let shift = self.get_shift(shift_id).await?;
        if !shift.is_active() {
            return Err(AppError::BusinessLogic(format!(
                "Shift {} is inactive",
                shift.shift_code
            )));
        }
        Ok(shift)
    }

    async fn check_references(&self, doctor_id: Option<Uuid>, department_id: Option<Uuid>) -> AppResult<()> {
        if let Some(doctor_id) = doctor_id {
            self.doctors
                .find_by_id(doctor_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))?;
        }
        if let Some(department_id) = department_id {
            self.departments
                .find_by_id(department_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Department not found".to_string()))?;
        }
        Ok(())
    }

    pub async fn create_schedule(&self, input: CreateSchedule, actor: Uuid) -> AppResult<ScheduleDetail> {
        check_max_appointments(input.max_appointments)?;
        let day_type = match input.day_type.as_deref() {
            Some(d) => parse_enum::<DayType>(d)?,
            None => DayType::Working,
        };
        let shift = self.rosterable_shift(input.shift_id).await?;
        check_runs_on(&shift, input.schedule_date)?;
        self.check_references(input.doctor_id, input.department_id).await?;

        let schedule = self.repo.insert_schedule(&Schedule::new(input, day_type)).await?;
        info!(
            "Rostered shift {} on {} ({})",
            shift.shift_code, schedule.schedule_date, schedule.day_type
        );
        self.record(
            AuditEntry::new(AuditAction::Create, "schedule", Some(schedule.id), "Roster entry created"),
            actor,
        )
        .await;
        Ok(schedule.with_shift(&shift))
    }

    pub async fn get_schedule(&self, id: Uuid) -> AppResult<ScheduleDetail> {
        let schedule = self
            .repo
            .find_schedule(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Schedule not found".to_string()))?;
        let shift = self.get_shift(schedule.shift_id).await?;
        Ok(schedule.with_shift(&shift))
    }

    pub async fn list_schedules(
        &self,
        mut filter: ScheduleFilter,
        page: Page,
    ) -> AppResult<Vec<ScheduleDetail>> {
        filter.status = normalise_enum::<ScheduleStatus>(filter.status)?;
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::Validation(
                    "Start date must not be after end date".to_string(),
                ));
            }
        }
        let schedules = self.repo.list_schedules(&filter, page).await?;

        let mut shifts: HashMap<Uuid, WorkShift> = HashMap::new();
        let mut details = Vec::with_capacity(schedules.len());
        for schedule in schedules {
            if !shifts.contains_key(&schedule.shift_id) {
                let shift = self.get_shift(schedule.shift_id).await?;
                shifts.insert(shift.id, shift);
            }
            match shifts.get(&schedule.shift_id) {
                Some(shift) => details.push(schedule.with_shift(shift)),
                None => continue,
            }
        }
        Ok(details)
    }

    /// One doctor's roster between two dates, defaulting to the coming week
    pub async fn doctor_roster(
        &self,
        doctor_id: Uuid,
        range: RosterRange,
        page: Page,
    ) -> AppResult<Vec<ScheduleDetail>> {
        self.check_references(Some(doctor_id), None).await?;
        let from = range.from.unwrap_or_else(|| utc_now().date());
        let to = range.to.unwrap_or(from + Duration::days(6));
        let filter = ScheduleFilter {
            doctor_id: Some(doctor_id),
            from: Some(from),
            to: Some(to),
            ..Default::default()
        };
        self.list_schedules(filter, page).await
    }

    pub async fn update_schedule(
        &self,
        id: Uuid,
        mut update: UpdateSchedule,
        actor: Uuid,
    ) -> AppResult<ScheduleDetail> {
        check_max_appointments(update.max_appointments)?;
        update.status = normalise_enum::<ScheduleStatus>(update.status)?;
        update.day_type = normalise_enum::<DayType>(update.day_type)?;
        self.check_references(None, update.department_id).await?;

        let mut schedule = self
            .repo
            .find_schedule(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Schedule not found".to_string()))?;
        let reshifted = update.shift_id.is_some_and(|shift_id| shift_id != schedule.shift_id);
        schedule.apply(update);

        let shift = if reshifted {
            self.rosterable_shift(schedule.shift_id).await?
        } else {
            self.get_shift(schedule.shift_id).await?
        };
        check_runs_on(&shift, schedule.schedule_date)?;

        let schedule = self.repo.update_schedule(&schedule).await?;
        self.record(
            AuditEntry::new(AuditAction::Update, "schedule", Some(id), "Roster entry updated"),
            actor,
        )
        .await;
        Ok(schedule.with_shift(&shift))
    }

    pub async fn delete_schedule(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if !self.repo.delete_schedule(id).await? {
            return Err(AppError::NotFound("Schedule not found".to_string()));
        }
        self.record(
            AuditEntry::new(AuditAction::Delete, "schedule", Some(id), "Roster entry deleted"),
            actor,
        )
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_code_must_be_uppercase() {
        assert_eq!(check_shift_code(" NGT-1 ").unwrap(), "NGT-1");
        assert!(matches!(check_shift_code("ngt"), Err(AppError::Validation(_))));
        assert!(check_shift_code("N G").is_err());
        assert!(check_shift_code("  ").is_err());
    }

    #[test]
    fn test_shift_numeric_bounds() {
        assert!(check_duration_hours(8).is_ok());
        assert!(check_duration_hours(0).is_err());
        assert!(check_duration_hours(25).is_err());
        assert!(check_minutes("Grace period", Some(-1)).is_err());
        assert!(check_minutes("Grace period", None).is_ok());
        assert!(check_multiplier(Some(Decimal::new(2, 0))).is_ok());
        assert!(check_multiplier(Some(Decimal::new(5, 1))).is_err());
        assert!(check_multiplier(Some(Decimal::new(100, 0))).is_err());
    }

    #[test]
    fn test_weekdays_are_canonicalised() {
        assert_eq!(
            normalise_days(vec!["MON".into(), " tue".into(), "mon".into()]).unwrap(),
            vec!["mon".to_string(), "tue".to_string()]
        );
        assert!(normalise_days(vec!["funday".into()]).is_err());
    }

    #[test]
    fn test_shift_runs_only_on_its_days() {
        let mut shift = WorkShift::new(
            CreateShift {
                shift_name: "Weekday morning".into(),
                shift_code: "WDM".into(),
                shift_type: "morning".into(),
                start_time: chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                end_time: chrono::NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                duration_hours: None,
                break_duration_minutes: None,
                applicable_days: vec!["mon".into()],
                grace_period_minutes: None,
                overtime_applicable: None,
                overtime_rate_multiplier: None,
                description: None,
            },
            ShiftType::Morning,
        );
        // 2030-03-04 is a Monday
        let monday = NaiveDate::from_ymd_opt(2030, 3, 4).unwrap();
        assert!(check_runs_on(&shift, monday).is_ok());
        assert!(matches!(
            check_runs_on(&shift, monday.succ_opt().unwrap()),
            Err(AppError::BusinessLogic(_))
        ));

        shift.applicable_days.clear();
        assert!(check_runs_on(&shift, monday.succ_opt().unwrap()).is_ok());
    }
}
