use super::{reference_number, utc_now};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    StaffRole ("staff role") {
        Nurse => "nurse",
        Technician => "technician",
        Pharmacist => "pharmacist",
        Receptionist => "receptionist",
        Administrator => "administrator",
        Accountant => "accountant",
        Support => "support",
        Security => "security",
        Other => "other",
    }
}

text_enum! {
    Shift ("shift") {
        Morning => "morning",
        Evening => "evening",
        Night => "night",
        Rotating => "rotating",
    }
}

text_enum! {
    StaffStatus ("staff status") {
        Active => "active",
        OnLeave => "on_leave",
        Resigned => "resigned",
        Terminated => "terminated",
        Inactive => "inactive",
    }
}

/// Non-physician employee
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Staff {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub staff_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub employee_id: String,
    pub designation: String,
    pub department: Option<String>,
    pub role: String,
    pub joining_date: NaiveDate,
    pub shift: Option<String>,
    pub salary: Option<Decimal>,
    pub qualification: Option<String>,
    pub experience_years: i32,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStaff {
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub employee_id: String,
    pub designation: String,
    pub department: Option<String>,
    pub role: String,
    pub joining_date: NaiveDate,
    pub shift: Option<String>,
    pub salary: Option<Decimal>,
    pub qualification: Option<String>,
    #[serde(default)]
    pub experience_years: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStaff {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub shift: Option<String>,
    pub salary: Option<Decimal>,
    pub qualification: Option<String>,
    pub experience_years: Option<i32>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffFilter {
    pub department: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

impl Staff {
    /// `role` and `shift` must already be normalised
    pub fn new(input: CreateStaff) -> Self {
        let now = utc_now();
        Self {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            staff_code: reference_number("STF"),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            phone: input.phone,
            employee_id: input.employee_id,
            designation: input.designation,
            department: input.department,
            role: input.role,
            joining_date: input.joining_date,
            shift: input.shift,
            salary: input.salary,
            qualification: input.qualification,
            experience_years: input.experience_years,
            status: StaffStatus::Active.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status.parse::<StaffStatus>() == Ok(StaffStatus::Active)
    }

    pub fn apply(&mut self, update: UpdateStaff) {
        if let Some(v) = update.first_name {
            self.first_name = v;
        }
        if let Some(v) = update.last_name {
            self.last_name = v;
        }
        if let Some(v) = update.email {
            self.email = v.trim().to_lowercase();
        }
        if let Some(v) = update.phone {
            self.phone = v;
        }
        if let Some(v) = update.designation {
            self.designation = v;
        }
        if update.department.is_some() {
            self.department = update.department;
        }
        if let Some(v) = update.role {
            self.role = v;
        }
        if update.shift.is_some() {
            self.shift = update.shift;
        }
        if update.salary.is_some() {
            self.salary = update.salary;
        }
        if update.qualification.is_some() {
            self.qualification = update.qualification;
        }
        if let Some(v) = update.experience_years {
            self.experience_years = v;
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        self.updated_at = utc_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_defaults_and_status() {
        let mut staff = Staff::new(CreateStaff {
            user_id: None,
            first_name: "Carla".into(),
            last_name: "Espinosa".into(),
            email: "Carla@Sacred.Heart".into(),
            phone: "5552223333".into(),
            employee_id: "EMP-7".into(),
            designation: "Head Nurse".into(),
            department: Some("Surgery".into()),
            role: "nurse".into(),
            joining_date: NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
            shift: Some("night".into()),
            salary: Some(Decimal::new(450000, 2)),
            qualification: None,
            experience_years: 8,
        });
        assert!(staff.staff_code.starts_with("STF-"));
        assert_eq!(staff.email, "carla@sacred.heart");
        assert!(staff.is_active());
        assert_eq!(staff.full_name(), "Carla Espinosa");

        staff.apply(UpdateStaff {
            status: Some("resigned".into()),
            ..Default::default()
        });
        assert!(!staff.is_active());
    }
}
