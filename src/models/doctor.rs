use super::{reference_number, utc_now};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    DoctorStatus ("doctor status") {
        Active => "active",
        OnLeave => "on_leave",
        Resigned => "resigned",
        Retired => "retired",
        Suspended => "suspended",
        Inactive => "inactive",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub doctor_code: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub specialization: String,
    pub qualification: String,
    pub medical_license_number: String,
    pub years_of_experience: i32,
    pub email: String,
    pub phone: String,
    pub department_id: Option<Uuid>,
    pub consultation_fee: Option<Decimal>,
    pub average_consultation_time: i32,
    pub is_available: bool,
    pub max_appointments_per_day: i32,
    pub rating: Option<Decimal>,
    pub status: String,
    pub bio: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDoctor {
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub specialization: String,
    pub qualification: String,
    pub medical_license_number: String,
    #[serde(default)]
    pub years_of_experience: i32,
    pub email: String,
    pub phone: String,
    pub department_id: Option<Uuid>,
    pub consultation_fee: Option<Decimal>,
    pub average_consultation_time: Option<i32>,
    pub max_appointments_per_day: Option<i32>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDoctor {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub years_of_experience: Option<i32>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department_id: Option<Uuid>,
    pub consultation_fee: Option<Decimal>,
    pub average_consultation_time: Option<i32>,
    pub max_appointments_per_day: Option<i32>,
    pub rating: Option<Decimal>,
    pub status: Option<String>,
    pub bio: Option<String>,
}

/// Listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorFilter {
    pub department_id: Option<Uuid>,
    pub specialization: Option<String>,
    pub is_available: Option<bool>,
    pub status: Option<String>,
}

impl Doctor {
    pub fn new(input: CreateDoctor) -> Self {
        let now = utc_now();
        Self {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            doctor_code: reference_number("DOC"),
            first_name: input.first_name.trim().to_string(),
            middle_name: input.middle_name,
            last_name: input.last_name.trim().to_string(),
            specialization: input.specialization,
            qualification: input.qualification,
            medical_license_number: input.medical_license_number,
            years_of_experience: input.years_of_experience,
            email: input.email.trim().to_lowercase(),
            phone: input.phone,
            department_id: input.department_id,
            consultation_fee: input.consultation_fee,
            average_consultation_time: input.average_consultation_time.unwrap_or(30),
            is_available: true,
            max_appointments_per_day: input.max_appointments_per_day.unwrap_or(20),
            rating: None,
            status: DoctorStatus::Active.as_str().to_string(),
            bio: input.bio,
            created_at: now,
            updated_at: now,
        }
    }

    /// "Dr. First [Middle] Last"
    pub fn display_name(&self) -> String {
        match &self.middle_name {
            Some(middle) if !middle.trim().is_empty() => {
                format!("Dr. {} {} {}", self.first_name, middle, self.last_name)
            }
            _ => format!("Dr. {} {}", self.first_name, self.last_name),
        }
    }

    pub fn status_enum(&self) -> DoctorStatus {
        self.status.parse().unwrap_or(DoctorStatus::Active)
    }

    /// Active and accepting appointments
    pub fn can_take_appointments(&self) -> bool {
        self.status_enum() == DoctorStatus::Active && self.is_available
    }

    pub fn apply(&mut self, update: UpdateDoctor) {
        if let Some(v) = update.first_name {
            self.first_name = v;
        }
        if update.middle_name.is_some() {
            self.middle_name = update.middle_name;
        }
        if let Some(v) = update.last_name {
            self.last_name = v;
        }
        if let Some(v) = update.specialization {
            self.specialization = v;
        }
        if let Some(v) = update.qualification {
            self.qualification = v;
        }
        if let Some(v) = update.years_of_experience {
            self.years_of_experience = v;
        }
        if let Some(v) = update.email {
            self.email = v.trim().to_lowercase();
        }
        if let Some(v) = update.phone {
            self.phone = v;
        }
        if update.department_id.is_some() {
            self.department_id = update.department_id;
        }
        if update.consultation_fee.is_some() {
            self.consultation_fee = update.consultation_fee;
        }
        if let Some(v) = update.average_consultation_time {
            self.average_consultation_time = v;
        }
        if let Some(v) = update.max_appointments_per_day {
            self.max_appointments_per_day = v;
        }
        if update.rating.is_some() {
            self.rating = update.rating;
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        if update.bio.is_some() {
            self.bio = update.bio;
        }
        self.updated_at = utc_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create() -> CreateDoctor {
        CreateDoctor {
            user_id: None,
            first_name: "Gregory".into(),
            middle_name: None,
            last_name: "House".into(),
            specialization: "Diagnostics".into(),
            qualification: "MD".into(),
            medical_license_number: "LIC-001".into(),
            years_of_experience: 20,
            email: "House@PPTH.org".into(),
            phone: "5550001111".into(),
            department_id: None,
            consultation_fee: Some(Decimal::new(15000, 2)),
            average_consultation_time: None,
            max_appointments_per_day: None,
            bio: None,
        }
    }

    #[test]
    fn test_new_doctor_defaults() {
        let doctor = Doctor::new(create());
        assert!(doctor.doctor_code.starts_with("DOC-"));
        assert_eq!(doctor.email, "house@ppth.org");
        assert_eq!(doctor.average_consultation_time, 30);
        assert_eq!(doctor.max_appointments_per_day, 20);
        assert!(doctor.can_take_appointments());
        assert_eq!(doctor.display_name(), "Dr. Gregory House");
    }

    #[test]
    fn test_unavailable_or_on_leave_cannot_book() {
        let mut doctor = Doctor::new(create());
        doctor.is_available = false;
        assert!(!doctor.can_take_appointments());

        doctor.is_available = true;
        doctor.apply(UpdateDoctor {
            status: Some("on_leave".into()),
            ..Default::default()
        });
        assert_eq!(doctor.status_enum(), DoctorStatus::OnLeave);
        assert!(!doctor.can_take_appointments());
    }
}
