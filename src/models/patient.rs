use super::{reference_number, round_money, utc_now};
use crate::validation::age_on;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    Gender ("gender") {
        Male => "male",
        Female => "female",
        Other => "other",
    }
}

text_enum! {
    BloodGroup ("blood group") {
        APositive => "A+",
        ANegative => "A-",
        BPositive => "B+",
        BNegative => "B-",
        AbPositive => "AB+",
        AbNegative => "AB-",
        OPositive => "O+",
        ONegative => "O-",
    }
}

text_enum! {
    PatientStatus ("patient status") {
        Active => "active",
        Discharged => "discharged",
        Deceased => "deceased",
        Transferred => "transferred",
        Inactive => "inactive",
    }
}

/// Registered patient
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub patient_number: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub pincode: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub emergency_contact_relation: Option<String>,
    pub blood_group: Option<String>,
    pub height_cm: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub bmi: Option<Decimal>,
    pub allergies: Option<String>,
    pub chronic_diseases: Option<String>,
    pub current_medications: Option<String>,
    pub primary_doctor_id: Option<Uuid>,
    pub current_bed_id: Option<Uuid>,
    pub is_admitted: bool,
    pub admission_date: Option<NaiveDateTime>,
    pub has_insurance: bool,
    pub insurance_provider: Option<String>,
    pub insurance_policy_number: Option<String>,
    pub national_id: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Payload for registering a patient
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePatient {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: Option<String>,
    pub pincode: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub emergency_contact_relation: Option<String>,
    pub blood_group: Option<String>,
    pub height_cm: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub allergies: Option<String>,
    pub chronic_diseases: Option<String>,
    pub current_medications: Option<String>,
    pub primary_doctor_id: Option<Uuid>,
    #[serde(default)]
    pub has_insurance: bool,
    pub insurance_provider: Option<String>,
    pub insurance_policy_number: Option<String>,
    pub national_id: Option<String>,
    pub notes: Option<String>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatient {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub pincode: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relation: Option<String>,
    pub blood_group: Option<String>,
    pub height_cm: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub allergies: Option<String>,
    pub chronic_diseases: Option<String>,
    pub current_medications: Option<String>,
    pub primary_doctor_id: Option<Uuid>,
    pub has_insurance: Option<bool>,
    pub insurance_provider: Option<String>,
    pub insurance_policy_number: Option<String>,
    pub national_id: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Patient plus the derived age, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct PatientResponse {
    #[serde(flatten)]
    pub patient: Patient,
    pub full_name: String,
    pub age: i32,
}

/// weight / (height in metres)², rounded to two decimals
pub fn calculate_bmi(height_cm: Decimal, weight_kg: Decimal) -> Option<Decimal> {
    if height_cm <= Decimal::ZERO || weight_kg <= Decimal::ZERO {
        return None;
    }
    let height_m = height_cm / Decimal::ONE_HUNDRED;
    weight_kg
        .checked_div(height_m * height_m)
        .map(round_money)
        .filter(|bmi| *bmi < Decimal::ONE_THOUSAND)
}

impl Patient {
    /// Build a new patient row from an already validated payload
    pub fn new(input: CreatePatient, gender: Gender, blood_group: Option<BloodGroup>) -> Self {
        let now = utc_now();
        let bmi = match (input.height_cm, input.weight_kg) {
            (Some(h), Some(w)) => calculate_bmi(h, w),
            _ => None,
        };

        Self {
            id: Uuid::new_v4(),
            patient_number: reference_number("PAT"),
            first_name: input.first_name.trim().to_string(),
            middle_name: input.middle_name,
            last_name: input.last_name.trim().to_string(),
            date_of_birth: input.date_of_birth,
            gender: gender.as_str().to_string(),
            email: input.email,
            phone: input.phone,
            address: input.address,
            city: input.city,
            state: input.state,
            country: input.country.unwrap_or_else(|| "USA".to_string()),
            pincode: input.pincode,
            emergency_contact_name: input.emergency_contact_name,
            emergency_contact_phone: input.emergency_contact_phone,
            emergency_contact_relation: input.emergency_contact_relation,
            blood_group: blood_group.map(|b| b.as_str().to_string()),
            height_cm: input.height_cm,
            weight_kg: input.weight_kg,
            bmi,
            allergies: input.allergies,
            chronic_diseases: input.chronic_diseases,
            current_medications: input.current_medications,
            primary_doctor_id: input.primary_doctor_id,
            current_bed_id: None,
            is_admitted: false,
            admission_date: None,
            has_insurance: input.has_insurance,
            insurance_provider: input.insurance_provider,
            insurance_policy_number: input.insurance_policy_number,
            national_id: input.national_id,
            status: PatientStatus::Active.as_str().to_string(),
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        match &self.middle_name {
            Some(middle) if !middle.trim().is_empty() => {
                format!("{} {} {}", self.first_name, middle, self.last_name)
            }
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }

    pub fn age(&self, today: NaiveDate) -> i32 {
        age_on(self.date_of_birth, today)
    }

    pub fn status_enum(&self) -> PatientStatus {
        self.status.parse().unwrap_or(PatientStatus::Active)
    }

    pub fn is_active(&self) -> bool {
        self.status_enum() == PatientStatus::Active
    }

    /// Apply a partial update. Enum fields must already be normalised.
    pub fn apply(&mut self, update: UpdatePatient) {
        macro_rules! set {
            ($($field:ident),+) => {
                $(if let Some(value) = update.$field { self.$field = value; })+
            };
        }
        macro_rules! set_opt {
            ($($field:ident),+) => {
                $(if update.$field.is_some() { self.$field = update.$field; })+
            };
        }

        set!(
            first_name, last_name, date_of_birth, gender, phone, address, city, state, country,
            pincode, emergency_contact_name, emergency_contact_phone, has_insurance, status
        );
        set_opt!(
            middle_name, email, emergency_contact_relation, blood_group, height_cm, weight_kg,
            allergies, chronic_diseases, current_medications, primary_doctor_id,
            insurance_provider, insurance_policy_number, national_id, notes
        );

        self.bmi = match (self.height_cm, self.weight_kg) {
            (Some(h), Some(w)) => calculate_bmi(h, w),
            _ => None,
        };
        self.updated_at = utc_now();
    }

    pub fn into_response(self, today: NaiveDate) -> PatientResponse {
        let full_name = self.full_name();
        let age = self.age(today);
        PatientResponse {
            patient: self,
            full_name,
            age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreatePatient {
        CreatePatient {
            first_name: " Ada ".into(),
            middle_name: None,
            last_name: "Lovelace".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
            gender: "female".into(),
            email: None,
            phone: "5551234567".into(),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            country: None,
            pincode: "62701".into(),
            emergency_contact_name: "Charles".into(),
            emergency_contact_phone: "5557654321".into(),
            emergency_contact_relation: None,
            blood_group: None,
            height_cm: Some(Decimal::new(170, 0)),
            weight_kg: Some(Decimal::new(65, 0)),
            allergies: None,
            chronic_diseases: None,
            current_medications: None,
            primary_doctor_id: None,
            has_insurance: false,
            insurance_provider: None,
            insurance_policy_number: None,
            national_id: None,
            notes: None,
        }
    }

    #[test]
    fn test_bmi_calculation() {
        assert_eq!(
            calculate_bmi(Decimal::new(170, 0), Decimal::new(65, 0)),
            Some(Decimal::new(2249, 2))
        );
        assert_eq!(calculate_bmi(Decimal::ZERO, Decimal::new(65, 0)), None);
        // 1 cm tall: not a storable reading
        assert_eq!(calculate_bmi(Decimal::ONE, Decimal::new(65, 0)), None);
    }

    #[test]
    fn test_new_patient_defaults() {
        let patient = Patient::new(payload(), Gender::Female, Some(BloodGroup::ONegative));
        assert!(patient.patient_number.starts_with("PAT-"));
        assert_eq!(patient.first_name, "Ada");
        assert_eq!(patient.country, "USA");
        assert_eq!(patient.blood_group.as_deref(), Some("O-"));
        assert_eq!(patient.bmi, Some(Decimal::new(2249, 2)));
        assert!(patient.is_active());
        assert!(!patient.is_admitted);
        assert_eq!(patient.full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_apply_recomputes_bmi() {
        let mut patient = Patient::new(payload(), Gender::Female, None);
        patient.apply(UpdatePatient {
            weight_kg: Some(Decimal::new(80, 0)),
            city: Some("Chicago".into()),
            ..Default::default()
        });
        assert_eq!(patient.city, "Chicago");
        assert_eq!(patient.bmi, Some(Decimal::new(2768, 2)));
    }

    #[test]
    fn test_blood_group_parsing_is_case_insensitive() {
        assert_eq!("ab+".parse::<BloodGroup>().unwrap(), BloodGroup::AbPositive);
        assert!("C+".parse::<BloodGroup>().is_err());
    }

    #[test]
    fn test_age_in_response() {
        let patient = Patient::new(payload(), Gender::Female, None);
        let response = patient.into_response(NaiveDate::from_ymd_opt(2024, 12, 9).unwrap());
        assert_eq!(response.age, 33);
    }
}
