//! Prescriptions and the medicines they list.

use super::{reference_number, utc_now};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    PrescriptionType ("prescription type") {
        Outpatient => "outpatient",
        Inpatient => "inpatient",
        Emergency => "emergency",
        Followup => "followup",
        Discharge => "discharge",
    }
}

text_enum! {
    PrescriptionStatus ("prescription status") {
        Active => "active",
        Completed => "completed",
        Cancelled => "cancelled",
        Expired => "expired",
        PartiallyDispensed => "partially_dispensed",
    }
}

impl PrescriptionStatus {
    /// Statuses that may still be dispensed against
    pub fn is_open(&self) -> bool {
        matches!(self, PrescriptionStatus::Active | PrescriptionStatus::PartiallyDispensed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Prescription {
    pub id: Uuid,
    pub prescription_number: String,
    pub prescription_date: NaiveDate,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub diagnosis: String,
    pub symptoms: Option<String>,
    pub prescription_type: String,
    pub temperature: Option<String>,
    pub blood_pressure: Option<String>,
    pub pulse_rate: Option<String>,
    pub respiratory_rate: Option<String>,
    pub general_instructions: Option<String>,
    pub dietary_advice: Option<String>,
    pub precautions: Option<String>,
    pub follow_up_required: bool,
    pub follow_up_date: Option<NaiveDate>,
    pub follow_up_notes: Option<String>,
    pub lab_tests_recommended: Vec<String>,
    pub status: String,
    pub valid_until: Option<NaiveDate>,
    pub is_dispensed: bool,
    pub dispensed_by: Option<String>,
    pub dispensed_at: Option<NaiveDateTime>,
    pub doctor_notes: Option<String>,
    pub pharmacy_notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrescriptionItem {
    pub id: Uuid,
    pub prescription_id: Uuid,
    pub medicine_id: Uuid,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub quantity: i32,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrescriptionItem {
    pub medicine_id: Uuid,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub quantity: i32,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrescription {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub prescription_date: Option<NaiveDate>,
    pub diagnosis: String,
    pub symptoms: Option<String>,
    pub prescription_type: Option<String>,
    pub temperature: Option<String>,
    pub blood_pressure: Option<String>,
    pub pulse_rate: Option<String>,
    pub respiratory_rate: Option<String>,
    pub general_instructions: Option<String>,
    pub dietary_advice: Option<String>,
    pub precautions: Option<String>,
    #[serde(default)]
    pub follow_up_required: bool,
    pub follow_up_date: Option<NaiveDate>,
    pub follow_up_notes: Option<String>,
    #[serde(default)]
    pub lab_tests_recommended: Vec<String>,
    pub valid_until: Option<NaiveDate>,
    pub doctor_notes: Option<String>,
    pub items: Vec<CreatePrescriptionItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePrescription {
    pub diagnosis: Option<String>,
    pub symptoms: Option<String>,
    pub general_instructions: Option<String>,
    pub dietary_advice: Option<String>,
    pub precautions: Option<String>,
    pub follow_up_required: Option<bool>,
    pub follow_up_date: Option<NaiveDate>,
    pub follow_up_notes: Option<String>,
    pub lab_tests_recommended: Option<Vec<String>>,
    pub status: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub doctor_notes: Option<String>,
    pub pharmacy_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrescriptionFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<String>,
    pub is_dispensed: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionDetail {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub items: Vec<PrescriptionItem>,
}

impl Prescription {
    pub fn new(input: &CreatePrescription, prescription_type: PrescriptionType, today: NaiveDate) -> Self {
        let now = utc_now();
        Self {
            id: Uuid::new_v4(),
            prescription_number: reference_number("RX"),
            prescription_date: input.prescription_date.unwrap_or(today),
            patient_id: input.patient_id,
            doctor_id: input.doctor_id,
            appointment_id: input.appointment_id,
            diagnosis: input.diagnosis.trim().to_string(),
            symptoms: input.symptoms.clone(),
            prescription_type: prescription_type.as_str().to_string(),
            temperature: input.temperature.clone(),
            blood_pressure: input.blood_pressure.clone(),
            pulse_rate: input.pulse_rate.clone(),
            respiratory_rate: input.respiratory_rate.clone(),
            general_instructions: input.general_instructions.clone(),
            dietary_advice: input.dietary_advice.clone(),
            precautions: input.precautions.clone(),
            follow_up_required: input.follow_up_required || input.follow_up_date.is_some(),
            follow_up_date: input.follow_up_date,
            follow_up_notes: input.follow_up_notes.clone(),
            lab_tests_recommended: input.lab_tests_recommended.clone(),
            status: PrescriptionStatus::Active.as_str().to_string(),
            valid_until: input.valid_until,
            is_dispensed: false,
            dispensed_by: None,
            dispensed_at: None,
            doctor_notes: input.doctor_notes.clone(),
            pharmacy_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdatePrescription) {
        if let Some(v) = update.diagnosis {
            self.diagnosis = v.trim().to_string();
        }
        if update.symptoms.is_some() {
            self.symptoms = update.symptoms;
        }
        if update.general_instructions.is_some() {
            self.general_instructions = update.general_instructions;
        }
        if update.dietary_advice.is_some() {
            self.dietary_advice = update.dietary_advice;
        }
        if update.precautions.is_some() {
            self.precautions = update.precautions;
        }
        if let Some(v) = update.follow_up_required {
            self.follow_up_required = v;
        }
        if update.follow_up_date.is_some() {
            self.follow_up_date = update.follow_up_date;
            self.follow_up_required = true;
        }
        if update.follow_up_notes.is_some() {
            self.follow_up_notes = update.follow_up_notes;
        }
        if let Some(v) = update.lab_tests_recommended {
            self.lab_tests_recommended = v;
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        if update.valid_until.is_some() {
            self.valid_until = update.valid_until;
        }
        if update.doctor_notes.is_some() {
            self.doctor_notes = update.doctor_notes;
        }
        if update.pharmacy_notes.is_some() {
            self.pharmacy_notes = update.pharmacy_notes;
        }
        self.updated_at = utc_now();
    }

    pub fn status_enum(&self) -> PrescriptionStatus {
        self.status.parse().unwrap_or(PrescriptionStatus::Active)
    }

    /// Past its validity date
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        matches!(self.valid_until, Some(until) if until < today)
    }
}

impl PrescriptionItem {
    pub fn new(prescription_id: Uuid, input: CreatePrescriptionItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            prescription_id,
            medicine_id: input.medicine_id,
            dosage: input.dosage.trim().to_string(),
            frequency: input.frequency.trim().to_string(),
            duration: input.duration.trim().to_string(),
            quantity: input.quantity,
            instructions: input.instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CreatePrescription {
        CreatePrescription {
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            appointment_id: None,
            prescription_date: None,
            diagnosis: " Acute bronchitis ".into(),
            symptoms: Some("Cough".into()),
            prescription_type: None,
            temperature: None,
            blood_pressure: None,
            pulse_rate: None,
            respiratory_rate: None,
            general_instructions: None,
            dietary_advice: None,
            precautions: None,
            follow_up_required: false,
            follow_up_date: NaiveDate::from_ymd_opt(2030, 1, 14),
            follow_up_notes: None,
            lab_tests_recommended: vec!["CBC".into()],
            valid_until: NaiveDate::from_ymd_opt(2030, 1, 31),
            doctor_notes: None,
            items: Vec::new(),
        }
    }

    #[test]
    fn test_new_prescription() {
        let today = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
        let rx = Prescription::new(&input(), PrescriptionType::Outpatient, today);
        assert!(rx.prescription_number.starts_with("RX-"));
        assert_eq!(rx.prescription_date, today);
        assert_eq!(rx.diagnosis, "Acute bronchitis");
        assert_eq!(rx.status, "active");
        assert!(rx.follow_up_required);
        assert!(!rx.is_dispensed);
    }

    #[test]
    fn test_expiry_and_open_statuses() {
        let today = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
        let rx = Prescription::new(&input(), PrescriptionType::Outpatient, today);
        assert!(!rx.is_expired(today));
        assert!(rx.is_expired(NaiveDate::from_ymd_opt(2030, 2, 1).unwrap()));

        assert!(PrescriptionStatus::Active.is_open());
        assert!(PrescriptionStatus::PartiallyDispensed.is_open());
        assert!(!PrescriptionStatus::Cancelled.is_open());
        assert!(!PrescriptionStatus::Completed.is_open());
    }
}
