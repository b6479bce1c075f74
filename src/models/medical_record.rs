//! Visit notes, vitals and clinical history.

use super::{reference_number, utc_now, UserRole};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    RecordType ("record type") {
        General => "general",
        Consultation => "consultation",
        Emergency => "emergency",
        FollowUp => "follow_up",
        Discharge => "discharge",
        Admission => "admission",
    }
}

text_enum! {
    RecordStatus ("record status") {
        Active => "active",
        Archived => "archived",
        Amended => "amended",
    }
}

/// Roles allowed to read records marked confidential
pub fn can_read_confidential(role: UserRole) -> bool {
    matches!(role, UserRole::Admin | UserRole::Doctor)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub record_number: String,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub record_type: String,
    pub visit_date: NaiveDate,
    pub visit_time: Option<NaiveTime>,
    pub chief_complaint: Option<String>,
    pub temperature: Option<Decimal>,
    pub blood_pressure: Option<String>,
    pub pulse_rate: Option<i32>,
    pub respiratory_rate: Option<i32>,
    pub oxygen_saturation: Option<Decimal>,
    pub history_of_present_illness: Option<String>,
    pub past_medical_history: Option<String>,
    pub family_history: Option<String>,
    pub social_history: Option<String>,
    pub physical_examination: Option<String>,
    pub assessment: Option<String>,
    pub diagnosis_notes: Option<String>,
    pub treatment_plan: Option<String>,
    pub medications_prescribed: Vec<String>,
    pub lab_tests_ordered: Vec<String>,
    pub procedures_performed: Option<String>,
    pub follow_up_required: bool,
    pub follow_up_date: Option<NaiveDate>,
    pub follow_up_instructions: Option<String>,
    pub discharge_summary: Option<String>,
    pub discharge_date: Option<NaiveDate>,
    pub allergies: Vec<String>,
    pub alerts: Option<String>,
    pub notes: Option<String>,
    pub doctor_notes: Option<String>,
    pub nurse_notes: Option<String>,
    pub status: String,
    pub is_confidential: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Vitals {
    pub temperature: Option<Decimal>,
    pub blood_pressure: Option<String>,
    pub pulse_rate: Option<i32>,
    pub respiratory_rate: Option<i32>,
    pub oxygen_saturation: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedicalRecord {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub record_type: Option<String>,
    pub visit_date: Option<NaiveDate>,
    pub visit_time: Option<NaiveTime>,
    pub chief_complaint: Option<String>,
    #[serde(flatten)]
    pub vitals: Vitals,
    pub history_of_present_illness: Option<String>,
    pub past_medical_history: Option<String>,
    pub family_history: Option<String>,
    pub social_history: Option<String>,
    pub physical_examination: Option<String>,
    pub assessment: Option<String>,
    pub diagnosis_notes: Option<String>,
    pub treatment_plan: Option<String>,
    #[serde(default)]
    pub medications_prescribed: Vec<String>,
    #[serde(default)]
    pub lab_tests_ordered: Vec<String>,
    pub procedures_performed: Option<String>,
    #[serde(default)]
    pub follow_up_required: bool,
    pub follow_up_date: Option<NaiveDate>,
    pub follow_up_instructions: Option<String>,
    pub discharge_summary: Option<String>,
    pub discharge_date: Option<NaiveDate>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub alerts: Option<String>,
    pub notes: Option<String>,
    pub doctor_notes: Option<String>,
    pub nurse_notes: Option<String>,
    #[serde(default)]
    pub is_confidential: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMedicalRecord {
    pub chief_complaint: Option<String>,
    #[serde(flatten)]
    pub vitals: Vitals,
    pub history_of_present_illness: Option<String>,
    pub physical_examination: Option<String>,
    pub assessment: Option<String>,
    pub diagnosis_notes: Option<String>,
    pub treatment_plan: Option<String>,
    pub medications_prescribed: Option<Vec<String>>,
    pub lab_tests_ordered: Option<Vec<String>>,
    pub procedures_performed: Option<String>,
    pub follow_up_required: Option<bool>,
    pub follow_up_date: Option<NaiveDate>,
    pub follow_up_instructions: Option<String>,
    pub discharge_summary: Option<String>,
    pub discharge_date: Option<NaiveDate>,
    pub allergies: Option<Vec<String>>,
    pub alerts: Option<String>,
    pub notes: Option<String>,
    pub doctor_notes: Option<String>,
    pub nurse_notes: Option<String>,
    pub status: Option<String>,
    pub is_confidential: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicalRecordFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub record_type: Option<String>,
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Set by the service from the caller's role, never by the client
    #[serde(skip)]
    pub include_confidential: bool,
}

impl MedicalRecord {
    pub fn new(input: CreateMedicalRecord, record_type: RecordType, today: NaiveDate) -> Self {
        let now = utc_now();
        Self {
            id: Uuid::new_v4(),
            record_number: reference_number("MR"),
            patient_id: input.patient_id,
            doctor_id: input.doctor_id,
            appointment_id: input.appointment_id,
            record_type: record_type.as_str().to_string(),
            visit_date: input.visit_date.unwrap_or(today),
            visit_time: input.visit_time,
            chief_complaint: input.chief_complaint,
            temperature: input.vitals.temperature,
            blood_pressure: input.vitals.blood_pressure,
            pulse_rate: input.vitals.pulse_rate,
            respiratory_rate: input.vitals.respiratory_rate,
            oxygen_saturation: input.vitals.oxygen_saturation,
            history_of_present_illness: input.history_of_present_illness,
            past_medical_history: input.past_medical_history,
            family_history: input.family_history,
            social_history: input.social_history,
            physical_examination: input.physical_examination,
            assessment: input.assessment,
            diagnosis_notes: input.diagnosis_notes,
            treatment_plan: input.treatment_plan,
            medications_prescribed: input.medications_prescribed,
            lab_tests_ordered: input.lab_tests_ordered,
            procedures_performed: input.procedures_performed,
            follow_up_required: input.follow_up_required || input.follow_up_date.is_some(),
            follow_up_date: input.follow_up_date,
            follow_up_instructions: input.follow_up_instructions,
            discharge_summary: input.discharge_summary,
            discharge_date: input.discharge_date,
            allergies: input.allergies,
            alerts: input.alerts,
            notes: input.notes,
            doctor_notes: input.doctor_notes,
            nurse_notes: input.nurse_notes,
            status: RecordStatus::Active.as_str().to_string(),
            is_confidential: input.is_confidential,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an edit; clinical content changes mark an active record amended
    pub fn apply(&mut self, update: UpdateMedicalRecord) {
        let vitals = update.vitals;
        let clinical = [
            replace(&mut self.chief_complaint, update.chief_complaint),
            replace(&mut self.temperature, vitals.temperature),
            replace(&mut self.blood_pressure, vitals.blood_pressure),
            replace(&mut self.pulse_rate, vitals.pulse_rate),
            replace(&mut self.respiratory_rate, vitals.respiratory_rate),
            replace(&mut self.oxygen_saturation, vitals.oxygen_saturation),
            replace(&mut self.history_of_present_illness, update.history_of_present_illness),
            replace(&mut self.physical_examination, update.physical_examination),
            replace(&mut self.assessment, update.assessment),
            replace(&mut self.diagnosis_notes, update.diagnosis_notes),
            replace(&mut self.treatment_plan, update.treatment_plan),
            replace(&mut self.procedures_performed, update.procedures_performed),
            replace(&mut self.follow_up_date, update.follow_up_date),
            replace(&mut self.follow_up_instructions, update.follow_up_instructions),
            replace(&mut self.discharge_summary, update.discharge_summary),
            replace(&mut self.discharge_date, update.discharge_date),
            replace(&mut self.alerts, update.alerts),
            replace_list(&mut self.medications_prescribed, update.medications_prescribed),
            replace_list(&mut self.lab_tests_ordered, update.lab_tests_ordered),
            replace_list(&mut self.allergies, update.allergies),
        ];
        let amended = clinical.contains(&true);

        if let Some(v) = update.follow_up_required {
            self.follow_up_required = v;
        }
        if self.follow_up_date.is_some() {
            self.follow_up_required = true;
        }
        replace(&mut self.notes, update.notes);
        replace(&mut self.doctor_notes, update.doctor_notes);
        replace(&mut self.nurse_notes, update.nurse_notes);
        if let Some(v) = update.is_confidential {
            self.is_confidential = v;
        }

        match update.status {
            Some(v) => self.status = v,
            None if amended && self.status == RecordStatus::Active.as_str() => {
                self.status = RecordStatus::Amended.as_str().to_string();
            }
            None => {}
        }
        self.updated_at = utc_now();
    }

    pub fn status_enum(&self) -> RecordStatus {
        self.status.parse().unwrap_or(RecordStatus::Active)
    }
}

/// Overwrite `slot` when a value was supplied; reports whether it did
fn replace<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

fn replace_list(slot: &mut Vec<String>, value: Option<Vec<String>>) -> bool {
    match value {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MedicalRecord {
        let input: CreateMedicalRecord = serde_json::from_value(serde_json::json!({
            "patient_id": Uuid::new_v4(),
            "chief_complaint": "Chest pain",
            "temperature": "98.6",
            "blood_pressure": "120/80",
            "pulse_rate": 72,
            "allergies": ["penicillin"]
        }))
        .unwrap();
        MedicalRecord::new(input, RecordType::Consultation, NaiveDate::from_ymd_opt(2030, 5, 1).unwrap())
    }

    #[test]
    fn test_new_record_reads_flattened_vitals() {
        let record = record();
        assert!(record.record_number.starts_with("MR-"));
        assert_eq!(record.temperature, Some(Decimal::new(986, 1)));
        assert_eq!(record.blood_pressure.as_deref(), Some("120/80"));
        assert_eq!(record.pulse_rate, Some(72));
        assert_eq!(record.allergies, vec!["penicillin".to_string()]);
        assert_eq!(record.status, "active");
        assert!(!record.is_confidential);
    }

    #[test]
    fn test_clinical_edit_marks_record_amended() {
        let mut record = record();
        record.apply(UpdateMedicalRecord {
            nurse_notes: Some("Resting".into()),
            ..Default::default()
        });
        assert_eq!(record.status, "active");

        record.apply(UpdateMedicalRecord {
            assessment: Some("Musculoskeletal".into()),
            ..Default::default()
        });
        assert_eq!(record.status, "amended");
        assert_eq!(record.assessment.as_deref(), Some("Musculoskeletal"));

        record.apply(UpdateMedicalRecord {
            status: Some("archived".into()),
            ..Default::default()
        });
        assert_eq!(record.status_enum(), RecordStatus::Archived);
    }

    #[test]
    fn test_confidential_readers() {
        assert!(can_read_confidential(UserRole::Admin));
        assert!(can_read_confidential(UserRole::Doctor));
        assert!(!can_read_confidential(UserRole::Nurse));
        assert!(!can_read_confidential(UserRole::Staff));
    }
}
