use super::{normalise_enum, parse_enum, AuditService};
use crate::error::{AppError, AppResult};
use crate::models::{
    can_read_confidential, utc_now, AuditAction, AuditEntry, CreateMedicalRecord,
    CreatePrescription, CreatePrescriptionItem, MedicalRecord, MedicalRecordFilter, Prescription,
    PrescriptionDetail, PrescriptionFilter, PrescriptionItem, PrescriptionStatus,
    PrescriptionType, RecordStatus, RecordType, UpdateMedicalRecord, UpdatePrescription, User,
    UserRole, Vitals,
};
use crate::repositories::{
    AppointmentRepository, ClinicalRepository, DoctorRepository, Page, PatientRepository,
    PharmacyRepository,
};
use crate::validation::{
    fits_numeric, percentage, positive, require_text, validate_blood_pressure, MEASURE_DIGITS,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispenseRequest {
    pub pharmacy_notes: Option<String>,
}

fn check_item(item: &CreatePrescriptionItem) -> AppResult<()> {
    require_text("Dosage", &item.dosage)?;
    require_text("Frequency", &item.frequency)?;
    require_text("Duration", &item.duration)?;
    if item.quantity <= 0 {
        return Err(AppError::Validation(
            "Prescribed quantity must be positive".to_string(),
        ));
    }
    Ok(())
}

fn check_items(items: &[CreatePrescriptionItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::Validation(
            "Prescription must list at least one medicine".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for item in items {
        check_item(item)?;
        if !seen.insert(item.medicine_id) {
            return Err(AppError::Validation(format!(
                "Medicine {} is listed more than once",
                item.medicine_id
            )));
        }
    }
    Ok(())
}

fn check_not_before(field: &str, date: Option<NaiveDate>, start: NaiveDate) -> AppResult<()> {
    if matches!(date, Some(d) if d < start) {
        return Err(AppError::Validation(format!(
            "{} cannot be before {}",
            field, start
        )));
    }
    Ok(())
}

fn check_vitals(vitals: &Vitals) -> AppResult<()> {
    if let Some(temperature) = vitals.temperature {
        positive("Temperature", temperature)?;
        fits_numeric("Temperature", temperature, MEASURE_DIGITS)?;
    }
    if let Some(saturation) = vitals.oxygen_saturation {
        percentage("Oxygen saturation", saturation)?;
    }
    if matches!(vitals.pulse_rate, Some(p) if p <= 0) {
        return Err(AppError::Validation("Pulse rate must be positive".to_string()));
    }
    if matches!(vitals.respiratory_rate, Some(r) if r <= 0) {
        return Err(AppError::Validation(
            "Respiratory rate must be positive".to_string(),
        ));
    }
    if let Some(reading) = &vitals.blood_pressure {
        validate_blood_pressure(reading)?;
    }
    Ok(())
}

fn check_readable(record: &MedicalRecord, role: UserRole) -> AppResult<()> {
    if record.is_confidential && !can_read_confidential(role) {
        return Err(AppError::Forbidden(
            "This medical record is confidential".to_string(),
        ));
    }
    Ok(())
}

/// Prescriptions and medical records
pub struct ClinicalService {
    repo: Arc<ClinicalRepository>,
    patients: Arc<PatientRepository>,
    doctors: Arc<DoctorRepository>,
    appointments: Arc<AppointmentRepository>,
    medicines: Arc<PharmacyRepository>,
    audit: Arc<AuditService>,
}

impl ClinicalService {
    pub fn new(
        repo: Arc<ClinicalRepository>,
        patients: Arc<PatientRepository>,
        doctors: Arc<DoctorRepository>,
        appointments: Arc<AppointmentRepository>,
        medicines: Arc<PharmacyRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            repo,
            patients,
            doctors,
            appointments,
            medicines,
            audit,
        }
    }

    async fn record(&self, entry: AuditEntry, actor: Uuid) {
        self.audit.record(entry.by(actor)).await;
    }

    /// Patient, doctor and appointment must exist and belong together
    async fn check_parties(
        &self,
        patient_id: Uuid,
        doctor_id: Option<Uuid>,
        appointment_id: Option<Uuid>,
    ) -> AppResult<()> {
        self.patients
            .find_by_id(patient_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;
        if let Some(doctor_id) = doctor_id {
            self.doctors
                .find_by_id(doctor_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))?;
        }
        if let Some(appointment_id) = appointment_id {
            let appointment = self
                .appointments
                .find_by_id(appointment_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;
            if appointment.patient_id != patient_id {
                return Err(AppError::Validation(format!(
                    "Appointment {} belongs to a different patient",
                    appointment.appointment_number
                )));
            }
        }
        Ok(())
    }

    // Prescriptions

    pub async fn create_prescription(
        &self,
        input: CreatePrescription,
        actor: Uuid,
    ) -> AppResult<PrescriptionDetail> {
        require_text("Diagnosis", &input.diagnosis)?;
        let prescription_type = match input.prescription_type.as_deref() {
            Some(t) => parse_enum::<PrescriptionType>(t)?,
            None => PrescriptionType::Outpatient,
        };
        check_items(&input.items)?;

        let prescription = Prescription::new(&input, prescription_type, utc_now().date());
        check_not_before("Valid until", prescription.valid_until, prescription.prescription_date)?;
        check_not_before("Follow-up date", prescription.follow_up_date, prescription.prescription_date)?;

        self.check_parties(input.patient_id, Some(input.doctor_id), input.appointment_id)
            .await?;
        for item in &input.items {
            self.medicines
                .find_medicine(item.medicine_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Medicine {} not found", item.medicine_id)))?;
        }

        let items: Vec<PrescriptionItem> = input
            .items
            .into_iter()
            .map(|item| PrescriptionItem::new(prescription.id, item))
            .collect();
        let prescription = self.repo.create_prescription(&prescription, &items).await?;
        info!(
            "Created prescription {} with {} medicines",
            prescription.prescription_number,
            items.len()
        );
        self.record(
            AuditEntry::new(
                AuditAction::Create,
                "prescription",
                Some(prescription.id),
                "Prescription created",
            ),
            actor,
        )
        .await;
        self.get_prescription(prescription.id).await
    }

    async fn find_prescription(&self, id: Uuid) -> AppResult<Prescription> {
        self.repo
            .find_prescription(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Prescription not found".to_string()))
    }

    pub async fn get_prescription(&self, id: Uuid) -> AppResult<PrescriptionDetail> {
        let prescription = self.find_prescription(id).await?;
        let items = self.repo.prescription_items(id).await?;
        Ok(PrescriptionDetail { prescription, items })
    }

    pub async fn list_prescriptions(
        &self,
        mut filter: PrescriptionFilter,
        page: Page,
    ) -> AppResult<Vec<Prescription>> {
        filter.status = normalise_enum::<PrescriptionStatus>(filter.status)?;
        Ok(self.repo.list_prescriptions(&filter, page).await?)
    }

    pub async fn update_prescription(
        &self,
        id: Uuid,
        mut update: UpdatePrescription,
        actor: Uuid,
    ) -> AppResult<PrescriptionDetail> {
        if let Some(diagnosis) = &update.diagnosis {
            require_text("Diagnosis", diagnosis)?;
        }
        update.status = normalise_enum::<PrescriptionStatus>(update.status)?;

        let mut prescription = self.find_prescription(id).await?;
        if prescription.is_dispensed {
            return Err(AppError::BusinessLogic(
                "Dispensed prescriptions cannot be edited".to_string(),
            ));
        }
        prescription.apply(update);
        check_not_before("Valid until", prescription.valid_until, prescription.prescription_date)?;
        check_not_before("Follow-up date", prescription.follow_up_date, prescription.prescription_date)?;

        self.repo.update_prescription(&prescription).await?;
        self.record(
            AuditEntry::new(AuditAction::Update, "prescription", Some(id), "Prescription updated"),
            actor,
        )
        .await;
        self.get_prescription(id).await
    }

    pub async fn delete_prescription(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        let prescription = self.find_prescription(id).await?;
        if prescription.is_dispensed {
            return Err(AppError::BusinessLogic(
                "Dispensed prescriptions are kept for the pharmacy record".to_string(),
            ));
        }
        if !self.repo.delete_prescription(id).await? {
            return Err(AppError::NotFound("Prescription not found".to_string()));
        }
        self.record(
            AuditEntry::new(AuditAction::Delete, "prescription", Some(id), "Prescription deleted"),
            actor,
        )
        .await;
        Ok(())
    }

    pub async fn mark_dispensed(
        &self,
        id: Uuid,
        request: DispenseRequest,
        dispenser: &User,
    ) -> AppResult<PrescriptionDetail> {
        let prescription = self
            .repo
            .mark_dispensed(
                id,
                &dispenser.display_name(),
                request.pharmacy_notes,
                utc_now().date(),
            )
            .await?;
        info!("Prescription {} dispensed", prescription.prescription_number);
        self.record(
            AuditEntry::new(
                AuditAction::Dispense,
                "prescription",
                Some(id),
                "Prescription dispensed",
            ),
            dispenser.id,
        )
        .await;
        self.get_prescription(id).await
    }

    // Medical records

    pub async fn create_record(
        &self,
        input: CreateMedicalRecord,
        actor: Uuid,
    ) -> AppResult<MedicalRecord> {
        let record_type = match input.record_type.as_deref() {
            Some(t) => parse_enum::<RecordType>(t)?,
            None => RecordType::General,
        };
        check_vitals(&input.vitals)?;
        self.check_parties(input.patient_id, input.doctor_id, input.appointment_id)
            .await?;

        let record = MedicalRecord::new(input, record_type, utc_now().date());
        check_not_before("Discharge date", record.discharge_date, record.visit_date)?;
        check_not_before("Follow-up date", record.follow_up_date, record.visit_date)?;

        let record = self.repo.insert_record(&record).await?;
        info!("Created medical record {} ({})", record.record_number, record.record_type);
        self.record(
            AuditEntry::new(AuditAction::Create, "medical_record", Some(record.id), "Medical record created"),
            actor,
        )
        .await;
        Ok(record)
    }

    pub async fn get_record(&self, id: Uuid, viewer: UserRole) -> AppResult<MedicalRecord> {
        let record = self
            .repo
            .find_record(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Medical record not found".to_string()))?;
        check_readable(&record, viewer)?;
        Ok(record)
    }

    pub async fn list_records(
        &self,
        mut filter: MedicalRecordFilter,
        viewer: UserRole,
        page: Page,
    ) -> AppResult<Vec<MedicalRecord>> {
        filter.record_type = normalise_enum::<RecordType>(filter.record_type)?;
        filter.status = normalise_enum::<RecordStatus>(filter.status)?;
        filter.include_confidential = can_read_confidential(viewer);
        Ok(self.repo.list_records(&filter, page).await?)
    }

    pub async fn update_record(
        &self,
        id: Uuid,
        mut update: UpdateMedicalRecord,
        viewer: UserRole,
        actor: Uuid,
    ) -> AppResult<MedicalRecord> {
        check_vitals(&update.vitals)?;
        update.status = normalise_enum::<RecordStatus>(update.status)?;
        if update.is_confidential.is_some() && !can_read_confidential(viewer) {
            return Err(AppError::Forbidden(
                "Only doctors can change record confidentiality".to_string(),
            ));
        }

        let mut record = self.get_record(id, viewer).await?;
        record.apply(update);
        check_not_before("Discharge date", record.discharge_date, record.visit_date)?;
        check_not_before("Follow-up date", record.follow_up_date, record.visit_date)?;

        let record = self.repo.update_record(&record).await?;
        self.record(
            AuditEntry::new(AuditAction::Update, "medical_record", Some(id), "Medical record updated"),
            actor,
        )
        .await;
        Ok(record)
    }

    pub async fn delete_record(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if !self.repo.delete_record(id).await? {
            return Err(AppError::NotFound("Medical record not found".to_string()));
        }
        self.record(
            AuditEntry::new(AuditAction::Delete, "medical_record", Some(id), "Medical record deleted"),
            actor,
        )
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(quantity: i32) -> CreatePrescriptionItem {
        CreatePrescriptionItem {
            medicine_id: Uuid::new_v4(),
            dosage: "500mg".into(),
            frequency: "Twice daily".into(),
            duration: "5 days".into(),
            quantity,
            instructions: None,
        }
    }

    #[test]
    fn test_prescription_items_are_checked() {
        assert!(check_items(&[item(10)]).is_ok());
        assert!(matches!(check_items(&[]), Err(AppError::Validation(_))));
        assert!(check_items(&[item(0)]).is_err());

        let mut blank = item(1);
        blank.frequency = "  ".into();
        assert!(check_items(&[blank]).is_err());

        let twice = item(2);
        assert!(check_items(&[twice.clone(), twice]).is_err());
    }

    #[test]
    fn test_vitals_bounds() {
        assert!(check_vitals(&Vitals::default()).is_ok());
        assert!(check_vitals(&Vitals {
            temperature: Some(Decimal::new(986, 1)),
            blood_pressure: Some("120/80".into()),
            pulse_rate: Some(72),
            respiratory_rate: Some(16),
            oxygen_saturation: Some(Decimal::new(98, 0)),
        })
        .is_ok());
        assert!(check_vitals(&Vitals {
            oxygen_saturation: Some(Decimal::new(101, 0)),
            ..Default::default()
        })
        .is_err());
        assert!(check_vitals(&Vitals {
            temperature: Some(Decimal::new(1000, 0)),
            ..Default::default()
        })
        .is_err());
        assert!(check_vitals(&Vitals {
            pulse_rate: Some(0),
            ..Default::default()
        })
        .is_err());
        assert!(check_vitals(&Vitals {
            blood_pressure: Some("high".into()),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_dates_not_before_start() {
        let start = NaiveDate::from_ymd_opt(2030, 1, 10).unwrap();
        assert!(check_not_before("Valid until", None, start).is_ok());
        assert!(check_not_before("Valid until", Some(start), start).is_ok());
        assert!(check_not_before("Valid until", start.pred_opt(), start).is_err());
    }
}
