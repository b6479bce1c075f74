use super::{normalise_enum, parse_enum, AuditService};
use crate::error::{AppError, AppResult};
use crate::models::{
    utc_now, AuditAction, AuditEntry, BloodGroup, CreatePatient, Gender, Patient, PatientResponse,
    PatientStatus, UpdatePatient,
};
use crate::repositories::{Page, PatientFilter, PatientRepository};
use crate::validation::{
    fits_numeric, positive, require_text, validate_date_of_birth, validate_email, validate_phone,
    MEASURE_DIGITS,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

fn check_measurements(height_cm: Option<Decimal>, weight_kg: Option<Decimal>) -> AppResult<()> {
    if let Some(height) = height_cm {
        positive("Height", height)?;
        fits_numeric("Height", height, MEASURE_DIGITS)?;
    }
    if let Some(weight) = weight_kg {
        positive("Weight", weight)?;
        fits_numeric("Weight", weight, MEASURE_DIGITS)?;
    }
    Ok(())
}

fn check_contact(email: Option<&str>, phone: Option<&str>) -> AppResult<()> {
    if let Some(email) = email {
        validate_email(email)?;
    }
    if let Some(phone) = phone {
        validate_phone(phone)?;
    }
    Ok(())
}

/// Patient registration and records
pub struct PatientService {
    repo: Arc<PatientRepository>,
    audit: Arc<AuditService>,
}

impl PatientService {
    pub fn new(repo: Arc<PatientRepository>, audit: Arc<AuditService>) -> Self {
        Self { repo, audit }
    }

    async fn load(&self, id: Uuid) -> AppResult<Patient> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))
    }

    pub async fn create(&self, input: CreatePatient, actor: Uuid) -> AppResult<PatientResponse> {
        let today = utc_now().date();
        require_text("First name", &input.first_name)?;
        require_text("Last name", &input.last_name)?;
        validate_date_of_birth(input.date_of_birth, today)?;
        check_contact(input.email.as_deref(), Some(&input.phone))?;
        validate_phone(&input.emergency_contact_phone)?;
        check_measurements(input.height_cm, input.weight_kg)?;

        let gender: Gender = parse_enum(&input.gender)?;
        let blood_group = input
            .blood_group
            .as_deref()
            .map(parse_enum::<BloodGroup>)
            .transpose()?;

        let patient = self.repo.insert(&Patient::new(input, gender, blood_group)).await?;
        info!("Registered patient {} ({})", patient.patient_number, patient.id);

        self.audit
            .record(
                AuditEntry::new(AuditAction::Create, "patient", Some(patient.id), "Patient registered")
                    .by(actor)
                    .with_details(serde_json::json!({ "patient_number": patient.patient_number })),
            )
            .await;

        Ok(patient.into_response(today))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PatientResponse> {
        Ok(self.load(id).await?.into_response(utc_now().date()))
    }

    pub async fn list(&self, filter: &PatientFilter, page: Page) -> AppResult<Vec<PatientResponse>> {
        let today = utc_now().date();
        let patients = self.repo.list(filter, page).await?;
        Ok(patients.into_iter().map(|p| p.into_response(today)).collect())
    }

    pub async fn update(
        &self,
        id: Uuid,
        mut update: UpdatePatient,
        actor: Uuid,
    ) -> AppResult<PatientResponse> {
        let today = utc_now().date();
        if let Some(dob) = update.date_of_birth {
            validate_date_of_birth(dob, today)?;
        }
        for (field, value) in [("First name", &update.first_name), ("Last name", &update.last_name)] {
            if let Some(value) = value {
                require_text(field, value)?;
            }
        }
        check_contact(update.email.as_deref(), update.phone.as_deref())?;
        check_measurements(update.height_cm, update.weight_kg)?;

        update.gender = normalise_enum::<Gender>(update.gender.take())?;
        update.blood_group = normalise_enum::<BloodGroup>(update.blood_group.take())?;
        update.status = normalise_enum::<PatientStatus>(update.status.take())?;

        let mut patient = self.load(id).await?;
        patient.apply(update);
        let patient = self.repo.update(&patient).await?;

        self.audit
            .record(AuditEntry::new(AuditAction::Update, "patient", Some(id), "Patient updated").by(actor))
            .await;

        Ok(patient.into_response(today))
    }

    pub async fn delete(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if !self.repo.delete(id).await? {
            return Err(AppError::NotFound("Patient not found".to_string()));
        }
        info!("Deleted patient {}", id);
        self.audit
            .record(AuditEntry::new(AuditAction::Delete, "patient", Some(id), "Patient deleted").by(actor))
            .await;
        Ok(())
    }

    pub async fn discharge(&self, id: Uuid, actor: Uuid) -> AppResult<PatientResponse> {
        let patient = self.repo.discharge(id).await?;
        info!("Discharged patient {}", patient.patient_number);

        self.audit
            .record(
                AuditEntry::new(AuditAction::Update, "patient", Some(id), "Patient discharged").by(actor),
            )
            .await;

        Ok(patient.into_response(utc_now().date()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurements_must_be_positive() {
        assert!(check_measurements(Some(Decimal::new(170, 0)), None).is_ok());
        assert!(matches!(
            check_measurements(None, Some(Decimal::ZERO)),
            Err(AppError::Validation(msg)) if msg == "Weight must be positive"
        ));
        assert!(matches!(
            check_measurements(Some(Decimal::new(1000, 0)), None),
            Err(AppError::Validation(msg)) if msg == "Height must be less than 1000"
        ));
    }

    #[test]
    fn test_contact_checks_only_present_fields() {
        assert!(check_contact(None, None).is_ok());
        assert!(check_contact(Some("not-an-email"), None).is_err());
        assert!(check_contact(None, Some("+1 555 010 9999")).is_ok());
    }
}
