use super::{filter_text, Page};
use crate::error::RepositoryError;
use crate::models::{Patient, PatientStatus};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientFilter {
    pub status: Option<String>,
    /// Matches name, phone or patient number
    pub search: Option<String>,
}

/// Repository for patient records
pub struct PatientRepository {
    pool: PgPool,
}

impl PatientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, patient: &Patient) -> Result<Patient, RepositoryError> {
        let created = sqlx::query_as::<_, Patient>(
            r#"
            INSERT INTO patients (
                id, patient_number, first_name, middle_name, last_name, date_of_birth, gender,
                email, phone, address, city, state, country, pincode,
                emergency_contact_name, emergency_contact_phone, emergency_contact_relation,
                blood_group, height_cm, weight_kg, bmi, allergies, chronic_diseases,
                current_medications, primary_doctor_id, current_bed_id, is_admitted,
                admission_date, has_insurance, insurance_provider, insurance_policy_number,
                national_id, status, notes, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
                $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34,
                $35, $36
            )
            RETURNING *
            "#,
        )
        .bind(patient.id)
        .bind(&patient.patient_number)
        .bind(&patient.first_name)
        .bind(&patient.middle_name)
        .bind(&patient.last_name)
        .bind(patient.date_of_birth)
        .bind(&patient.gender)
        .bind(&patient.email)
        .bind(&patient.phone)
        .bind(&patient.address)
        .bind(&patient.city)
        .bind(&patient.state)
        .bind(&patient.country)
        .bind(&patient.pincode)
        .bind(&patient.emergency_contact_name)
        .bind(&patient.emergency_contact_phone)
        .bind(&patient.emergency_contact_relation)
        .bind(&patient.blood_group)
        .bind(patient.height_cm)
        .bind(patient.weight_kg)
        .bind(patient.bmi)
        .bind(&patient.allergies)
        .bind(&patient.chronic_diseases)
        .bind(&patient.current_medications)
        .bind(patient.primary_doctor_id)
        .bind(patient.current_bed_id)
        .bind(patient.is_admitted)
        .bind(patient.admission_date)
        .bind(patient.has_insurance)
        .bind(&patient.insurance_provider)
        .bind(&patient.insurance_policy_number)
        .bind(&patient.national_id)
        .bind(&patient.status)
        .bind(&patient.notes)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, RepositoryError> {
        let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(patient)
    }

    pub async fn list(
        &self,
        filter: &PatientFilter,
        page: Page,
    ) -> Result<Vec<Patient>, RepositoryError> {
        let patients = sqlx::query_as::<_, Patient>(
            r#"
            SELECT * FROM patients
            WHERE ($1::text IS NULL OR status = $1)
              AND (
                $2::text IS NULL
                OR first_name ILIKE '%' || $2 || '%'
                OR last_name ILIKE '%' || $2 || '%'
                OR phone ILIKE '%' || $2 || '%'
                OR patient_number ILIKE '%' || $2 || '%'
              )
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(filter_text(&filter.status))
        .bind(filter_text(&filter.search))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(patients)
    }

    /// Lock a patient row, returning the bed they currently hold
    async fn lock_bed(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Option<Uuid>>, RepositoryError> {
        let bed = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT current_bed_id FROM patients WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(bed)
    }

    /// Write every editable column back; admission columns are owned by bed assignment.
    ///
    /// A patient who holds a bed must stay active until the bed is released.
    pub async fn update(&self, patient: &Patient) -> Result<Patient, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current_bed = Self::lock_bed(&mut tx, patient.id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Patient not found".to_string()))?;
        if current_bed.is_some() && patient.status_enum() != PatientStatus::Active {
            return Err(RepositoryError::BusinessRule(format!(
                "Patient still occupies a bed; release it before changing status to {}",
                patient.status
            )));
        }

        let updated = sqlx::query_as::<_, Patient>(
            r#"
            UPDATE patients SET
                first_name = $2, middle_name = $3, last_name = $4, date_of_birth = $5,
                gender = $6, email = $7, phone = $8, address = $9, city = $10, state = $11,
                country = $12, pincode = $13, emergency_contact_name = $14,
                emergency_contact_phone = $15, emergency_contact_relation = $16,
                blood_group = $17, height_cm = $18, weight_kg = $19, bmi = $20,
                allergies = $21, chronic_diseases = $22, current_medications = $23,
                primary_doctor_id = $24, has_insurance = $25, insurance_provider = $26,
                insurance_policy_number = $27, national_id = $28, status = $29, notes = $30,
                updated_at = $31
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(patient.id)
        .bind(&patient.first_name)
        .bind(&patient.middle_name)
        .bind(&patient.last_name)
        .bind(patient.date_of_birth)
        .bind(&patient.gender)
        .bind(&patient.email)
        .bind(&patient.phone)
        .bind(&patient.address)
        .bind(&patient.city)
        .bind(&patient.state)
        .bind(&patient.country)
        .bind(&patient.pincode)
        .bind(&patient.emergency_contact_name)
        .bind(&patient.emergency_contact_phone)
        .bind(&patient.emergency_contact_relation)
        .bind(&patient.blood_group)
        .bind(patient.height_cm)
        .bind(patient.weight_kg)
        .bind(patient.bmi)
        .bind(&patient.allergies)
        .bind(&patient.chronic_diseases)
        .bind(&patient.current_medications)
        .bind(patient.primary_doctor_id)
        .bind(patient.has_insurance)
        .bind(&patient.insurance_provider)
        .bind(&patient.insurance_policy_number)
        .bind(&patient.national_id)
        .bind(&patient.status)
        .bind(&patient.notes)
        .bind(patient.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Discharge a patient who no longer occupies a bed
    pub async fn discharge(&self, id: Uuid) -> Result<Patient, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Patient not found".to_string()))?;

        if patient.current_bed_id.is_some() {
            return Err(RepositoryError::BusinessRule(
                "Patient still occupies a bed; release it before discharge".to_string(),
            ));
        }

        let discharged = sqlx::query_as::<_, Patient>(
            r#"
            UPDATE patients
            SET status = 'discharged', is_admitted = FALSE,
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(discharged)
    }

    /// Delete a patient who does not hold a bed. Returns false when no such patient exists.
    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        match Self::lock_bed(&mut tx, id).await? {
            None => return Ok(false),
            Some(Some(_)) => {
                return Err(RepositoryError::BusinessRule(
                    "Patient still occupies a bed; release it before deleting the record"
                        .to_string(),
                ))
            }
            Some(None) => {}
        }

        sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(true)
    }
}
