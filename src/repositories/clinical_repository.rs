use super::{filter_text, Page};
use crate::error::RepositoryError;
use crate::models::{
    utc_now, MedicalRecord, MedicalRecordFilter, Prescription, PrescriptionFilter,
    PrescriptionItem, PrescriptionStatus,
};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for prescriptions and medical records
pub struct ClinicalRepository {
    pool: PgPool,
}

impl ClinicalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a prescription together with its medicine lines
    pub async fn create_prescription(
        &self,
        prescription: &Prescription,
        items: &[PrescriptionItem],
    ) -> Result<Prescription, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Prescription>(
            r#"
            INSERT INTO prescriptions (
                id, prescription_number, prescription_date, patient_id, doctor_id, appointment_id,
                diagnosis, symptoms, prescription_type, temperature, blood_pressure, pulse_rate,
                respiratory_rate, general_instructions, dietary_advice, precautions,
                follow_up_required, follow_up_date, follow_up_notes, lab_tests_recommended,
                status, valid_until, is_dispensed, dispensed_by, dispensed_at, doctor_notes,
                pharmacy_notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29)
            RETURNING *
            "#,
        )
        .bind(prescription.id)
        .bind(&prescription.prescription_number)
        .bind(prescription.prescription_date)
        .bind(prescription.patient_id)
        .bind(prescription.doctor_id)
        .bind(prescription.appointment_id)
        .bind(&prescription.diagnosis)
        .bind(&prescription.symptoms)
        .bind(&prescription.prescription_type)
        .bind(&prescription.temperature)
        .bind(&prescription.blood_pressure)
        .bind(&prescription.pulse_rate)
        .bind(&prescription.respiratory_rate)
        .bind(&prescription.general_instructions)
        .bind(&prescription.dietary_advice)
        .bind(&prescription.precautions)
        .bind(prescription.follow_up_required)
        .bind(prescription.follow_up_date)
        .bind(&prescription.follow_up_notes)
        .bind(&prescription.lab_tests_recommended)
        .bind(&prescription.status)
        .bind(prescription.valid_until)
        .bind(prescription.is_dispensed)
        .bind(&prescription.dispensed_by)
        .bind(prescription.dispensed_at)
        .bind(&prescription.doctor_notes)
        .bind(&prescription.pharmacy_notes)
        .bind(prescription.created_at)
        .bind(prescription.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO prescription_items (
                    id, prescription_id, medicine_id, dosage, frequency, duration, quantity,
                    instructions
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(created.id)
            .bind(item.medicine_id)
            .bind(&item.dosage)
            .bind(&item.frequency)
            .bind(&item.duration)
            .bind(item.quantity)
            .bind(&item.instructions)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    pub async fn find_prescription(&self, id: Uuid) -> Result<Option<Prescription>, RepositoryError> {
        let prescription =
            sqlx::query_as::<_, Prescription>("SELECT * FROM prescriptions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(prescription)
    }

    pub async fn prescription_items(
        &self,
        prescription_id: Uuid,
    ) -> Result<Vec<PrescriptionItem>, RepositoryError> {
        let items = sqlx::query_as::<_, PrescriptionItem>(
            "SELECT * FROM prescription_items WHERE prescription_id = $1 ORDER BY dosage, id",
        )
        .bind(prescription_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn list_prescriptions(
        &self,
        filter: &PrescriptionFilter,
        page: Page,
    ) -> Result<Vec<Prescription>, RepositoryError> {
        let prescriptions = sqlx::query_as::<_, Prescription>(
            r#"
            SELECT * FROM prescriptions
            WHERE ($1::uuid IS NULL OR patient_id = $1)
              AND ($2::uuid IS NULL OR doctor_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::boolean IS NULL OR is_dispensed = $4)
            ORDER BY prescription_date DESC, created_at DESC
            OFFSET $5 LIMIT $6
            "#,
        )
        .bind(filter.patient_id)
        .bind(filter.doctor_id)
        .bind(filter_text(&filter.status))
        .bind(filter.is_dispensed)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(prescriptions)
    }

    pub async fn update_prescription(
        &self,
        prescription: &Prescription,
    ) -> Result<Prescription, RepositoryError> {
        let updated = sqlx::query_as::<_, Prescription>(
            r#"
            UPDATE prescriptions SET
                diagnosis = $2, symptoms = $3, general_instructions = $4, dietary_advice = $5,
                precautions = $6, follow_up_required = $7, follow_up_date = $8,
                follow_up_notes = $9, lab_tests_recommended = $10, status = $11,
                valid_until = $12, doctor_notes = $13, pharmacy_notes = $14, updated_at = $15
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(prescription.id)
        .bind(&prescription.diagnosis)
        .bind(&prescription.symptoms)
        .bind(&prescription.general_instructions)
        .bind(&prescription.dietary_advice)
        .bind(&prescription.precautions)
        .bind(prescription.follow_up_required)
        .bind(prescription.follow_up_date)
        .bind(&prescription.follow_up_notes)
        .bind(&prescription.lab_tests_recommended)
        .bind(&prescription.status)
        .bind(prescription.valid_until)
        .bind(&prescription.doctor_notes)
        .bind(&prescription.pharmacy_notes)
        .bind(prescription.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Prescription not found".to_string()))?;

        Ok(updated)
    }

    pub async fn delete_prescription(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query("DELETE FROM prescriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    /// Record that the pharmacy handed out an open, unexpired prescription
    pub async fn mark_dispensed(
        &self,
        id: Uuid,
        dispensed_by: &str,
        pharmacy_notes: Option<String>,
        today: NaiveDate,
    ) -> Result<Prescription, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let prescription =
            sqlx::query_as::<_, Prescription>("SELECT * FROM prescriptions WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| RepositoryError::NotFound("Prescription not found".to_string()))?;

        if prescription.is_dispensed {
            return Err(RepositoryError::BusinessRule(
                "Prescription has already been dispensed".to_string(),
            ));
        }
        if !prescription.status_enum().is_open() {
            return Err(RepositoryError::BusinessRule(format!(
                "Cannot dispense a {} prescription",
                prescription.status
            )));
        }
        if prescription.is_expired(today) {
            return Err(RepositoryError::BusinessRule(
                "Prescription is past its validity date".to_string(),
            ));
        }

        let now = utc_now();
        let dispensed = sqlx::query_as::<_, Prescription>(
            r#"
            UPDATE prescriptions SET
                is_dispensed = TRUE, dispensed_by = $2, dispensed_at = $3, status = $4,
                pharmacy_notes = COALESCE($5, pharmacy_notes), updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(dispensed_by)
        .bind(now)
        .bind(PrescriptionStatus::Completed.as_str())
        .bind(pharmacy_notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(dispensed)
    }

    // Medical records

    pub async fn insert_record(&self, record: &MedicalRecord) -> Result<MedicalRecord, RepositoryError> {
        let created = sqlx::query_as::<_, MedicalRecord>(
            r#"
            INSERT INTO medical_records (
                id, record_number, patient_id, doctor_id, appointment_id, record_type, visit_date,
                visit_time, chief_complaint, temperature, blood_pressure, pulse_rate,
                respiratory_rate, oxygen_saturation, history_of_present_illness,
                past_medical_history, family_history, social_history, physical_examination,
                assessment, diagnosis_notes, treatment_plan, medications_prescribed,
                lab_tests_ordered, procedures_performed, follow_up_required, follow_up_date,
                follow_up_instructions, discharge_summary, discharge_date, allergies, alerts,
                notes, doctor_notes, nurse_notes, status, is_confidential, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32,
                    $33, $34, $35, $36, $37, $38, $39)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(&record.record_number)
        .bind(record.patient_id)
        .bind(record.doctor_id)
        .bind(record.appointment_id)
        .bind(&record.record_type)
        .bind(record.visit_date)
        .bind(record.visit_time)
        .bind(&record.chief_complaint)
        .bind(record.temperature)
        .bind(&record.blood_pressure)
        .bind(record.pulse_rate)
        .bind(record.respiratory_rate)
        .bind(record.oxygen_saturation)
        .bind(&record.history_of_present_illness)
        .bind(&record.past_medical_history)
        .bind(&record.family_history)
        .bind(&record.social_history)
        .bind(&record.physical_examination)
        .bind(&record.assessment)
        .bind(&record.diagnosis_notes)
        .bind(&record.treatment_plan)
        .bind(&record.medications_prescribed)
        .bind(&record.lab_tests_ordered)
        .bind(&record.procedures_performed)
        .bind(record.follow_up_required)
        .bind(record.follow_up_date)
        .bind(&record.follow_up_instructions)
        .bind(&record.discharge_summary)
        .bind(record.discharge_date)
        .bind(&record.allergies)
        .bind(&record.alerts)
        .bind(&record.notes)
        .bind(&record.doctor_notes)
        .bind(&record.nurse_notes)
        .bind(&record.status)
        .bind(record.is_confidential)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_record(&self, id: Uuid) -> Result<Option<MedicalRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, MedicalRecord>("SELECT * FROM medical_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    pub async fn list_records(
        &self,
        filter: &MedicalRecordFilter,
        page: Page,
    ) -> Result<Vec<MedicalRecord>, RepositoryError> {
        let records = sqlx::query_as::<_, MedicalRecord>(
            r#"
            SELECT * FROM medical_records
            WHERE ($1::uuid IS NULL OR patient_id = $1)
              AND ($2::uuid IS NULL OR doctor_id = $2)
              AND ($3::text IS NULL OR record_type = $3)
              AND ($4::text IS NULL OR status = $4)
              AND ($5::date IS NULL OR visit_date >= $5)
              AND ($6::date IS NULL OR visit_date <= $6)
              AND ($7 OR is_confidential = FALSE)
            ORDER BY visit_date DESC, created_at DESC
            OFFSET $8 LIMIT $9
            "#,
        )
        .bind(filter.patient_id)
        .bind(filter.doctor_id)
        .bind(filter_text(&filter.record_type))
        .bind(filter_text(&filter.status))
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.include_confidential)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn update_record(&self, record: &MedicalRecord) -> Result<MedicalRecord, RepositoryError> {
        let updated = sqlx::query_as::<_, MedicalRecord>(
            r#"
            UPDATE medical_records SET
                chief_complaint = $2, temperature = $3, blood_pressure = $4, pulse_rate = $5,
                respiratory_rate = $6, oxygen_saturation = $7, history_of_present_illness = $8,
                physical_examination = $9, assessment = $10, diagnosis_notes = $11,
                treatment_plan = $12, medications_prescribed = $13, lab_tests_ordered = $14,
                procedures_performed = $15, follow_up_required = $16, follow_up_date = $17,
                follow_up_instructions = $18, discharge_summary = $19, discharge_date = $20,
                allergies = $21, alerts = $22, notes = $23, doctor_notes = $24,
                nurse_notes = $25, status = $26, is_confidential = $27, updated_at = $28
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(&record.chief_complaint)
        .bind(record.temperature)
        .bind(&record.blood_pressure)
        .bind(record.pulse_rate)
        .bind(record.respiratory_rate)
        .bind(record.oxygen_saturation)
        .bind(&record.history_of_present_illness)
        .bind(&record.physical_examination)
        .bind(&record.assessment)
        .bind(&record.diagnosis_notes)
        .bind(&record.treatment_plan)
        .bind(&record.medications_prescribed)
        .bind(&record.lab_tests_ordered)
        .bind(&record.procedures_performed)
        .bind(record.follow_up_required)
        .bind(record.follow_up_date)
        .bind(&record.follow_up_instructions)
        .bind(&record.discharge_summary)
        .bind(record.discharge_date)
        .bind(&record.allergies)
        .bind(&record.alerts)
        .bind(&record.notes)
        .bind(&record.doctor_notes)
        .bind(&record.nurse_notes)
        .bind(&record.status)
        .bind(record.is_confidential)
        .bind(record.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Medical record not found".to_string()))?;

        Ok(updated)
    }

    pub async fn delete_record(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query("DELETE FROM medical_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}
