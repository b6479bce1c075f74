use super::{filter_text, Page};
use crate::error::RepositoryError;
use crate::models::{Bed, BedFilter, BedStatus, Floor, Patient, PatientStatus, Ward};
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for floors, wards and beds
///
/// Ward bed counters are maintained here, inside the same transaction as the
/// bed change that moves them.
pub struct FacilityRepository {
    pool: PgPool,
}

impl FacilityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ----- floors -----

    pub async fn insert_floor(&self, floor: &Floor) -> Result<Floor, RepositoryError> {
        let created = sqlx::query_as::<_, Floor>(
            r#"
            INSERT INTO floors (id, floor_number, floor_name, floor_type, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(floor.id)
        .bind(floor.floor_number)
        .bind(&floor.floor_name)
        .bind(&floor.floor_type)
        .bind(&floor.description)
        .bind(floor.created_at)
        .bind(floor.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_floor(&self, id: Uuid) -> Result<Option<Floor>, RepositoryError> {
        let floor = sqlx::query_as::<_, Floor>("SELECT * FROM floors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(floor)
    }

    pub async fn list_floors(&self, page: Page) -> Result<Vec<Floor>, RepositoryError> {
        let floors = sqlx::query_as::<_, Floor>(
            "SELECT * FROM floors ORDER BY floor_number OFFSET $1 LIMIT $2",
        )
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(floors)
    }

    pub async fn update_floor(&self, floor: &Floor) -> Result<Floor, RepositoryError> {
        let updated = sqlx::query_as::<_, Floor>(
            r#"
            UPDATE floors
            SET floor_name = $2, floor_type = $3, description = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(floor.id)
        .bind(&floor.floor_name)
        .bind(&floor.floor_type)
        .bind(&floor.description)
        .bind(floor.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Floor not found".to_string()))?;

        Ok(updated)
    }

    pub async fn delete_floor(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query("DELETE FROM floors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    // ----- wards -----

    pub async fn insert_ward(&self, ward: &Ward) -> Result<Ward, RepositoryError> {
        let created = sqlx::query_as::<_, Ward>(
            r#"
            INSERT INTO wards (
                id, ward_name, ward_code, ward_type, floor_id, department_id, total_beds,
                occupied_beds, reserved_beds, status, description, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(ward.id)
        .bind(&ward.ward_name)
        .bind(&ward.ward_code)
        .bind(&ward.ward_type)
        .bind(ward.floor_id)
        .bind(ward.department_id)
        .bind(ward.total_beds)
        .bind(ward.occupied_beds)
        .bind(ward.reserved_beds)
        .bind(&ward.status)
        .bind(&ward.description)
        .bind(ward.created_at)
        .bind(ward.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_ward(&self, id: Uuid) -> Result<Option<Ward>, RepositoryError> {
        let ward = sqlx::query_as::<_, Ward>("SELECT * FROM wards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ward)
    }

    pub async fn list_wards(
        &self,
        floor_id: Option<Uuid>,
        ward_type: Option<String>,
        page: Page,
    ) -> Result<Vec<Ward>, RepositoryError> {
        let wards = sqlx::query_as::<_, Ward>(
            r#"
            SELECT * FROM wards
            WHERE ($1::uuid IS NULL OR floor_id = $1)
              AND ($2::text IS NULL OR ward_type = $2)
            ORDER BY ward_code
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(floor_id)
        .bind(filter_text(&ward_type))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(wards)
    }

    /// Bed counters are left alone; only descriptive fields and reservations change
    pub async fn update_ward(&self, ward: &Ward) -> Result<Ward, RepositoryError> {
        let updated = sqlx::query_as::<_, Ward>(
            r#"
            UPDATE wards SET
                ward_name = $2, ward_type = $3, floor_id = $4, department_id = $5,
                reserved_beds = $6, status = $7, description = $8, updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ward.id)
        .bind(&ward.ward_name)
        .bind(&ward.ward_type)
        .bind(ward.floor_id)
        .bind(ward.department_id)
        .bind(ward.reserved_beds)
        .bind(&ward.status)
        .bind(&ward.description)
        .bind(ward.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Ward not found".to_string()))?;

        Ok(updated)
    }

    pub async fn delete_ward(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let occupied: Option<i32> =
            sqlx::query_scalar("SELECT occupied_beds FROM wards WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        match occupied {
            None => return Ok(false),
            Some(n) if n > 0 => {
                return Err(RepositoryError::BusinessRule(
                    "Cannot delete a ward with occupied beds".to_string(),
                ))
            }
            Some(_) => {}
        }

        sqlx::query("DELETE FROM wards WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    // ----- beds -----

    /// Insert a bed and grow its ward's capacity
    pub async fn insert_bed(&self, bed: &Bed) -> Result<Bed, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let ward_exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM wards WHERE id = $1 FOR UPDATE")
                .bind(bed.ward_id)
                .fetch_optional(&mut *tx)
                .await?;
        if ward_exists.is_none() {
            return Err(RepositoryError::NotFound("Ward not found".to_string()));
        }

        let created = sqlx::query_as::<_, Bed>(
            r#"
            INSERT INTO beds (
                id, bed_number, ward_id, bed_type, status, is_available, current_patient_id,
                assigned_at, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(bed.id)
        .bind(&bed.bed_number)
        .bind(bed.ward_id)
        .bind(&bed.bed_type)
        .bind(&bed.status)
        .bind(bed.is_available)
        .bind(bed.current_patient_id)
        .bind(bed.assigned_at)
        .bind(&bed.notes)
        .bind(bed.created_at)
        .bind(bed.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE wards
            SET total_beds = total_beds + 1, updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            "#,
        )
        .bind(bed.ward_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    pub async fn find_bed(&self, id: Uuid) -> Result<Option<Bed>, RepositoryError> {
        let bed = sqlx::query_as::<_, Bed>("SELECT * FROM beds WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(bed)
    }

    pub async fn list_beds(&self, filter: &BedFilter, page: Page) -> Result<Vec<Bed>, RepositoryError> {
        let beds = sqlx::query_as::<_, Bed>(
            r#"
            SELECT * FROM beds
            WHERE ($1::uuid IS NULL OR ward_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY bed_number
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(filter.ward_id)
        .bind(filter_text(&filter.status))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(beds)
    }

    /// Delete an unoccupied bed and shrink its ward's capacity
    pub async fn delete_bed(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(bed) = sqlx::query_as::<_, Bed>("SELECT * FROM beds WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(false);
        };

        if bed.is_occupied() {
            return Err(RepositoryError::BusinessRule(
                "Cannot delete an occupied bed".to_string(),
            ));
        }

        sqlx::query("DELETE FROM beds WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE wards
            SET total_beds = GREATEST(total_beds - 1, occupied_beds),
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            "#,
        )
        .bind(bed.ward_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Put a patient into a bed
    pub async fn assign_bed(&self, bed_id: Uuid, patient_id: Uuid) -> Result<Bed, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let bed = sqlx::query_as::<_, Bed>("SELECT * FROM beds WHERE id = $1 FOR UPDATE")
            .bind(bed_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Bed not found".to_string()))?;

        if bed.status_enum() != BedStatus::Available || bed.current_patient_id.is_some() {
            return Err(RepositoryError::BusinessRule(format!(
                "Bed {} is not available (status: {})",
                bed.bed_number, bed.status
            )));
        }

        let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1 FOR UPDATE")
            .bind(patient_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Patient not found".to_string()))?;

        if patient.status_enum() != PatientStatus::Active {
            return Err(RepositoryError::BusinessRule(
                "Only active patients can be assigned a bed".to_string(),
            ));
        }
        if patient.current_bed_id.is_some() {
            return Err(RepositoryError::BusinessRule(
                "Patient is already assigned to a bed".to_string(),
            ));
        }

        let assigned = sqlx::query_as::<_, Bed>(
            r#"
            UPDATE beds
            SET status = $2, is_available = FALSE, current_patient_id = $3,
                assigned_at = (NOW() AT TIME ZONE 'utc'),
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(bed_id)
        .bind(BedStatus::Occupied.as_str())
        .bind(patient_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE patients
            SET current_bed_id = $2, is_admitted = TRUE,
                admission_date = (NOW() AT TIME ZONE 'utc'),
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            "#,
        )
        .bind(patient_id)
        .bind(bed_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE wards
            SET occupied_beds = occupied_beds + 1, updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            "#,
        )
        .bind(bed.ward_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(assigned)
    }

    /// Free an occupied bed and return it to service
    pub async fn release_bed(&self, bed_id: Uuid) -> Result<Bed, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let bed = sqlx::query_as::<_, Bed>("SELECT * FROM beds WHERE id = $1 FOR UPDATE")
            .bind(bed_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Bed not found".to_string()))?;

        if !bed.is_occupied() {
            return Err(RepositoryError::BusinessRule(format!(
                "Bed {} is not occupied",
                bed.bed_number
            )));
        }

        let released = sqlx::query_as::<_, Bed>(
            r#"
            UPDATE beds
            SET status = $2, is_available = TRUE, current_patient_id = NULL,
                assigned_at = NULL, updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(bed_id)
        .bind(BedStatus::Available.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if let Some(patient_id) = bed.current_patient_id {
            sqlx::query(
                r#"
                UPDATE patients
                SET current_bed_id = NULL, is_admitted = FALSE,
                    updated_at = (NOW() AT TIME ZONE 'utc')
                WHERE id = $1
                "#,
            )
            .bind(patient_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE wards
            SET occupied_beds = GREATEST(occupied_beds - 1, 0),
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            "#,
        )
        .bind(bed.ward_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(released)
    }

    /// Move a free bed between non-occupancy states
    pub async fn set_bed_status(&self, bed_id: Uuid, status: BedStatus) -> Result<Bed, RepositoryError> {
        if status == BedStatus::Occupied {
            return Err(RepositoryError::BusinessRule(
                "Use bed assignment to occupy a bed".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let bed = sqlx::query_as::<_, Bed>("SELECT * FROM beds WHERE id = $1 FOR UPDATE")
            .bind(bed_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Bed not found".to_string()))?;

        if bed.is_occupied() {
            return Err(RepositoryError::BusinessRule(
                "Occupied bed must be released before changing its status".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Bed>(
            r#"
            UPDATE beds
            SET status = $2, is_available = $3, updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(bed_id)
        .bind(status.as_str())
        .bind(status == BedStatus::Available)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }
}
