use super::{filter_text, Page};
use crate::error::RepositoryError;
use crate::models::{
    Dispensation, DispensationFilter, DispensationPaymentStatus, DispensationStatus,
    DispenseRequest, DispensedItem, Medicine, MedicineFilter,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

/// Repository for medicine stock and dispensations
pub struct PharmacyRepository {
    pool: PgPool,
}

impl PharmacyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_medicine(&self, medicine: &Medicine) -> Result<Medicine, RepositoryError> {
        let created = sqlx::query_as::<_, Medicine>(
            r#"
            INSERT INTO medicines (
                id, medicine_code, name, generic_name, brand_name, category, dosage_form,
                strength, unit, manufacturer, stock_quantity, reorder_level, purchase_price,
                selling_price, batch_number, expiry_date, requires_prescription,
                is_controlled_substance, status, is_available, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22)
            RETURNING *
            "#,
        )
        .bind(medicine.id)
        .bind(&medicine.medicine_code)
        .bind(&medicine.name)
        .bind(&medicine.generic_name)
        .bind(&medicine.brand_name)
        .bind(&medicine.category)
        .bind(&medicine.dosage_form)
        .bind(&medicine.strength)
        .bind(&medicine.unit)
        .bind(&medicine.manufacturer)
        .bind(medicine.stock_quantity)
        .bind(medicine.reorder_level)
        .bind(medicine.purchase_price)
        .bind(medicine.selling_price)
        .bind(&medicine.batch_number)
        .bind(medicine.expiry_date)
        .bind(medicine.requires_prescription)
        .bind(medicine.is_controlled_substance)
        .bind(&medicine.status)
        .bind(medicine.is_available)
        .bind(medicine.created_at)
        .bind(medicine.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_medicine(&self, id: Uuid) -> Result<Option<Medicine>, RepositoryError> {
        let medicine = sqlx::query_as::<_, Medicine>("SELECT * FROM medicines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(medicine)
    }

    pub async fn list_medicines(
        &self,
        filter: &MedicineFilter,
        page: Page,
    ) -> Result<Vec<Medicine>, RepositoryError> {
        let medicines = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT * FROM medicines
            WHERE ($1::text IS NULL OR category ILIKE $1)
              AND ($2::text IS NULL OR status = $2)
              AND (
                $3::text IS NULL
                OR name ILIKE '%' || $3 || '%'
                OR generic_name ILIKE '%' || $3 || '%'
                OR medicine_code ILIKE '%' || $3 || '%'
              )
            ORDER BY name
            OFFSET $4 LIMIT $5
            "#,
        )
        .bind(filter_text(&filter.category))
        .bind(filter_text(&filter.status))
        .bind(filter_text(&filter.search))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(medicines)
    }

    /// Write descriptive and pricing fields; stock moves only through adjustments
    pub async fn update_medicine(&self, medicine: &Medicine) -> Result<Medicine, RepositoryError> {
        let updated = sqlx::query_as::<_, Medicine>(
            r#"
            UPDATE medicines SET
                name = $2, generic_name = $3, brand_name = $4, category = $5, dosage_form = $6,
                strength = $7, unit = $8, manufacturer = $9, reorder_level = $10,
                purchase_price = $11, selling_price = $12, batch_number = $13,
                expiry_date = $14, requires_prescription = $15, is_controlled_substance = $16,
                status = $17, is_available = $18, updated_at = $19
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.generic_name)
        .bind(&medicine.brand_name)
        .bind(&medicine.category)
        .bind(&medicine.dosage_form)
        .bind(&medicine.strength)
        .bind(&medicine.unit)
        .bind(&medicine.manufacturer)
        .bind(medicine.reorder_level)
        .bind(medicine.purchase_price)
        .bind(medicine.selling_price)
        .bind(&medicine.batch_number)
        .bind(medicine.expiry_date)
        .bind(medicine.requires_prescription)
        .bind(medicine.is_controlled_substance)
        .bind(&medicine.status)
        .bind(medicine.is_available)
        .bind(medicine.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("Medicine not found".to_string()))?;

        Ok(updated)
    }

    pub async fn delete_medicine(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query("DELETE FROM medicines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    async fn save_stock(
        tx: &mut Transaction<'_, Postgres>,
        medicine: &Medicine,
    ) -> Result<Medicine, RepositoryError> {
        let saved = sqlx::query_as::<_, Medicine>(
            r#"
            UPDATE medicines
            SET stock_quantity = $2, status = $3, is_available = $4,
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(medicine.id)
        .bind(medicine.stock_quantity)
        .bind(&medicine.status)
        .bind(medicine.is_available)
        .fetch_one(&mut **tx)
        .await?;
        Ok(saved)
    }

    /// Add or remove stock; the level never drops below zero
    pub async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<Medicine, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut medicine =
            sqlx::query_as::<_, Medicine>("SELECT * FROM medicines WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| RepositoryError::NotFound("Medicine not found".to_string()))?;

        let new_quantity = i64::from(medicine.stock_quantity) + i64::from(delta);
        if new_quantity < 0 {
            return Err(RepositoryError::BusinessRule(format!(
                "Insufficient stock for {}: available {}, requested {}",
                medicine.name,
                medicine.stock_quantity,
                -delta
            )));
        }
        medicine.stock_quantity = i32::try_from(new_quantity)
            .map_err(|_| RepositoryError::InvalidInput("Stock quantity too large".to_string()))?;
        medicine.sync_stock_status();

        let saved = Self::save_stock(&mut tx, &medicine).await?;
        tx.commit().await?;

        Ok(saved)
    }

    /// Medicines at or below their reorder level that are still stocked
    pub async fn low_stock(&self) -> Result<Vec<Medicine>, RepositoryError> {
        let medicines = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT * FROM medicines
            WHERE stock_quantity <= reorder_level
              AND status NOT IN ('discontinued', 'recalled')
            ORDER BY stock_quantity, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(medicines)
    }

    pub async fn count_low_stock(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM medicines
            WHERE stock_quantity <= reorder_level
              AND status NOT IN ('discontinued', 'recalled')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Medicines whose expiry falls between `from` and `until`, inclusive
    pub async fn expiring_between(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Medicine>, RepositoryError> {
        let medicines = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT * FROM medicines
            WHERE expiry_date BETWEEN $1 AND $2
            ORDER BY expiry_date, name
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(medicines)
    }

    /// Dispense every requested line or nothing
    ///
    /// All medicine rows are locked up front in id order, then each line is
    /// checked against the running stock so repeated lines add up.
    pub async fn dispense(
        &self,
        request: &DispenseRequest,
        payment_status: DispensationPaymentStatus,
        dispensed_by: String,
        today: NaiveDate,
    ) -> Result<Dispensation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<Uuid> = request.items.iter().map(|line| line.medicine_id).collect();
        let locked = sqlx::query_as::<_, Medicine>(
            "SELECT * FROM medicines WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;
        let mut stock: HashMap<Uuid, Medicine> =
            locked.into_iter().map(|m| (m.id, m)).collect();

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let medicine = stock.get_mut(&line.medicine_id).ok_or_else(|| {
                RepositoryError::NotFound(format!("Medicine {} not found", line.medicine_id))
            })?;

            if medicine.is_expired(today) {
                return Err(RepositoryError::BusinessRule(format!(
                    "{} expired on {}",
                    medicine.name,
                    medicine.expiry_date.map(|d| d.to_string()).unwrap_or_default()
                )));
            }
            if !medicine.is_dispensable(today) {
                return Err(RepositoryError::BusinessRule(format!(
                    "{} is not available for dispensing (status: {})",
                    medicine.name, medicine.status
                )));
            }
            if medicine.stock_quantity < line.quantity {
                return Err(RepositoryError::BusinessRule(format!(
                    "Insufficient stock for {}: available {}, requested {}",
                    medicine.name, medicine.stock_quantity, line.quantity
                )));
            }

            medicine.stock_quantity -= line.quantity;
            items.push(DispensedItem::new(
                medicine.id,
                medicine.name.clone(),
                line.quantity,
                medicine.selling_price,
            )?);
        }

        let dispensation = Dispensation::new(request, items, payment_status, dispensed_by)?;
        if dispensation.discount_amount > dispensation.total_amount {
            return Err(RepositoryError::InvalidInput(format!(
                "Discount {} exceeds total {}",
                dispensation.discount_amount, dispensation.total_amount
            )));
        }
        if dispensation.final_amount < Decimal::ZERO {
            return Err(RepositoryError::InvalidInput(
                "Final amount cannot be negative".to_string(),
            ));
        }

        for medicine in stock.values_mut() {
            medicine.sync_stock_status();
            Self::save_stock(&mut tx, medicine).await?;
        }

        let created = sqlx::query_as::<_, Dispensation>(
            r#"
            INSERT INTO dispensations (
                id, transaction_number, patient_id, items, dispensed_by, total_amount,
                discount_amount, tax_amount, final_amount, payment_status, payment_method,
                status, is_returned, notes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(dispensation.id)
        .bind(&dispensation.transaction_number)
        .bind(dispensation.patient_id)
        .bind(&dispensation.items)
        .bind(&dispensation.dispensed_by)
        .bind(dispensation.total_amount)
        .bind(dispensation.discount_amount)
        .bind(dispensation.tax_amount)
        .bind(dispensation.final_amount)
        .bind(&dispensation.payment_status)
        .bind(&dispensation.payment_method)
        .bind(&dispensation.status)
        .bind(dispensation.is_returned)
        .bind(&dispensation.notes)
        .bind(dispensation.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Put every dispensed item back on the shelf and refund the sale
    pub async fn return_dispensation(
        &self,
        id: Uuid,
        reason: &str,
    ) -> Result<Dispensation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let dispensation =
            sqlx::query_as::<_, Dispensation>("SELECT * FROM dispensations WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| RepositoryError::NotFound("Dispensation not found".to_string()))?;

        if dispensation.is_returned || dispensation.status_enum() != DispensationStatus::Completed {
            return Err(RepositoryError::BusinessRule(format!(
                "Dispensation {} cannot be returned (status: {})",
                dispensation.transaction_number, dispensation.status
            )));
        }

        for item in dispensation.items_vec()? {
            sqlx::query(
                r#"
                UPDATE medicines SET
                    stock_quantity = stock_quantity + $2,
                    status = CASE WHEN status = 'out_of_stock' THEN 'active' ELSE status END,
                    is_available = CASE WHEN status IN ('active', 'out_of_stock')
                        THEN TRUE ELSE is_available END,
                    updated_at = (NOW() AT TIME ZONE 'utc')
                WHERE id = $1
                "#,
            )
            .bind(item.medicine_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        let returned = sqlx::query_as::<_, Dispensation>(
            r#"
            UPDATE dispensations SET
                status = $2, is_returned = TRUE, return_date = (NOW() AT TIME ZONE 'utc'),
                return_reason = $3, refund_amount = final_amount, payment_status = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(DispensationStatus::Returned.as_str())
        .bind(reason)
        .bind(DispensationPaymentStatus::Refunded.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(returned)
    }

    pub async fn find_dispensation(&self, id: Uuid) -> Result<Option<Dispensation>, RepositoryError> {
        let dispensation =
            sqlx::query_as::<_, Dispensation>("SELECT * FROM dispensations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(dispensation)
    }

    pub async fn list_dispensations(
        &self,
        filter: &DispensationFilter,
        page: Page,
    ) -> Result<Vec<Dispensation>, RepositoryError> {
        let dispensations = sqlx::query_as::<_, Dispensation>(
            r#"
            SELECT * FROM dispensations
            WHERE ($1::uuid IS NULL OR patient_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(filter.patient_id)
        .bind(filter_text(&filter.status))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(dispensations)
    }
}
