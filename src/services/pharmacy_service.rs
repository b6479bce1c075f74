use super::{normalise_enum, parse_enum, AuditService};
use crate::error::{AppError, AppResult};
use crate::models::{
    utc_now, AuditAction, AuditEntry, CreateMedicine, DispensationFilter,
    DispensationPaymentStatus, DispensationStatus, Dispensation, DispenseRequest, DosageForm,
    Medicine, MedicineFilter, MedicineResponse, MedicineStatus, PaymentMethod, StockAdjustment,
    UpdateMedicine,
};
use crate::repositories::{Page, PatientRepository, PharmacyRepository};
use crate::validation::{fits_numeric, non_negative, require_text, PRICE_DIGITS};
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Longest look-ahead accepted by the expiry report
const MAX_EXPIRY_WINDOW_DAYS: i64 = 365;

fn check_dispense_request(request: &DispenseRequest) -> AppResult<()> {
    if request.items.is_empty() {
        return Err(AppError::Validation(
            "Dispensation must include at least one item".to_string(),
        ));
    }
    if request.items.iter().any(|line| line.quantity <= 0) {
        return Err(AppError::Validation(
            "Dispensed quantity must be positive".to_string(),
        ));
    }
    non_negative("Discount amount", request.discount_amount)?;
    non_negative("Tax amount", request.tax_amount)?;
    fits_numeric("Discount amount", request.discount_amount, PRICE_DIGITS)?;
    fits_numeric("Tax amount", request.tax_amount, PRICE_DIGITS)?;
    Ok(())
}

fn check_expiry_window(days: i64) -> AppResult<()> {
    if !(1..=MAX_EXPIRY_WINDOW_DAYS).contains(&days) {
        return Err(AppError::Validation(format!(
            "Days must be between 1 and {}",
            MAX_EXPIRY_WINDOW_DAYS
        )));
    }
    Ok(())
}

/// Medicine catalogue, stock and dispensing
pub struct PharmacyService {
    repo: Arc<PharmacyRepository>,
    patients: Arc<PatientRepository>,
    audit: Arc<AuditService>,
}

impl PharmacyService {
    pub fn new(
        repo: Arc<PharmacyRepository>,
        patients: Arc<PatientRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            repo,
            patients,
            audit,
        }
    }

    fn respond(medicines: Vec<Medicine>) -> Vec<MedicineResponse> {
        let today = utc_now().date();
        medicines.into_iter().map(|m| m.into_response(today)).collect()
    }

    pub async fn create_medicine(&self, input: CreateMedicine, actor: Uuid) -> AppResult<MedicineResponse> {
        require_text("Medicine code", &input.medicine_code)?;
        require_text("Name", &input.name)?;
        require_text("Generic name", &input.generic_name)?;
        non_negative("Purchase price", input.purchase_price)?;
        non_negative("Selling price", input.selling_price)?;
        fits_numeric("Purchase price", input.purchase_price, PRICE_DIGITS)?;
        fits_numeric("Selling price", input.selling_price, PRICE_DIGITS)?;
        if input.stock_quantity < 0 {
            return Err(AppError::Validation(
                "Stock quantity cannot be negative".to_string(),
            ));
        }
        if matches!(input.reorder_level, Some(level) if level < 0) {
            return Err(AppError::Validation(
                "Reorder level cannot be negative".to_string(),
            ));
        }
        let dosage_form: DosageForm = parse_enum(&input.dosage_form)?;

        let medicine = self
            .repo
            .insert_medicine(&Medicine::new(input, dosage_form))
            .await?;
        info!("Added medicine {} ({})", medicine.name, medicine.medicine_code);
        self.audit
            .record(
                AuditEntry::new(AuditAction::Create, "medicine", Some(medicine.id), "Medicine added")
                    .by(actor),
            )
            .await;
        Ok(medicine.into_response(utc_now().date()))
    }

    async fn load(&self, id: Uuid) -> AppResult<Medicine> {
        self.repo
            .find_medicine(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Medicine not found".to_string()))
    }

    pub async fn get_medicine(&self, id: Uuid) -> AppResult<MedicineResponse> {
        Ok(self.load(id).await?.into_response(utc_now().date()))
    }

    pub async fn list_medicines(
        &self,
        mut filter: MedicineFilter,
        page: Page,
    ) -> AppResult<Vec<MedicineResponse>> {
        filter.status = normalise_enum::<MedicineStatus>(filter.status.take())?;
        Ok(Self::respond(self.repo.list_medicines(&filter, page).await?))
    }

    pub async fn update_medicine(
        &self,
        id: Uuid,
        mut update: UpdateMedicine,
        actor: Uuid,
    ) -> AppResult<MedicineResponse> {
        if let Some(price) = update.purchase_price {
            non_negative("Purchase price", price)?;
            fits_numeric("Purchase price", price, PRICE_DIGITS)?;
        }
        if let Some(price) = update.selling_price {
            non_negative("Selling price", price)?;
            fits_numeric("Selling price", price, PRICE_DIGITS)?;
        }
        if matches!(update.reorder_level, Some(level) if level < 0) {
            return Err(AppError::Validation(
                "Reorder level cannot be negative".to_string(),
            ));
        }
        update.dosage_form = normalise_enum::<DosageForm>(update.dosage_form.take())?;
        update.status = normalise_enum::<MedicineStatus>(update.status.take())?;

        let mut medicine = self.load(id).await?;
        medicine.apply(update);
        let medicine = self.repo.update_medicine(&medicine).await?;
        self.audit
            .record(AuditEntry::new(AuditAction::Update, "medicine", Some(id), "Medicine updated").by(actor))
            .await;
        Ok(medicine.into_response(utc_now().date()))
    }

    pub async fn delete_medicine(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if !self.repo.delete_medicine(id).await? {
            return Err(AppError::NotFound("Medicine not found".to_string()));
        }
        self.audit
            .record(AuditEntry::new(AuditAction::Delete, "medicine", Some(id), "Medicine deleted").by(actor))
            .await;
        Ok(())
    }

    pub async fn adjust_stock(
        &self,
        id: Uuid,
        adjustment: StockAdjustment,
        actor: Uuid,
    ) -> AppResult<MedicineResponse> {
        if adjustment.delta == 0 {
            return Err(AppError::Validation(
                "Stock adjustment cannot be zero".to_string(),
            ));
        }
        let reason = require_text("Reason", &adjustment.reason)?;

        let medicine = self.repo.adjust_stock(id, adjustment.delta).await?;
        info!(
            "Stock of {} adjusted by {} to {} ({})",
            medicine.name, adjustment.delta, medicine.stock_quantity, reason
        );
        if medicine.is_low_stock() {
            warn!(
                "{} is at or below its reorder level ({} <= {})",
                medicine.name, medicine.stock_quantity, medicine.reorder_level
            );
        }
        self.audit
            .record(
                AuditEntry::new(AuditAction::Update, "medicine", Some(id), "Stock adjusted")
                    .by(actor)
                    .with_details(serde_json::json!({
                        "delta": adjustment.delta,
                        "stock_quantity": medicine.stock_quantity,
                        "reason": reason,
                    })),
            )
            .await;
        Ok(medicine.into_response(utc_now().date()))
    }

    pub async fn low_stock(&self) -> AppResult<Vec<MedicineResponse>> {
        Ok(Self::respond(self.repo.low_stock().await?))
    }

    /// Medicines expiring between today and `days` from now
    pub async fn expiring_within(&self, days: i64) -> AppResult<Vec<MedicineResponse>> {
        check_expiry_window(days)?;
        let today = utc_now().date();
        let until = today + Duration::days(days);
        Ok(Self::respond(self.repo.expiring_between(today, until).await?))
    }

    pub async fn dispense(
        &self,
        request: DispenseRequest,
        dispensed_by: String,
        actor: Uuid,
    ) -> AppResult<Dispensation> {
        check_dispense_request(&request)?;
        let payment_status = match request.payment_status.as_deref() {
            Some(status) => parse_enum::<DispensationPaymentStatus>(status)?,
            None => DispensationPaymentStatus::Pending,
        };
        if let Some(method) = request.payment_method.as_deref() {
            parse_enum::<PaymentMethod>(method)?;
        }
        if self.patients.find_by_id(request.patient_id).await?.is_none() {
            return Err(AppError::NotFound("Patient not found".to_string()));
        }

        let dispensation = self
            .repo
            .dispense(&request, payment_status, dispensed_by, utc_now().date())
            .await?;
        info!(
            "Dispensed {} ({} lines, final {})",
            dispensation.transaction_number,
            request.items.len(),
            dispensation.final_amount
        );
        self.audit
            .record(
                AuditEntry::new(
                    AuditAction::Dispense,
                    "dispensation",
                    Some(dispensation.id),
                    "Medicines dispensed",
                )
                .by(actor)
                .with_details(serde_json::json!({
                    "patient_id": dispensation.patient_id,
                    "items": dispensation.items,
                    "final_amount": dispensation.final_amount,
                })),
            )
            .await;
        Ok(dispensation)
    }

    pub async fn return_dispensation(&self, id: Uuid, reason: &str, actor: Uuid) -> AppResult<Dispensation> {
        let reason = require_text("Return reason", reason)?;
        let dispensation = self.repo.return_dispensation(id, &reason).await?;
        info!("Returned dispensation {}", dispensation.transaction_number);
        self.audit
            .record(
                AuditEntry::new(AuditAction::Refund, "dispensation", Some(id), "Dispensation returned")
                    .by(actor)
                    .with_details(serde_json::json!({
                        "refund_amount": dispensation.refund_amount,
                        "reason": reason,
                    })),
            )
            .await;
        Ok(dispensation)
    }

    pub async fn get_dispensation(&self, id: Uuid) -> AppResult<Dispensation> {
        self.repo
            .find_dispensation(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Dispensation not found".to_string()))
    }

    pub async fn list_dispensations(
        &self,
        mut filter: DispensationFilter,
        page: Page,
    ) -> AppResult<Vec<Dispensation>> {
        filter.status = normalise_enum::<DispensationStatus>(filter.status.take())?;
        Ok(self.repo.list_dispensations(&filter, page).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DispenseLine;
    use rust_decimal::Decimal;

    fn request(quantities: &[i32]) -> DispenseRequest {
        DispenseRequest {
            patient_id: Uuid::new_v4(),
            items: quantities
                .iter()
                .map(|&quantity| DispenseLine {
                    medicine_id: Uuid::new_v4(),
                    quantity,
                })
                .collect(),
            discount_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            payment_status: None,
            payment_method: None,
            notes: None,
        }
    }

    #[test]
    fn test_dispense_request_checks() {
        assert!(check_dispense_request(&request(&[1, 2])).is_ok());
        assert!(check_dispense_request(&request(&[])).is_err());
        assert!(check_dispense_request(&request(&[3, 0])).is_err());

        let mut negative_discount = request(&[1]);
        negative_discount.discount_amount = Decimal::new(-1, 0);
        assert!(check_dispense_request(&negative_discount).is_err());
    }

    #[test]
    fn test_expiry_window() {
        assert!(check_expiry_window(30).is_ok());
        assert!(check_expiry_window(0).is_err());
        assert!(check_expiry_window(366).is_err());
    }
}
