use super::{normalise_enum, parse_enum, AuditService};
use crate::error::{AppError, AppResult};
use crate::models::{
    reference_number, AuditAction, AuditEntry, CreateInvoice, CreateInvoiceItem, Invoice,
    InvoiceDetail, InvoiceFilter, InvoiceItem, InvoiceStatus, InvoiceTotals, ItemCategory,
    Payment, PaymentMethod, RecordPayment, RefundPayment,
};
use crate::repositories::{AppointmentRepository, BillingRepository, Page, PatientRepository};
use crate::validation::{fits_numeric, non_negative, percentage, positive, require_text, AMOUNT_DIGITS};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Validate line items and resolve their categories
fn check_items(items: &[CreateInvoiceItem]) -> AppResult<Vec<ItemCategory>> {
    if items.is_empty() {
        return Err(AppError::Validation(
            "Invoice must have at least one item".to_string(),
        ));
    }
    items
        .iter()
        .map(|item| {
            require_text("Item description", &item.description)?;
            if item.quantity <= 0 {
                return Err(AppError::Validation(
                    "Item quantity must be positive".to_string(),
                ));
            }
            non_negative("Unit price", item.unit_price)?;
            fits_numeric("Unit price", item.unit_price, AMOUNT_DIGITS)?;
            parse_enum::<ItemCategory>(&item.category)
        })
        .collect()
}

/// Invoices, payments and refunds
pub struct BillingService {
    billing: Arc<BillingRepository>,
    patients: Arc<PatientRepository>,
    appointments: Arc<AppointmentRepository>,
    audit: Arc<AuditService>,
}

impl BillingService {
    pub fn new(
        billing: Arc<BillingRepository>,
        patients: Arc<PatientRepository>,
        appointments: Arc<AppointmentRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            billing,
            patients,
            appointments,
            audit,
        }
    }

    pub async fn create_invoice(&self, mut input: CreateInvoice, actor: Uuid) -> AppResult<InvoiceDetail> {
        let categories = check_items(&input.items)?;
        percentage("Discount percent", input.discount_percent)?;
        percentage("Tax percent", input.tax_percent)?;

        if self.patients.find_by_id(input.patient_id).await?.is_none() {
            return Err(AppError::NotFound("Patient not found".to_string()));
        }
        if let Some(appointment_id) = input.appointment_id {
            let appointment = self
                .appointments
                .find_by_id(appointment_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;
            if appointment.patient_id != input.patient_id {
                return Err(AppError::Validation(
                    "Appointment belongs to a different patient".to_string(),
                ));
            }
        }

        let lines: Vec<(i32, _)> = input
            .items
            .iter()
            .map(|item| (item.quantity, item.unit_price))
            .collect();
        let totals = InvoiceTotals::compute(&lines, input.discount_percent, input.tax_percent)?;

        let invoice = Invoice::new(reference_number("INV"), &input, totals, Some(actor));
        let items: Vec<InvoiceItem> = std::mem::take(&mut input.items)
            .into_iter()
            .zip(categories)
            .map(|(item, category)| InvoiceItem::new(invoice.id, item, category))
            .collect::<AppResult<_>>()?;

        let invoice = self.billing.create_invoice(&invoice, &items).await?;
        info!(
            "Created invoice {} for patient {} totalling {}",
            invoice.invoice_number, invoice.patient_id, invoice.total_amount
        );
        self.audit
            .record(
                AuditEntry::new(AuditAction::Create, "invoice", Some(invoice.id), "Invoice created")
                    .by(actor)
                    .with_details(serde_json::json!({
                        "invoice_number": invoice.invoice_number,
                        "total_amount": invoice.total_amount,
                    })),
            )
            .await;

        Ok(InvoiceDetail {
            invoice,
            items,
            payments: Vec::new(),
        })
    }

    pub async fn get_invoice(&self, id: Uuid) -> AppResult<InvoiceDetail> {
        let invoice = self
            .billing
            .find_invoice(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;
        let items = self.billing.invoice_items(id).await?;
        let payments = self.billing.invoice_payments(id).await?;
        Ok(InvoiceDetail {
            invoice,
            items,
            payments,
        })
    }

    pub async fn list_invoices(&self, mut filter: InvoiceFilter, page: Page) -> AppResult<Vec<Invoice>> {
        filter.status = normalise_enum::<InvoiceStatus>(filter.status.take())?;
        Ok(self.billing.list_invoices(&filter, page).await?)
    }

    pub async fn cancel_invoice(&self, id: Uuid, actor: Uuid) -> AppResult<Invoice> {
        let invoice = self.billing.cancel_invoice(id).await?;
        info!("Cancelled invoice {}", invoice.invoice_number);
        self.audit
            .record(AuditEntry::new(AuditAction::Cancel, "invoice", Some(id), "Invoice cancelled").by(actor))
            .await;
        Ok(invoice)
    }

    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        input: RecordPayment,
        received_by: String,
        actor: Uuid,
    ) -> AppResult<Payment> {
        positive("Payment amount", input.amount)?;
        fits_numeric("Payment amount", input.amount, AMOUNT_DIGITS)?;
        let method: PaymentMethod = parse_enum(&input.payment_method)?;

        let invoice = self
            .billing
            .find_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;

        let payment = Payment::new(invoice.id, invoice.patient_id, input, method, received_by);
        let (payment, invoice) = self.billing.record_payment(&payment).await?;
        info!(
            "Payment {} of {} recorded on {}; invoice now {}",
            payment.payment_number, payment.amount, invoice.invoice_number, invoice.status
        );
        self.audit
            .record(
                AuditEntry::new(AuditAction::Payment, "payment", Some(payment.id), "Payment recorded")
                    .by(actor)
                    .with_details(serde_json::json!({
                        "invoice_id": invoice.id,
                        "amount": payment.amount,
                        "method": payment.payment_method,
                        "receipt_number": payment.receipt_number,
                    })),
            )
            .await;
        Ok(payment)
    }

    pub async fn get_payment(&self, id: Uuid) -> AppResult<Payment> {
        self.billing
            .find_payment(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
    }

    pub async fn refund_payment(&self, id: Uuid, request: RefundPayment, actor: Uuid) -> AppResult<Payment> {
        let reason = require_text("Refund reason", &request.reason)?;
        if let Some(amount) = request.amount {
            positive("Refund amount", amount)?;
            fits_numeric("Refund amount", amount, AMOUNT_DIGITS)?;
        }

        let (payment, invoice) = self.billing.refund_payment(id, request.amount, &reason).await?;
        info!(
            "Refunded {} on payment {}; invoice {} now {}",
            payment.refund_amount.unwrap_or_default(),
            payment.payment_number,
            invoice.invoice_number,
            invoice.status
        );
        self.audit
            .record(
                AuditEntry::new(AuditAction::Refund, "payment", Some(id), "Payment refunded")
                    .by(actor)
                    .with_details(serde_json::json!({
                        "invoice_id": invoice.id,
                        "refund_amount": payment.refund_amount,
                        "reason": reason,
                    })),
            )
            .await;
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(quantity: i32, price: i64, category: &str) -> CreateInvoiceItem {
        CreateInvoiceItem {
            description: "Chest X-ray".into(),
            category: category.into(),
            quantity,
            unit_price: Decimal::new(price, 2),
        }
    }

    #[test]
    fn test_items_are_validated() {
        let categories = check_items(&[item(1, 12000, "imaging"), item(2, 0, "LAB")]).unwrap();
        assert_eq!(categories, vec![ItemCategory::Imaging, ItemCategory::Lab]);

        assert!(check_items(&[]).is_err());
        assert!(check_items(&[item(0, 100, "lab")]).is_err());
        assert!(check_items(&[item(1, -100, "lab")]).is_err());
        assert!(check_items(&[item(1, 100, "parking")]).is_err());
    }
}
