use super::{round_money, utc_now, Payment};
use crate::error::{AppError, AppResult};
use crate::validation::{fits_numeric, AMOUNT_DIGITS};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    InvoiceStatus ("invoice status") {
        Pending => "pending",
        PartiallyPaid => "partially_paid",
        Paid => "paid",
        Cancelled => "cancelled",
        Refunded => "refunded",
    }
}

impl InvoiceStatus {
    /// Status implied by how much of `total` has been paid
    pub fn from_amounts(paid: Decimal, total: Decimal) -> Self {
        if paid <= Decimal::ZERO {
            InvoiceStatus::Pending
        } else if paid < total {
            InvoiceStatus::PartiallyPaid
        } else {
            InvoiceStatus::Paid
        }
    }

    pub fn accepts_payments(&self) -> bool {
        matches!(self, InvoiceStatus::Pending | InvoiceStatus::PartiallyPaid)
    }
}

text_enum! {
    ItemCategory ("item category") {
        Consultation => "consultation",
        RoomCharge => "room_charge",
        Procedure => "procedure",
        Medication => "medication",
        Lab => "lab",
        Imaging => "imaging",
        Other => "other",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub tax_percent: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance_due: Decimal,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub category: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoiceItem {
    pub description: String,
    pub category: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoice {
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub tax_percent: Decimal,
    pub notes: Option<String>,
    pub items: Vec<CreateInvoiceItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilter {
    pub patient_id: Option<Uuid>,
    pub status: Option<String>,
}

/// Invoice with its line items and payments
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
}

/// Computed money columns of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

fn too_large() -> AppError {
    AppError::Validation("Invoice amounts are too large".to_string())
}

fn percent_of(amount: Decimal, percent: Decimal) -> AppResult<Decimal> {
    amount
        .checked_mul(percent)
        .map(|value| round_money(value / Decimal::ONE_HUNDRED))
        .ok_or_else(too_large)
}

impl InvoiceTotals {
    /// Discount applies to the subtotal, tax to the discounted amount
    pub fn compute(
        lines: &[(i32, Decimal)],
        discount_percent: Decimal,
        tax_percent: Decimal,
    ) -> AppResult<Self> {
        let subtotal = lines
            .iter()
            .try_fold(Decimal::ZERO, |sum, (quantity, unit_price)| {
                sum.checked_add(Decimal::from(*quantity).checked_mul(*unit_price)?)
            })
            .map(round_money)
            .ok_or_else(too_large)?;
        fits_numeric("Invoice subtotal", subtotal, AMOUNT_DIGITS)?;

        let discount_amount = percent_of(subtotal, discount_percent)?;
        let taxable = subtotal.checked_sub(discount_amount).ok_or_else(too_large)?;
        let tax_amount = percent_of(taxable, tax_percent)?;
        let total_amount = round_money(taxable.checked_add(tax_amount).ok_or_else(too_large)?);
        fits_numeric("Invoice total", total_amount, AMOUNT_DIGITS)?;

        Ok(Self {
            subtotal,
            discount_amount,
            tax_amount,
            total_amount,
        })
    }
}

impl InvoiceItem {
    pub fn new(invoice_id: Uuid, input: CreateInvoiceItem, category: ItemCategory) -> AppResult<Self> {
        let amount = Decimal::from(input.quantity)
            .checked_mul(input.unit_price)
            .map(round_money)
            .ok_or_else(too_large)?;
        fits_numeric("Item amount", amount, AMOUNT_DIGITS)?;
        Ok(Self {
            id: Uuid::new_v4(),
            invoice_id,
            description: input.description.trim().to_string(),
            category: category.as_str().to_string(),
            quantity: input.quantity,
            unit_price: input.unit_price,
            amount,
        })
    }
}

impl Invoice {
    pub fn new(
        invoice_number: String,
        input: &CreateInvoice,
        totals: InvoiceTotals,
        created_by: Option<Uuid>,
    ) -> Self {
        let now = utc_now();
        Self {
            id: Uuid::new_v4(),
            invoice_number,
            patient_id: input.patient_id,
            appointment_id: input.appointment_id,
            invoice_date: now.date(),
            due_date: input.due_date,
            subtotal: totals.subtotal,
            discount_percent: input.discount_percent,
            discount_amount: totals.discount_amount,
            tax_percent: input.tax_percent,
            tax_amount: totals.tax_amount,
            total_amount: totals.total_amount,
            paid_amount: Decimal::ZERO,
            balance_due: totals.total_amount,
            status: InvoiceStatus::Pending.as_str().to_string(),
            notes: input.notes.clone(),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status_enum(&self) -> InvoiceStatus {
        self.status.parse().unwrap_or(InvoiceStatus::Pending)
    }

    /// Set paid amount and derive balance and status from it
    pub fn set_paid_amount(&mut self, paid: Decimal) {
        self.paid_amount = round_money(paid.max(Decimal::ZERO));
        self.balance_due = round_money((self.total_amount - self.paid_amount).max(Decimal::ZERO));
        self.status = InvoiceStatus::from_amounts(self.paid_amount, self.total_amount)
            .as_str()
            .to_string();
        self.updated_at = utc_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_totals_with_discount_and_tax() {
        let totals = InvoiceTotals::compute(
            &[(1, dec("500.00")), (3, dec("33.33"))],
            dec("10"),
            dec("5"),
        )
        .unwrap();
        assert_eq!(totals.subtotal, dec("599.99"));
        assert_eq!(totals.discount_amount, dec("60.00"));
        assert_eq!(totals.tax_amount, dec("27.00"));
        assert_eq!(totals.total_amount, dec("566.99"));
    }

    #[test]
    fn test_totals_round_half_away_from_zero() {
        let totals = InvoiceTotals::compute(&[(1, dec("0.25"))], dec("10"), Decimal::ZERO).unwrap();
        // 0.025 rounds up, not to even
        assert_eq!(totals.discount_amount, dec("0.03"));
        assert_eq!(totals.total_amount, dec("0.22"));
    }

    #[test]
    fn test_status_from_amounts() {
        assert_eq!(
            InvoiceStatus::from_amounts(Decimal::ZERO, dec("10")),
            InvoiceStatus::Pending
        );
        assert_eq!(
            InvoiceStatus::from_amounts(dec("4"), dec("10")),
            InvoiceStatus::PartiallyPaid
        );
        assert_eq!(
            InvoiceStatus::from_amounts(dec("10"), dec("10")),
            InvoiceStatus::Paid
        );
        assert!(!InvoiceStatus::Cancelled.accepts_payments());
    }

    #[test]
    fn test_set_paid_amount_updates_balance() {
        let input = CreateInvoice {
            patient_id: Uuid::new_v4(),
            appointment_id: None,
            due_date: None,
            discount_percent: Decimal::ZERO,
            tax_percent: Decimal::ZERO,
            notes: None,
            items: vec![],
        };
        let totals = InvoiceTotals::compute(&[(2, dec("50"))], Decimal::ZERO, Decimal::ZERO).unwrap();
        let mut invoice = Invoice::new("INV-1".into(), &input, totals, None);
        assert_eq!(invoice.balance_due, dec("100"));

        invoice.set_paid_amount(dec("40"));
        assert_eq!(invoice.balance_due, dec("60"));
        assert_eq!(invoice.status_enum(), InvoiceStatus::PartiallyPaid);

        invoice.set_paid_amount(dec("100"));
        assert_eq!(invoice.balance_due, Decimal::ZERO);
        assert_eq!(invoice.status_enum(), InvoiceStatus::Paid);
    }

    #[test]
    fn test_item_amount() {
        let item = InvoiceItem::new(
            Uuid::new_v4(),
            CreateInvoiceItem {
                description: "Room".into(),
                category: "room_charge".into(),
                quantity: 3,
                unit_price: dec("120.50"),
            },
            ItemCategory::RoomCharge,
        )
        .unwrap();
        assert_eq!(item.amount, dec("361.50"));
    }

    #[test]
    fn test_oversized_amounts_are_rejected_not_panicking() {
        let huge = dec("79228162514264337593543950");
        let err = InvoiceTotals::compute(&[(2_000_000_000, huge)], Decimal::ZERO, Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // each line fits, the sum does not
        let err = InvoiceTotals::compute(
            &[(1, dec("9000000000")), (1, dec("9000000000"))],
            Decimal::ZERO,
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let item = CreateInvoiceItem {
            description: "Implant".into(),
            category: "procedure".into(),
            quantity: i32::MAX,
            unit_price: huge,
        };
        assert!(InvoiceItem::new(Uuid::new_v4(), item, ItemCategory::Procedure).is_err());
    }
}
