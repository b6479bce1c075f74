use super::{reference_number, round_money, utc_now};
use crate::error::RepositoryError;
use crate::validation::{numeric_limit, PRICE_DIGITS};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    DispensationPaymentStatus ("payment status") {
        Pending => "pending",
        Paid => "paid",
        PartiallyPaid => "partially_paid",
        InsuranceClaimed => "insurance_claimed",
        Refunded => "refunded",
    }
}

text_enum! {
    DispensationStatus ("dispensation status") {
        Completed => "completed",
        Cancelled => "cancelled",
        Returned => "returned",
    }
}

/// One line of a dispensation, priced at the time it was handed out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispensedItem {
    pub medicine_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dispensation {
    pub id: Uuid,
    pub transaction_number: String,
    pub patient_id: Uuid,
    pub items: Value, // JSONB array of DispensedItem
    pub dispensed_by: String,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub final_amount: Decimal,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub status: String,
    pub is_returned: bool,
    pub return_date: Option<NaiveDateTime>,
    pub return_reason: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispenseLine {
    pub medicine_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispenseRequest {
    pub patient_id: Uuid,
    pub items: Vec<DispenseLine>,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnDispensation {
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispensationFilter {
    pub patient_id: Option<Uuid>,
    pub status: Option<String>,
}

fn too_large(what: &str) -> RepositoryError {
    RepositoryError::InvalidInput(format!(
        "{} must be less than {}",
        what,
        numeric_limit(PRICE_DIGITS)
    ))
}

/// `amount` rounded to cents, if it fits the pharmacy money columns
fn priced(what: &str, amount: Option<Decimal>) -> Result<Decimal, RepositoryError> {
    amount
        .map(round_money)
        .filter(|value| value.abs() < numeric_limit(PRICE_DIGITS))
        .ok_or_else(|| too_large(what))
}

impl DispensedItem {
    pub fn new(
        medicine_id: Uuid,
        name: String,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<Self, RepositoryError> {
        let amount = priced(
            &format!("Amount for {}", name),
            Decimal::from(quantity).checked_mul(unit_price),
        )?;
        Ok(Self {
            medicine_id,
            name,
            quantity,
            unit_price,
            amount,
        })
    }
}

impl Dispensation {
    /// `final = total - discount + tax`
    pub fn new(
        request: &DispenseRequest,
        items: Vec<DispensedItem>,
        payment_status: DispensationPaymentStatus,
        dispensed_by: String,
    ) -> Result<Self, RepositoryError> {
        let total_amount = priced(
            "Total amount",
            items
                .iter()
                .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.amount)),
        )?;
        let final_amount = priced(
            "Final amount",
            total_amount
                .checked_sub(request.discount_amount)
                .and_then(|value| value.checked_add(request.tax_amount)),
        )?;
        let items = serde_json::to_value(&items)
            .map_err(|e| RepositoryError::Query(sqlx::Error::Protocol(e.to_string())))?;

        Ok(Self {
            id: Uuid::new_v4(),
            transaction_number: reference_number("DSP"),
            patient_id: request.patient_id,
            items,
            dispensed_by,
            total_amount,
            discount_amount: request.discount_amount,
            tax_amount: request.tax_amount,
            final_amount,
            payment_status: payment_status.as_str().to_string(),
            payment_method: request.payment_method.clone(),
            status: DispensationStatus::Completed.as_str().to_string(),
            is_returned: false,
            return_date: None,
            return_reason: None,
            refund_amount: None,
            notes: request.notes.clone(),
            created_at: utc_now(),
        })
    }

    /// Items decoded from the JSON column
    pub fn items_vec(&self) -> Result<Vec<DispensedItem>, RepositoryError> {
        serde_json::from_value(self.items.clone())
            .map_err(|e| RepositoryError::Query(sqlx::Error::Decode(Box::new(e))))
    }

    pub fn status_enum(&self) -> DispensationStatus {
        self.status.parse().unwrap_or(DispensationStatus::Completed)
    }
}
