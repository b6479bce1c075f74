use super::{reference_number, utc_now};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    PaymentMethod ("payment method") {
        Cash => "cash",
        Card => "card",
        CreditCard => "credit_card",
        DebitCard => "debit_card",
        Upi => "upi",
        NetBanking => "net_banking",
        Cheque => "cheque",
        Insurance => "insurance",
        Wallet => "wallet",
        Online => "online",
    }
}

text_enum! {
    PaymentStatus ("payment status") {
        Completed => "completed",
        Pending => "pending",
        Failed => "failed",
        Refunded => "refunded",
        Cancelled => "cancelled",
        Processing => "processing",
    }
}

/// Money received against an invoice
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub payment_number: String,
    pub receipt_number: String,
    pub invoice_id: Uuid,
    pub patient_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub status: String,
    pub is_refunded: bool,
    pub refund_amount: Option<Decimal>,
    pub refund_date: Option<NaiveDateTime>,
    pub refund_reason: Option<String>,
    pub received_by: String,
    pub notes: Option<String>,
    pub paid_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordPayment {
    pub amount: Decimal,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundPayment {
    /// Defaults to the full payment amount
    pub amount: Option<Decimal>,
    pub reason: String,
}

impl Payment {
    pub fn new(
        invoice_id: Uuid,
        patient_id: Uuid,
        input: RecordPayment,
        method: PaymentMethod,
        received_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_number: reference_number("PAY"),
            receipt_number: reference_number("RCP"),
            invoice_id,
            patient_id,
            amount: input.amount,
            payment_method: method.as_str().to_string(),
            transaction_id: input.transaction_id,
            status: PaymentStatus::Completed.as_str().to_string(),
            is_refunded: false,
            refund_amount: None,
            refund_date: None,
            refund_reason: None,
            received_by,
            notes: input.notes,
            paid_at: utc_now(),
        }
    }

    pub fn status_enum(&self) -> PaymentStatus {
        self.status.parse().unwrap_or(PaymentStatus::Pending)
    }

    pub fn can_refund(&self) -> bool {
        self.status_enum() == PaymentStatus::Completed && !self.is_refunded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_payment_is_completed_and_refundable() {
        let payment = Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            RecordPayment {
                amount: Decimal::new(2500, 2),
                payment_method: "upi".into(),
                transaction_id: None,
                notes: None,
            },
            PaymentMethod::Upi,
            "Front Desk".into(),
        );
        assert!(payment.payment_number.starts_with("PAY-"));
        assert!(payment.receipt_number.starts_with("RCP-"));
        assert!(payment.can_refund());

        let mut refunded = payment.clone();
        refunded.is_refunded = true;
        assert!(!refunded.can_refund());
    }
}
