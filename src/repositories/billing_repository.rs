use super::{filter_text, Page};
use crate::error::RepositoryError;
use crate::models::{
    round_money, AppointmentPaymentStatus, Invoice, InvoiceFilter, InvoiceItem, InvoiceStatus,
    Payment, PaymentStatus,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for invoices, their line items and payments
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_invoice(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Invoice, RepositoryError> {
        sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Invoice not found".to_string()))
    }

    async fn save_amounts(
        tx: &mut Transaction<'_, Postgres>,
        invoice: &Invoice,
    ) -> Result<Invoice, RepositoryError> {
        let saved = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET paid_amount = $2, balance_due = $3, status = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(invoice.id)
        .bind(invoice.paid_amount)
        .bind(invoice.balance_due)
        .bind(&invoice.status)
        .bind(invoice.updated_at)
        .fetch_one(&mut **tx)
        .await?;
        Ok(saved)
    }

    /// Insert an invoice together with all of its line items
    pub async fn create_invoice(
        &self,
        invoice: &Invoice,
        items: &[InvoiceItem],
    ) -> Result<Invoice, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                id, invoice_number, patient_id, appointment_id, invoice_date, due_date,
                subtotal, discount_percent, discount_amount, tax_percent, tax_amount,
                total_amount, paid_amount, balance_due, status, notes, created_by,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19)
            RETURNING *
            "#,
        )
        .bind(invoice.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.patient_id)
        .bind(invoice.appointment_id)
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(invoice.subtotal)
        .bind(invoice.discount_percent)
        .bind(invoice.discount_amount)
        .bind(invoice.tax_percent)
        .bind(invoice.tax_amount)
        .bind(invoice.total_amount)
        .bind(invoice.paid_amount)
        .bind(invoice.balance_due)
        .bind(&invoice.status)
        .bind(&invoice.notes)
        .bind(invoice.created_by)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (id, invoice_id, description, category, quantity, unit_price, amount)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id)
            .bind(created.id)
            .bind(&item.description)
            .bind(&item.category)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    pub async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>, RepositoryError> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    pub async fn invoice_items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, RepositoryError> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = $1 ORDER BY description",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn invoice_payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>, RepositoryError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE invoice_id = $1 ORDER BY paid_at",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    pub async fn list_invoices(
        &self,
        filter: &InvoiceFilter,
        page: Page,
    ) -> Result<Vec<Invoice>, RepositoryError> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
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
        Ok(invoices)
    }

    /// Cancel an invoice that has not received any money
    pub async fn cancel_invoice(&self, id: Uuid) -> Result<Invoice, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let invoice = Self::lock_invoice(&mut tx, id).await?;
        if invoice.paid_amount > Decimal::ZERO {
            return Err(RepositoryError::BusinessRule(
                "Cannot cancel an invoice with payments; refund them first".to_string(),
            ));
        }
        if invoice.status_enum() == InvoiceStatus::Cancelled {
            return Err(RepositoryError::BusinessRule(
                "Invoice is already cancelled".to_string(),
            ));
        }

        let cancelled = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = 'cancelled', balance_due = 0, updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(cancelled)
    }

    /// Apply a payment to its invoice
    ///
    /// When the invoice becomes fully paid its appointment, if any, is
    /// marked paid in the same transaction.
    pub async fn record_payment(&self, payment: &Payment) -> Result<(Payment, Invoice), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut invoice = Self::lock_invoice(&mut tx, payment.invoice_id).await?;
        if !invoice.status_enum().accepts_payments() {
            return Err(RepositoryError::BusinessRule(format!(
                "Invoice {} is {} and cannot accept payments",
                invoice.invoice_number, invoice.status
            )));
        }
        if payment.amount > invoice.balance_due {
            return Err(RepositoryError::BusinessRule(format!(
                "Payment amount {} exceeds balance due {}",
                payment.amount, invoice.balance_due
            )));
        }

        let created = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                id, payment_number, receipt_number, invoice_id, patient_id, amount,
                payment_method, transaction_id, status, is_refunded, received_by, notes, paid_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(payment.id)
        .bind(&payment.payment_number)
        .bind(&payment.receipt_number)
        .bind(invoice.id)
        .bind(invoice.patient_id)
        .bind(payment.amount)
        .bind(&payment.payment_method)
        .bind(&payment.transaction_id)
        .bind(&payment.status)
        .bind(payment.is_refunded)
        .bind(&payment.received_by)
        .bind(&payment.notes)
        .bind(payment.paid_at)
        .fetch_one(&mut *tx)
        .await?;

        invoice.set_paid_amount(invoice.paid_amount + payment.amount);
        let invoice = Self::save_amounts(&mut tx, &invoice).await?;

        if invoice.status_enum() == InvoiceStatus::Paid {
            if let Some(appointment_id) = invoice.appointment_id {
                sqlx::query(
                    r#"
                    UPDATE appointments
                    SET payment_status = 'paid', updated_at = (NOW() AT TIME ZONE 'utc')
                    WHERE id = $1
                    "#,
                )
                .bind(appointment_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok((created, invoice))
    }

    pub async fn find_payment(&self, id: Uuid) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    /// Refund all or part of a completed payment
    pub async fn refund_payment(
        &self,
        payment_id: Uuid,
        amount: Option<Decimal>,
        reason: &str,
    ) -> Result<(Payment, Invoice), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1 FOR UPDATE")
            .bind(payment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Payment not found".to_string()))?;

        if !payment.can_refund() {
            return Err(RepositoryError::BusinessRule(
                "Only completed, unrefunded payments can be refunded".to_string(),
            ));
        }

        let refund = round_money(amount.unwrap_or(payment.amount));
        if refund <= Decimal::ZERO || refund > payment.amount {
            return Err(RepositoryError::InvalidInput(format!(
                "Refund amount must be greater than 0 and at most {}",
                payment.amount
            )));
        }

        let refunded = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $2, is_refunded = TRUE, refund_amount = $3,
                refund_date = (NOW() AT TIME ZONE 'utc'), refund_reason = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(PaymentStatus::Refunded.as_str())
        .bind(refund)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        let mut invoice = Self::lock_invoice(&mut tx, payment.invoice_id).await?;
        invoice.set_paid_amount(invoice.paid_amount - refund);
        if invoice.paid_amount.is_zero() {
            invoice.status = InvoiceStatus::Refunded.as_str().to_string();
        }
        let invoice = Self::save_amounts(&mut tx, &invoice).await?;

        if let Some(appointment_id) = invoice.appointment_id {
            let payment_status = match invoice.status_enum() {
                InvoiceStatus::Paid => AppointmentPaymentStatus::Paid,
                InvoiceStatus::Refunded => AppointmentPaymentStatus::Refunded,
                _ => AppointmentPaymentStatus::Pending,
            };
            sqlx::query(
                r#"
                UPDATE appointments
                SET payment_status = $2, updated_at = (NOW() AT TIME ZONE 'utc')
                WHERE id = $1
                "#,
            )
            .bind(appointment_id)
            .bind(payment_status.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok((refunded, invoice))
    }
}
