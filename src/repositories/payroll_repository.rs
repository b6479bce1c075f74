use super::{filter_text, Page};
use crate::error::RepositoryError;
use crate::models::{Payroll, PayrollFilter, PayrollStatus, PayrollSummary};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

/// Extra columns written alongside a status change
#[derive(Debug, Clone, Default)]
pub struct PayrollStatusChange {
    pub approved_by: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_date: Option<NaiveDate>,
}

/// Repository for monthly payroll records
pub struct PayrollRepository {
    pool: PgPool,
}

impl PayrollRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, payroll: &Payroll) -> Result<Payroll, RepositoryError> {
        let created = sqlx::query_as::<_, Payroll>(
            r#"
            INSERT INTO payrolls (
                id, payroll_number, staff_id, employee_name, employee_id, designation, month,
                year, pay_period_start, pay_period_end, basic_salary, hra, medical_allowance,
                transport_allowance, other_allowances, overtime_hours, overtime_amount, bonus,
                incentives, gross_salary, pf_deduction, esi_deduction, tax_deduction,
                loan_deduction, advance_deduction, other_deductions, total_deductions,
                net_salary, working_days, present_days, leave_days, unpaid_leaves, status,
                notes, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
                $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34,
                $35, $36
            )
            RETURNING *
            "#,
        )
        .bind(payroll.id)
        .bind(&payroll.payroll_number)
        .bind(payroll.staff_id)
        .bind(&payroll.employee_name)
        .bind(&payroll.employee_id)
        .bind(&payroll.designation)
        .bind(payroll.month)
        .bind(payroll.year)
        .bind(payroll.pay_period_start)
        .bind(payroll.pay_period_end)
        .bind(payroll.basic_salary)
        .bind(payroll.hra)
        .bind(payroll.medical_allowance)
        .bind(payroll.transport_allowance)
        .bind(payroll.other_allowances)
        .bind(payroll.overtime_hours)
        .bind(payroll.overtime_amount)
        .bind(payroll.bonus)
        .bind(payroll.incentives)
        .bind(payroll.gross_salary)
        .bind(payroll.pf_deduction)
        .bind(payroll.esi_deduction)
        .bind(payroll.tax_deduction)
        .bind(payroll.loan_deduction)
        .bind(payroll.advance_deduction)
        .bind(payroll.other_deductions)
        .bind(payroll.total_deductions)
        .bind(payroll.net_salary)
        .bind(payroll.working_days)
        .bind(payroll.present_days)
        .bind(payroll.leave_days)
        .bind(payroll.unpaid_leaves)
        .bind(&payroll.status)
        .bind(&payroll.notes)
        .bind(payroll.created_at)
        .bind(payroll.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match RepositoryError::from(e) {
            RepositoryError::Duplicate(_) => RepositoryError::Duplicate(format!(
                "Payroll already exists for {}/{}",
                payroll.month, payroll.year
            )),
            other => other,
        })?;

        Ok(created)
    }

    pub async fn exists_for_period(
        &self,
        staff_id: Uuid,
        month: i32,
        year: i32,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM payrolls WHERE staff_id = $1 AND month = $2 AND year = $3)",
        )
        .bind(staff_id)
        .bind(month)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Payroll>, RepositoryError> {
        let payroll = sqlx::query_as::<_, Payroll>("SELECT * FROM payrolls WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payroll)
    }

    pub async fn list(&self, filter: &PayrollFilter, page: Page) -> Result<Vec<Payroll>, RepositoryError> {
        let payrolls = sqlx::query_as::<_, Payroll>(
            r#"
            SELECT * FROM payrolls
            WHERE ($1::uuid IS NULL OR staff_id = $1)
              AND ($2::int4 IS NULL OR month = $2)
              AND ($3::int4 IS NULL OR year = $3)
              AND ($4::text IS NULL OR status = $4)
            ORDER BY year DESC, month DESC, employee_name
            OFFSET $5 LIMIT $6
            "#,
        )
        .bind(filter.staff_id)
        .bind(filter.month)
        .bind(filter.year)
        .bind(filter_text(&filter.status))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(payrolls)
    }

    /// Move a payroll to `next`, recording approval or payment details
    pub async fn transition(
        &self,
        id: Uuid,
        next: PayrollStatus,
        change: PayrollStatusChange,
    ) -> Result<Payroll, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Payroll>("SELECT * FROM payrolls WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Payroll not found".to_string()))?;

        if !current.status_enum().can_transition_to(next) {
            return Err(RepositoryError::BusinessRule(format!(
                "Cannot change payroll from {} to {}",
                current.status, next
            )));
        }

        let updated = sqlx::query_as::<_, Payroll>(
            r#"
            UPDATE payrolls SET
                status = $2,
                approved_by = COALESCE($3, approved_by),
                approval_date = CASE WHEN $2 = 'processed'
                    THEN (NOW() AT TIME ZONE 'utc')::date ELSE approval_date END,
                payment_method = COALESCE($4, payment_method),
                transaction_id = COALESCE($5, transaction_id),
                payment_date = CASE WHEN $2 = 'paid'
                    THEN COALESCE($6, (NOW() AT TIME ZONE 'utc')::date) ELSE payment_date END,
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .bind(change.approved_by)
        .bind(change.payment_method)
        .bind(change.transaction_id)
        .bind(change.payment_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Totals for one month, cancelled payrolls excluded
    pub async fn summary(&self, month: i32, year: i32) -> Result<PayrollSummary, RepositoryError> {
        let summary = sqlx::query_as::<_, PayrollSummary>(
            r#"
            SELECT
                $1::int4 AS month,
                $2::int4 AS year,
                COUNT(*) AS payroll_count,
                COALESCE(SUM(gross_salary), 0) AS total_gross,
                COALESCE(SUM(total_deductions), 0) AS total_deductions,
                COALESCE(SUM(net_salary), 0) AS total_net
            FROM payrolls
            WHERE month = $1 AND year = $2 AND status <> 'cancelled'
            "#,
        )
        .bind(month)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }
}
