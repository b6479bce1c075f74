use super::{normalise_enum, parse_enum, AuditService};
use crate::error::{AppError, AppResult};
use crate::models::{
    pay_period, AuditAction, AuditEntry, GeneratePayroll, PayPayroll, Payroll, PayrollFilter,
    PayrollStatus, PayrollSummary, PaymentMethod,
};
use crate::repositories::{Page, PayrollRepository, PayrollStatusChange, StaffRepository};
use crate::validation::{fits_numeric, non_negative, AMOUNT_DIGITS};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

fn check_period(month: i32, year: i32) -> AppResult<(NaiveDate, NaiveDate)> {
    if !(1..=12).contains(&month) {
        return Err(AppError::Validation("Month must be between 1 and 12".to_string()));
    }
    if !(2000..=2100).contains(&year) {
        return Err(AppError::Validation(
            "Year must be between 2000 and 2100".to_string(),
        ));
    }
    pay_period(month, year)
        .ok_or_else(|| AppError::Validation(format!("Invalid pay period {}/{}", month, year)))
}

/// Shape checks that need no database access
fn check_components(input: &GeneratePayroll) -> AppResult<(NaiveDate, NaiveDate)> {
    let period = check_period(input.month, input.year)?;

    for (field, amount, digits) in input.amounts() {
        non_negative(field, amount)?;
        fits_numeric(field, amount, digits)?;
    }
    for (field, days) in [
        ("overtime_hours", input.overtime_hours),
        ("working_days", input.working_days),
        ("present_days", input.present_days),
        ("leave_days", input.leave_days),
        ("unpaid_leaves", input.unpaid_leaves),
    ] {
        if days < 0 {
            return Err(AppError::Validation(format!("{} cannot be negative", field)));
        }
    }
    if input.working_days > 31 {
        return Err(AppError::Validation(
            "working_days cannot exceed 31".to_string(),
        ));
    }
    if input.present_days > input.working_days {
        return Err(AppError::Validation(
            "Present days cannot exceed working days".to_string(),
        ));
    }
    Ok(period)
}

/// Monthly salary processing
pub struct PayrollService {
    payrolls: Arc<PayrollRepository>,
    staff: Arc<StaffRepository>,
    audit: Arc<AuditService>,
}

impl PayrollService {
    pub fn new(
        payrolls: Arc<PayrollRepository>,
        staff: Arc<StaffRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            payrolls,
            staff,
            audit,
        }
    }

    pub async fn generate(&self, input: GeneratePayroll, actor: Uuid) -> AppResult<Payroll> {
        let period = check_components(&input)?;

        let staff = self
            .staff
            .find_by_id(input.staff_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Staff member not found".to_string()))?;
        let basic_salary = input.basic_salary.or(staff.salary).ok_or_else(|| {
            AppError::Validation(
                "Basic salary is required when the staff member has no salary on file".to_string(),
            )
        })?;
        non_negative("basic_salary", basic_salary)?;
        fits_numeric("basic_salary", basic_salary, AMOUNT_DIGITS)?;

        if self
            .payrolls
            .exists_for_period(staff.id, input.month, input.year)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "Payroll already exists for {}/{}",
                input.month, input.year
            )));
        }

        let payroll = Payroll::generate(&staff, input, basic_salary, period)?;
        if payroll.net_salary < Decimal::ZERO {
            return Err(AppError::Validation(
                "Deductions cannot exceed gross salary".to_string(),
            ));
        }

        let payroll = self.payrolls.insert(&payroll).await?;
        info!(
            "Generated payroll {} for {} ({}/{}), net {}",
            payroll.payroll_number, payroll.employee_name, payroll.month, payroll.year, payroll.net_salary
        );
        self.audit
            .record(
                AuditEntry::new(AuditAction::Create, "payroll", Some(payroll.id), "Payroll generated")
                    .by(actor)
                    .with_details(serde_json::json!({
                        "staff_id": payroll.staff_id,
                        "month": payroll.month,
                        "year": payroll.year,
                        "net_salary": payroll.net_salary,
                    })),
            )
            .await;
        Ok(payroll)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Payroll> {
        self.payrolls
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payroll not found".to_string()))
    }

    pub async fn list(&self, mut filter: PayrollFilter, page: Page) -> AppResult<Vec<Payroll>> {
        filter.status = normalise_enum::<PayrollStatus>(filter.status.take())?;
        Ok(self.payrolls.list(&filter, page).await?)
    }

    async fn transition(
        &self,
        id: Uuid,
        next: PayrollStatus,
        change: PayrollStatusChange,
        action: AuditAction,
        actor: Uuid,
    ) -> AppResult<Payroll> {
        let payroll = self.payrolls.transition(id, next, change).await?;
        info!("Payroll {} is now {}", payroll.payroll_number, next);
        self.audit
            .record(
                AuditEntry::new(action, "payroll", Some(id), format!("Payroll {}", next)).by(actor),
            )
            .await;
        Ok(payroll)
    }

    pub async fn approve(&self, id: Uuid, approved_by: String, actor: Uuid) -> AppResult<Payroll> {
        let change = PayrollStatusChange {
            approved_by: Some(approved_by),
            ..Default::default()
        };
        self.transition(id, PayrollStatus::Processed, change, AuditAction::Approve, actor)
            .await
    }

    pub async fn pay(&self, id: Uuid, request: PayPayroll, actor: Uuid) -> AppResult<Payroll> {
        let method: PaymentMethod = parse_enum(&request.payment_method)?;
        let change = PayrollStatusChange {
            payment_method: Some(method.into()),
            transaction_id: request.transaction_id,
            payment_date: request.payment_date,
            ..Default::default()
        };
        self.transition(id, PayrollStatus::Paid, change, AuditAction::Payment, actor)
            .await
    }

    pub async fn hold(&self, id: Uuid, actor: Uuid) -> AppResult<Payroll> {
        self.transition(id, PayrollStatus::OnHold, PayrollStatusChange::default(), AuditAction::Update, actor)
            .await
    }

    pub async fn resume(&self, id: Uuid, actor: Uuid) -> AppResult<Payroll> {
        self.transition(id, PayrollStatus::Pending, PayrollStatusChange::default(), AuditAction::Update, actor)
            .await
    }

    pub async fn cancel(&self, id: Uuid, actor: Uuid) -> AppResult<Payroll> {
        self.transition(id, PayrollStatus::Cancelled, PayrollStatusChange::default(), AuditAction::Cancel, actor)
            .await
    }

    pub async fn summary(&self, month: i32, year: i32) -> AppResult<PayrollSummary> {
        check_period(month, year)?;
        Ok(self.payrolls.summary(month, year).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> GeneratePayroll {
        GeneratePayroll {
            staff_id: Uuid::new_v4(),
            month: 3,
            year: 2024,
            working_days: 22,
            present_days: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_period_ranges() {
        assert!(check_period(12, 2100).is_ok());
        assert!(check_period(0, 2024).is_err());
        assert!(check_period(13, 2024).is_err());
        assert!(check_period(6, 1999).is_err());
    }

    #[test]
    fn test_component_checks() {
        let (start, end) = check_components(&input()).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());

        let mut too_present = input();
        too_present.present_days = 23;
        assert!(matches!(
            check_components(&too_present),
            Err(AppError::Validation(msg)) if msg == "Present days cannot exceed working days"
        ));

        let mut negative_bonus = input();
        negative_bonus.bonus = Decimal::new(-500, 2);
        assert!(check_components(&negative_bonus).is_err());

        let mut huge_bonus = input();
        huge_bonus.bonus = Decimal::new(100_000_000, 0);
        assert!(matches!(
            check_components(&huge_bonus),
            Err(AppError::Validation(msg)) if msg == "bonus must be less than 100000000"
        ));
    }
}
