use super::{reference_number, round_money, utc_now, Staff};
use crate::error::{AppError, AppResult};
use crate::validation::{fits_numeric, AMOUNT_DIGITS, PRICE_DIGITS};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    PayrollStatus ("payroll status") {
        Pending => "pending",
        Processed => "processed",
        Paid => "paid",
        OnHold => "on_hold",
        Cancelled => "cancelled",
    }
}

impl PayrollStatus {
    pub fn can_transition_to(&self, next: PayrollStatus) -> bool {
        use PayrollStatus::*;
        matches!(
            (*self, next),
            (Pending, Processed)
                | (Processed, Paid)
                | (Pending | Processed, OnHold)
                | (OnHold, Pending)
                | (Pending | Processed | OnHold, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payroll {
    pub id: Uuid,
    pub payroll_number: String,
    pub staff_id: Uuid,
    pub employee_name: String,
    pub employee_id: String,
    pub designation: Option<String>,
    pub month: i32,
    pub year: i32,
    pub pay_period_start: NaiveDate,
    pub pay_period_end: NaiveDate,
    pub basic_salary: Decimal,
    pub hra: Decimal,
    pub medical_allowance: Decimal,
    pub transport_allowance: Decimal,
    pub other_allowances: Decimal,
    pub overtime_hours: i32,
    pub overtime_amount: Decimal,
    pub bonus: Decimal,
    pub incentives: Decimal,
    pub gross_salary: Decimal,
    pub pf_deduction: Decimal,
    pub esi_deduction: Decimal,
    pub tax_deduction: Decimal,
    pub loan_deduction: Decimal,
    pub advance_deduction: Decimal,
    pub other_deductions: Decimal,
    pub total_deductions: Decimal,
    pub net_salary: Decimal,
    pub working_days: i32,
    pub present_days: i32,
    pub leave_days: i32,
    pub unpaid_leaves: i32,
    pub status: String,
    pub payment_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub approved_by: Option<String>,
    pub approval_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Salary components; missing amounts are zero
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratePayroll {
    pub staff_id: Uuid,
    pub month: i32,
    pub year: i32,
    /// Defaults to the staff member's salary
    pub basic_salary: Option<Decimal>,
    #[serde(default)]
    pub hra: Decimal,
    #[serde(default)]
    pub medical_allowance: Decimal,
    #[serde(default)]
    pub transport_allowance: Decimal,
    #[serde(default)]
    pub other_allowances: Decimal,
    #[serde(default)]
    pub overtime_hours: i32,
    #[serde(default)]
    pub overtime_amount: Decimal,
    #[serde(default)]
    pub bonus: Decimal,
    #[serde(default)]
    pub incentives: Decimal,
    #[serde(default)]
    pub pf_deduction: Decimal,
    #[serde(default)]
    pub esi_deduction: Decimal,
    #[serde(default)]
    pub tax_deduction: Decimal,
    #[serde(default)]
    pub loan_deduction: Decimal,
    #[serde(default)]
    pub advance_deduction: Decimal,
    #[serde(default)]
    pub other_deductions: Decimal,
    pub working_days: i32,
    pub present_days: i32,
    #[serde(default)]
    pub leave_days: i32,
    #[serde(default)]
    pub unpaid_leaves: i32,
    pub notes: Option<String>,
}

impl GeneratePayroll {
    /// Every money component with the digits of its column
    pub fn amounts(&self) -> [(&'static str, Decimal, u32); 14] {
        [
            ("basic_salary", self.basic_salary.unwrap_or_default(), AMOUNT_DIGITS),
            ("hra", self.hra, AMOUNT_DIGITS),
            ("medical_allowance", self.medical_allowance, AMOUNT_DIGITS),
            ("transport_allowance", self.transport_allowance, AMOUNT_DIGITS),
            ("other_allowances", self.other_allowances, AMOUNT_DIGITS),
            ("overtime_amount", self.overtime_amount, PRICE_DIGITS),
            ("bonus", self.bonus, PRICE_DIGITS),
            ("incentives", self.incentives, PRICE_DIGITS),
            ("pf_deduction", self.pf_deduction, PRICE_DIGITS),
            ("esi_deduction", self.esi_deduction, PRICE_DIGITS),
            ("tax_deduction", self.tax_deduction, PRICE_DIGITS),
            ("loan_deduction", self.loan_deduction, PRICE_DIGITS),
            ("advance_deduction", self.advance_deduction, PRICE_DIGITS),
            ("other_deductions", self.other_deductions, PRICE_DIGITS),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovePayroll {
    pub approved_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayPayroll {
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub payment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayrollFilter {
    pub staff_id: Option<Uuid>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayrollPeriod {
    pub month: i32,
    pub year: i32,
}

/// Aggregate for one pay period
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PayrollSummary {
    pub month: i32,
    pub year: i32,
    pub payroll_count: i64,
    pub total_gross: Decimal,
    pub total_deductions: Decimal,
    pub total_net: Decimal,
}

/// First and last day of the month, `None` for an invalid month
pub fn pay_period(month: i32, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let month = u32::try_from(month).ok()?;
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month_start = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let end = next_month_start.pred_opt()?;
    Some((start, end))
}

/// Sum of `parts` rounded to cents, failing when it overflows its column
fn column_total(field: &str, parts: &[Decimal]) -> AppResult<Decimal> {
    let total = parts
        .iter()
        .try_fold(Decimal::ZERO, |sum, part| sum.checked_add(*part))
        .map(round_money)
        .ok_or_else(|| AppError::Validation(format!("{} is too large", field)))?;
    fits_numeric(field, total, AMOUNT_DIGITS)?;
    Ok(total)
}

impl Payroll {
    /// Compute gross, deductions and net for `staff`. Inputs must already be validated.
    pub fn generate(
        staff: &Staff,
        input: GeneratePayroll,
        basic_salary: Decimal,
        period: (NaiveDate, NaiveDate),
    ) -> AppResult<Self> {
        let now = utc_now();
        let gross_salary = column_total(
            "Gross salary",
            &[
                basic_salary,
                input.hra,
                input.medical_allowance,
                input.transport_allowance,
                input.other_allowances,
                input.overtime_amount,
                input.bonus,
                input.incentives,
            ],
        )?;
        let total_deductions = column_total(
            "Total deductions",
            &[
                input.pf_deduction,
                input.esi_deduction,
                input.tax_deduction,
                input.loan_deduction,
                input.advance_deduction,
                input.other_deductions,
            ],
        )?;

        Ok(Self {
            id: Uuid::new_v4(),
            payroll_number: reference_number("PRL"),
            staff_id: staff.id,
            employee_name: staff.full_name(),
            employee_id: staff.employee_id.clone(),
            designation: Some(staff.designation.clone()),
            month: input.month,
            year: input.year,
            pay_period_start: period.0,
            pay_period_end: period.1,
            basic_salary,
            hra: input.hra,
            medical_allowance: input.medical_allowance,
            transport_allowance: input.transport_allowance,
            other_allowances: input.other_allowances,
            overtime_hours: input.overtime_hours,
            overtime_amount: input.overtime_amount,
            bonus: input.bonus,
            incentives: input.incentives,
            gross_salary,
            pf_deduction: input.pf_deduction,
            esi_deduction: input.esi_deduction,
            tax_deduction: input.tax_deduction,
            loan_deduction: input.loan_deduction,
            advance_deduction: input.advance_deduction,
            other_deductions: input.other_deductions,
            total_deductions,
            net_salary: round_money(gross_salary - total_deductions),
            working_days: input.working_days,
            present_days: input.present_days,
            leave_days: input.leave_days,
            unpaid_leaves: input.unpaid_leaves,
            status: PayrollStatus::Pending.as_str().to_string(),
            payment_date: None,
            payment_method: None,
            transaction_id: None,
            approved_by: None,
            approval_date: None,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn status_enum(&self) -> PayrollStatus {
        self.status.parse().unwrap_or(PayrollStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateStaff;

    fn staff() -> Staff {
        Staff::new(CreateStaff {
            user_id: None,
            first_name: "Elliot".into(),
            last_name: "Reid".into(),
            email: "elliot@sacred.heart".into(),
            phone: "5550101010".into(),
            employee_id: "EMP-42".into(),
            designation: "Resident".into(),
            department: None,
            role: "other".into(),
            joining_date: NaiveDate::from_ymd_opt(2021, 7, 1).unwrap(),
            shift: None,
            salary: Some(Decimal::new(300000, 2)),
            qualification: None,
            experience_years: 1,
        })
    }

    #[test]
    fn test_pay_period_bounds() {
        let (start, end) = pay_period(2, 2024).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let (_, end) = pay_period(12, 2023).unwrap();
        assert_eq!(end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        assert!(pay_period(13, 2024).is_none());
        assert!(pay_period(0, 2024).is_none());
    }

    #[test]
    fn test_generate_computes_gross_and_net() {
        let input = GeneratePayroll {
            staff_id: Uuid::new_v4(),
            month: 3,
            year: 2024,
            hra: Decimal::new(50000, 2),
            bonus: Decimal::new(10000, 2),
            pf_deduction: Decimal::new(36000, 2),
            tax_deduction: Decimal::new(20000, 2),
            working_days: 22,
            present_days: 20,
            ..Default::default()
        };
        let staff = staff();
        let period = pay_period(3, 2024).unwrap();
        let payroll = Payroll::generate(&staff, input, Decimal::new(300000, 2), period).unwrap();

        assert_eq!(payroll.gross_salary, Decimal::new(360000, 2));
        assert_eq!(payroll.total_deductions, Decimal::new(56000, 2));
        assert_eq!(payroll.net_salary, Decimal::new(304000, 2));
        assert_eq!(payroll.employee_name, "Elliot Reid");
        assert_eq!(payroll.status_enum(), PayrollStatus::Pending);
    }

    #[test]
    fn test_generate_rejects_totals_beyond_column() {
        let input = GeneratePayroll {
            staff_id: Uuid::new_v4(),
            month: 3,
            year: 2024,
            hra: Decimal::MAX,
            working_days: 22,
            present_days: 20,
            ..Default::default()
        };
        let period = pay_period(3, 2024).unwrap();
        let err = Payroll::generate(&staff(), input, Decimal::ONE, period).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_status_transitions() {
        use PayrollStatus::*;
        assert!(Pending.can_transition_to(Processed));
        assert!(Processed.can_transition_to(Paid));
        assert!(Processed.can_transition_to(OnHold));
        assert!(OnHold.can_transition_to(Pending));
        assert!(OnHold.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }
}
