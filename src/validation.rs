//! Input validation shared by the services.

use crate::error::{AppError, AppResult};
use crate::models::round_money;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{6,18}[0-9]$").expect("valid phone regex"));

static BLOOD_PRESSURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2,3}/\d{2,3}$").expect("valid blood pressure regex"));

/// Digits of the `NUMERIC(12, 2)` columns: invoice, payment and payroll totals
pub const AMOUNT_DIGITS: u32 = 12;
/// Digits of the `NUMERIC(10, 2)` columns: prices, fees and pharmacy totals
pub const PRICE_DIGITS: u32 = 10;
/// Digits of the `NUMERIC(5, 2)` measurement columns
pub const MEASURE_DIGITS: u32 = 5;

const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?/~`'\"\\";

pub fn validate_email(email: &str) -> AppResult<()> {
    if EMAIL_RE.is_match(email.trim()) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid email address: {}", email)))
    }
}

pub fn validate_phone(phone: &str) -> AppResult<()> {
    if PHONE_RE.is_match(phone.trim()) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid phone number: {}", phone)))
    }
}

/// Systolic over diastolic, e.g. `120/80`
pub fn validate_blood_pressure(reading: &str) -> AppResult<()> {
    if BLOOD_PRESSURE_RE.is_match(reading.trim()) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Blood pressure must look like 120/80, got {}",
            reading
        )))
    }
}

/// Password must contain upper, lower, digit and punctuation characters.
pub fn validate_password_strength(password: &str, min_length: usize) -> AppResult<()> {
    if password.chars().count() < min_length {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            min_length
        )));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::Validation(
            "Password must contain at least one uppercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AppError::Validation(
            "Password must contain at least one lowercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Password must contain at least one digit".into(),
        ));
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(AppError::Validation(
            "Password must contain at least one special character".into(),
        ));
    }
    Ok(())
}

/// Reject blank required strings, returning the trimmed value.
pub fn require_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub fn non_negative(field: &str, value: Decimal) -> AppResult<()> {
    if value < Decimal::ZERO {
        return Err(AppError::Validation(format!("{} cannot be negative", field)));
    }
    Ok(())
}

pub fn positive(field: &str, value: Decimal) -> AppResult<()> {
    if value <= Decimal::ZERO {
        return Err(AppError::Validation(format!("{} must be positive", field)));
    }
    Ok(())
}

pub fn percentage(field: &str, value: Decimal) -> AppResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(AppError::Validation(format!(
            "{} must be between 0 and 100",
            field
        )));
    }
    Ok(())
}

/// Smallest magnitude a `NUMERIC(digits, 2)` column cannot store
pub fn numeric_limit(digits: u32) -> Decimal {
    Decimal::from(10u64.pow(digits.saturating_sub(2)))
}

/// Reject values that a `NUMERIC(digits, 2)` column cannot store.
pub fn fits_numeric(field: &str, value: Decimal, digits: u32) -> AppResult<()> {
    let limit = numeric_limit(digits);
    if round_money(value).abs() >= limit {
        return Err(AppError::Validation(format!(
            "{} must be less than {}",
            field, limit
        )));
    }
    Ok(())
}

/// Whole years between `date_of_birth` and `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

pub fn validate_date_of_birth(date_of_birth: NaiveDate, today: NaiveDate) -> AppResult<()> {
    if date_of_birth > today {
        return Err(AppError::Validation(
            "Date of birth cannot be in the future".into(),
        ));
    }
    if age_on(date_of_birth, today) > 150 {
        return Err(AppError::Validation("Invalid date of birth".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(validate_email("nurse.joy@hospital.org").is_ok());
        assert!(validate_email("no-at-sign.org").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_phone_validation() {
        assert!(validate_phone("+1 555-123-4567").is_ok());
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("12ab").is_err());
    }

    #[test]
    fn test_blood_pressure_format() {
        assert!(validate_blood_pressure("120/80").is_ok());
        assert!(validate_blood_pressure(" 90/60 ").is_ok());
        assert!(validate_blood_pressure("120-80").is_err());
        assert!(validate_blood_pressure("1200/80").is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Str0ng!pass", 8).is_ok());
        assert!(validate_password_strength("Sh0rt!", 8).is_err());
        assert!(validate_password_strength("alllower1!", 8).is_err());
        assert!(validate_password_strength("ALLUPPER1!", 8).is_err());
        assert!(validate_password_strength("NoDigits!!", 8).is_err());
        assert!(validate_password_strength("NoSpecial11", 8).is_err());
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let dob = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), 23);
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 24);
    }

    #[test]
    fn test_date_of_birth_bounds() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(validate_date_of_birth(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), today).is_err());
        assert!(validate_date_of_birth(NaiveDate::from_ymd_opt(1850, 1, 1).unwrap(), today).is_err());
        assert!(validate_date_of_birth(NaiveDate::from_ymd_opt(1990, 3, 3).unwrap(), today).is_ok());
    }

    #[test]
    fn test_numeric_column_limits() {
        assert!(fits_numeric("Unit price", Decimal::new(999_999_999_999, 2), AMOUNT_DIGITS).is_ok());
        assert!(fits_numeric("Unit price", Decimal::new(10_000_000_000, 0), AMOUNT_DIGITS).is_err());
        // rounds up to the limit
        assert!(fits_numeric("Fee", Decimal::new(99_999_999_995, 3), PRICE_DIGITS).is_err());
        assert!(fits_numeric("Weight", Decimal::new(99999, 2), MEASURE_DIGITS).is_ok());
        assert!(fits_numeric("Weight", Decimal::new(1000, 0), MEASURE_DIGITS).is_err());
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(percentage("discount", Decimal::new(5000, 2)).is_ok());
        assert!(percentage("discount", Decimal::new(101, 0)).is_err());
        assert!(percentage("discount", Decimal::new(-1, 0)).is_err());
    }
}
