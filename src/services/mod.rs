pub mod appointment_service;
pub mod audit;
pub mod auth_service;
pub mod billing_service;
pub mod clinical_service;
pub mod directory_service;
pub mod facility_service;
pub mod notifier;
pub mod patient_service;
pub mod payroll_service;
pub mod pharmacy_service;
pub mod roster_service;

pub use appointment_service::AppointmentService;
pub use audit::AuditService;
pub use auth_service::AuthService;
pub use billing_service::BillingService;
pub use clinical_service::ClinicalService;
pub use directory_service::DirectoryService;
pub use facility_service::FacilityService;
pub use notifier::{LogOtpSender, OtpMessage, OtpSender, WebhookOtpSender};
pub use patient_service::PatientService;
pub use payroll_service::PayrollService;
pub use pharmacy_service::PharmacyService;
pub use roster_service::RosterService;

use crate::error::{AppError, AppResult};
use std::str::FromStr;

/// Parse a TEXT enum from client input, reporting a 400 on bad values
pub(crate) fn parse_enum<T>(value: &str) -> AppResult<T>
where
    T: FromStr<Err = String>,
{
    value.parse::<T>().map_err(AppError::Validation)
}

/// Parse an optional enum field and return its canonical stored form
pub(crate) fn normalise_enum<T>(value: Option<String>) -> AppResult<Option<String>>
where
    T: FromStr<Err = String> + Into<String>,
{
    value
        .map(|v| parse_enum::<T>(&v).map(Into::into))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BloodGroup, Gender};

    #[test]
    fn test_parse_enum_reports_validation_error() {
        assert_eq!(parse_enum::<Gender>("FEMALE").unwrap(), Gender::Female);
        assert!(matches!(parse_enum::<Gender>("x"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_normalise_enum_canonicalises_case() {
        assert_eq!(
            normalise_enum::<BloodGroup>(Some("ab-".into())).unwrap(),
            Some("AB-".to_string())
        );
        assert_eq!(normalise_enum::<BloodGroup>(None).unwrap(), None);
        assert!(normalise_enum::<BloodGroup>(Some("Z".into())).is_err());
    }
}
