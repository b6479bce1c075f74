pub mod appointment_repository;
pub mod audit_repository;
pub mod billing_repository;
pub mod clinical_repository;
pub mod department_repository;
pub mod doctor_repository;
pub mod facility_repository;
pub mod patient_repository;
pub mod payroll_repository;
pub mod pharmacy_repository;
pub mod roster_repository;
pub mod staff_repository;
pub mod user_repository;

// Re-export all repositories for convenient access
pub use appointment_repository::AppointmentRepository;
pub use audit_repository::AuditRepository;
pub use billing_repository::BillingRepository;
pub use clinical_repository::ClinicalRepository;
pub use department_repository::DepartmentRepository;
pub use doctor_repository::DoctorRepository;
pub use facility_repository::FacilityRepository;
pub use patient_repository::{PatientFilter, PatientRepository};
pub use payroll_repository::{PayrollRepository, PayrollStatusChange};
pub use pharmacy_repository::PharmacyRepository;
pub use roster_repository::RosterRepository;
pub use staff_repository::StaffRepository;
pub use user_repository::{NewUser, UserRepository};

/// Offset pagination already clamped by the API layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip: skip.max(0),
            limit: limit.max(1),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: 20 }
    }
}

/// Optional trimmed filter value; blank strings mean "no filter"
pub(crate) fn filter_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
