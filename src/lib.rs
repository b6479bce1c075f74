//! Hospital Backend Library
//!
//! Exposes the backend components for the binary and for integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod maintenance;
pub mod models;
pub mod repositories;
pub mod services;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use auth::TokenService;
use database::Database;
use maintenance::MaintenanceWorker;
use repositories::*;
use services::*;
use std::sync::Arc;
use tracing::info;

/// Application state shared by every request handler
pub struct AppState {
    pub config: AppConfig,
    pub database: Database,
    pub tokens: Arc<TokenService>,
    pub users: Arc<UserRepository>,
    pub appointment_repo: Arc<AppointmentRepository>,
    pub pharmacy_repo: Arc<PharmacyRepository>,
    pub audit: Arc<AuditService>,
    pub auth: Arc<AuthService>,
    pub patients: Arc<PatientService>,
    pub directory: Arc<DirectoryService>,
    pub facilities: Arc<FacilityService>,
    pub appointments: Arc<AppointmentService>,
    pub billing: Arc<BillingService>,
    pub pharmacy: Arc<PharmacyService>,
    pub payroll: Arc<PayrollService>,
    pub roster: Arc<RosterService>,
    pub clinical: Arc<ClinicalService>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: sqlx::PgPool, config: AppConfig) -> AppResult<Self> {
        let sender: Arc<dyn OtpSender> = match config.security.otp_webhook_url.as_deref() {
            Some(url) => {
                info!("OTP codes will be delivered via webhook");
                Arc::new(WebhookOtpSender::new(url)?)
            }
            None => Arc::new(LogOtpSender),
        };
        Self::with_otp_sender(pool, config, sender)
    }

    /// Same as [`AppState::new`] with an explicit OTP delivery backend
    pub fn with_otp_sender(
        pool: sqlx::PgPool,
        config: AppConfig,
        sender: Arc<dyn OtpSender>,
    ) -> AppResult<Self> {
        let database = Database::new(pool.clone());

        let users = Arc::new(UserRepository::new(pool.clone()));
        let patient_repo = Arc::new(PatientRepository::new(pool.clone()));
        let department_repo = Arc::new(DepartmentRepository::new(pool.clone()));
        let doctor_repo = Arc::new(DoctorRepository::new(pool.clone()));
        let staff_repo = Arc::new(StaffRepository::new(pool.clone()));
        let facility_repo = Arc::new(FacilityRepository::new(pool.clone()));
        let appointment_repo = Arc::new(AppointmentRepository::new(pool.clone()));
        let billing_repo = Arc::new(BillingRepository::new(pool.clone()));
        let pharmacy_repo = Arc::new(PharmacyRepository::new(pool.clone()));
        let payroll_repo = Arc::new(PayrollRepository::new(pool.clone()));
        let roster_repo = Arc::new(RosterRepository::new(pool.clone()));
        let clinical_repo = Arc::new(ClinicalRepository::new(pool.clone()));
        let audit_repo = Arc::new(AuditRepository::new(pool));

        let audit = Arc::new(AuditService::new(audit_repo, config.audit_log_dir.clone())?);
        let tokens = Arc::new(TokenService::new(&config.security));

        Ok(Self {
            auth: Arc::new(AuthService::new(
                users.clone(),
                tokens.clone(),
                sender,
                audit.clone(),
                config.security.clone(),
            )),
            patients: Arc::new(PatientService::new(patient_repo.clone(), audit.clone())),
            directory: Arc::new(DirectoryService::new(
                department_repo.clone(),
                doctor_repo.clone(),
                staff_repo.clone(),
                audit.clone(),
            )),
            facilities: Arc::new(FacilityService::new(facility_repo, audit.clone())),
            appointments: Arc::new(AppointmentService::new(
                appointment_repo.clone(),
                patient_repo.clone(),
                doctor_repo.clone(),
                audit.clone(),
            )),
            billing: Arc::new(BillingService::new(
                billing_repo,
                patient_repo.clone(),
                appointment_repo.clone(),
                audit.clone(),
            )),
            pharmacy: Arc::new(PharmacyService::new(
                pharmacy_repo.clone(),
                patient_repo.clone(),
                audit.clone(),
            )),
            roster: Arc::new(RosterService::new(
                roster_repo,
                doctor_repo.clone(),
                department_repo,
                audit.clone(),
            )),
            clinical: Arc::new(ClinicalService::new(
                clinical_repo,
                patient_repo,
                doctor_repo,
                appointment_repo.clone(),
                pharmacy_repo.clone(),
                audit.clone(),
            )),
            payroll: Arc::new(PayrollService::new(payroll_repo, staff_repo, audit.clone())),
            config,
            database,
            tokens,
            users,
            appointment_repo,
            pharmacy_repo,
            audit,
        })
    }

    /// Background housekeeping configured from this state
    pub fn maintenance_worker(&self) -> MaintenanceWorker {
        MaintenanceWorker::new(
            self.appointment_repo.clone(),
            self.users.clone(),
            self.pharmacy_repo.clone(),
        )
        .with_interval(self.config.maintenance_interval())
        .with_no_show_grace(self.config.no_show_grace_minutes)
    }
}
