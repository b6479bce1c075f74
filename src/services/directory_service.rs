use super::{normalise_enum, parse_enum, AuditService};
use crate::error::{AppError, AppResult};
use crate::models::{
    AuditAction, AuditEntry, CreateDepartment, CreateDoctor, CreateStaff, Department,
    DepartmentStatus, DepartmentType, Doctor, DoctorFilter, DoctorStatus, Shift, Staff,
    StaffFilter, StaffRole, StaffStatus, UpdateDepartment, UpdateDoctor, UpdateStaff,
};
use crate::repositories::{DepartmentRepository, DoctorRepository, Page, StaffRepository};
use crate::validation::{
    fits_numeric, non_negative, require_text, validate_email, validate_phone, AMOUNT_DIGITS,
    PRICE_DIGITS,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

fn check_doctor_numbers(
    years_of_experience: Option<i32>,
    consultation_fee: Option<Decimal>,
    average_consultation_time: Option<i32>,
    max_appointments_per_day: Option<i32>,
) -> AppResult<()> {
    if matches!(years_of_experience, Some(y) if y < 0) {
        return Err(AppError::Validation(
            "Years of experience cannot be negative".to_string(),
        ));
    }
    if let Some(fee) = consultation_fee {
        non_negative("Consultation fee", fee)?;
        fits_numeric("Consultation fee", fee, PRICE_DIGITS)?;
    }
    if matches!(average_consultation_time, Some(t) if t <= 0) {
        return Err(AppError::Validation(
            "Average consultation time must be positive".to_string(),
        ));
    }
    if matches!(max_appointments_per_day, Some(m) if m <= 0) {
        return Err(AppError::Validation(
            "Max appointments per day must be positive".to_string(),
        ));
    }
    Ok(())
}

fn check_rating(rating: Option<Decimal>) -> AppResult<()> {
    match rating {
        Some(r) if r < Decimal::ZERO || r > Decimal::from(5) => Err(AppError::Validation(
            "Rating must be between 0 and 5".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Departments, doctors and non-physician staff
pub struct DirectoryService {
    departments: Arc<DepartmentRepository>,
    doctors: Arc<DoctorRepository>,
    staff: Arc<StaffRepository>,
    audit: Arc<AuditService>,
}

impl DirectoryService {
    pub fn new(
        departments: Arc<DepartmentRepository>,
        doctors: Arc<DoctorRepository>,
        staff: Arc<StaffRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            departments,
            doctors,
            staff,
            audit,
        }
    }

    async fn record(&self, action: AuditAction, resource: &'static str, id: Uuid, what: &str, actor: Uuid) {
        self.audit
            .record(AuditEntry::new(action, resource, Some(id), what).by(actor))
            .await;
    }

    // Departments

    pub async fn create_department(&self, input: CreateDepartment, actor: Uuid) -> AppResult<Department> {
        require_text("Department name", &input.name)?;
        require_text("Department code", &input.code)?;
        if let Some(email) = &input.email {
            validate_email(email)?;
        }
        let department_type: DepartmentType = parse_enum(&input.department_type)?;

        let department = self
            .departments
            .insert(&Department::new(input, department_type))
            .await?;
        info!("Created department {} ({})", department.code, department.id);
        self.record(AuditAction::Create, "department", department.id, "Department created", actor)
            .await;
        Ok(department)
    }

    pub async fn get_department(&self, id: Uuid) -> AppResult<Department> {
        self.departments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Department not found".to_string()))
    }

    pub async fn list_departments(&self, status: Option<String>, page: Page) -> AppResult<Vec<Department>> {
        let status = normalise_enum::<DepartmentStatus>(status)?;
        Ok(self.departments.list(status, page).await?)
    }

    pub async fn update_department(
        &self,
        id: Uuid,
        mut update: UpdateDepartment,
        actor: Uuid,
    ) -> AppResult<Department> {
        if let Some(name) = &update.name {
            require_text("Department name", name)?;
        }
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        update.department_type = normalise_enum::<DepartmentType>(update.department_type.take())?;
        update.status = normalise_enum::<DepartmentStatus>(update.status.take())?;

        let mut department = self.get_department(id).await?;
        department.apply(update);
        let department = self.departments.update(&department).await?;
        self.record(AuditAction::Update, "department", id, "Department updated", actor)
            .await;
        Ok(department)
    }

    pub async fn delete_department(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if !self.departments.delete(id).await? {
            return Err(AppError::NotFound("Department not found".to_string()));
        }
        self.record(AuditAction::Delete, "department", id, "Department deleted", actor)
            .await;
        Ok(())
    }

    // Doctors

    pub async fn create_doctor(&self, input: CreateDoctor, actor: Uuid) -> AppResult<Doctor> {
        require_text("First name", &input.first_name)?;
        require_text("Last name", &input.last_name)?;
        require_text("Specialization", &input.specialization)?;
        require_text("Medical license number", &input.medical_license_number)?;
        validate_email(&input.email)?;
        validate_phone(&input.phone)?;
        check_doctor_numbers(
            Some(input.years_of_experience),
            input.consultation_fee,
            input.average_consultation_time,
            input.max_appointments_per_day,
        )?;

        let doctor = self.doctors.insert(&Doctor::new(input)).await?;
        info!("Registered {} ({})", doctor.display_name(), doctor.doctor_code);
        self.record(AuditAction::Create, "doctor", doctor.id, "Doctor registered", actor)
            .await;
        Ok(doctor)
    }

    pub async fn get_doctor(&self, id: Uuid) -> AppResult<Doctor> {
        self.doctors
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))
    }

    pub async fn list_doctors(&self, filter: &DoctorFilter, page: Page) -> AppResult<Vec<Doctor>> {
        Ok(self.doctors.list(filter, page).await?)
    }

    pub async fn update_doctor(&self, id: Uuid, mut update: UpdateDoctor, actor: Uuid) -> AppResult<Doctor> {
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        if let Some(phone) = &update.phone {
            validate_phone(phone)?;
        }
        check_doctor_numbers(
            update.years_of_experience,
            update.consultation_fee,
            update.average_consultation_time,
            update.max_appointments_per_day,
        )?;
        check_rating(update.rating)?;
        update.status = normalise_enum::<DoctorStatus>(update.status.take())?;

        let mut doctor = self.get_doctor(id).await?;
        doctor.apply(update);
        let doctor = self.doctors.update(&doctor).await?;
        self.record(AuditAction::Update, "doctor", id, "Doctor updated", actor)
            .await;
        Ok(doctor)
    }

    pub async fn set_doctor_availability(&self, id: Uuid, is_available: bool, actor: Uuid) -> AppResult<Doctor> {
        let doctor = self.doctors.set_availability(id, is_available).await?;
        info!("{} availability set to {}", doctor.display_name(), is_available);
        self.record(
            AuditAction::Update,
            "doctor",
            id,
            if is_available { "Doctor marked available" } else { "Doctor marked unavailable" },
            actor,
        )
        .await;
        Ok(doctor)
    }

    pub async fn delete_doctor(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if !self.doctors.delete(id).await? {
            return Err(AppError::NotFound("Doctor not found".to_string()));
        }
        self.record(AuditAction::Delete, "doctor", id, "Doctor deleted", actor)
            .await;
        Ok(())
    }

    // Staff

    pub async fn create_staff(&self, mut input: CreateStaff, actor: Uuid) -> AppResult<Staff> {
        require_text("First name", &input.first_name)?;
        require_text("Last name", &input.last_name)?;
        require_text("Employee id", &input.employee_id)?;
        require_text("Designation", &input.designation)?;
        validate_email(&input.email)?;
        validate_phone(&input.phone)?;
        if let Some(salary) = input.salary {
            non_negative("Salary", salary)?;
            fits_numeric("Salary", salary, AMOUNT_DIGITS)?;
        }
        if input.experience_years < 0 {
            return Err(AppError::Validation(
                "Experience years cannot be negative".to_string(),
            ));
        }
        input.role = parse_enum::<StaffRole>(&input.role)?.into();
        input.shift = normalise_enum::<Shift>(input.shift.take())?;

        let staff = self.staff.insert(&Staff::new(input)).await?;
        info!("Registered staff member {} ({})", staff.full_name(), staff.staff_code);
        self.record(AuditAction::Create, "staff", staff.id, "Staff member registered", actor)
            .await;
        Ok(staff)
    }

    pub async fn get_staff(&self, id: Uuid) -> AppResult<Staff> {
        self.staff
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Staff member not found".to_string()))
    }

    pub async fn list_staff(&self, filter: &StaffFilter, page: Page) -> AppResult<Vec<Staff>> {
        Ok(self.staff.list(filter, page).await?)
    }

    pub async fn update_staff(&self, id: Uuid, mut update: UpdateStaff, actor: Uuid) -> AppResult<Staff> {
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        if let Some(phone) = &update.phone {
            validate_phone(phone)?;
        }
        if let Some(salary) = update.salary {
            non_negative("Salary", salary)?;
            fits_numeric("Salary", salary, AMOUNT_DIGITS)?;
        }
        update.role = normalise_enum::<StaffRole>(update.role.take())?;
        update.shift = normalise_enum::<Shift>(update.shift.take())?;
        update.status = normalise_enum::<StaffStatus>(update.status.take())?;

        let mut staff = self.get_staff(id).await?;
        staff.apply(update);
        let staff = self.staff.update(&staff).await?;
        self.record(AuditAction::Update, "staff", id, "Staff member updated", actor)
            .await;
        Ok(staff)
    }

    pub async fn delete_staff(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if !self.staff.delete(id).await? {
            return Err(AppError::NotFound("Staff member not found".to_string()));
        }
        self.record(AuditAction::Delete, "staff", id, "Staff member deleted", actor)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctor_numbers() {
        assert!(check_doctor_numbers(Some(0), Some(Decimal::ZERO), Some(15), Some(1)).is_ok());
        assert!(check_doctor_numbers(Some(-1), None, None, None).is_err());
        assert!(check_doctor_numbers(None, Some(Decimal::new(-1, 0)), None, None).is_err());
        assert!(check_doctor_numbers(None, None, Some(0), None).is_err());
        assert!(check_doctor_numbers(None, None, None, Some(0)).is_err());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(check_rating(None).is_ok());
        assert!(check_rating(Some(Decimal::new(45, 1))).is_ok());
        assert!(check_rating(Some(Decimal::from(5))).is_ok());
        assert!(check_rating(Some(Decimal::new(51, 1))).is_err());
    }
}
