use super::utc_now;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    DepartmentType ("department type") {
        Clinical => "clinical",
        Diagnostic => "diagnostic",
        Support => "support",
        Administrative => "administrative",
        Emergency => "emergency",
        Surgical => "surgical",
        Medical => "medical",
        Pediatric => "pediatric",
    }
}

text_enum! {
    DepartmentStatus ("department status") {
        Active => "active",
        Inactive => "inactive",
        UnderMaintenance => "under_maintenance",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub department_type: String,
    pub floor_id: Option<Uuid>,
    pub head_doctor_id: Option<Uuid>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub is_emergency_department: bool,
    pub is_24x7: bool,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDepartment {
    pub name: String,
    pub code: String,
    pub department_type: String,
    pub floor_id: Option<Uuid>,
    pub head_doctor_id: Option<Uuid>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub is_emergency_department: bool,
    #[serde(default)]
    pub is_24x7: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDepartment {
    pub name: Option<String>,
    pub department_type: Option<String>,
    pub floor_id: Option<Uuid>,
    pub head_doctor_id: Option<Uuid>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub is_emergency_department: Option<bool>,
    pub is_24x7: Option<bool>,
    pub description: Option<String>,
}

impl Department {
    pub fn new(input: CreateDepartment, department_type: DepartmentType) -> Self {
        let now = utc_now();
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_uppercase(),
            department_type: department_type.as_str().to_string(),
            floor_id: input.floor_id,
            head_doctor_id: input.head_doctor_id,
            contact_number: input.contact_number,
            email: input.email,
            status: DepartmentStatus::Active.as_str().to_string(),
            is_emergency_department: input.is_emergency_department
                || department_type == DepartmentType::Emergency,
            is_24x7: input.is_24x7,
            description: input.description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateDepartment) {
        if let Some(v) = update.name {
            self.name = v;
        }
        if let Some(v) = update.department_type {
            self.department_type = v;
        }
        if update.floor_id.is_some() {
            self.floor_id = update.floor_id;
        }
        if update.head_doctor_id.is_some() {
            self.head_doctor_id = update.head_doctor_id;
        }
        if update.contact_number.is_some() {
            self.contact_number = update.contact_number;
        }
        if update.email.is_some() {
            self.email = update.email;
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        if let Some(v) = update.is_emergency_department {
            self.is_emergency_department = v;
        }
        if let Some(v) = update.is_24x7 {
            self.is_24x7 = v;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        self.updated_at = utc_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emergency_type_marks_emergency_department() {
        let dept = Department::new(
            CreateDepartment {
                name: "Accident & Emergency".into(),
                code: "er".into(),
                department_type: "emergency".into(),
                floor_id: None,
                head_doctor_id: None,
                contact_number: None,
                email: None,
                is_emergency_department: false,
                is_24x7: true,
                description: None,
            },
            DepartmentType::Emergency,
        );
        assert_eq!(dept.code, "ER");
        assert!(dept.is_emergency_department);
        assert_eq!(dept.status, "active");
    }
}
