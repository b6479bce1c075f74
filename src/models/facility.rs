//! Floors, wards and beds.

use super::{round_money, utc_now};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const MIN_FLOOR_NUMBER: i32 = -10;
pub const MAX_FLOOR_NUMBER: i32 = 100;

text_enum! {
    WardType ("ward type") {
        General => "general",
        Private => "private",
        SemiPrivate => "semi_private",
        Icu => "icu",
        Nicu => "nicu",
        Picu => "picu",
        Ccu => "ccu",
        Cardiac => "cardiac",
        Maternity => "maternity",
        Pediatric => "pediatric",
        Surgical => "surgical",
        Emergency => "emergency",
        Isolation => "isolation",
        Burn => "burn",
    }
}

impl WardType {
    pub fn is_critical_care(&self) -> bool {
        matches!(
            self,
            WardType::Icu | WardType::Nicu | WardType::Picu | WardType::Cardiac | WardType::Ccu
        )
    }
}

text_enum! {
    WardStatus ("ward status") {
        Active => "active",
        Inactive => "inactive",
        UnderMaintenance => "under_maintenance",
        Closed => "closed",
    }
}

text_enum! {
    BedType ("bed type") {
        Standard => "standard",
        Electric => "electric",
        Icu => "icu",
        Pediatric => "pediatric",
        Bariatric => "bariatric",
        Maternity => "maternity",
        Stretcher => "stretcher",
    }
}

text_enum! {
    BedStatus ("bed status") {
        Available => "available",
        Occupied => "occupied",
        Maintenance => "maintenance",
        Reserved => "reserved",
        Cleaning => "cleaning",
        OutOfService => "out_of_service",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Floor {
    pub id: Uuid,
    pub floor_number: i32,
    pub floor_name: String,
    pub floor_type: Option<String>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFloor {
    pub floor_number: i32,
    pub floor_name: String,
    pub floor_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFloor {
    pub floor_name: Option<String>,
    pub floor_type: Option<String>,
    pub description: Option<String>,
}

impl Floor {
    pub fn new(input: CreateFloor) -> Self {
        let now = utc_now();
        Self {
            id: Uuid::new_v4(),
            floor_number: input.floor_number,
            floor_name: input.floor_name.trim().to_string(),
            floor_type: input.floor_type,
            description: input.description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateFloor) {
        if let Some(v) = update.floor_name {
            self.floor_name = v;
        }
        if update.floor_type.is_some() {
            self.floor_type = update.floor_type;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        self.updated_at = utc_now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ward {
    pub id: Uuid,
    pub ward_name: String,
    pub ward_code: String,
    pub ward_type: String,
    pub floor_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub total_beds: i32,
    pub occupied_beds: i32,
    pub reserved_beds: i32,
    pub status: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWard {
    pub ward_name: String,
    pub ward_code: String,
    pub ward_type: String,
    pub floor_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWard {
    pub ward_name: Option<String>,
    pub ward_type: Option<String>,
    pub floor_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub reserved_beds: Option<i32>,
    pub status: Option<String>,
    pub description: Option<String>,
}

/// Ward with its derived occupancy figures
#[derive(Debug, Clone, Serialize)]
pub struct WardOccupancy {
    pub ward_id: Uuid,
    pub ward_name: String,
    pub ward_code: String,
    pub ward_type: String,
    pub total_beds: i32,
    pub occupied_beds: i32,
    pub reserved_beds: i32,
    pub available_beds: i32,
    pub occupancy_rate: Decimal,
    pub is_full: bool,
    pub is_critical_care: bool,
}

impl Ward {
    /// Bed counters start at zero; they follow bed creation and assignment
    pub fn new(input: CreateWard, ward_type: WardType) -> Self {
        let now = utc_now();
        Self {
            id: Uuid::new_v4(),
            ward_name: input.ward_name.trim().to_string(),
            ward_code: input.ward_code.trim().to_uppercase(),
            ward_type: ward_type.as_str().to_string(),
            floor_id: input.floor_id,
            department_id: input.department_id,
            total_beds: 0,
            occupied_beds: 0,
            reserved_beds: 0,
            status: WardStatus::Active.as_str().to_string(),
            description: input.description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn available_beds(&self) -> i32 {
        (self.total_beds - self.occupied_beds - self.reserved_beds).max(0)
    }

    /// Percentage of beds occupied, two decimals
    pub fn occupancy_rate(&self) -> Decimal {
        if self.total_beds <= 0 {
            return Decimal::ZERO;
        }
        round_money(
            Decimal::from(self.occupied_beds) * Decimal::ONE_HUNDRED
                / Decimal::from(self.total_beds),
        )
    }

    pub fn is_full(&self) -> bool {
        self.available_beds() == 0
    }

    pub fn is_critical_care(&self) -> bool {
        self.ward_type
            .parse::<WardType>()
            .map(|t| t.is_critical_care())
            .unwrap_or(false)
    }

    pub fn occupancy(&self) -> WardOccupancy {
        WardOccupancy {
            ward_id: self.id,
            ward_name: self.ward_name.clone(),
            ward_code: self.ward_code.clone(),
            ward_type: self.ward_type.clone(),
            total_beds: self.total_beds,
            occupied_beds: self.occupied_beds,
            reserved_beds: self.reserved_beds,
            available_beds: self.available_beds(),
            occupancy_rate: self.occupancy_rate(),
            is_full: self.is_full(),
            is_critical_care: self.is_critical_care(),
        }
    }

    pub fn apply(&mut self, update: UpdateWard) {
        if let Some(v) = update.ward_name {
            self.ward_name = v;
        }
        if let Some(v) = update.ward_type {
            self.ward_type = v;
        }
        if update.floor_id.is_some() {
            self.floor_id = update.floor_id;
        }
        if update.department_id.is_some() {
            self.department_id = update.department_id;
        }
        if let Some(v) = update.reserved_beds {
            self.reserved_beds = v;
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        self.updated_at = utc_now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bed {
    pub id: Uuid,
    pub bed_number: String,
    pub ward_id: Uuid,
    pub bed_type: String,
    pub status: String,
    pub is_available: bool,
    pub current_patient_id: Option<Uuid>,
    pub assigned_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBed {
    pub bed_number: String,
    pub ward_id: Uuid,
    pub bed_type: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BedFilter {
    pub ward_id: Option<Uuid>,
    pub status: Option<String>,
}

impl Bed {
    pub fn new(input: CreateBed, bed_type: BedType) -> Self {
        let now = utc_now();
        Self {
            id: Uuid::new_v4(),
            bed_number: input.bed_number.trim().to_uppercase(),
            ward_id: input.ward_id,
            bed_type: bed_type.as_str().to_string(),
            status: BedStatus::Available.as_str().to_string(),
            is_available: true,
            current_patient_id: None,
            assigned_at: None,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status_enum(&self) -> BedStatus {
        self.status.parse().unwrap_or(BedStatus::OutOfService)
    }

    pub fn is_occupied(&self) -> bool {
        self.status_enum() == BedStatus::Occupied || self.current_patient_id.is_some()
    }
}
