use super::{normalise_enum, parse_enum, AuditService};
use crate::error::{AppError, AppResult};
use crate::models::{
    AuditAction, AuditEntry, Bed, BedFilter, BedStatus, BedType, CreateBed, CreateFloor,
    CreateWard, Floor, UpdateFloor, UpdateWard, Ward, WardOccupancy, WardStatus, WardType,
    MAX_FLOOR_NUMBER, MIN_FLOOR_NUMBER,
};
use crate::repositories::{FacilityRepository, Page};
use crate::validation::require_text;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct AssignBedRequest {
    pub patient_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BedStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WardFilter {
    pub floor_id: Option<Uuid>,
    pub ward_type: Option<String>,
}

fn check_floor_number(floor_number: i32) -> AppResult<()> {
    if !(MIN_FLOOR_NUMBER..=MAX_FLOOR_NUMBER).contains(&floor_number) {
        return Err(AppError::Validation(format!(
            "Floor number must be between {} and {}",
            MIN_FLOOR_NUMBER, MAX_FLOOR_NUMBER
        )));
    }
    Ok(())
}

/// Reserved beds must fit beside the occupied ones
fn check_reservations(ward: &Ward, reserved_beds: i32) -> AppResult<()> {
    if reserved_beds < 0 {
        return Err(AppError::Validation(
            "Reserved beds cannot be negative".to_string(),
        ));
    }
    if ward.occupied_beds + reserved_beds > ward.total_beds {
        return Err(AppError::BusinessLogic(format!(
            "Ward {} has only {} free beds to reserve",
            ward.ward_code,
            (ward.total_beds - ward.occupied_beds).max(0)
        )));
    }
    Ok(())
}

/// Floors, wards, beds and bed assignment
pub struct FacilityService {
    repo: Arc<FacilityRepository>,
    audit: Arc<AuditService>,
}

impl FacilityService {
    pub fn new(repo: Arc<FacilityRepository>, audit: Arc<AuditService>) -> Self {
        Self { repo, audit }
    }

    async fn record(&self, entry: AuditEntry, actor: Uuid) {
        self.audit.record(entry.by(actor)).await;
    }

    // Floors

    pub async fn create_floor(&self, input: CreateFloor, actor: Uuid) -> AppResult<Floor> {
        check_floor_number(input.floor_number)?;
        require_text("Floor name", &input.floor_name)?;

        let floor = self.repo.insert_floor(&Floor::new(input)).await?;
        self.record(
            AuditEntry::new(AuditAction::Create, "floor", Some(floor.id), "Floor created"),
            actor,
        )
        .await;
        Ok(floor)
    }

    pub async fn get_floor(&self, id: Uuid) -> AppResult<Floor> {
        self.repo
            .find_floor(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Floor not found".to_string()))
    }

    pub async fn list_floors(&self, page: Page) -> AppResult<Vec<Floor>> {
        Ok(self.repo.list_floors(page).await?)
    }

    pub async fn update_floor(&self, id: Uuid, update: UpdateFloor, actor: Uuid) -> AppResult<Floor> {
        if let Some(name) = &update.floor_name {
            require_text("Floor name", name)?;
        }
        let mut floor = self.get_floor(id).await?;
        floor.apply(update);
        let floor = self.repo.update_floor(&floor).await?;
        self.record(AuditEntry::new(AuditAction::Update, "floor", Some(id), "Floor updated"), actor)
            .await;
        Ok(floor)
    }

    pub async fn delete_floor(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if !self.repo.delete_floor(id).await? {
            return Err(AppError::NotFound("Floor not found".to_string()));
        }
        self.record(AuditEntry::new(AuditAction::Delete, "floor", Some(id), "Floor deleted"), actor)
            .await;
        Ok(())
    }

    // Wards

    pub async fn create_ward(&self, input: CreateWard, actor: Uuid) -> AppResult<Ward> {
        require_text("Ward name", &input.ward_name)?;
        require_text("Ward code", &input.ward_code)?;
        let ward_type: WardType = parse_enum(&input.ward_type)?;

        let ward = self.repo.insert_ward(&Ward::new(input, ward_type)).await?;
        info!("Created ward {} ({})", ward.ward_code, ward.ward_type);
        self.record(AuditEntry::new(AuditAction::Create, "ward", Some(ward.id), "Ward created"), actor)
            .await;
        Ok(ward)
    }

    pub async fn get_ward(&self, id: Uuid) -> AppResult<Ward> {
        self.repo
            .find_ward(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ward not found".to_string()))
    }

    pub async fn list_wards(&self, filter: WardFilter, page: Page) -> AppResult<Vec<Ward>> {
        let ward_type = normalise_enum::<WardType>(filter.ward_type)?;
        Ok(self.repo.list_wards(filter.floor_id, ward_type, page).await?)
    }

    pub async fn ward_occupancy(&self, id: Uuid) -> AppResult<WardOccupancy> {
        Ok(self.get_ward(id).await?.occupancy())
    }

    pub async fn update_ward(&self, id: Uuid, mut update: UpdateWard, actor: Uuid) -> AppResult<Ward> {
        if let Some(name) = &update.ward_name {
            require_text("Ward name", name)?;
        }
        update.ward_type = normalise_enum::<WardType>(update.ward_type.take())?;
        update.status = normalise_enum::<WardStatus>(update.status.take())?;

        let mut ward = self.get_ward(id).await?;
        if let Some(reserved) = update.reserved_beds {
            check_reservations(&ward, reserved)?;
        }
        ward.apply(update);
        let ward = self.repo.update_ward(&ward).await?;
        self.record(AuditEntry::new(AuditAction::Update, "ward", Some(id), "Ward updated"), actor)
            .await;
        Ok(ward)
    }

    pub async fn delete_ward(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if !self.repo.delete_ward(id).await? {
            return Err(AppError::NotFound("Ward not found".to_string()));
        }
        self.record(AuditEntry::new(AuditAction::Delete, "ward", Some(id), "Ward deleted"), actor)
            .await;
        Ok(())
    }

    // Beds

    pub async fn create_bed(&self, input: CreateBed, actor: Uuid) -> AppResult<Bed> {
        require_text("Bed number", &input.bed_number)?;
        let bed_type = match input.bed_type.as_deref() {
            Some(t) => parse_enum::<BedType>(t)?,
            None => BedType::Standard,
        };

        let bed = self.repo.insert_bed(&Bed::new(input, bed_type)).await?;
        self.record(
            AuditEntry::new(AuditAction::Create, "bed", Some(bed.id), "Bed created")
                .with_details(serde_json::json!({ "ward_id": bed.ward_id })),
            actor,
        )
        .await;
        Ok(bed)
    }

    pub async fn get_bed(&self, id: Uuid) -> AppResult<Bed> {
        self.repo
            .find_bed(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Bed not found".to_string()))
    }

    pub async fn list_beds(&self, mut filter: BedFilter, page: Page) -> AppResult<Vec<Bed>> {
        filter.status = normalise_enum::<BedStatus>(filter.status.take())?;
        Ok(self.repo.list_beds(&filter, page).await?)
    }

    pub async fn delete_bed(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if !self.repo.delete_bed(id).await? {
            return Err(AppError::NotFound("Bed not found".to_string()));
        }
        self.record(AuditEntry::new(AuditAction::Delete, "bed", Some(id), "Bed deleted"), actor)
            .await;
        Ok(())
    }

    pub async fn assign_bed(&self, bed_id: Uuid, patient_id: Uuid, actor: Uuid) -> AppResult<Bed> {
        let bed = self.repo.assign_bed(bed_id, patient_id).await?;
        info!("Assigned bed {} to patient {}", bed.bed_number, patient_id);
        self.record(
            AuditEntry::new(AuditAction::Assign, "bed", Some(bed_id), "Bed assigned")
                .with_details(serde_json::json!({ "patient_id": patient_id, "ward_id": bed.ward_id })),
            actor,
        )
        .await;
        Ok(bed)
    }

    pub async fn release_bed(&self, bed_id: Uuid, actor: Uuid) -> AppResult<Bed> {
        let bed = self.repo.release_bed(bed_id).await?;
        info!("Released bed {}", bed.bed_number);
        self.record(AuditEntry::new(AuditAction::Release, "bed", Some(bed_id), "Bed released"), actor)
            .await;
        Ok(bed)
    }

    pub async fn set_bed_status(&self, bed_id: Uuid, status: &str, actor: Uuid) -> AppResult<Bed> {
        let status: BedStatus = parse_enum(status)?;
        let bed = self.repo.set_bed_status(bed_id, status).await?;
        self.record(
            AuditEntry::new(AuditAction::Update, "bed", Some(bed_id), format!("Bed status set to {}", status)),
            actor,
        )
        .await;
        Ok(bed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::utc_now;

    fn ward(total: i32, occupied: i32) -> Ward {
        let now = utc_now();
        Ward {
            id: Uuid::new_v4(),
            ward_name: "East".into(),
            ward_code: "E1".into(),
            ward_type: "general".into(),
            floor_id: None,
            department_id: None,
            total_beds: total,
            occupied_beds: occupied,
            reserved_beds: 0,
            status: "active".into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_floor_number_range() {
        assert!(check_floor_number(-10).is_ok());
        assert!(check_floor_number(100).is_ok());
        assert!(check_floor_number(-11).is_err());
        assert!(check_floor_number(101).is_err());
    }

    #[test]
    fn test_reservations_fit_free_beds() {
        let ward = ward(10, 7);
        assert!(check_reservations(&ward, 3).is_ok());
        assert!(matches!(check_reservations(&ward, 4), Err(AppError::BusinessLogic(_))));
        assert!(matches!(check_reservations(&ward, -1), Err(AppError::Validation(_))));
    }
}
