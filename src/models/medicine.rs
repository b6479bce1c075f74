use super::{round_money, utc_now};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    DosageForm ("dosage form") {
        Tablet => "tablet",
        Capsule => "capsule",
        Syrup => "syrup",
        Injection => "injection",
        Cream => "cream",
        Ointment => "ointment",
        Drops => "drops",
        Inhaler => "inhaler",
        Powder => "powder",
        Suspension => "suspension",
        Gel => "gel",
        Patch => "patch",
        Spray => "spray",
    }
}

text_enum! {
    MedicineStatus ("medicine status") {
        Active => "active",
        Discontinued => "discontinued",
        OutOfStock => "out_of_stock",
        Expired => "expired",
        Recalled => "recalled",
    }
}

/// Pharmacy inventory item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Medicine {
    pub id: Uuid,
    pub medicine_code: String,
    pub name: String,
    pub generic_name: String,
    pub brand_name: Option<String>,
    pub category: String,
    pub dosage_form: String,
    pub strength: String,
    pub unit: String,
    pub manufacturer: String,
    pub stock_quantity: i32,
    pub reorder_level: i32,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub requires_prescription: bool,
    pub is_controlled_substance: bool,
    pub status: String,
    pub is_available: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedicine {
    pub medicine_code: String,
    pub name: String,
    pub generic_name: String,
    pub brand_name: Option<String>,
    pub category: String,
    pub dosage_form: String,
    pub strength: String,
    pub unit: String,
    pub manufacturer: String,
    #[serde(default)]
    pub stock_quantity: i32,
    pub reorder_level: Option<i32>,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub requires_prescription: Option<bool>,
    #[serde(default)]
    pub is_controlled_substance: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMedicine {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub brand_name: Option<String>,
    pub category: Option<String>,
    pub dosage_form: Option<String>,
    pub strength: Option<String>,
    pub unit: Option<String>,
    pub manufacturer: Option<String>,
    pub reorder_level: Option<i32>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub requires_prescription: Option<bool>,
    pub is_controlled_substance: Option<bool>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    /// Positive to restock, negative to write off
    pub delta: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicineFilter {
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

/// Medicine plus derived stock and margin figures
#[derive(Debug, Clone, Serialize)]
pub struct MedicineResponse {
    #[serde(flatten)]
    pub medicine: Medicine,
    pub is_low_stock: bool,
    pub is_expired: bool,
    pub profit_margin: Option<Decimal>,
}

impl Medicine {
    pub fn new(input: CreateMedicine, dosage_form: DosageForm) -> Self {
        let now = utc_now();
        let mut medicine = Self {
            id: Uuid::new_v4(),
            medicine_code: input.medicine_code.trim().to_uppercase(),
            name: input.name.trim().to_string(),
            generic_name: input.generic_name,
            brand_name: input.brand_name,
            category: input.category,
            dosage_form: dosage_form.as_str().to_string(),
            strength: input.strength,
            unit: input.unit,
            manufacturer: input.manufacturer,
            stock_quantity: input.stock_quantity,
            reorder_level: input.reorder_level.unwrap_or(10),
            purchase_price: input.purchase_price,
            selling_price: input.selling_price,
            batch_number: input.batch_number,
            expiry_date: input.expiry_date,
            requires_prescription: input.requires_prescription.unwrap_or(true),
            is_controlled_substance: input.is_controlled_substance,
            status: MedicineStatus::Active.as_str().to_string(),
            is_available: true,
            created_at: now,
            updated_at: now,
        };
        medicine.sync_stock_status();
        medicine
    }

    pub fn status_enum(&self) -> MedicineStatus {
        self.status.parse().unwrap_or(MedicineStatus::Active)
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.reorder_level
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.map(|d| d < today).unwrap_or(false)
    }

    /// (selling - purchase) / purchase × 100; `None` when bought for free
    pub fn profit_margin(&self) -> Option<Decimal> {
        if self.purchase_price <= Decimal::ZERO {
            return None;
        }
        Some(round_money(
            (self.selling_price - self.purchase_price) / self.purchase_price
                * Decimal::ONE_HUNDRED,
        ))
    }

    /// Flip between active and out_of_stock as stock crosses zero.
    /// Other statuses (recalled, discontinued, expired) are left alone.
    pub fn sync_stock_status(&mut self) {
        match self.status_enum() {
            MedicineStatus::Active if self.stock_quantity == 0 => {
                self.status = MedicineStatus::OutOfStock.as_str().to_string();
                self.is_available = false;
            }
            MedicineStatus::OutOfStock if self.stock_quantity > 0 => {
                self.status = MedicineStatus::Active.as_str().to_string();
                self.is_available = true;
            }
            _ => {}
        }
    }

    /// Can be handed out today
    pub fn is_dispensable(&self, today: NaiveDate) -> bool {
        self.status_enum() == MedicineStatus::Active && !self.is_expired(today)
    }

    pub fn apply(&mut self, update: UpdateMedicine) {
        if let Some(v) = update.name {
            self.name = v;
        }
        if let Some(v) = update.generic_name {
            self.generic_name = v;
        }
        if update.brand_name.is_some() {
            self.brand_name = update.brand_name;
        }
        if let Some(v) = update.category {
            self.category = v;
        }
        if let Some(v) = update.dosage_form {
            self.dosage_form = v;
        }
        if let Some(v) = update.strength {
            self.strength = v;
        }
        if let Some(v) = update.unit {
            self.unit = v;
        }
        if let Some(v) = update.manufacturer {
            self.manufacturer = v;
        }
        if let Some(v) = update.reorder_level {
            self.reorder_level = v;
        }
        if let Some(v) = update.purchase_price {
            self.purchase_price = v;
        }
        if let Some(v) = update.selling_price {
            self.selling_price = v;
        }
        if update.batch_number.is_some() {
            self.batch_number = update.batch_number;
        }
        if update.expiry_date.is_some() {
            self.expiry_date = update.expiry_date;
        }
        if let Some(v) = update.requires_prescription {
            self.requires_prescription = v;
        }
        if let Some(v) = update.is_controlled_substance {
            self.is_controlled_substance = v;
        }
        if let Some(v) = update.status {
            self.status = v;
            self.is_available = self.status_enum() == MedicineStatus::Active;
        }
        self.updated_at = utc_now();
    }

    pub fn into_response(self, today: NaiveDate) -> MedicineResponse {
        MedicineResponse {
            is_low_stock: self.is_low_stock(),
            is_expired: self.is_expired(today),
            profit_margin: self.profit_margin(),
            medicine: self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medicine(stock: i32) -> Medicine {
        Medicine::new(
            CreateMedicine {
                medicine_code: "amx-500".into(),
                name: "Amoxicillin".into(),
                generic_name: "Amoxicillin".into(),
                brand_name: None,
                category: "Antibiotic".into(),
                dosage_form: "capsule".into(),
                strength: "500mg".into(),
                unit: "capsule".into(),
                manufacturer: "Acme".into(),
                stock_quantity: stock,
                reorder_level: None,
                purchase_price: Decimal::new(400, 2),
                selling_price: Decimal::new(500, 2),
                batch_number: None,
                expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1),
                requires_prescription: None,
                is_controlled_substance: false,
            },
            DosageForm::Capsule,
        )
    }

    #[test]
    fn test_low_stock_and_margin() {
        let med = medicine(10);
        assert_eq!(med.medicine_code, "AMX-500");
        assert!(med.is_low_stock());
        assert!(!medicine(11).is_low_stock());
        assert_eq!(med.profit_margin(), Some(Decimal::new(2500, 2)));
        assert!(med.requires_prescription);
    }

    #[test]
    fn test_stock_status_flips() {
        let mut med = medicine(0);
        assert_eq!(med.status_enum(), MedicineStatus::OutOfStock);
        assert!(!med.is_available);

        med.stock_quantity = 5;
        med.sync_stock_status();
        assert_eq!(med.status_enum(), MedicineStatus::Active);
        assert!(med.is_available);

        med.status = "recalled".into();
        med.stock_quantity = 0;
        med.sync_stock_status();
        assert_eq!(med.status_enum(), MedicineStatus::Recalled);
    }

    #[test]
    fn test_expiry() {
        let med = medicine(20);
        assert!(!med.is_expired(NaiveDate::from_ymd_opt(2029, 12, 31).unwrap()));
        assert!(med.is_expired(NaiveDate::from_ymd_opt(2030, 1, 2).unwrap()));
        assert!(!med.is_dispensable(NaiveDate::from_ymd_opt(2030, 1, 2).unwrap()));
    }
}
