use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    AuditAction ("audit action") {
        Create => "create",
        Update => "update",
        Delete => "delete",
        Login => "login",
        Logout => "logout",
        Assign => "assign",
        Release => "release",
        Payment => "payment",
        Refund => "refund",
        Dispense => "dispense",
        Approve => "approve",
        Cancel => "cancel",
    }
}

text_enum! {
    AuditStatus ("audit status") {
        Success => "success",
        Failure => "failure",
    }
}

/// Persisted audit record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<Uuid>,
    pub description: String,
    pub details: Option<Value>,
    pub status: String,
    pub created_at: NaiveDateTime,
}

/// What a service reports after a mutation
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource_type: &'static str,
    pub resource_id: Option<Uuid>,
    pub description: String,
    pub details: Option<Value>,
    pub status: AuditStatus,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        resource_type: &'static str,
        resource_id: Option<Uuid>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id: None,
            action,
            resource_type,
            resource_id,
            description: description.into(),
            details: None,
            status: AuditStatus::Success,
        }
    }

    pub fn by(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn failed(mut self) -> Self {
        self.status = AuditStatus::Failure;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub resource_type: Option<String>,
    pub resource_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder() {
        let user = Uuid::new_v4();
        let entry = AuditEntry::new(AuditAction::Assign, "bed", None, "Assigned bed")
            .by(user)
            .with_details(serde_json::json!({"ward": "ICU"}))
            .failed();
        assert_eq!(entry.user_id, Some(user));
        assert_eq!(entry.status, AuditStatus::Failure);
        assert_eq!(entry.details.unwrap()["ward"], "ICU");
    }
}
