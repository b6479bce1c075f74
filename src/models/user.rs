use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    /// Account role used by route guards
    UserRole ("role") {
        User => "user",
        Admin => "admin",
        Doctor => "doctor",
        Nurse => "nurse",
        Patient => "patient",
        Staff => "staff",
    }
}

text_enum! {
    /// Why an OTP was issued
    OtpPurpose ("OTP purpose") {
        Login => "login",
        VerifyEmail => "verify_email",
        VerifyPhone => "verify_phone",
    }
}

text_enum! {
    /// Channel an OTP is delivered over
    OtpMethod ("OTP method") {
        Email => "email",
        Sms => "sms",
    }
}

/// Account row. Never serialised directly; see [`UserResponse`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: String, // Stored as TEXT, see UserRole
    pub is_verified: bool,
    pub is_active: bool,
    pub address: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn role_enum(&self) -> UserRole {
        self.role.parse().unwrap_or(UserRole::User)
    }

    pub fn is_admin(&self) -> bool {
        self.role_enum() == UserRole::Admin
    }

    /// Where OTPs for this account go: email first, then phone
    pub fn otp_destination(&self) -> Option<(OtpMethod, &str)> {
        self.email
            .as_deref()
            .map(|email| (OtpMethod::Email, email))
            .or_else(|| self.phone.as_deref().map(|phone| (OtpMethod::Sms, phone)))
    }

    /// Name used in audit trails and receipts
    pub fn display_name(&self) -> String {
        self.full_name
            .clone()
            .or_else(|| self.username.clone())
            .or_else(|| self.email.clone())
            .or_else(|| self.phone.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub role: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            phone: user.phone.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
            is_verified: user.is_verified,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Stored one-time code; only the SHA-256 digest of the code is kept
#[derive(Debug, Clone, FromRow)]
pub struct OtpCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code_hash: String,
    pub purpose: String,
    pub method: String,
    pub expires_at: NaiveDateTime,
    pub is_used: bool,
    pub created_at: NaiveDateTime,
}

impl OtpCode {
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now >= self.expires_at
    }

    pub fn is_usable(&self, now: NaiveDateTime) -> bool {
        !self.is_used && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(email: Option<&str>, phone: Option<&str>) -> User {
        let now = chrono::Utc::now().naive_utc();
        User {
            id: Uuid::new_v4(),
            email: email.map(String::from),
            phone: phone.map(String::from),
            username: None,
            password_hash: "hash".into(),
            full_name: None,
            role: "nurse".into(),
            is_verified: false,
            is_active: true,
            address: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_otp_destination_prefers_email() {
        let u = user(Some("a@b.org"), Some("5551234567"));
        assert_eq!(u.otp_destination(), Some((OtpMethod::Email, "a@b.org")));

        let u = user(None, Some("5551234567"));
        assert_eq!(u.otp_destination(), Some((OtpMethod::Sms, "5551234567")));
    }

    #[test]
    fn test_role_parsing() {
        let u = user(Some("a@b.org"), None);
        assert_eq!(u.role_enum(), UserRole::Nurse);
        assert!(!u.is_admin());
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_otp_usability() {
        let now = chrono::Utc::now().naive_utc();
        let mut otp = OtpCode {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code_hash: String::new(),
            purpose: "login".into(),
            method: "email".into(),
            expires_at: now + Duration::minutes(10),
            is_used: false,
            created_at: now,
        };
        assert!(otp.is_usable(now));
        assert!(!otp.is_usable(now + Duration::minutes(10)));
        otp.is_used = true;
        assert!(!otp.is_usable(now));
    }
}
