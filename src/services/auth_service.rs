use super::notifier::{OtpMessage, OtpSender};
use super::AuditService;
use crate::auth::{generate_code, hash_code, hash_password, verify_password, TokenPair, TokenService, TokenType};
use crate::config::SecurityConfig;
use crate::error::{AppError, AppResult};
use crate::models::{utc_now, AuditAction, AuditEntry, OtpMethod, OtpPurpose, User, UserRole};
use crate::repositories::{NewUser, UserRepository};
use crate::validation::{validate_email, validate_password_strength, validate_phone};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub otp_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub method: OtpMethod,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Normalised login identifier
#[derive(Debug, Clone, PartialEq, Eq)]
struct Contact {
    email: Option<String>,
    phone: Option<String>,
}

impl Contact {
    fn new(email: Option<&str>, phone: Option<&str>) -> Self {
        let clean = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Self {
            email: clean(email).map(|e| e.to_lowercase()),
            phone: clean(phone),
        }
    }

    fn require(self) -> AppResult<Self> {
        if self.email.is_none() && self.phone.is_none() {
            return Err(AppError::Validation(
                "Either email or phone is required".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Registration, two-step login and token refresh
pub struct AuthService {
    users: Arc<UserRepository>,
    tokens: Arc<TokenService>,
    sender: Arc<dyn OtpSender>,
    audit: Arc<AuditService>,
    security: SecurityConfig,
}

impl AuthService {
    pub fn new(
        users: Arc<UserRepository>,
        tokens: Arc<TokenService>,
        sender: Arc<dyn OtpSender>,
        audit: Arc<AuditService>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            users,
            tokens,
            sender,
            audit,
            security,
        }
    }

    async fn find_by_contact(&self, contact: &Contact) -> AppResult<Option<User>> {
        Ok(self
            .users
            .find_by_contact(contact.email.as_deref(), contact.phone.as_deref())
            .await?)
    }

    /// Replace any outstanding code for `purpose` and deliver a fresh one
    async fn issue_otp(&self, user: &User, purpose: OtpPurpose) -> AppResult<OtpMethod> {
        let (method, recipient) = user.otp_destination().ok_or_else(|| {
            AppError::Validation("User has no email or phone to send an OTP to".to_string())
        })?;

        let code = generate_code(self.security.otp_length);
        let expires_at = utc_now() + Duration::minutes(self.security.otp_expiry_minutes);
        self.users
            .replace_otp(user.id, &hash_code(&code), purpose, method, expires_at)
            .await?;

        self.sender
            .send(&OtpMessage {
                recipient: recipient.to_string(),
                method,
                code,
                purpose,
                expires_in_minutes: self.security.otp_expiry_minutes,
            })
            .await?;

        info!("Issued {} OTP for user {} via {}", purpose, user.id, method);
        Ok(method)
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<RegisterResponse> {
        let contact = Contact::new(request.email.as_deref(), request.phone.as_deref()).require()?;

        if let Some(email) = &contact.email {
            validate_email(email)?;
        }
        if let Some(phone) = &contact.phone {
            validate_phone(phone)?;
        }
        validate_password_strength(&request.password, self.security.password_min_length)?;

        let role = match request.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(role) => role.parse::<UserRole>().map_err(AppError::Validation)?,
            None => UserRole::User,
        };
        if role == UserRole::Admin && !self.security.allow_admin_signup {
            return Err(AppError::Forbidden(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }
        let username = request
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());

        if let Some(email) = &contact.email {
            if self.users.find_by_email(email).await?.is_some() {
                return Err(AppError::Validation("Email already registered".to_string()));
            }
        }
        if let Some(phone) = &contact.phone {
            if self.users.find_by_phone(phone).await?.is_some() {
                return Err(AppError::Validation(
                    "Phone number already registered".to_string(),
                ));
            }
        }
        if let Some(username) = username {
            if self.users.find_by_username(username).await?.is_some() {
                return Err(AppError::Validation("Username already taken".to_string()));
            }
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .users
            .create(NewUser {
                email: contact.email.as_deref(),
                phone: contact.phone.as_deref(),
                username,
                password_hash: &password_hash,
                full_name: request.full_name.as_deref(),
                role,
                address: request.address.as_deref(),
            })
            .await?;

        let purpose = if user.email.is_some() {
            OtpPurpose::VerifyEmail
        } else {
            OtpPurpose::VerifyPhone
        };
        self.issue_otp(&user, purpose).await?;

        self.audit
            .record(
                AuditEntry::new(AuditAction::Create, "user", Some(user.id), "User registered")
                    .by(user.id)
                    .with_details(serde_json::json!({ "role": role })),
            )
            .await;

        info!("Registered user {} with role {}", user.id, role);
        Ok(RegisterResponse {
            message: "User registered successfully. Please verify your account with the OTP sent."
                .to_string(),
            user_id: user.id,
        })
    }

    /// First login step: check the password and send a login OTP
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        let contact = Contact::new(request.email.as_deref(), request.phone.as_deref()).require()?;

        let user = self
            .find_by_contact(&contact)
            .await?
            .filter(|user| verify_password(&request.password, &user.password_hash))
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        if !user.is_active {
            return Err(AppError::Forbidden("Account is inactive".to_string()));
        }

        let method = self.issue_otp(&user, OtpPurpose::Login).await?;

        self.audit
            .record(
                AuditEntry::new(AuditAction::Login, "user", Some(user.id), "Password accepted, OTP sent")
                    .by(user.id),
            )
            .await;

        Ok(LoginResponse {
            message: format!("OTP sent to your {}", method),
            method,
            user_id: user.id,
        })
    }

    /// Second login step: trade a login OTP for tokens
    pub async fn verify_otp(&self, request: VerifyOtpRequest) -> AppResult<TokenPair> {
        let contact = Contact::new(request.email.as_deref(), request.phone.as_deref()).require()?;
        let user = self
            .find_by_contact(&contact)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.users
            .consume_otp(user.id, &hash_code(&request.otp_code), &[OtpPurpose::Login], utc_now())
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired OTP".to_string()))?;

        info!("User {} completed login", user.id);
        self.tokens.issue_pair(user.id)
    }

    pub async fn verify_account(&self, request: VerifyOtpRequest) -> AppResult<MessageResponse> {
        let contact = Contact::new(request.email.as_deref(), request.phone.as_deref()).require()?;
        let user = self
            .find_by_contact(&contact)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.users
            .consume_otp(
                user.id,
                &hash_code(&request.otp_code),
                &[OtpPurpose::VerifyEmail, OtpPurpose::VerifyPhone],
                utc_now(),
            )
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired OTP".to_string()))?;

        self.users.mark_verified(user.id).await?;

        self.audit
            .record(AuditEntry::new(AuditAction::Update, "user", Some(user.id), "Account verified").by(user.id))
            .await;

        Ok(MessageResponse {
            message: "Account verified successfully".to_string(),
        })
    }

    pub async fn refresh(&self, request: RefreshRequest) -> AppResult<AccessTokenResponse> {
        let claims = self
            .tokens
            .decode_expecting(&request.refresh_token, TokenType::Refresh)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        if !user.is_active {
            return Err(AppError::Forbidden("Account is inactive".to_string()));
        }

        Ok(AccessTokenResponse {
            access_token: self.tokens.issue(user.id, TokenType::Access)?,
            token_type: "bearer".to_string(),
        })
    }

    pub async fn resend_otp(&self, request: ContactRequest) -> AppResult<MessageResponse> {
        let contact = Contact::new(request.email.as_deref(), request.phone.as_deref()).require()?;
        let user = self
            .find_by_contact(&contact)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let method = self.issue_otp(&user, OtpPurpose::Login).await?;
        Ok(MessageResponse {
            message: format!("OTP resent to your {}", method),
        })
    }
}
