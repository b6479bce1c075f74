use crate::error::RepositoryError;
use crate::models::{OtpCode, OtpMethod, OtpPurpose, User, UserRole};
use chrono::NaiveDateTime;
use sqlx::PgPool;
use uuid::Uuid;

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub username: Option<&'a str>,
    pub password_hash: &'a str,
    pub full_name: Option<&'a str>,
    pub role: UserRole,
    pub address: Option<&'a str>,
}

/// Repository for user accounts and their one-time codes
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user
    pub async fn create(&self, user: NewUser<'_>) -> Result<User, RepositoryError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, phone, username, password_hash, full_name, role, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user.email)
        .bind(user.phone)
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.full_name)
        .bind(user.role.as_str())
        .bind(user.address)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Find a user by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Look a user up by email if given, otherwise by phone
    pub async fn find_by_contact(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<User>, RepositoryError> {
        match (email, phone) {
            (Some(email), _) => self.find_by_email(email).await,
            (None, Some(phone)) => self.find_by_phone(phone).await,
            (None, None) => Ok(None),
        }
    }

    pub async fn mark_verified(&self, id: Uuid) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_verified = TRUE, updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound("User not found".to_string()))?;

        Ok(user)
    }

    // =========================================================================
    // One-time codes
    // =========================================================================

    /// Replace any unused code for this user and purpose with a new one
    pub async fn replace_otp(
        &self,
        user_id: Uuid,
        code_hash: &str,
        purpose: OtpPurpose,
        method: OtpMethod,
        expires_at: NaiveDateTime,
    ) -> Result<OtpCode, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM otp_codes WHERE user_id = $1 AND purpose = $2 AND is_used = FALSE")
            .bind(user_id)
            .bind(purpose.as_str())
            .execute(&mut *tx)
            .await?;

        let otp = sqlx::query_as::<_, OtpCode>(
            r#"
            INSERT INTO otp_codes (user_id, code_hash, purpose, method, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(code_hash)
        .bind(purpose.as_str())
        .bind(method.as_str())
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(otp)
    }

    /// Atomically consume a matching, unexpired code for one of `purposes`
    pub async fn consume_otp(
        &self,
        user_id: Uuid,
        code_hash: &str,
        purposes: &[OtpPurpose],
        now: NaiveDateTime,
    ) -> Result<Option<OtpCode>, RepositoryError> {
        let purposes: Vec<String> = purposes.iter().map(|p| p.as_str().to_string()).collect();

        let otp = sqlx::query_as::<_, OtpCode>(
            r#"
            UPDATE otp_codes
            SET is_used = TRUE
            WHERE id = (
                SELECT id FROM otp_codes
                WHERE user_id = $1
                  AND code_hash = $2
                  AND purpose = ANY($3)
                  AND is_used = FALSE
                  AND expires_at > $4
                ORDER BY created_at DESC
                LIMIT 1
                FOR UPDATE
            )
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(code_hash)
        .bind(purposes)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(otp)
    }

    /// Delete used or expired codes; returns how many were removed
    pub async fn purge_stale_otps(&self, now: NaiveDateTime) -> Result<u64, RepositoryError> {
        let removed = sqlx::query("DELETE FROM otp_codes WHERE is_used = TRUE OR expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed)
    }
}
