use super::TokenType;
use crate::error::{AppError, AppResult};
use crate::models::{User, UserRole};
use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::sync::Arc;
use uuid::Uuid;

/// The authenticated caller, resolved from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn user(&self) -> &User {
        &self.0
    }

    pub fn role(&self) -> UserRole {
        self.0.role_enum()
    }

    /// Admins pass every guard
    pub fn require_role(&self, allowed: &[UserRole]) -> AppResult<()> {
        if self.0.is_admin() || allowed.contains(&self.role()) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ))
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let claims = state.tokens.decode_expecting(token, TokenType::Access)?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !user.is_active {
            return Err(AppError::Forbidden("Inactive user".to_string()));
        }

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::Utc;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/protected");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn user_with_role(role: &str) -> CurrentUser {
        let now = Utc::now().naive_utc();
        CurrentUser(User {
            id: Uuid::new_v4(),
            email: Some("nurse@hospital.test".into()),
            phone: None,
            username: None,
            password_hash: String::new(),
            full_name: None,
            role: role.into(),
            is_verified: true,
            is_active: true,
            address: None,
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_role_guard() {
        let nurse = user_with_role("nurse");
        assert!(nurse.require_role(&[UserRole::Nurse, UserRole::Doctor]).is_ok());
        assert!(matches!(
            nurse.require_role(&[UserRole::Doctor]),
            Err(AppError::Forbidden(_))
        ));

        let admin = user_with_role("admin");
        assert!(admin.require_role(&[UserRole::Doctor]).is_ok());
        assert!(admin.require_role(&[]).is_ok());
    }
}
