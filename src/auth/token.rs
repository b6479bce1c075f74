use crate::config::SecurityConfig;
use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// Issues and checks HS256 tokens
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &SecurityConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            access_ttl: Duration::minutes(config.access_token_expire_minutes),
            refresh_ttl: Duration::days(config.refresh_token_expire_days),
        }
    }

    fn encode_claims(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Message(format!("Failed to sign token: {}", e)))
    }

    pub fn issue(&self, user_id: Uuid, token_type: TokenType) -> AppResult<String> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        self.encode_claims(&Claims {
            sub: user_id,
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        })
    }

    pub fn issue_pair(&self, user_id: Uuid) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(user_id, TokenType::Access)?,
            refresh_token: self.issue(user_id, TokenType::Refresh)?,
            token_type: "bearer".to_string(),
        })
    }

    /// Verify signature and expiry
    pub fn decode(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))
    }

    /// Verify the token and that it was issued for `expected` use
    pub fn decode_expecting(&self, token: &str, expected: TokenType) -> AppResult<Claims> {
        let claims = self.decode(token)?;
        if claims.token_type != expected {
            return Err(AppError::Unauthorized("Invalid token type".to_string()));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&SecurityConfig::default())
    }

    #[test]
    fn test_round_trip_pair() {
        let tokens = service();
        let user_id = Uuid::new_v4();
        let pair = tokens.issue_pair(user_id).unwrap();
        assert_eq!(pair.token_type, "bearer");

        let access = tokens.decode_expecting(&pair.access_token, TokenType::Access).unwrap();
        assert_eq!(access.sub, user_id);
        assert!(access.exp > access.iat);

        let refresh = tokens.decode_expecting(&pair.refresh_token, TokenType::Refresh).unwrap();
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let tokens = service();
        let refresh = tokens.issue(Uuid::new_v4(), TokenType::Refresh).unwrap();
        let err = tokens.decode_expecting(&refresh, TokenType::Access).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg == "Invalid token type"));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let token = service().issue(Uuid::new_v4(), TokenType::Access).unwrap();
        let err = service().decode(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = service();
        let issued = Utc::now() - Duration::hours(2);
        let token = tokens
            .encode_claims(&Claims {
                sub: Uuid::new_v4(),
                token_type: TokenType::Access,
                iat: issued.timestamp(),
                exp: (issued + Duration::minutes(30)).timestamp(),
            })
            .unwrap();
        assert!(tokens.decode(&token).is_err());
    }
}
