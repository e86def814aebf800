pub mod jwt;
pub mod middleware;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::JwtService;
use crate::models::user::UserRole;
use crate::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize, // Expiration time
}

impl Claims {
    pub fn user_uuid(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.user_id)
            .map_err(|_| AppError::AuthError("Invalid user ID in token".to_string()))
    }
}

pub struct AuthService {
    jwt: JwtService,
    token_ttl_secs: i64,
}

impl AuthService {
    pub fn new(jwt_secret: String, token_ttl_secs: i64) -> Self {
        Self {
            jwt: JwtService::new(&jwt_secret),
            token_ttl_secs,
        }
    }

    pub fn generate_token(&self, user_id: Uuid, username: &str, role: UserRole) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            user_id: user_id.to_string(),
            username: username.to_string(),
            role,
            iat: now as usize,
            exp: (now + self.token_ttl_secs) as usize,
        };
        self.jwt.encode_token(&claims)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        self.jwt.decode_token(token)
    }

    /// Parse a raw `Authorization` header value of the form `Bearer <token>`
    pub fn verify_bearer(&self, header_value: &str) -> Result<Claims> {
        let token = header_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::AuthError("No token provided".to_string()))?;
        self.verify_token(token)
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::InternalError(format!("Stored password hash is invalid: {}", e)))?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new("test-secret".to_string(), 3600)
    }

    #[test]
    fn test_token_round_trip_keeps_identity() {
        let auth = service();
        let user_id = Uuid::new_v4();
        let token = auth.generate_token(user_id, "krishna", UserRole::Admin).unwrap();

        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.user_uuid().unwrap(), user_id);
        assert_eq!(claims.username, "krishna");
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = service().generate_token(Uuid::new_v4(), "a", UserRole::User).unwrap();
        let other = AuthService::new("another-secret".to_string(), 3600);
        assert!(matches!(other.verify_token(&token), Err(AppError::AuthError(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Beyond the default 60s validation leeway
        let auth = AuthService::new("test-secret".to_string(), -120);
        let token = auth.generate_token(Uuid::new_v4(), "a", UserRole::User).unwrap();
        match auth.verify_token(&token) {
            Err(AppError::AuthError(msg)) => assert_eq!(msg, "Token expired"),
            other => panic!("expected expiry error, got {:?}", other),
        }
    }

    #[test]
    fn test_bearer_parsing() {
        let auth = service();
        let token = auth.generate_token(Uuid::new_v4(), "a", UserRole::User).unwrap();
        assert!(auth.verify_bearer(&format!("Bearer {}", token)).is_ok());
        assert!(auth.verify_bearer(&token).is_err());
        assert!(auth.verify_bearer("Bearer ").is_err());
    }

    #[test]
    fn test_password_hash_and_verify() {
        let auth = service();
        let hash = auth.hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(auth.verify_password("hunter2", &hash).unwrap());
        assert!(!auth.verify_password("hunter3", &hash).unwrap());
    }
}
