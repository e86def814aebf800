use crate::auth::AuthService;
use crate::models::user::{CreateUserRequest, UserResponse};
use crate::models::{AuthorSummary, User, UserRole};
use crate::db::repository::UserRepository;
use crate::{AppError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<UserResponse>> {
        Ok(self.user_repo.get_user_by_id(user_id).await?.map(UserResponse::from))
    }

    /// Registers a user and returns them with a fresh token
    pub async fn create_user(&self, request: CreateUserRequest, auth_service: &AuthService) -> Result<(UserResponse, String)> {
        let username = request.username.trim();
        let email = request.email.trim();

        if username.is_empty() || email.is_empty() || request.password.is_empty() {
            return Err(AppError::ValidationError("Username, email and password are required".to_string()));
        }
        if !email.contains('@') {
            return Err(AppError::ValidationError("Email address is invalid".to_string()));
        }

        // Hash the password before storing
        let password_hash = auth_service.hash_password(&request.password)?;

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role: request.role.unwrap_or_default(),
            created_at: Utc::now(),
        };

        let created_user = self.user_repo.create_user(&user).await?;
        let token = auth_service.generate_token(created_user.id, &created_user.username, created_user.role)?;
        tracing::info!("👤 USER: Registered {} ({})", created_user.username, created_user.role);

        Ok((UserResponse::from(created_user), token))
    }

    /// Checks credentials and issues a token. With `require_admin`, valid
    /// credentials of a non-admin account are refused.
    pub async fn authenticate_user(&self, email: &str, password: &str, require_admin: bool, auth_service: &AuthService) -> Result<(UserResponse, String)> {
        let invalid = || AppError::ValidationError("Invalid credentials".to_string());

        let user = self.user_repo.get_user_by_email(email.trim()).await?
            .ok_or_else(invalid)?;

        if !auth_service.verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }

        if require_admin && user.role != UserRole::Admin {
            tracing::warn!("🚫 USER: Non-admin {} attempted admin login", user.username);
            return Err(AppError::Forbidden("Access denied".to_string()));
        }

        let token = auth_service.generate_token(user.id, &user.username, user.role)?;
        Ok((UserResponse::from(user), token))
    }

    /// Author references for a set of user ids; unknown ids are absent
    pub async fn author_summaries(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, AuthorSummary>> {
        let mut unique = ids.to_vec();
        unique.sort();
        unique.dedup();

        let users = self.user_repo.get_users_by_ids(&unique).await?;
        Ok(users.iter().map(|u| (u.id, AuthorSummary::from(u))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::InMemoryUserRepository;

    fn setup() -> (UserService, AuthService) {
        (
            UserService::new(Arc::new(InMemoryUserRepository::new())),
            AuthService::new("test-secret".to_string(), 3600),
        )
    }

    fn request(email: &str, role: Option<UserRole>) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: "pw".to_string(),
            username: "krishna".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (service, auth) = setup();
        let (user, token) = service.create_user(request("k@example.com", None), &auth).await.unwrap();
        assert_eq!(user.role, UserRole::User);
        assert_eq!(auth.verify_token(&token).unwrap().user_uuid().unwrap(), user.id);

        let (logged_in, _) = service.authenticate_user("k@example.com", "pw", false, &auth).await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let (service, auth) = setup();
        service.create_user(request("k@example.com", None), &auth).await.unwrap();

        let wrong_password = service.authenticate_user("k@example.com", "nope", false, &auth).await;
        let unknown_email = service.authenticate_user("x@example.com", "pw", false, &auth).await;

        for result in [wrong_password, unknown_email] {
            match result {
                Err(AppError::ValidationError(msg)) => assert_eq!(msg, "Invalid credentials"),
                other => panic!("expected invalid credentials, got {:?}", other.map(|(u, _)| u.id)),
            }
        }
    }

    #[tokio::test]
    async fn test_admin_login_requires_admin_role() {
        let (service, auth) = setup();
        service.create_user(request("user@example.com", None), &auth).await.unwrap();
        service.create_user(request("admin@example.com", Some(UserRole::Admin)), &auth).await.unwrap();

        assert!(matches!(
            service.authenticate_user("user@example.com", "pw", true, &auth).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(service.authenticate_user("admin@example.com", "pw", true, &auth).await.is_ok());
    }

    #[tokio::test]
    async fn test_blank_fields_are_rejected() {
        let (service, auth) = setup();
        let mut bad = request("k@example.com", None);
        bad.username = "  ".to_string();
        assert!(matches!(service.create_user(bad, &auth).await, Err(AppError::ValidationError(_))));
    }
}
