use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::auth::{generate_jwt, validate_jwt, Claims, JwtError};
use crate::database::models::user::{self, PublicUser};
use crate::database::models::Role;
use crate::database::{DatabaseError, RelationalStore};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("User not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Token(JwtError),
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Credential checks and token issuance against the Users table.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn RelationalStore>,
    jwt_secret: Arc<str>,
    expiry_hours: u64,
}

impl AuthService {
    pub fn new(store: Arc<dyn RelationalStore>, jwt_secret: &str, expiry_hours: u64) -> Self {
        Self {
            store,
            jwt_secret: Arc::from(jwt_secret),
            expiry_hours,
        }
    }

    pub(crate) fn store(&self) -> &dyn RelationalStore {
        self.store.as_ref()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation("Email and password are required".to_string()));
        }

        let Some(user) = user::find_by_email(self.store(), email.trim()).await? else {
            warn!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            warn!("Login failed: wrong password for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_token(user.id, user.role)?;
        info!("User {} logged in", user.id);
        Ok(LoginResponse {
            token,
            user: PublicUser::from(&user),
        })
    }

    pub fn issue_token(&self, id: i64, role: Role) -> Result<String, AuthError> {
        generate_jwt(&Claims::new(id, role, self.expiry_hours), &self.jwt_secret).map_err(AuthError::Token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        validate_jwt(token, &self.jwt_secret).map_err(|e| {
            warn!("Rejected token: {}", e);
            AuthError::InvalidToken
        })
    }

    pub async fn current_user(&self, id: i64) -> Result<PublicUser, AuthError> {
        user::find_by_id(self.store(), id)
            .await?
            .map(|u| PublicUser::from(&u))
            .ok_or(AuthError::NotFound)
    }

    pub async fn change_password(&self, id: i64, current: &str, new: &str) -> Result<(), AuthError> {
        if current.is_empty() || new.is_empty() {
            return Err(AuthError::Validation(
                "Current password and new password are required".to_string(),
            ));
        }

        let user = user::find_by_id(self.store(), id).await?.ok_or(AuthError::NotFound)?;
        if !verify_password(current.to_string(), user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let hash = hash_password(new.to_string()).await?;
        if user::update_password_hash(self.store(), id, &hash).await? == 0 {
            return Err(AuthError::NotFound);
        }
        info!("User {} changed password", id);
        Ok(())
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<PublicUser, AuthError> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Username, email and password are required".to_string(),
            ));
        }

        let hash = hash_password(password.to_string()).await?;
        let id = user::insert(self.store(), username.trim(), email.trim(), &hash, role).await?;
        Ok(PublicUser {
            id,
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::temp_store;

    async fn service() -> (crate::testing::StoreFixture, AuthService) {
        let fixture = temp_store().await;
        let auth = AuthService::new(fixture.store.clone(), "test-secret", 8);
        (fixture, auth)
    }

    #[tokio::test]
    async fn login_token_carries_stored_role() {
        let (_fixture, auth) = service().await;
        auth.create_user("ed", "ed@example.com", "pw-ed", Role::Editor).await.unwrap();

        let login = auth.login("ed@example.com", "pw-ed").await.unwrap();
        let claims = auth.verify(&login.token).unwrap();
        assert_eq!(claims.role, Role::Editor);
        assert_eq!(claims.id, login.user.id);
        assert_eq!(login.user.email, "ed@example.com");
    }

    #[tokio::test]
    async fn login_rejects_unknown_email_and_bad_password() {
        let (_fixture, auth) = service().await;
        assert!(matches!(
            auth.login("nobody@example.com", "x").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("admin@integriting.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(auth.login("", "").await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let (_fixture, auth) = service().await;
        let user = auth.create_user("u", "u@example.com", "old", Role::Editor).await.unwrap();

        assert!(matches!(
            auth.change_password(user.id, "nope", "new").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.change_password(9999, "old", "new").await,
            Err(AuthError::NotFound)
        ));

        auth.change_password(user.id, "old", "new").await.unwrap();
        assert!(auth.login("u@example.com", "old").await.is_err());
        assert!(auth.login("u@example.com", "new").await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_constraint_violation() {
        let (_fixture, auth) = service().await;
        let result = auth.create_user("other", "admin@integriting.com", "pw", Role::Editor).await;
        assert!(matches!(result, Err(AuthError::Database(DatabaseError::Constraint(_)))));
    }
}
