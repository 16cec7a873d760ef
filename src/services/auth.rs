//! Session-less account operations.
//!
//! Every caller identifies itself by email; admin-gated operations resolve
//! that email first and fail closed.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::password::{validate_password, PasswordHasher};
use crate::db::models::{Role, User, UserPublicView};
use crate::error::AppError;
use crate::store::{StoreError, UserRepository};

/// Resolves `actor_email` to an admin or fails with [`AppError::Auth`].
pub(crate) async fn require_admin(
    users: &dyn UserRepository,
    actor_email: &str,
    action: &str,
) -> Result<User, AppError> {
    match users.find_by_email(actor_email).await? {
        Some(user) if user.role == Role::Admin => Ok(user),
        _ => {
            tracing::warn!(actor = %actor_email, action, "admin check failed");
            Err(AppError::Auth(format!(
                "Unauthorized: Only admins can {}",
                action
            )))
        }
    }
}

/// Equal-length comparison that does not stop at the first mismatch.
fn secrets_match(given: &str, expected: &str) -> bool {
    let given = given.as_bytes();
    let expected = expected.as_bytes();
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    bootstrap_secret: Option<String>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: PasswordHasher,
        bootstrap_secret: Option<String>,
    ) -> Self {
        Self {
            users,
            hasher,
            bootstrap_secret: bootstrap_secret.filter(|s| !s.is_empty()),
        }
    }

    /// Every new account is created as an admin.
    pub async fn signup(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<UserPublicView, AppError> {
        validate_password(password)?;
        if email.trim().is_empty() || !email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }

        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hasher.hash(password).await?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.trim().to_string(),
            password_hash,
            role: Role::Admin,
            created_at: now,
            updated_at: now,
        };

        match self.users.insert(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.id, email = %user.email, "account created");
        Ok(UserPublicView::from(&user))
    }

    pub async fn signin(&self, email: &str, password: &str) -> Result<UserPublicView, AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !self.hasher.verify(password, &user.password_hash).await {
            tracing::warn!(email = %email, "failed sign-in attempt");
            return Err(AppError::Auth("Invalid password".to_string()));
        }

        let user = self.ensure_admin_exists(user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "signed in");
        Ok(UserPublicView::from(&user))
    }

    /// Promotes `user` when the system has no admin at all. The check and
    /// the promotion are one store operation.
    async fn ensure_admin_exists(&self, mut user: User) -> Result<User, AppError> {
        if user.role == Role::Admin {
            return Ok(user);
        }

        let now = Utc::now();
        if self.users.promote_if_no_admin(user.id, now).await? {
            tracing::info!(user_id = %user.id, "no admin present, promoted signing-in user");
            user.role = Role::Admin;
            user.updated_at = now;
        }
        Ok(user)
    }

    pub async fn promote_to_admin(
        &self,
        actor_email: &str,
        target_user_id: Uuid,
    ) -> Result<UserPublicView, AppError> {
        require_admin(self.users.as_ref(), actor_email, "promote users").await?;
        let user = self.set_role(target_user_id, Role::Admin).await?;
        tracing::info!(actor = %actor_email, target = %user.id, "user promoted to admin");
        Ok(UserPublicView::from(&user))
    }

    /// Demoting the last admin is allowed; the next sign-in restores one.
    pub async fn demote_from_admin(
        &self,
        actor_email: &str,
        target_user_id: Uuid,
    ) -> Result<UserPublicView, AppError> {
        require_admin(self.users.as_ref(), actor_email, "demote users").await?;
        let user = self.set_role(target_user_id, Role::User).await?;
        tracing::info!(actor = %actor_email, target = %user.id, "admin demoted to user");

        if self.users.count_admins().await? == 0 {
            tracing::warn!(target = %user.id, "no admins remain after demotion");
        }
        Ok(UserPublicView::from(&user))
    }

    async fn set_role(&self, target_user_id: Uuid, role: Role) -> Result<User, AppError> {
        self.users
            .set_role(target_user_id, role, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Full records including digests; the HTTP layer maps them to public views.
    pub async fn list_all_users(&self, actor_email: &str) -> Result<Vec<User>, AppError> {
        require_admin(self.users.as_ref(), actor_email, "view all users").await?;
        Ok(self.users.list().await?)
    }

    pub async fn get_current_user(&self, email: &str) -> Result<Option<UserPublicView>, AppError> {
        Ok(self
            .users
            .find_by_email(email)
            .await?
            .map(|user| UserPublicView::from(&user)))
    }

    /// Operator escape hatch: promotes `email` when `secret` matches the
    /// configured bootstrap secret. Disabled when no secret is configured.
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<UserPublicView, AppError> {
        let authorized = self
            .bootstrap_secret
            .as_deref()
            .is_some_and(|expected| secrets_match(secret, expected));
        if !authorized {
            tracing::warn!(email = %email, "rejected admin bootstrap attempt");
            return Err(AppError::Auth("Invalid bootstrap secret".to_string()));
        }

        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let user = self.set_role(user.id, Role::Admin).await?;
        tracing::warn!(user_id = %user.id, "admin granted via bootstrap secret");
        Ok(UserPublicView::from(&user))
    }
}
