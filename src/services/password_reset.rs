//! One-time reset codes.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

use super::password::{validate_password, PasswordHasher};
use crate::db::models::PasswordResetRequest;
use crate::error::AppError;
use crate::store::{ResetRepository, UserRepository};

pub const RESET_CODE_LEN: usize = 6;
/// Also quoted in the reset email.
pub const RESET_CODE_TTL_MINUTES: i64 = 10;
pub const MAX_RESET_ATTEMPTS: u32 = 5;

/// Result of a reset request. Both fields are absent when the email has no
/// account, so callers cannot tell the two cases apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResetIssued {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeVerification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CodeVerification {
    fn valid() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn invalid(reason: &str) -> Self {
        Self {
            valid: false,
            error: Some(reason.to_string()),
        }
    }
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..RESET_CODE_LEN)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Why a request cannot be used right now, if it cannot.
fn inactive_reason(request: &PasswordResetRequest, now: DateTime<Utc>) -> Option<&'static str> {
    if request.consumed {
        Some("Reset code has already been used")
    } else if now >= request.expires_at {
        Some("Reset code has expired")
    } else if request.attempts >= MAX_RESET_ATTEMPTS {
        Some("Too many attempts. Please request a new code")
    } else {
        None
    }
}

#[derive(Clone)]
pub struct PasswordResetService {
    users: Arc<dyn UserRepository>,
    resets: Arc<dyn ResetRepository>,
    hasher: PasswordHasher,
}

impl PasswordResetService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        resets: Arc<dyn ResetRepository>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            users,
            resets,
            hasher,
        }
    }

    /// Issues a fresh code, superseding any earlier request for `email`.
    pub async fn request_password_reset(&self, email: &str) -> Result<ResetIssued, AppError> {
        if self.users.find_by_email(email).await?.is_none() {
            tracing::info!(email = %email, "password reset requested for unknown email");
            return Ok(ResetIssued::default());
        }

        let now = Utc::now();
        let request = PasswordResetRequest {
            email: email.to_string(),
            code: generate_code(),
            created_at: now,
            expires_at: now + Duration::minutes(RESET_CODE_TTL_MINUTES),
            attempts: 0,
            consumed: false,
        };
        self.resets.put(&request).await?;

        tracing::info!(email = %email, expires_at = %request.expires_at, "password reset code issued");
        Ok(ResetIssued {
            code: Some(request.code),
            expires_at: Some(request.expires_at),
        })
    }

    /// Never fails on an unusable code; the reason is reported instead.
    /// A wrong code does not count as an attempt here, see
    /// [`Self::increment_attempts`].
    pub async fn verify_reset_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<CodeVerification, AppError> {
        let Some(request) = self.resets.get(email).await? else {
            return Ok(CodeVerification::invalid("No reset request found"));
        };

        if let Some(reason) = inactive_reason(&request, Utc::now()) {
            return Ok(CodeVerification::invalid(reason));
        }
        if request.code != code {
            return Ok(CodeVerification::invalid("Invalid code"));
        }
        Ok(CodeVerification::valid())
    }

    pub async fn increment_attempts(&self, email: &str) -> Result<(), AppError> {
        if let Some(attempts) = self.resets.increment_attempts(email).await? {
            tracing::debug!(email = %email, attempts, "reset code attempt recorded");
            if attempts >= MAX_RESET_ATTEMPTS {
                tracing::warn!(email = %email, "reset code locked after too many attempts");
            }
        }
        Ok(())
    }

    /// Consumes the request before the digest is rewritten, so a code can
    /// change the password at most once. A wrong code counts as an attempt.
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        validate_password(new_password)?;

        let request = self
            .resets
            .get(email)
            .await?
            .ok_or_else(|| AppError::Auth("No reset request found".to_string()))?;
        if let Some(reason) = inactive_reason(&request, Utc::now()) {
            return Err(AppError::Auth(reason.to_string()));
        }
        if request.code != code {
            self.increment_attempts(email).await?;
            return Err(AppError::Auth("Invalid code".to_string()));
        }

        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let password_hash = self.hasher.hash(new_password).await?;

        if !self.resets.consume(email, code).await? {
            return Err(AppError::Auth("Reset code has already been used".to_string()));
        }
        self.users
            .set_password_hash(user.id, &password_hash, Utc::now())
            .await?;

        tracing::info!(user_id = %user.id, "password reset completed");
        Ok(())
    }
}
