//! Password digests.

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Rejects passwords shorter than [`MIN_PASSWORD_LEN`] characters.
pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// bcrypt with a configurable cost. Hashing runs on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("hash task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("failed to hash password: {}", e)))
    }

    /// A malformed digest counts as a mismatch.
    pub async fn verify(&self, password: &str, digest: &str) -> bool {
        let password = password.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &digest).unwrap_or(false))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        // Counted in characters, not bytes
        assert!(validate_password("ééééé").is_err());
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(4);
        let digest = hasher.hash("correct horse").await.unwrap();
        assert_ne!(digest, "correct horse");
        assert!(hasher.verify("correct horse", &digest).await);
        assert!(!hasher.verify("wrong horse", &digest).await);
        assert!(!hasher.verify("correct horse", "not-a-digest").await);
    }
}
