/// Password Hashing and Verification
///
/// Salted bcrypt digests with a configurable cost factor. `bcrypt::verify`
/// compares digests in constant time.

use bcrypt::{hash, verify};

use crate::error::{AppError, ConfigError};

#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// # Errors
    /// Returns a config error when `cost` is outside bcrypt's 4..=31 range
    pub fn new(cost: u32) -> Result<Self, AppError> {
        if !(4..=31).contains(&cost) {
            return Err(ConfigError::InvalidValue(format!(
                "bcrypt cost must be between 4 and 31, got {}",
                cost
            ))
            .into());
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password using bcrypt
    ///
    /// # Errors
    /// Returns error if bcrypt hashing fails
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its hash
    ///
    /// # Errors
    /// Returns error if the stored hash is not a bcrypt digest
    pub fn verify(&self, password: &str, digest: &str) -> Result<bool, AppError> {
        verify(password, digest)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}
