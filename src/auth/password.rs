use thiserror::Error;

/// bcrypt reads 72 bytes including the NUL terminator.
pub const MAX_PASSWORD_BYTES: usize = 71;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password exceeds 71 bytes")]
    TooLong,

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

/// bcrypt hasher with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash without truncation; input longer than `MAX_PASSWORD_BYTES` is refused.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        match bcrypt::non_truncating_hash(plaintext, self.cost) {
            Ok(hash) => Ok(hash),
            Err(bcrypt::BcryptError::Truncation(_)) => Err(PasswordError::TooLong),
            Err(e) => Err(e.into()),
        }
    }

    /// Constant-time check. Mismatches, over-long input and unreadable hashes all yield `false`.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        match bcrypt::non_truncating_verify(plaintext, hash) {
            Ok(matches) => matches,
            Err(bcrypt::BcryptError::Truncation(_)) => false,
            Err(e) => {
                tracing::warn!("Stored password hash could not be parsed: {}", e);
                false
            }
        }
    }
}
