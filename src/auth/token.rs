use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, SecurityConfig};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT generation error: {0}")]
    Generation(String),
}

/// Signs and verifies stateless bearer tokens with a symmetric secret.
#[derive(Clone)]
pub struct TokenIssuer {
    algorithm: Algorithm,
    lifetime: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(security: &SecurityConfig) -> Result<Self, ConfigError> {
        if security.jwt_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if security.token_expiry_minutes <= 0 {
            return Err(ConfigError::ZeroTokenLifetime);
        }

        let algorithm = Algorithm::from_str(&security.jwt_algorithm)
            .ok()
            .filter(|alg| matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512))
            .ok_or_else(|| ConfigError::UnsupportedAlgorithm(security.jwt_algorithm.clone()))?;

        let secret = security.jwt_secret.as_bytes();

        Ok(Self {
            algorithm,
            lifetime: Duration::minutes(security.token_expiry_minutes),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// Mint a token as if issued at `now`; it expires at `now + lifetime`.
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + self.lifetime).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Verify signature, algorithm and expiry, returning the embedded subject.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| TokenError::InvalidToken(e.to_string()))?;

        let subject = token_data.claims.sub;
        if subject.is_empty() {
            return Err(TokenError::InvalidToken("token payload has no subject".to_string()));
        }

        Ok(subject)
    }
}
