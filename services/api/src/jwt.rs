//! JWT service for access-token generation and validation
//!
//! Tokens are signed with HS256 using a server-held secret and carry the
//! username as subject plus an absolute expiry. There is no refresh,
//! rotation, or revocation; a token stays valid until it expires.

use anyhow::Result;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret for signing and verifying tokens
    pub secret: String,
    /// Access token expiration time in seconds (default: 30 minutes)
    pub access_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SECRET_KEY`: Shared signing secret (required)
    /// - `ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 1800)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("SECRET_KEY")
            .map_err(|_| anyhow::anyhow!("SECRET_KEY environment variable not set"))?;

        let access_token_expiry = std::env::var("ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "1800".to_string()) // 30 minutes
            .parse()
            .unwrap_or(1800);

        Ok(JwtConfig {
            secret,
            access_token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the authenticated user
    pub sub: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_expiry: u64,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: &JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        // Expiry is absolute, no clock-skew grace
        validation.leeway = 0;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            access_token_expiry: config.access_token_expiry,
        }
    }

    /// Generate an access token for a subject
    pub fn issue(&self, subject: &str) -> Result<String> {
        let now = unix_now()?;

        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + self.access_token_expiry,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a token and return the claims
    ///
    /// Fails on a bad signature, an unparseable payload, or an elapsed
    /// expiry.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(expiry: u64) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: expiry,
        })
    }

    #[test]
    fn issued_token_verifies_and_carries_subject() {
        let jwt = service(1800);
        let token = jwt.issue("alice").expect("issue");
        let claims = jwt.verify(&token).expect("verify");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp, claims.iat + 1800);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = service(1800);
        let now = unix_now().expect("time");

        let claims = Claims {
            sub: "alice".to_string(),
            iat: now - 3600,
            exp: now - 300,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .expect("encode");

        assert!(jwt.verify(&token).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let jwt = service(1800);
        let token = jwt.issue("alice").expect("issue");

        let mut tampered = token.clone();
        // Flip the last signature character
        let last = tampered.pop().expect("non-empty token");
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert!(jwt.verify(&tampered).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let jwt = service(1800);
        let other = JwtService::new(&JwtConfig {
            secret: "other-secret".to_string(),
            access_token_expiry: 1800,
        });

        let token = other.issue("alice").expect("issue");
        assert!(jwt.verify(&token).is_err());
    }
}
