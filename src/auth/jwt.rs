use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::config::JwtConfig;
use crate::error::AppError;
use crate::store::UserRecord;

use super::Claims;

/// HS256 key pair for issuing and validating session tokens
pub struct JwtKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_hours: i64,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation: Validation::default(),
            expiry_hours: config.expiry_hours,
        }
    }

    /// Mint a session token for a user who just completed OTP login
    pub fn issue(&self, user: &UserRecord) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            expiry_hours: 24,
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let keys = JwtKeys::new(&create_test_config());
        let user = UserRecord::new("rider@example.com", Some("Rider".to_string()));

        let token = keys.issue(&user).unwrap();
        let claims = keys.validate(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "rider@example.com");
        assert_eq!(claims.name.as_deref(), Some("Rider"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_invalid_token() {
        let keys = JwtKeys::new(&create_test_config());
        assert!(keys.validate("invalid-token").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let keys = JwtKeys::new(&create_test_config());
        let other = JwtKeys::new(&JwtConfig {
            secret: "some-other-secret".to_string(),
            expiry_hours: 24,
        });

        let user = UserRecord::new("rider@example.com", None);
        let token = other.issue(&user).unwrap();
        assert!(keys.validate(&token).is_err());
    }
}
