//! JWT token generation, validation, and claims.
//!
//! Centralizes all JWT handling with a shared validator for encoding and decoding.
//! Uses a pre-compiled validator with cached keys for optimal performance.
//!
//! This module is database-agnostic: implement `JwtSubject` for your user type.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppError;

/// JWT issuer identifier.
const ISSUER: &str = "credentialing-service";
/// JWT audience identifier.
const AUDIENCE: &str = "credentialing-service";

/// Trait for types that can be used as JWT subjects.
///
/// Implement this trait for your user model to enable JWT generation
/// without coupling the JWT module to specific database models.
pub trait JwtSubject {
    /// User's unique identifier.
    fn user_id(&self) -> Uuid;
    /// User's email address.
    fn email(&self) -> &str;
    /// User's display name.
    fn name(&self) -> &str;
    /// User's role as a string (e.g., "administrator", "reviewer").
    fn role(&self) -> &str;
}

/// Back-office role carried in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Administrator,
    Reviewer,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Administrator => "administrator",
            Self::Reviewer => "reviewer",
        })
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "administrator" => Ok(Self::Administrator),
            "reviewer" => Ok(Self::Reviewer),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

/// Distinguishes access tokens from refresh tokens.
///
/// A refresh token must never be accepted on protected routes, and an
/// access token must never mint a new pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// Validated authentication info from JWT.
///
/// Single source of truth for auth context across middleware and services.
#[derive(Debug, Clone)]
pub struct AuthInfo {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl AuthInfo {
    /// Check if the user has the administrator role.
    #[inline]
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Administrator)
    }
}

impl JwtSubject for AuthInfo {
    fn user_id(&self) -> Uuid {
        self.user_id
    }
    fn email(&self) -> &str {
        &self.email
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn role(&self) -> &str {
        match self.role {
            UserRole::Administrator => "administrator",
            UserRole::Reviewer => "reviewer",
        }
    }
}

/// JWT claims structure following RFC 7519.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Audience
    pub aud: String,
    /// Issuer
    pub iss: String,
    /// JWT ID (unique token identifier)
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Not before time (Unix timestamp) - token is not valid before this time
    pub nbf: i64,

    // Custom claims
    /// Token purpose (access or refresh)
    pub token_use: TokenUse,
    /// User role
    pub role: String,
    /// User email
    pub email: String,
    /// User name
    pub name: String,
}

/// JWT validation errors.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("invalid authorization format")]
    InvalidFormat,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("wrong token type for this operation")]
    WrongTokenUse,
    #[error("invalid claim: {0}")]
    InvalidClaim(&'static str),
}

impl TryFrom<Claims> for AuthInfo {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidClaim("sub"))?,
            role: claims
                .role
                .parse()
                .map_err(|_| JwtError::InvalidClaim("role"))?,
            email: claims.email,
            name: claims.name,
        })
    }
}

/// Access and refresh token pair returned on login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Pre-compiled JWT validator with cached encoding/decoding keys.
///
/// Thread-safe and cloneable via `Arc`. Creating keys is expensive,
/// so this caches them for the lifetime of the application.
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl JwtValidator {
    /// Create a new validator from a secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret_bytes)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret_bytes)),
            validation,
        }
    }

    /// Generate a token for any type implementing `JwtSubject`.
    pub fn generate_token<T: JwtSubject>(
        &self,
        subject: &T,
        token_use: TokenUse,
        ttl_secs: u64,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let expiration = now + Duration::seconds(ttl_secs as i64);

        let claims = Claims {
            // Standard claims
            sub: subject.user_id().to_string(),
            aud: AUDIENCE.to_string(),
            iss: ISSUER.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(), // Token valid immediately

            // Custom claims
            token_use,
            role: subject.role().to_string(),
            email: subject.email().to_string(),
            name: subject.name().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("JWT encoding failed: {e}")))
    }

    /// Generate an access/refresh pair for a subject.
    pub fn generate_pair<T: JwtSubject>(
        &self,
        subject: &T,
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
    ) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access: self.generate_token(subject, TokenUse::Access, access_ttl_secs)?,
            refresh: self.generate_token(subject, TokenUse::Refresh, refresh_ttl_secs)?,
        })
    }

    /// Validate an access token and extract auth info.
    pub fn validate(&self, token: &str) -> Result<AuthInfo, JwtError> {
        self.validate_use(token, TokenUse::Access)
    }

    /// Validate a refresh token and extract auth info for re-minting.
    pub fn validate_refresh(&self, token: &str) -> Result<AuthInfo, JwtError> {
        self.validate_use(token, TokenUse::Refresh)
    }

    fn validate_use(&self, token: &str, expected: TokenUse) -> Result<AuthInfo, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| JwtError::InvalidToken)?;

        if token_data.claims.token_use != expected {
            return Err(JwtError::WrongTokenUse);
        }

        token_data.claims.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test implementation of JwtSubject for unit tests.
    struct TestUser {
        id: Uuid,
        email: String,
        name: String,
        role: String,
    }

    impl JwtSubject for TestUser {
        fn user_id(&self) -> Uuid {
            self.id
        }
        fn email(&self) -> &str {
            &self.email
        }
        fn name(&self) -> &str {
            &self.name
        }
        fn role(&self) -> &str {
            &self.role
        }
    }

    fn test_user() -> TestUser {
        TestUser {
            id: Uuid::new_v4(),
            email: "reviewer@example.com".to_string(),
            name: "Test Reviewer".to_string(),
            role: "reviewer".to_string(),
        }
    }

    fn test_secret() -> SecretString {
        SecretString::from("test_secret_key_minimum_32_chars!")
    }

    #[test]
    fn generate_and_validate_access_token() {
        let user = test_user();
        let validator = JwtValidator::new(&test_secret());

        let token = validator
            .generate_token(&user, TokenUse::Access, 900)
            .unwrap();

        let auth_info = validator.validate(&token).unwrap();

        assert_eq!(auth_info.email, user.email);
        assert_eq!(auth_info.name, user.name);
        assert_eq!(auth_info.user_id, user.id);
        assert_eq!(auth_info.role, UserRole::Reviewer);
    }

    #[test]
    fn refresh_token_rejected_as_access() {
        let user = test_user();
        let validator = JwtValidator::new(&test_secret());

        let pair = validator.generate_pair(&user, 900, 86400).unwrap();

        assert!(validator.validate(&pair.access).is_ok());
        assert!(matches!(
            validator.validate(&pair.refresh),
            Err(JwtError::WrongTokenUse)
        ));
        assert!(validator.validate_refresh(&pair.refresh).is_ok());
        assert!(matches!(
            validator.validate_refresh(&pair.access),
            Err(JwtError::WrongTokenUse)
        ));
    }

    #[test]
    fn refresh_minted_auth_info_can_generate_new_pair() {
        let user = test_user();
        let validator = JwtValidator::new(&test_secret());

        let pair = validator.generate_pair(&user, 900, 86400).unwrap();
        let auth_info = validator.validate_refresh(&pair.refresh).unwrap();

        let new_pair = validator.generate_pair(&auth_info, 900, 86400).unwrap();
        let revalidated = validator.validate(&new_pair.access).unwrap();

        assert_eq!(revalidated.user_id, user.id);
        assert_eq!(revalidated.email, user.email);
    }

    #[test]
    fn invalid_token_rejected() {
        let validator = JwtValidator::new(&test_secret());
        assert!(validator.validate("invalid.token.here").is_err());
    }

    #[test]
    fn token_from_different_secret_rejected() {
        let user = test_user();
        let validator = JwtValidator::new(&test_secret());
        let other = JwtValidator::new(&SecretString::from(
            "another_secret_key_minimum_32_chars",
        ));

        let token = validator
            .generate_token(&user, TokenUse::Access, 900)
            .unwrap();

        assert!(matches!(
            other.validate(&token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn user_role_parsing() {
        assert_eq!(
            "administrator".parse::<UserRole>().unwrap(),
            UserRole::Administrator
        );
        assert_eq!("reviewer".parse::<UserRole>().unwrap(), UserRole::Reviewer);
        assert_eq!(
            "ADMINISTRATOR".parse::<UserRole>().unwrap(),
            UserRole::Administrator
        );
        assert!("invalid".parse::<UserRole>().is_err());
    }

    #[test]
    fn admin_flag() {
        let admin = AuthInfo {
            user_id: Uuid::new_v4(),
            email: "admin@test.com".to_string(),
            name: "Admin".to_string(),
            role: UserRole::Administrator,
        };
        let reviewer = AuthInfo {
            user_id: Uuid::new_v4(),
            email: "reviewer@test.com".to_string(),
            name: "Reviewer".to_string(),
            role: UserRole::Reviewer,
        };

        assert!(admin.is_admin());
        assert!(!reviewer.is_admin());
    }
}
