//! Bearer token issuance and validation.
//!
//! Tokens are HS256 JWTs. A login yields an access/refresh pair; the refresh
//! token can only be exchanged for a new access token, never used on a
//! resource route.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bookshop_core::UserId;

use crate::config::JwtConfig;
use crate::models::User;

/// Header prefixes accepted in `Authorization`.
const AUTH_SCHEMES: [&str; 2] = ["Bearer ", "JWT "];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// The user id in `sub`.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidToken` if `sub` is not a number.
    pub fn user_id(&self) -> Result<UserId, JwtError> {
        self.sub
            .parse()
            .map_err(|_| JwtError::InvalidToken("subject is not a user id".to_owned()))
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token has expired")]
    ExpiredToken,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("expected a {expected:?} token")]
    WrongTokenType { expected: TokenType },

    #[error("token generation failed: {0}")]
    GenerationFailed(String),
}

/// Access and refresh token issued together at login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
        }
    }

    /// Issue a fresh access/refresh pair for `user`.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::GenerationFailed` if signing fails.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.issue(user, TokenType::Access)?,
            refresh: self.issue(user, TokenType::Refresh)?,
        })
    }

    /// Issue a single token of the given type.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::GenerationFailed` if signing fails.
    pub fn issue(&self, user: &User, token_type: TokenType) -> Result<String, JwtError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.to_string(),
            is_staff: user.is_staff,
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// Check signature, expiry and type of `token`.
    ///
    /// # Errors
    ///
    /// Returns the matching `JwtError` for a token that is malformed, expired,
    /// badly signed or of the wrong type.
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken(e.to_string()),
            }
        })?;

        if data.claims.token_type != expected {
            return Err(JwtError::WrongTokenType { expected });
        }
        Ok(data.claims)
    }

    /// Extract the token from an `Authorization` header value.
    #[must_use]
    pub fn extract_from_header(header: &str) -> Option<&str> {
        AUTH_SCHEMES
            .iter()
            .find_map(|scheme| header.strip_prefix(scheme))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use bookshop_core::Email;

    use super::*;

    fn service(access_minutes: i64) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: SecretString::from("k3J9!vQ2#mZ8@pL5$wR1^tY7&uB4*nX6"),
            access_token_minutes: access_minutes,
            refresh_token_days: 1,
        })
    }

    fn user() -> User {
        User {
            id: UserId::new(7),
            username: "reader".to_owned(),
            first_name: String::new(),
            last_name: String::new(),
            email: Email::parse("reader@example.com").unwrap(),
            is_staff: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_pair_round_trip() {
        let jwt = service(60);
        let pair = jwt.issue_pair(&user()).unwrap();

        let claims = jwt.validate(&pair.access, TokenType::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId::new(7));
        assert_eq!(claims.username, "reader");
        assert_eq!(claims.email, "reader@example.com");
        assert!(claims.is_staff);

        assert!(jwt.validate(&pair.refresh, TokenType::Refresh).is_ok());
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let jwt = service(60);
        let pair = jwt.issue_pair(&user()).unwrap();
        assert!(matches!(
            jwt.validate(&pair.refresh, TokenType::Access),
            Err(JwtError::WrongTokenType {
                expected: TokenType::Access
            })
        ));
    }

    #[test]
    fn test_expired_token() {
        let jwt = service(-5);
        let token = jwt.issue(&user(), TokenType::Access).unwrap();
        assert!(matches!(
            jwt.validate(&token, TokenType::Access),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_foreign_signature() {
        let token = service(60).issue(&user(), TokenType::Access).unwrap();
        let other = JwtService::new(&JwtConfig {
            secret: SecretString::from("Zq8#Lm2!Rt6@Wx4$Np9^Hc3&Vb7*Ks5%"),
            access_token_minutes: 60,
            refresh_token_days: 1,
        });
        assert!(matches!(
            other.validate(&token, TokenType::Access),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("JWT abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
        assert_eq!(JwtService::extract_from_header("Bearer "), None);
    }
}
