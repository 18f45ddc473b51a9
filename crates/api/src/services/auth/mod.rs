//! Authentication service.
//!
//! Password accounts with argon2 hashes, and bearer tokens on top of them.

mod error;
pub mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, JwtError, JwtService, TokenPair, TokenType};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;

use bookshop_core::Email;

use crate::db::{RepositoryError, Store, UserRepository};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest accepted username.
const MAX_USERNAME_LENGTH: usize = 150;

/// Self-service sign-up payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Authentication service.
///
/// Handles registration, login and token refresh.
pub struct AuthService<'a> {
    store: &'a Store,
    jwt: &'a JwtService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a Store, jwt: &'a JwtService) -> Self {
        Self { store, jwt }
    }

    /// Create a non-staff account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::InvalidUsername` or
    /// `AuthError::WeakPassword` for bad input, and
    /// `AuthError::UserAlreadyExists` if the username is taken.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AuthError> {
        let email = Email::parse(&request.email)?;
        let username = validate_username(&request.username)?;
        validate_password(&request.password)?;

        let password_hash = hash_password(&request.password)?;

        let user = self
            .store
            .create_user(NewUser {
                username,
                first_name: request.first_name.trim().to_owned(),
                last_name: request.last_name.trim().to_owned(),
                email,
                password_hash,
                is_staff: false,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "account registered");
        Ok(user)
    }

    /// Check a username/password and issue a token pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let (user, password_hash) = self
            .store
            .get_user_credentials(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(self.jwt.issue_pair(&user)?)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Claims are re-read from the account, so a staff flag revoked since the
    /// refresh token was issued is not carried forward.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` for a bad refresh token and
    /// `AuthError::UserNotFound` if the account is gone.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.jwt.validate(refresh_token, TokenType::Refresh)?;
        let user = self.user_for(&claims).await?;
        Ok(self.jwt.issue(&user, TokenType::Access)?)
    }

    /// Resolve an access token to the current state of its account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` for a bad token and `AuthError::UserNotFound`
    /// if the account is gone.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self.jwt.validate(access_token, TokenType::Access)?;
        self.user_for(&claims).await
    }

    async fn user_for(&self, claims: &Claims) -> Result<User, AuthError> {
        self.store
            .get_user(claims.user_id()?)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Validate a username: non-blank, bounded, no whitespace inside.
fn validate_username(username: &str) -> Result<String, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername("username cannot be empty".to_owned()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidUsername(
            "username cannot contain spaces".to_owned(),
        ));
    }
    Ok(username.to_owned())
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::JwtConfig;

    fn jwt() -> JwtService {
        JwtService::new(&JwtConfig {
            secret: SecretString::from("k3J9!vQ2#mZ8@pL5$wR1^tY7&uB4*nX6"),
            access_token_minutes: 60,
            refresh_token_days: 1,
        })
    }

    fn request(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            password: password.to_owned(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
        assert_eq!(validate_username("  reader ").unwrap(), "reader");
        assert!(validate_username("two words").is_err());
        assert!(validate_username("").is_err());
    }

    #[tokio::test]
    async fn test_register_login_refresh() {
        let store = Store::memory();
        let jwt = jwt();
        let auth = AuthService::new(&store, &jwt);

        let user = auth.register(request("reader", "s3cret-pass")).await.unwrap();
        assert!(!user.is_staff);

        assert!(matches!(
            auth.register(request("reader", "another-pass")).await,
            Err(AuthError::UserAlreadyExists)
        ));
        assert!(matches!(
            auth.login("reader", "bad-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody", "s3cret-pass").await,
            Err(AuthError::InvalidCredentials)
        ));

        let pair = auth.login("reader", "s3cret-pass").await.unwrap();
        assert_eq!(auth.authenticate(&pair.access).await.unwrap().id, user.id);

        let access = auth.refresh(&pair.refresh).await.unwrap();
        assert_eq!(auth.authenticate(&access).await.unwrap().id, user.id);
        assert!(auth.refresh(&pair.access).await.is_err());
    }
}
