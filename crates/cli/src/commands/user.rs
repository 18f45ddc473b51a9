//! Account management.
//!
//! # Environment Variables
//!
//! - `BOOKSHOP_NEW_USER_PASSWORD` - password for the new account, kept out of
//!   the shell history and process list

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use bookshop_api::db::{RepositoryError, UserRepository};
use bookshop_api::models::NewUser;
use bookshop_api::services::auth::{AuthError, hash_password, validate_password};
use bookshop_core::{Email, EmailError};

const PASSWORD_VAR: &str = "BOOKSHOP_NEW_USER_PASSWORD";

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("{0}")]
    Password(#[from] AuthError),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Storage error: {0}")]
    Repository(RepositoryError),
}

/// Create an account, optionally with staff rights.
///
/// # Errors
///
/// Returns a `UserError` for bad input or a taken username, and any
/// connection error.
pub async fn create(
    username: &str,
    email: &str,
    staff: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let username = username.trim();
    if username.is_empty() || username.chars().any(char::is_whitespace) {
        return Err(UserError::InvalidUsername(username.to_owned()).into());
    }
    let email = Email::parse(email).map_err(UserError::from)?;

    let password = std::env::var(PASSWORD_VAR)
        .map(SecretString::from)
        .map_err(|_| UserError::MissingEnvVar(PASSWORD_VAR))?;
    validate_password(password.expose_secret()).map_err(UserError::from)?;
    let password_hash = hash_password(password.expose_secret()).map_err(UserError::from)?;

    let store = super::connect_store().await?;

    tracing::info!("Creating account: {} ({})", username, email);
    let user = store
        .create_user(NewUser {
            username: username.to_owned(),
            first_name: String::new(),
            last_name: String::new(),
            email,
            password_hash,
            is_staff: staff,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => UserError::UserExists(username.to_owned()),
            other => UserError::Repository(other),
        })?;

    tracing::info!(
        "Account created successfully! ID: {}, Username: {}, Staff: {}",
        user.id,
        user.username,
        user.is_staff
    );
    Ok(())
}
