//! Authentication extractors.
//!
//! Resolve the `Authorization: Bearer <token>` header (the `JWT` scheme is
//! accepted too) to the caller's account. The account is re-read on every
//! request, so a deleted user or a revoked staff flag takes effect at once.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use bookshop_core::permission::{Access, Denied, Identity, Policy};
use bookshop_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::auth::{AuthError, JwtError, JwtService};
use crate::state::AppState;

/// The caller, if a token was presented.
///
/// An absent header yields `Caller(None)`; a header with a bad token is
/// rejected with 401 even on public routes.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(caller: Caller) -> impl IntoResponse {
///     match caller.user() {
///         Some(u) => format!("Hello, {}!", u.username),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Caller(pub Option<User>);

impl Caller {
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.0.as_ref().map(User::identity)
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.0.as_ref().is_some_and(|u| u.is_staff)
    }

    /// Collection-level check of `policy` for this caller.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Denied` when the policy refuses.
    pub fn check(&self, policy: Policy, access: Access) -> Result<(), AppError> {
        Ok(policy.check_collection(self.identity().as_ref(), access)?)
    }

    /// Object-level check of `policy` against an object owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Denied` when the policy refuses.
    pub fn check_object(
        &self,
        policy: Policy,
        access: Access,
        owner: Option<UserId>,
    ) -> Result<(), AppError> {
        Ok(policy.check_object(self.identity().as_ref(), access, owner)?)
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self(None));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(JwtService::extract_from_header)
            .ok_or_else(|| {
                AuthError::Token(JwtError::InvalidToken(
                    "malformed authorization header".to_string(),
                ))
            })?;

        let user = state.auth().authenticate(token).await?;

        tracing::Span::current().record("user_id", tracing::field::display(user.id));
        set_sentry_user(&user.id, &user.username);

        Ok(Self(Some(user)))
    }
}

/// Extractor that requires an authenticated caller.
///
/// Rejects with 401 when no token was presented.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Caller(user) = Caller::from_request_parts(parts, state).await?;
        user.map(Self).ok_or(AppError::Denied(Denied::Unauthenticated))
    }
}
