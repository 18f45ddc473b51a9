//! Account handlers.
//!
//! `/users/` is staff-only administration. A single account is governed by the
//! owner policy: the account itself or staff may read and update it, only
//! staff may delete it. `/profile/` is the caller's own account.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use bookshop_core::UserId;
use bookshop_core::catalog::{Sort, UserSortField};
use bookshop_core::permission::{Access, Policy};

use crate::db::{OrderRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{Caller, RequireAuth};
use crate::models::{OrderScope, User, UserDetail, UserUpdate};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub ordering: Option<String>,
}

/// GET /users/
#[instrument(skip(state, caller))]
pub async fn index(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<ApiJson<Vec<User>>> {
    caller.check(Policy::StaffOnly, Access::Read)?;
    let sort: Sort<UserSortField> = match query.ordering.as_deref().map(str::trim) {
        None | Some("") => Sort::default(),
        Some(ordering) => ordering.parse()?,
    };
    Ok(ApiJson(state.store().list_users(sort).await?))
}

/// GET /users/{id}/
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<UserId>,
) -> Result<ApiJson<UserDetail>> {
    caller.check(Policy::Owner, Access::Read)?;
    let user = load(&state, id).await?;
    caller.check_object(Policy::Owner, Access::Read, Some(user.id))?;
    Ok(ApiJson(detail(&state, user).await?))
}

/// PUT|PATCH /users/{id}/
#[instrument(skip(state, caller, update))]
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Result<ApiJson<UserDetail>> {
    caller.check(Policy::Owner, Access::Update)?;
    let user = load(&state, id).await?;
    caller.check_object(Policy::Owner, Access::Update, Some(user.id))?;
    save(&state, user, update).await
}

/// DELETE /users/{id}/
#[instrument(skip(state, caller))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<UserId>,
) -> Result<StatusCode> {
    caller.check(Policy::Owner, Access::Delete)?;
    let user = load(&state, id).await?;
    caller.check_object(Policy::Owner, Access::Delete, Some(user.id))?;
    state.store().delete_user(user.id).await?;
    tracing::info!(user_id = %user.id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /profile/
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiJson<UserDetail>> {
    Ok(ApiJson(detail(&state, user).await?))
}

/// PUT|PATCH /profile/
#[instrument(skip(state, user, update), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Result<ApiJson<UserDetail>> {
    save(&state, user, update).await
}

async fn load(state: &AppState, id: UserId) -> Result<User> {
    state
        .store()
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))
}

async fn save(state: &AppState, mut user: User, update: UserUpdate) -> Result<ApiJson<UserDetail>> {
    update.apply(&mut user);
    user.first_name = user.first_name.trim().to_owned();
    user.last_name = user.last_name.trim().to_owned();

    let user = state.store().update_user(&user).await?;
    tracing::info!(user_id = %user.id, "account updated");
    Ok(ApiJson(detail(state, user).await?))
}

async fn detail(state: &AppState, user: User) -> Result<UserDetail> {
    let orders = state
        .store()
        .list_orders(OrderScope::customer(user.id))
        .await?;
    Ok(UserDetail { user, orders })
}
