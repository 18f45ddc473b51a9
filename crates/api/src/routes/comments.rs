//! Review handlers.
//!
//! Any signed-in caller may read reviews or post one per book; only the
//! review's author or staff may change or delete it.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use bookshop_core::permission::{Access, Policy};
use bookshop_core::{BookId, CommentId, Rating};

use crate::db::{CommentRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{Caller, RequireAuth};
use crate::models::{Comment, CommentPatch, NewComment};
use crate::state::AppState;

/// `POST /comment/` body. The author is always the caller.
#[derive(Debug, Deserialize)]
pub struct CommentInput {
    pub book: BookId,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub comment: String,
}

/// POST /comment/
#[instrument(skip(state, author, input), fields(book_id = %input.book))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(author): RequireAuth,
    ApiJson(input): ApiJson<CommentInput>,
) -> Result<impl IntoResponse> {
    Policy::CommentOwner.check_collection(Some(&author.identity()), Access::Create)?;

    let comment = state
        .store()
        .create_comment(NewComment {
            book_id: input.book,
            author_id: author.id,
            rating: input.rating,
            comment: input.comment.trim().to_owned(),
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::validation("you have already reviewed this book")
            }
            other => other.into(),
        })?;

    tracing::info!(comment_id = %comment.id, "review posted");
    Ok((StatusCode::CREATED, ApiJson(comment)))
}

/// GET /comment/{id}/
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<CommentId>,
) -> Result<ApiJson<Comment>> {
    caller.check(Policy::CommentOwner, Access::Read)?;
    let comment = load(&state, id).await?;
    caller.check_object(Policy::CommentOwner, Access::Read, Some(comment.author_id))?;
    Ok(ApiJson(comment))
}

/// PUT|PATCH /comment/{id}/
#[instrument(skip(state, caller, patch))]
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<CommentId>,
    ApiJson(patch): ApiJson<CommentPatch>,
) -> Result<ApiJson<Comment>> {
    caller.check(Policy::CommentOwner, Access::Update)?;
    let mut comment = load(&state, id).await?;
    caller.check_object(Policy::CommentOwner, Access::Update, Some(comment.author_id))?;

    patch.apply(&mut comment);
    comment.comment = comment.comment.trim().to_owned();
    let comment = state.store().update_comment(&comment).await?;
    Ok(ApiJson(comment))
}

/// DELETE /comment/{id}/
#[instrument(skip(state, caller))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<CommentId>,
) -> Result<StatusCode> {
    caller.check(Policy::CommentOwner, Access::Delete)?;
    let comment = load(&state, id).await?;
    caller.check_object(Policy::CommentOwner, Access::Delete, Some(comment.author_id))?;
    state.store().delete_comment(comment.id).await?;
    tracing::info!(comment_id = %comment.id, "review deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load(state: &AppState, id: CommentId) -> Result<Comment> {
    state
        .store()
        .get_comment(id)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))
}
