//! Author handlers. Public read, staff write.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use bookshop_core::AuthorId;
use bookshop_core::permission::{Access, Policy};

use crate::db::{AuthorRepository, BookRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::Caller;
use crate::models::{Author, AuthorDetail, AuthorInput, BookFilter};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// GET /authors/
#[instrument(skip(state, caller))]
pub async fn index(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<ApiJson<Vec<Author>>> {
    caller.check(Policy::PublicRead, Access::Read)?;
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(ApiJson(state.store().list_authors(search).await?))
}

/// GET /authors/{id}/
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<AuthorId>,
) -> Result<ApiJson<AuthorDetail>> {
    caller.check(Policy::PublicRead, Access::Read)?;
    let author = state
        .store()
        .get_author(id)
        .await?
        .ok_or_else(|| AppError::not_found("author"))?;

    let filter = BookFilter {
        author_id: Some(id),
        include_out_of_stock: caller.is_staff(),
        ..BookFilter::default()
    };
    let books = state.store().list_books(&filter).await?;
    Ok(ApiJson(AuthorDetail { author, books }))
}

/// POST /authors/
#[instrument(skip(state, caller, input))]
pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<AuthorInput>,
) -> Result<impl IntoResponse> {
    caller.check(Policy::PublicRead, Access::Create)?;
    let input = validate(input)?;
    let author = state.store().create_author(&input).await?;
    tracing::info!(author_id = %author.id, "author created");
    Ok((StatusCode::CREATED, ApiJson(author)))
}

/// PUT /authors/{id}/
#[instrument(skip(state, caller, input))]
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<AuthorId>,
    ApiJson(input): ApiJson<AuthorInput>,
) -> Result<ApiJson<Author>> {
    caller.check(Policy::PublicRead, Access::Update)?;
    let input = validate(input)?;
    Ok(ApiJson(state.store().update_author(id, &input).await?))
}

/// DELETE /authors/{id}/
#[instrument(skip(state, caller))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<AuthorId>,
) -> Result<StatusCode> {
    caller.check(Policy::PublicRead, Access::Delete)?;
    state.store().delete_author(id).await?;
    tracing::info!(author_id = %id, "author deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn validate(input: AuthorInput) -> Result<AuthorInput> {
    let name = input.name.trim().to_owned();
    let surname = input.surname.trim().to_owned();
    if name.is_empty() || surname.is_empty() {
        return Err(AppError::validation("name and surname are required"));
    }
    Ok(AuthorInput { name, surname })
}
