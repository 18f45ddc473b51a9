//! Publishing house handlers. Public read, staff write.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use bookshop_core::PublisherId;
use bookshop_core::permission::{Access, Policy};

use crate::db::{BookRepository, PublisherRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::Caller;
use crate::models::{BookFilter, Publisher, PublisherDetail, PublisherInput};
use crate::routes::authors::SearchQuery;
use crate::state::AppState;

/// GET /publishing-houses/
#[instrument(skip(state, caller))]
pub async fn index(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<ApiJson<Vec<Publisher>>> {
    caller.check(Policy::PublicRead, Access::Read)?;
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(ApiJson(state.store().list_publishers(search).await?))
}

/// GET /publishing-houses/{id}/
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<PublisherId>,
) -> Result<ApiJson<PublisherDetail>> {
    caller.check(Policy::PublicRead, Access::Read)?;
    let publisher = state
        .store()
        .get_publisher(id)
        .await?
        .ok_or_else(|| AppError::not_found("publisher"))?;

    let filter = BookFilter {
        publisher_id: Some(id),
        include_out_of_stock: caller.is_staff(),
        ..BookFilter::default()
    };
    let books = state.store().list_books(&filter).await?;
    Ok(ApiJson(PublisherDetail { publisher, books }))
}

/// POST /publishing-houses/
#[instrument(skip(state, caller, input))]
pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<PublisherInput>,
) -> Result<impl IntoResponse> {
    caller.check(Policy::PublicRead, Access::Create)?;
    let input = validate(input)?;
    let publisher = state.store().create_publisher(&input).await?;
    tracing::info!(publisher_id = %publisher.id, "publisher created");
    Ok((StatusCode::CREATED, ApiJson(publisher)))
}

/// PUT /publishing-houses/{id}/
#[instrument(skip(state, caller, input))]
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<PublisherId>,
    ApiJson(input): ApiJson<PublisherInput>,
) -> Result<ApiJson<Publisher>> {
    caller.check(Policy::PublicRead, Access::Update)?;
    let input = validate(input)?;
    Ok(ApiJson(state.store().update_publisher(id, &input).await?))
}

/// DELETE /publishing-houses/{id}/
#[instrument(skip(state, caller))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<PublisherId>,
) -> Result<StatusCode> {
    caller.check(Policy::PublicRead, Access::Delete)?;
    state.store().delete_publisher(id).await?;
    tracing::info!(publisher_id = %id, "publisher deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn validate(input: PublisherInput) -> Result<PublisherInput> {
    let name = input.name.trim().to_owned();
    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }
    Ok(PublisherInput { name })
}
