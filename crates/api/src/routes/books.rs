//! Catalog book handlers.
//!
//! Anyone may browse; only staff may write. Sold-out books are invisible to
//! everyone but staff, in the listing and in the detail view.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use bookshop_core::catalog::{BookSortField, Sort};
use bookshop_core::permission::{Access, Policy};
use bookshop_core::{BookId, Rating};

use crate::db::{AuthorRepository, BookRepository, CommentRepository, PublisherRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::Caller;
use crate::models::{Book, BookDetail, BookFilter, BookInput, BookPatch, BookSummary};
use crate::state::AppState;

/// `GET /books/` query string.
#[derive(Debug, Default, Deserialize)]
pub struct BookQuery {
    pub search: Option<String>,
    pub title: Option<String>,
    #[serde(alias = "author_name", alias = "author_surname")]
    pub author: Option<String>,
    #[serde(alias = "publishing")]
    pub publisher: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub ordering: Option<String>,
}

impl BookQuery {
    fn into_filter(self, include_out_of_stock: bool) -> Result<BookFilter> {
        let sort: Sort<BookSortField> = match self.ordering.as_deref().map(str::trim) {
            None | Some("") => Default::default(),
            Some(ordering) => ordering.parse()?,
        };
        Ok(BookFilter {
            search: non_blank(self.search),
            title: non_blank(self.title),
            author: non_blank(self.author),
            publisher: non_blank(self.publisher),
            min_price: self.min_price,
            max_price: self.max_price,
            min_year: self.min_year,
            max_year: self.max_year,
            author_id: None,
            publisher_id: None,
            sort,
            include_out_of_stock,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// List books with their review aggregates.
///
/// GET /books/
#[instrument(skip(state, caller))]
pub async fn index(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<BookQuery>,
) -> Result<ApiJson<Vec<BookSummary>>> {
    caller.check(Policy::PublicRead, Access::Read)?;
    let filter = query.into_filter(caller.is_staff())?;
    let books = state.store().list_books(&filter).await?;
    Ok(ApiJson(books))
}

/// Create a book.
///
/// POST /books/
#[instrument(skip(state, caller, input), fields(title = %input.title))]
pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<BookInput>,
) -> Result<impl IntoResponse> {
    caller.check(Policy::PublicRead, Access::Create)?;

    let book = input.into_book(BookId::new(0));
    book.validate()?;
    let book = state.store().create_book(&book).await?;

    tracing::info!(book_id = %book.id, "book created");
    Ok((StatusCode::CREATED, ApiJson(book)))
}

/// A book with its reviews and display names.
///
/// GET /books/{id}/
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<BookId>,
) -> Result<ApiJson<BookDetail>> {
    caller.check(Policy::PublicRead, Access::Read)?;
    let book = load_visible(&state, &caller, id).await?;
    Ok(ApiJson(detail(&state, book).await?))
}

/// Replace a book.
///
/// PUT /books/{id}/
#[instrument(skip(state, caller, input))]
pub async fn replace(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(input): ApiJson<BookInput>,
) -> Result<ApiJson<BookDetail>> {
    caller.check(Policy::PublicRead, Access::Update)?;
    let current = load(&state, id).await?;

    let mut book = input.into_book(id);
    // Covers are only set through the upload endpoint.
    if book.image.is_none() {
        book.image = current.image;
    }
    save(&state, book).await
}

/// Update some fields of a book.
///
/// PATCH /books/{id}/
#[instrument(skip(state, caller, patch))]
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(patch): ApiJson<BookPatch>,
) -> Result<ApiJson<BookDetail>> {
    caller.check(Policy::PublicRead, Access::Update)?;
    let mut book = load(&state, id).await?;
    patch.apply(&mut book);
    save(&state, book).await
}

/// Delete a book. Refused while orders or reviews reference it.
///
/// DELETE /books/{id}/
#[instrument(skip(state, caller))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<BookId>,
) -> Result<StatusCode> {
    caller.check(Policy::PublicRead, Access::Delete)?;
    state.store().delete_book(id).await?;
    tracing::info!(book_id = %id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn save(state: &AppState, book: Book) -> Result<ApiJson<BookDetail>> {
    book.validate()?;
    let book = state.store().update_book(&book).await?;
    tracing::info!(book_id = %book.id, "book updated");
    Ok(ApiJson(detail(state, book).await?))
}

async fn load(state: &AppState, id: BookId) -> Result<Book> {
    state
        .store()
        .get_book(id)
        .await?
        .ok_or_else(|| AppError::not_found("book"))
}

/// Load a book the caller may see: sold-out books exist only for staff.
async fn load_visible(state: &AppState, caller: &Caller, id: BookId) -> Result<Book> {
    let book = load(state, id).await?;
    if !book.in_stock() && !caller.is_staff() {
        return Err(AppError::not_found("book"));
    }
    Ok(book)
}

async fn detail(state: &AppState, book: Book) -> Result<BookDetail> {
    let store = state.store();

    let author_name = match book.author_id {
        Some(id) => store
            .get_author(id)
            .await?
            .map(|a| format!("{} {}", a.name, a.surname)),
        None => None,
    };
    let publisher_name = match book.publisher_id {
        Some(id) => store.get_publisher(id).await?.map(|p| p.name),
        None => None,
    };

    let comments = store.list_comments(book.id).await?;
    let rating = Rating::average(comments.iter().filter_map(|c| c.rating));
    let reviews = i64::try_from(comments.len()).unwrap_or(i64::MAX);

    Ok(BookDetail {
        book,
        author_name,
        publisher_name,
        rating,
        reviews,
        comments,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_to_title_order() {
        let filter = BookQuery::default().into_filter(false).unwrap();
        assert_eq!(filter.sort.field, BookSortField::Title);
        assert!(!filter.sort.descending);
        assert!(!filter.include_out_of_stock);
    }

    #[test]
    fn test_query_ordering_and_blank_filters() {
        let query = BookQuery {
            search: Some("   ".to_owned()),
            author: Some(" Стругацкий ".to_owned()),
            ordering: Some("-price".to_owned()),
            ..BookQuery::default()
        };
        let filter = query.into_filter(true).unwrap();
        assert_eq!(filter.search, None);
        assert_eq!(filter.author.as_deref(), Some("Стругацкий"));
        assert_eq!(filter.sort.field, BookSortField::Price);
        assert!(filter.sort.descending);
        assert!(filter.include_out_of_stock);
    }

    #[test]
    fn test_query_rejects_unknown_ordering() {
        let query = BookQuery {
            ordering: Some("rating".to_owned()),
            ..BookQuery::default()
        };
        let err = query.into_filter(false).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
