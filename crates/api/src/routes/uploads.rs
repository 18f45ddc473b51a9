//! Cover image upload.

use axum::extract::{Multipart, State};
use tracing::instrument;

use bookshop_core::BookId;
use bookshop_core::permission::{Access, Policy};

use crate::db::BookRepository;
use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::Caller;
use crate::models::Book;
use crate::state::AppState;

/// Attach an uploaded image to a book.
///
/// POST /upload_image/ (multipart: `book_id`, `image`)
///
/// The book is checked before anything is written, so a bad id never leaves
/// an orphaned file behind.
#[instrument(skip_all)]
pub async fn upload_image(
    State(state): State<AppState>,
    caller: Caller,
    mut multipart: Multipart,
) -> Result<ApiJson<Book>> {
    caller.check(Policy::PublicRead, Access::Update)?;

    let mut book_id: Option<BookId> = None;
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("book_id") => {
                let text = field.text().await?;
                book_id = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| AppError::validation("book_id must be a number"))?,
                );
            }
            Some("image") => {
                let name = field.file_name().unwrap_or_default().to_owned();
                image = Some((name, field.bytes().await?.to_vec()));
            }
            _ => {}
        }
    }

    let book_id = book_id.ok_or_else(|| AppError::validation("book_id is required"))?;
    let (file_name, data) = image.ok_or_else(|| AppError::validation("image is required"))?;

    if state.store().get_book(book_id).await?.is_none() {
        return Err(AppError::not_found("book"));
    }

    let reference = state.media().save_cover(&file_name, &data).await?;
    let book = state.store().set_book_image(book_id, &reference).await?;

    tracing::info!(book_id = %book.id, image = %reference, "cover uploaded");
    Ok(ApiJson(book))
}
