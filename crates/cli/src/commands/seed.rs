//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! publishers:
//!   - name: АСТ
//! authors:
//!   - name: Аркадий
//!     surname: Стругацкий
//! books:
//!   - title: Пикник на обочине
//!     author: Стругацкий      # surname of a listed or existing author
//!     publisher: АСТ
//!     publication_year: 2015
//!     price: "450.00"
//!     count_in_stock: 5
//! ```
//!
//! Publishers and authors are matched by name, books by title; anything
//! already present is left untouched, so the same file can be applied twice.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use bookshop_api::db::{
    AuthorRepository, BookRepository, PublisherRepository, RepoResult, Store,
};
use bookshop_api::models::{Author, AuthorInput, BookFilter, BookInput, Publisher, PublisherInput};
use bookshop_core::BookId;

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub publishers: Vec<PublisherInput>,
    #[serde(default)]
    pub authors: Vec<AuthorInput>,
    #[serde(default)]
    pub books: Vec<SeedBook>,
}

#[derive(Debug, Deserialize)]
pub struct SeedBook {
    pub title: String,
    /// Author surname.
    #[serde(default)]
    pub author: Option<String>,
    /// Publisher name.
    #[serde(default)]
    pub publisher: Option<String>,
    pub publication_year: i32,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub count_in_stock: i32,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub publishers: usize,
    pub authors: usize,
    pub books: usize,
    pub skipped: usize,
    pub invalid: usize,
}

/// Seed the catalog from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or storage fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    info!(
        publishers = seed.publishers.len(),
        authors = seed.authors.len(),
        books = seed.books.len(),
        "Parsed seed file"
    );

    let store = super::connect_store().await?;
    let report = apply(&store, seed).await?;

    info!("Seeding complete!");
    info!("  Publishers inserted: {}", report.publishers);
    info!("  Authors inserted: {}", report.authors);
    info!("  Books inserted: {}", report.books);
    info!("  Books skipped (already exist): {}", report.skipped);
    if report.invalid > 0 {
        warn!("  Books rejected as invalid: {}", report.invalid);
    }
    Ok(())
}

/// Insert whatever in `seed` the store does not have yet.
///
/// # Errors
///
/// Returns the first storage error.
pub async fn apply(store: &Store, seed: SeedFile) -> RepoResult<SeedReport> {
    let mut report = SeedReport::default();

    for input in &seed.publishers {
        if find_publisher(store, &input.name).await?.is_none() {
            store.create_publisher(input).await?;
            report.publishers += 1;
        }
    }
    for input in &seed.authors {
        if find_author(store, &input.name, &input.surname).await?.is_none() {
            store.create_author(input).await?;
            report.authors += 1;
        }
    }

    for entry in seed.books {
        if book_exists(store, &entry.title).await? {
            report.skipped += 1;
            continue;
        }

        let author = match &entry.author {
            Some(surname) => find_author_by_surname(store, surname).await?,
            None => None,
        };
        let publisher = match &entry.publisher {
            Some(name) => find_publisher(store, name).await?,
            None => None,
        };

        let book = BookInput {
            title: entry.title,
            image: None,
            author: author.map(|a| a.id),
            publisher: publisher.map(|p| p.id),
            publication_year: entry.publication_year,
            description: entry.description,
            price: entry.price,
            count_in_stock: entry.count_in_stock,
        }
        .into_book(BookId::new(0));

        if let Err(e) = book.validate() {
            warn!(title = %book.title, error = %e, "Skipping invalid book");
            report.invalid += 1;
            continue;
        }
        store.create_book(&book).await?;
        report.books += 1;
    }

    Ok(report)
}

async fn find_publisher(store: &Store, name: &str) -> RepoResult<Option<Publisher>> {
    let name = name.trim();
    Ok(store
        .list_publishers(Some(name))
        .await?
        .into_iter()
        .find(|p| p.name.to_lowercase() == name.to_lowercase()))
}

async fn find_author(store: &Store, name: &str, surname: &str) -> RepoResult<Option<Author>> {
    let (name, surname) = (name.trim(), surname.trim());
    Ok(store
        .list_authors(Some(surname))
        .await?
        .into_iter()
        .find(|a| a.name == name && a.surname == surname))
}

async fn find_author_by_surname(store: &Store, surname: &str) -> RepoResult<Option<Author>> {
    let surname = surname.trim();
    Ok(store
        .list_authors(Some(surname))
        .await?
        .into_iter()
        .find(|a| a.surname == surname))
}

async fn book_exists(store: &Store, title: &str) -> RepoResult<bool> {
    let title = title.trim();
    let filter = BookFilter {
        title: Some(title.to_owned()),
        include_out_of_stock: true,
        ..BookFilter::default()
    };
    Ok(store
        .list_books(&filter)
        .await?
        .iter()
        .any(|b| b.title == title))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SEED: &str = r#"
publishers:
  - name: АСТ
authors:
  - name: Аркадий
    surname: Стругацкий
books:
  - title: Пикник на обочине
    author: Стругацкий
    publisher: АСТ
    publication_year: 2015
    price: "450.00"
    count_in_stock: 5
  - title: Broken
    publication_year: 1900
    price: "10.00"
"#;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = Store::memory();

        let first = apply(&store, serde_yaml::from_str(SEED).unwrap()).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                publishers: 1,
                authors: 1,
                books: 1,
                skipped: 0,
                invalid: 1,
            }
        );

        let second = apply(&store, serde_yaml::from_str(SEED).unwrap()).await.unwrap();
        assert_eq!(second.publishers, 0);
        assert_eq!(second.authors, 0);
        assert_eq!(second.books, 0);
        assert_eq!(second.skipped, 1);
    }

    #[tokio::test]
    async fn test_seed_links_relations() {
        let store = Store::memory();
        apply(&store, serde_yaml::from_str(SEED).unwrap()).await.unwrap();

        let filter = BookFilter {
            include_out_of_stock: true,
            ..BookFilter::default()
        };
        let books = store.list_books(&filter).await.unwrap();
        assert_eq!(books.len(), 1);

        let book = store.get_book(books[0].id).await.unwrap().unwrap();
        assert!(book.author_id.is_some());
        assert!(book.publisher_id.is_some());
    }
}
