//! Catalog types: authors, publishers and books.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookshop_core::catalog::{
    self, BookFieldError, BookSortField, Sort,
};
use bookshop_core::{AuthorId, BookId, PublisherId};

use super::comment::Comment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    pub surname: String,
}

/// An author with the books they wrote.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorDetail {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<BookSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorInput {
    pub name: String,
    pub surname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publisher {
    pub id: PublisherId,
    pub name: String,
}

/// A publishing house with the books it published.
#[derive(Debug, Clone, Serialize)]
pub struct PublisherDetail {
    #[serde(flatten)]
    pub publisher: Publisher,
    pub books: Vec<BookSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublisherInput {
    pub name: String,
}

/// A catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    /// Path of the cover under the media root, if one was uploaded.
    pub image: Option<String>,
    #[serde(rename = "author")]
    pub author_id: Option<AuthorId>,
    #[serde(rename = "publisher")]
    pub publisher_id: Option<PublisherId>,
    pub publication_year: i32,
    pub description: String,
    pub price: Decimal,
    pub count_in_stock: i32,
}

impl Book {
    /// Check every field against the catalog rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`BookFieldError`] found.
    pub fn validate(&self) -> Result<(), BookFieldError> {
        catalog::validate_title(&self.title)?;
        catalog::validate_publication_year(self.publication_year)?;
        catalog::validate_price(self.price)?;
        catalog::validate_stock(self.count_in_stock)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.count_in_stock > 0
    }
}

/// List view of a book with its review aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSummary {
    pub id: BookId,
    pub title: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub count_in_stock: i32,
    /// Mean review rating; `None` when no review carries a rating.
    pub rating: Option<Decimal>,
    /// Number of reviews.
    pub reviews: i64,
}

/// Detail view of a book: the record, display names and every review.
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub author_name: Option<String>,
    pub publisher_name: Option<String>,
    pub rating: Option<Decimal>,
    pub reviews: i64,
    pub comments: Vec<Comment>,
}

/// Full book payload for `POST` and `PUT`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookInput {
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub author: Option<AuthorId>,
    #[serde(default)]
    pub publisher: Option<PublisherId>,
    pub publication_year: i32,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub count_in_stock: i32,
}

impl BookInput {
    /// Build the record this payload describes. The id is assigned by storage
    /// on insert and ignored there.
    #[must_use]
    pub fn into_book(self, id: BookId) -> Book {
        Book {
            id,
            title: self.title.trim().to_owned(),
            image: self.image,
            author_id: self.author,
            publisher_id: self.publisher,
            publication_year: self.publication_year,
            description: self.description,
            price: self.price,
            count_in_stock: self.count_in_stock,
        }
    }
}

/// Partial book payload for `PATCH`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<AuthorId>,
    pub publisher: Option<PublisherId>,
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub count_in_stock: Option<i32>,
}

impl BookPatch {
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title.trim().to_owned();
        }
        if let Some(author) = self.author {
            book.author_id = Some(author);
        }
        if let Some(publisher) = self.publisher {
            book.publisher_id = Some(publisher);
        }
        if let Some(year) = self.publication_year {
            book.publication_year = year;
        }
        if let Some(description) = self.description {
            book.description = description;
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(count) = self.count_in_stock {
            book.count_in_stock = count;
        }
    }
}

/// Catalog listing criteria.
///
/// Text filters match case-insensitively. `search` looks at the title, the
/// author's surname and the publisher's name at once.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub search: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub author_id: Option<AuthorId>,
    pub publisher_id: Option<PublisherId>,
    pub sort: Sort<BookSortField>,
    /// Staff see sold-out books too.
    pub include_out_of_stock: bool,
}
