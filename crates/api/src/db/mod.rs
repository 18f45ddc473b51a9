//! Storage for the bookshop.
//!
//! One repository trait per entity. Both backends implement all of them:
//!
//! - [`postgres::PgStore`] - the production store (`BOOKSHOP_STORAGE=postgres`)
//! - [`memory::MemoryStore`] - a process-local store for tests and demos
//!   (`BOOKSHOP_STORAGE=memory`)
//!
//! Handlers reach storage through [`Store`], a cloneable handle that derefs to
//! the backend, so `state.store().get_book(id)` works whichever backend is live.
//!
//! # Tables
//!
//! - `users` - accounts with argon2 password hashes
//! - `authors`, `publishers`, `books` - the catalog
//! - `orders`, `delivery_addresses`, `ordered_books` - orders and what they own
//! - `comments` - reviews, unique per (book, author)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bookshop-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bookshop_core::catalog::{Sort, UserSortField};
use bookshop_core::{
    AuthorId, BookId, CommentId, OrderId, PublisherId, StatusTransition, UserId,
};

use crate::models::{
    Author, AuthorInput, Book, BookFilter, BookSummary, Comment, NewComment, NewOrder, NewUser,
    Order, OrderDetail, OrderScope, Publisher, PublisherInput, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (unique key, or a delete blocked by references).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A write pointed at a row that does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// A line asked for more copies than are on the shelf.
    #[error("not enough copies of book {0} in stock")]
    InsufficientStock(BookId),
}

/// Result alias for repository calls.
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// # Errors
    ///
    /// `Conflict` if the username is taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;

    async fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;

    /// Look up an account and its password hash for login.
    async fn get_user_credentials(&self, username: &str) -> RepoResult<Option<(User, String)>>;

    async fn list_users(&self, sort: Sort<UserSortField>) -> RepoResult<Vec<User>>;

    /// Persist the profile fields of `user`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account is gone.
    async fn update_user(&self, user: &User) -> RepoResult<User>;

    /// Delete an account together with its orders and reviews.
    async fn delete_user(&self, id: UserId) -> RepoResult<()>;
}

#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// Authors by surname; `search` matches name or surname.
    async fn list_authors(&self, search: Option<&str>) -> RepoResult<Vec<Author>>;

    async fn get_author(&self, id: AuthorId) -> RepoResult<Option<Author>>;

    async fn create_author(&self, input: &AuthorInput) -> RepoResult<Author>;

    async fn update_author(&self, id: AuthorId, input: &AuthorInput) -> RepoResult<Author>;

    /// # Errors
    ///
    /// `Conflict` while any book references the author.
    async fn delete_author(&self, id: AuthorId) -> RepoResult<()>;
}

#[async_trait]
pub trait PublisherRepository: Send + Sync {
    /// Publishers by name; `search` matches the name.
    async fn list_publishers(&self, search: Option<&str>) -> RepoResult<Vec<Publisher>>;

    async fn get_publisher(&self, id: PublisherId) -> RepoResult<Option<Publisher>>;

    async fn create_publisher(&self, input: &PublisherInput) -> RepoResult<Publisher>;

    async fn update_publisher(
        &self,
        id: PublisherId,
        input: &PublisherInput,
    ) -> RepoResult<Publisher>;

    /// # Errors
    ///
    /// `Conflict` while any book references the publisher.
    async fn delete_publisher(&self, id: PublisherId) -> RepoResult<()>;
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Books matching `filter`, each with its review aggregate.
    async fn list_books(&self, filter: &BookFilter) -> RepoResult<Vec<BookSummary>>;

    async fn get_book(&self, id: BookId) -> RepoResult<Option<Book>>;

    /// Insert `book`; its `id` is ignored.
    ///
    /// # Errors
    ///
    /// `InvalidReference` if the author or publisher does not exist.
    async fn create_book(&self, book: &Book) -> RepoResult<Book>;

    async fn update_book(&self, book: &Book) -> RepoResult<Book>;

    /// # Errors
    ///
    /// `Conflict` while line items or reviews reference the book.
    async fn delete_book(&self, id: BookId) -> RepoResult<()>;

    async fn set_book_image(&self, id: BookId, image: &str) -> RepoResult<Book>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Reviews of a book, newest first.
    async fn list_comments(&self, book_id: BookId) -> RepoResult<Vec<Comment>>;

    async fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>>;

    /// # Errors
    ///
    /// `Conflict` if the author already reviewed the book, `InvalidReference`
    /// if the book does not exist.
    async fn create_comment(&self, comment: NewComment) -> RepoResult<Comment>;

    async fn update_comment(&self, comment: &Comment) -> RepoResult<Comment>;

    async fn delete_comment(&self, id: CommentId) -> RepoResult<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Write an order, its address and its lines, and take the ordered copies
    /// off the shelf. All of it happens or none of it does.
    ///
    /// Each book's stock is decremented only if it still covers the line, so
    /// concurrent orders can never drive a count below zero.
    ///
    /// # Errors
    ///
    /// `InsufficientStock` naming the first book that cannot cover its line,
    /// `InvalidReference` if a book does not exist.
    async fn place_order(&self, order: NewOrder) -> RepoResult<OrderDetail>;

    async fn get_order(&self, id: OrderId) -> RepoResult<Option<OrderDetail>>;

    async fn list_orders(&self, scope: OrderScope) -> RepoResult<Vec<Order>>;

    /// Set the paid flag and stamp the payment time.
    async fn mark_order_paid(&self, id: OrderId, at: DateTime<Utc>) -> RepoResult<Order>;

    /// Apply an approved status change, stamping delivery when it asks to.
    ///
    /// Fails with `Conflict` when the order is no longer in `transition.from`.
    async fn set_order_status(
        &self,
        id: OrderId,
        transition: StatusTransition,
        at: DateTime<Utc>,
    ) -> RepoResult<Order>;
}

/// A complete storage backend.
#[async_trait]
pub trait Backend:
    UserRepository
    + AuthorRepository
    + PublisherRepository
    + BookRepository
    + CommentRepository
    + OrderRepository
{
    /// Cheap round trip proving the backend is reachable.
    async fn ping(&self) -> RepoResult<()>;
}

/// Cloneable handle to the live storage backend.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Backend>,
}

impl Store {
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            backend: Arc::new(PgStore::new(pool)),
        }
    }

    #[must_use]
    pub fn memory() -> Self {
        Self {
            backend: Arc::new(MemoryStore::default()),
        }
    }
}

impl Deref for Store {
    type Target = dyn Backend;

    fn deref(&self) -> &Self::Target {
        self.backend.as_ref()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

/// Map a sqlx error on insert/update into the repository taxonomy.
///
/// Unique violations become `Conflict(what)`; foreign-key violations become
/// `InvalidReference` on writes that point at a missing row.
pub(crate) fn classify_write_error(error: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = error {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(what.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::InvalidReference(
                db_err.constraint().unwrap_or("foreign key").to_owned(),
            );
        }
    }
    RepositoryError::Database(error)
}

/// Map a sqlx error on delete: a foreign-key violation means something still
/// references the row.
pub(crate) fn classify_delete_error(error: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = error
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(error)
}
