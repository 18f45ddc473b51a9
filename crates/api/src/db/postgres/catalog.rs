//! Author, publisher and book queries.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use bookshop_core::catalog::BookSortField;
use bookshop_core::{AuthorId, BookId, PublisherId};

use super::{PgStore, contains_pattern};
use crate::db::{
    AuthorRepository, BookRepository, PublisherRepository, RepoResult, RepositoryError,
    classify_delete_error, classify_write_error,
};
use crate::models::{
    Author, AuthorInput, Book, BookFilter, BookSummary, Publisher, PublisherInput,
};

#[derive(sqlx::FromRow)]
struct AuthorRow {
    id: AuthorId,
    name: String,
    surname: String,
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            surname: row.surname,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PublisherRow {
    id: PublisherId,
    name: String,
}

impl From<PublisherRow> for Publisher {
    fn from(row: PublisherRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

const BOOK_COLUMNS: &str = "id, title, image, author_id, publisher_id, publication_year, \
                            description, price, count_in_stock";

#[derive(sqlx::FromRow)]
struct BookRow {
    id: BookId,
    title: String,
    image: Option<String>,
    author_id: Option<AuthorId>,
    publisher_id: Option<PublisherId>,
    publication_year: i32,
    description: String,
    price: Decimal,
    count_in_stock: i32,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            image: row.image,
            author_id: row.author_id,
            publisher_id: row.publisher_id,
            publication_year: row.publication_year,
            description: row.description,
            price: row.price,
            count_in_stock: row.count_in_stock,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookSummaryRow {
    id: BookId,
    title: String,
    image: Option<String>,
    price: Decimal,
    count_in_stock: i32,
    rating: Option<Decimal>,
    reviews: i64,
}

impl From<BookSummaryRow> for BookSummary {
    fn from(row: BookSummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            image: row.image,
            price: row.price,
            count_in_stock: row.count_in_stock,
            rating: row.rating,
            reviews: row.reviews,
        }
    }
}

#[async_trait]
impl AuthorRepository for PgStore {
    async fn list_authors(&self, search: Option<&str>) -> RepoResult<Vec<Author>> {
        let rows = match search {
            Some(term) => {
                sqlx::query_as::<_, AuthorRow>(
                    "SELECT id, name, surname FROM authors
                     WHERE name ILIKE $1 OR surname ILIKE $1
                     ORDER BY surname, id",
                )
                .bind(contains_pattern(term))
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, AuthorRow>(
                    "SELECT id, name, surname FROM authors ORDER BY surname, id",
                )
                .fetch_all(self.pool())
                .await?
            }
        };
        Ok(rows.into_iter().map(Author::from).collect())
    }

    async fn get_author(&self, id: AuthorId) -> RepoResult<Option<Author>> {
        let row = sqlx::query_as::<_, AuthorRow>("SELECT id, name, surname FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Author::from))
    }

    async fn create_author(&self, input: &AuthorInput) -> RepoResult<Author> {
        let row = sqlx::query_as::<_, AuthorRow>(
            "INSERT INTO authors (name, surname) VALUES ($1, $2) RETURNING id, name, surname",
        )
        .bind(&input.name)
        .bind(&input.surname)
        .fetch_one(self.pool())
        .await?;
        Ok(row.into())
    }

    async fn update_author(&self, id: AuthorId, input: &AuthorInput) -> RepoResult<Author> {
        let row = sqlx::query_as::<_, AuthorRow>(
            "UPDATE authors SET name = $2, surname = $3 WHERE id = $1
             RETURNING id, name, surname",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.surname)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    async fn delete_author(&self, id: AuthorId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| classify_delete_error(e, "author still has books"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PublisherRepository for PgStore {
    async fn list_publishers(&self, search: Option<&str>) -> RepoResult<Vec<Publisher>> {
        let rows = match search {
            Some(term) => {
                sqlx::query_as::<_, PublisherRow>(
                    "SELECT id, name FROM publishers WHERE name ILIKE $1 ORDER BY name, id",
                )
                .bind(contains_pattern(term))
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, PublisherRow>("SELECT id, name FROM publishers ORDER BY name, id")
                    .fetch_all(self.pool())
                    .await?
            }
        };
        Ok(rows.into_iter().map(Publisher::from).collect())
    }

    async fn get_publisher(&self, id: PublisherId) -> RepoResult<Option<Publisher>> {
        let row = sqlx::query_as::<_, PublisherRow>("SELECT id, name FROM publishers WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Publisher::from))
    }

    async fn create_publisher(&self, input: &PublisherInput) -> RepoResult<Publisher> {
        let row = sqlx::query_as::<_, PublisherRow>(
            "INSERT INTO publishers (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&input.name)
        .fetch_one(self.pool())
        .await?;
        Ok(row.into())
    }

    async fn update_publisher(
        &self,
        id: PublisherId,
        input: &PublisherInput,
    ) -> RepoResult<Publisher> {
        let row = sqlx::query_as::<_, PublisherRow>(
            "UPDATE publishers SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(&input.name)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    async fn delete_publisher(&self, id: PublisherId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM publishers WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| classify_delete_error(e, "publisher still has books"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Append `AND (lower(column) = any of the comma-separated values)`.
fn push_any_of(query: &mut QueryBuilder<'_, Postgres>, columns: &[&str], csv: &str) {
    let values: Vec<String> = csv
        .split(',')
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return;
    }
    query.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            query.push(" OR ");
        }
        query.push(format!("lower({column}) = ANY("));
        query.push_bind(values.clone());
        query.push(")");
    }
    query.push(")");
}

#[async_trait]
impl BookRepository for PgStore {
    async fn list_books(&self, filter: &BookFilter) -> RepoResult<Vec<BookSummary>> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT b.id, b.title, b.image, b.price, b.count_in_stock,
                    ROUND(AVG(c.rating)::numeric, 2) AS rating,
                    COUNT(c.id) AS reviews
             FROM books b
             LEFT JOIN authors a ON a.id = b.author_id
             LEFT JOIN publishers p ON p.id = b.publisher_id
             LEFT JOIN comments c ON c.book_id = b.id
             WHERE TRUE",
        );

        if !filter.include_out_of_stock {
            query.push(" AND b.count_in_stock > 0");
        }
        if let Some(term) = &filter.search {
            let pattern = contains_pattern(term);
            query.push(" AND (b.title ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR a.surname ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR p.name ILIKE ");
            query.push_bind(pattern);
            query.push(")");
        }
        if let Some(titles) = &filter.title {
            push_any_of(&mut query, &["b.title"], titles);
        }
        if let Some(authors) = &filter.author {
            push_any_of(&mut query, &["a.name", "a.surname"], authors);
        }
        if let Some(publishers) = &filter.publisher {
            push_any_of(&mut query, &["p.name"], publishers);
        }
        if let Some(author_id) = filter.author_id {
            query.push(" AND b.author_id = ").push_bind(author_id);
        }
        if let Some(publisher_id) = filter.publisher_id {
            query.push(" AND b.publisher_id = ").push_bind(publisher_id);
        }
        if let Some(min) = filter.min_price {
            query.push(" AND b.price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            query.push(" AND b.price <= ").push_bind(max);
        }
        if let Some(min) = filter.min_year {
            query.push(" AND b.publication_year >= ").push_bind(min);
        }
        if let Some(max) = filter.max_year {
            query.push(" AND b.publication_year <= ").push_bind(max);
        }

        let column = match filter.sort.field {
            BookSortField::Title => "b.title",
            BookSortField::Price => "b.price",
            BookSortField::PublicationYear => "b.publication_year",
        };
        let direction = if filter.sort.descending { "DESC" } else { "ASC" };
        query.push(format!(" GROUP BY b.id ORDER BY {column} {direction}, b.id"));

        let rows = query
            .build_query_as::<BookSummaryRow>()
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(BookSummary::from).collect())
    }

    async fn get_book(&self, id: BookId) -> RepoResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Book::from))
    }

    async fn create_book(&self, book: &Book) -> RepoResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "INSERT INTO books (title, image, author_id, publisher_id, publication_year,
                                description, price, count_in_stock)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&book.title)
        .bind(&book.image)
        .bind(book.author_id)
        .bind(book.publisher_id)
        .bind(book.publication_year)
        .bind(&book.description)
        .bind(book.price)
        .bind(book.count_in_stock)
        .fetch_one(self.pool())
        .await
        .map_err(|e| classify_write_error(e, "book already exists"))?;
        Ok(row.into())
    }

    async fn update_book(&self, book: &Book) -> RepoResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "UPDATE books SET title = $2, image = $3, author_id = $4, publisher_id = $5,
                              publication_year = $6, description = $7, price = $8,
                              count_in_stock = $9
             WHERE id = $1
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.image)
        .bind(book.author_id)
        .bind(book.publisher_id)
        .bind(book.publication_year)
        .bind(&book.description)
        .bind(book.price)
        .bind(book.count_in_stock)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| classify_write_error(e, "book already exists"))?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    async fn delete_book(&self, id: BookId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| classify_delete_error(e, "book is referenced by orders or reviews"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_book_image(&self, id: BookId, image: &str) -> RepoResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "UPDATE books SET image = $2 WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id)
        .bind(image)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }
}
