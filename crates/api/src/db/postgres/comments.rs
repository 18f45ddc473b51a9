//! Review queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookshop_core::{BookId, CommentId, Rating, UserId};

use super::{PgStore, corrupt};
use crate::db::{CommentRepository, RepoResult, RepositoryError, classify_write_error};
use crate::models::{Comment, NewComment};

/// Joined with `users` for the author's username.
const COMMENT_SELECT: &str = "SELECT c.id, c.book_id, c.author_id, u.username AS author_username,
                                     c.rating, c.comment, c.created_at
                              FROM comments c
                              JOIN users u ON u.id = c.author_id";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: CommentId,
    book_id: BookId,
    author_id: UserId,
    author_username: String,
    rating: Option<i16>,
    comment: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = RepositoryError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        let rating = row
            .rating
            .map(|value| Rating::new(i64::from(value)))
            .transpose()
            .map_err(|e| corrupt("rating", e))?;
        Ok(Self {
            id: row.id,
            book_id: row.book_id,
            author_id: row.author_id,
            author_username: row.author_username,
            rating,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

impl PgStore {
    async fn fetch_comment(&self, id: CommentId) -> RepoResult<Option<Comment>> {
        sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Comment::try_from)
            .transpose()
    }
}

#[async_trait]
impl CommentRepository for PgStore {
    async fn list_comments(&self, book_id: BookId) -> RepoResult<Vec<Comment>> {
        sqlx::query_as::<_, CommentRow>(&format!(
            "{COMMENT_SELECT} WHERE c.book_id = $1 ORDER BY c.created_at DESC, c.id DESC"
        ))
        .bind(book_id)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(Comment::try_from)
        .collect()
    }

    async fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>> {
        self.fetch_comment(id).await
    }

    async fn create_comment(&self, comment: NewComment) -> RepoResult<Comment> {
        let id: CommentId = sqlx::query_scalar(
            "INSERT INTO comments (book_id, author_id, rating, comment)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(comment.book_id)
        .bind(comment.author_id)
        .bind(comment.rating.map(Rating::value))
        .bind(&comment.comment)
        .fetch_one(self.pool())
        .await
        .map_err(|e| classify_write_error(e, "you have already reviewed this book"))?;

        self.fetch_comment(id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_comment(&self, comment: &Comment) -> RepoResult<Comment> {
        let updated = sqlx::query("UPDATE comments SET rating = $2, comment = $3 WHERE id = $1")
            .bind(comment.id)
            .bind(comment.rating.map(Rating::value))
            .bind(&comment.comment)
            .execute(self.pool())
            .await?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.fetch_comment(comment.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_comment(&self, id: CommentId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
