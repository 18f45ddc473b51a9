//! Account queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookshop_core::catalog::{Sort, UserSortField};
use bookshop_core::{Email, UserId};

use super::{PgStore, corrupt};
use crate::db::{RepoResult, RepositoryError, UserRepository, classify_write_error};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, email, is_staff, date_joined";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    is_staff: bool,
    date_joined: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| corrupt("email", e))?;
        Ok(Self {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email,
            is_staff: row.is_staff,
            date_joined: row.date_joined,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, first_name, last_name, email, password_hash, is_staff)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .fetch_one(self.pool())
        .await
        .map_err(|e| classify_write_error(e, "username already exists"))?;

        row.try_into()
    }

    async fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_user_credentials(&self, username: &str) -> RepoResult<Option<(User, String)>> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some((row.user.try_into()?, row.password_hash)))
    }

    async fn list_users(&self, sort: Sort<UserSortField>) -> RepoResult<Vec<User>> {
        let column = match sort.field {
            UserSortField::Username => "username",
            UserSortField::LastName => "last_name",
        };
        let direction = if sort.descending { "DESC" } else { "ASC" };

        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY {column} {direction}, id"
        ))
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn update_user(&self, user: &User) -> RepoResult<User> {
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET first_name = $2, last_name = $3, email = $4
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.email.as_str())
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    async fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
