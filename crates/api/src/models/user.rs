//! Account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookshop_core::permission::Identity;
use bookshop_core::{Email, UserId};

use super::order::Order;

/// A shop account (domain type).
///
/// The password hash never leaves the storage layer on this type; see
/// [`crate::db::UserRepository::get_user_credentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    /// Elevated rights: bypasses ownership checks and may write the catalog.
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// What access policies need to know about this account.
    #[must_use]
    pub const fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            is_staff: self.is_staff,
        }
    }
}

/// Account detail with the account's orders, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub orders: Vec<Order>,
}

/// Everything needed to insert an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub password_hash: String,
    pub is_staff: bool,
}

/// Profile fields a caller may change. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<Email>,
}

impl UserUpdate {
    /// Apply the present fields to `user`.
    pub fn apply(self, user: &mut User) {
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
    }
}
