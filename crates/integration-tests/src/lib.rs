//! Integration tests for the bookshop API.
//!
//! Each test boots the real router on `127.0.0.1:0` over a fresh in-memory
//! store and talks to it with `reqwest`, so no database or external service is
//! needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bookshop-integration-tests
//! ```

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::OnceLock;

use axum::ServiceExt;
use axum::extract::Request;
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use uuid::Uuid;

use bookshop_api::config::{ApiConfig, JwtConfig, StorageBackend};
use bookshop_api::db::{BookRepository, Store, UserRepository};
use bookshop_api::models::{Book, BookInput, NewUser, User};
use bookshop_api::services::auth::hash_password;
use bookshop_api::state::AppState;
use bookshop_core::{BookId, Email};

/// Password shared by every account a test creates.
pub const PASSWORD: &str = "correct-horse-battery";

const JWT_SECRET: &str = "integration-test-signing-key-Zq8vN3kR7wXy2LmP";

/// Argon2 is slow in debug builds; hash the shared password once.
fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("hash test password"))
        .clone()
}

/// Parse a decimal from a JSON string or number.
#[must_use]
pub fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        other => other.to_string().parse().expect("decimal number"),
    }
}

/// A running server plus direct access to its store for setup.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub store: Store,
    pub media_dir: PathBuf,
}

impl TestContext {
    pub async fn new() -> Self {
        let media_dir = std::env::temp_dir().join(format!("bookshop-it-{}", Uuid::new_v4()));
        let config = ApiConfig {
            database_url: None,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            storage: StorageBackend::Memory,
            jwt: JwtConfig {
                secret: SecretString::from(JWT_SECRET),
                access_token_minutes: 60,
                refresh_token_days: 1,
            },
            media_dir: media_dir.clone(),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let store = Store::memory();
        let app = bookshop_api::app(AppState::new(config, store.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
                .await
                .expect("test server");
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{addr}"),
            store,
            media_dir,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.client.patch(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Insert an account directly; its password is [`PASSWORD`].
    pub async fn create_user(&self, username: &str, is_staff: bool) -> User {
        self.store
            .create_user(NewUser {
                username: username.to_owned(),
                first_name: String::new(),
                last_name: String::new(),
                email: Email::parse(&format!("{username}@example.com")).expect("email"),
                password_hash: password_hash(),
                is_staff,
            })
            .await
            .expect("create user")
    }

    /// Log in through the API and return the access token.
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .post("/token/")
            .json(&serde_json::json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("token request");
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.expect("token body");
        body["access"].as_str().expect("access token").to_owned()
    }

    /// Create an account and log it in.
    pub async fn signed_in(&self, username: &str, is_staff: bool) -> (User, String) {
        let user = self.create_user(username, is_staff).await;
        let token = self.login(username).await;
        (user, token)
    }

    /// Insert a book directly.
    pub async fn create_book(&self, title: &str, price: &str, count_in_stock: i32) -> Book {
        let book = BookInput {
            title: title.to_owned(),
            image: None,
            author: None,
            publisher: None,
            publication_year: 2015,
            description: String::new(),
            price: price.parse().expect("price"),
            count_in_stock,
        }
        .into_book(BookId::new(0));
        self.store.create_book(&book).await.expect("create book")
    }

    pub async fn stock_of(&self, id: BookId) -> i32 {
        self.store
            .get_book(id)
            .await
            .expect("get book")
            .expect("book exists")
            .count_in_stock
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.media_dir);
    }
}
