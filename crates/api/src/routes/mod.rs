//! HTTP route handlers for the bookshop API.
//!
//! # Route Structure
//!
//! Trailing slashes are optional everywhere (`/books/` and `/books` match).
//!
//! ```text
//! GET  /health                       - Liveness
//! GET  /health/ready                 - Storage reachable
//!
//! # Catalog (public read, staff write)
//! GET|POST              /books/
//! GET|PUT|PATCH|DELETE  /books/{id}/
//! GET|POST              /authors/
//! GET|PUT|DELETE        /authors/{id}/
//! GET|POST              /publishing-houses/
//! GET|PUT|DELETE        /publishing-houses/{id}/
//! POST                  /upload_image/           - multipart book_id + image
//!
//! # Orders
//! POST /add-order/                   - Place an order (signed in)
//! GET  /orders/                      - Own orders; all for staff
//! GET  /orders/{id}/
//! PUT  /pay/{id}/                    - Customer or staff
//! PUT  /order_status/{id}/           - Staff only
//!
//! # Accounts
//! POST /token/                       - Access/refresh pair
//! POST /token/refresh/               - New access token
//! POST /register/
//! GET  /users/                       - Staff only
//! GET|PUT|PATCH|DELETE /users/{id}/  - Self or staff; delete staff only
//! GET|PUT|PATCH /profile/
//!
//! # Reviews
//! POST                  /comment/
//! GET|PUT|PATCH|DELETE  /comment/{id}/   - Author or staff may write
//! ```

pub mod auth;
pub mod authors;
pub mod books;
pub mod comments;
pub mod orders;
pub mod publishers;
pub mod uploads;
pub mod users;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post, put},
};

use crate::services::media::MAX_IMAGE_SIZE;
use crate::state::AppState;

/// Room for the multipart framing and the `book_id` field around the image.
const UPLOAD_OVERHEAD: usize = 64 * 1024;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(books::index).post(books::create))
        .route(
            "/books/{id}",
            get(books::show)
                .put(books::replace)
                .patch(books::update)
                .delete(books::destroy),
        )
        .route("/authors", get(authors::index).post(authors::create))
        .route(
            "/authors/{id}",
            get(authors::show)
                .put(authors::update)
                .delete(authors::destroy),
        )
        .route(
            "/publishing-houses",
            get(publishers::index).post(publishers::create),
        )
        .route(
            "/publishing-houses/{id}",
            get(publishers::show)
                .put(publishers::update)
                .delete(publishers::destroy),
        )
        .route(
            "/upload_image",
            post(uploads::upload_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + UPLOAD_OVERHEAD)),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/add-order", post(orders::place))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/pay/{id}", put(orders::pay))
        .route("/order_status/{id}", put(orders::set_status))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/token", post(auth::obtain))
        .route("/token/refresh", post(auth::refresh))
        .route("/register", post(auth::register))
        .route("/users", get(users::index))
        .route(
            "/users/{id}",
            get(users::show)
                .put(users::update)
                .patch(users::update)
                .delete(users::destroy),
        )
        .route(
            "/profile",
            get(users::profile)
                .put(users::update_profile)
                .patch(users::update_profile),
        )
}

/// Create the review routes router.
pub fn comment_routes() -> Router<AppState> {
    Router::new()
        .route("/comment", post(comments::create))
        .route(
            "/comment/{id}",
            get(comments::show)
                .put(comments::update)
                .patch(comments::update)
                .delete(comments::destroy),
        )
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(catalog_routes())
        .merge(order_routes())
        .merge(account_routes())
        .merge(comment_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if storage is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
