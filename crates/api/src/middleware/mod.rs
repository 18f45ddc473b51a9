//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. Path normalization (`/books/` and `/books` route alike)
//! 3. `TraceLayer` (request span with `request_id` and `user_id` fields)
//! 4. Request ID (add unique ID to each request)
//! 5. Security headers
//!
//! Authentication is not a layer: handlers take a [`Caller`] or
//! [`RequireAuth`] extractor.

pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use auth::{Caller, RequireAuth};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
