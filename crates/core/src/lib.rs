//! Bookshop Core - domain types and rules.
//!
//! This crate holds everything about the bookshop that can be decided without
//! touching a database or a socket:
//! - `api` - the HTTP service built on top of these types
//! - `cli` - operator tooling (migrations, accounts, catalog seeding)
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Storage adapters enable the `postgres` feature to get `sqlx`
//! encode/decode impls for the newtypes.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, contact details, ratings and order status
//! - [`pricing`] - Shipping rule and order totals
//! - [`permission`] - Access-control policies evaluated per request
//! - [`catalog`] - Book validation and catalog ordering

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod permission;
pub mod pricing;
pub mod types;

pub use types::*;
