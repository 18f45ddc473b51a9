//! Core types for the bookshop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod id;
pub mod rating;
pub mod status;

pub use contact::{Email, EmailError, PhoneNumber, PhoneNumberError};
pub use id::*;
pub use rating::{Rating, RatingError};
pub use status::*;
