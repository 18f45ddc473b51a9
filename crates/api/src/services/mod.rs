//! Business logic services for the bookshop.
//!
//! # Services
//!
//! - `auth` - Registration, password login and bearer tokens
//! - `orders` - Order placement, payment and status workflow
//! - `media` - Stores uploaded cover images under the media root

pub mod auth;
pub mod media;
pub mod orders;
