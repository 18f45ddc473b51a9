//! Domain models for the bookshop API.
//!
//! These are the validated shapes handlers and repositories exchange. Storage
//! row types live next to the queries that produce them and convert into these.

pub mod catalog;
pub mod comment;
pub mod order;
pub mod user;

pub use catalog::{
    Author, AuthorDetail, AuthorInput, Book, BookDetail, BookFilter, BookInput, BookPatch,
    BookSummary, Publisher, PublisherDetail, PublisherInput,
};
pub use comment::{Comment, CommentPatch, NewComment};
pub use order::{
    DeliveryAddress, NewOrder, NewOrderLine, Order, OrderDetail, OrderScope, OrderedBook,
};
pub use user::{NewUser, User, UserDetail, UserUpdate};
