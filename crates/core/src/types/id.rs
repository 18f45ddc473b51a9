//! Newtype IDs for type-safe entity references.
//!
//! Every table in the bookshop is keyed by a PostgreSQL `SERIAL`. Wrapping the
//! raw `i32` per entity keeps a `BookId` from being passed where an `OrderId`
//! is expected.

/// Define a type-safe ID wrapper around `i32`.
///
/// Generated types are `Copy`, ordered, hashable, serialize transparently as a
/// bare number and parse from path segments via `FromStr`. With the `postgres`
/// feature they also derive a transparent `sqlx::Type`, so they can be bound
/// and decoded directly.
///
/// # Example
///
/// ```rust
/// # use bookshop_core::define_id;
/// define_id!(
///     /// Identifier of a shelf.
///     ShelfId
/// );
///
/// let shelf = ShelfId::new(4);
/// assert_eq!(shelf.as_i32(), 4);
/// assert_eq!("4".parse::<ShelfId>().unwrap(), shelf);
/// ```
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type))]
        #[cfg_attr(feature = "postgres", sqlx(transparent))]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw database id.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw database id.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a user account (customer or staff).
    UserId
);
define_id!(
    /// Identifier of a book author.
    AuthorId
);
define_id!(
    /// Identifier of a publishing house.
    PublisherId
);
define_id!(
    /// Identifier of a catalog book.
    BookId
);
define_id!(
    /// Identifier of an order.
    OrderId
);
define_id!(
    /// Identifier of an order line item.
    OrderedBookId
);
define_id!(
    /// Identifier of an order's delivery address.
    AddressId
);
define_id!(
    /// Identifier of a book review.
    CommentId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_numbers() {
        let json = serde_json::to_string(&BookId::new(7)).unwrap();
        assert_eq!(json, "7");

        let parsed: OrderId = serde_json::from_str("12").unwrap();
        assert_eq!(parsed, OrderId::new(12));
    }

    #[test]
    fn test_ids_parse_from_str() {
        assert_eq!("42".parse::<UserId>().unwrap(), UserId::new(42));
        assert!("forty-two".parse::<UserId>().is_err());
    }
}
