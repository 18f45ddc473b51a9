//! Catalog rules: book field validation and list ordering.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::pricing::{MAX_AMOUNT, MONEY_SCALE};

/// Oldest publication year the shop stocks.
pub const MIN_PUBLICATION_YEAR: i32 = 1990;

/// Longest accepted book title.
pub const MAX_TITLE_LENGTH: usize = 200;

/// A book field that breaks a catalog rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookFieldError {
    #[error("title cannot be empty")]
    EmptyTitle,
    #[error("title must be at most {max} characters", max = MAX_TITLE_LENGTH)]
    TitleTooLong,
    #[error("publication year must be {min} or later, got {0}", min = MIN_PUBLICATION_YEAR)]
    PublicationYear(i32),
    #[error("price cannot be negative")]
    NegativePrice,
    #[error("price must be at most {max}", max = MAX_AMOUNT)]
    PriceTooLarge,
    #[error("price cannot have more than {scale} decimal places", scale = MONEY_SCALE)]
    PriceScale,
    #[error("stock count cannot be negative")]
    NegativeStock,
}

/// Check a title.
///
/// # Errors
///
/// Returns [`BookFieldError`] for a blank or over-long title.
pub fn validate_title(title: &str) -> Result<(), BookFieldError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BookFieldError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(BookFieldError::TitleTooLong);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`BookFieldError::PublicationYear`] before [`MIN_PUBLICATION_YEAR`].
pub const fn validate_publication_year(year: i32) -> Result<(), BookFieldError> {
    if year < MIN_PUBLICATION_YEAR {
        return Err(BookFieldError::PublicationYear(year));
    }
    Ok(())
}

/// Check a price fits the stored money column.
///
/// # Errors
///
/// Returns [`BookFieldError`] for a negative price, one above [`MAX_AMOUNT`],
/// or one with sub-cent digits (`10.500` is fine, `10.005` is not).
pub fn validate_price(price: Decimal) -> Result<(), BookFieldError> {
    if price < Decimal::ZERO {
        return Err(BookFieldError::NegativePrice);
    }
    if price > MAX_AMOUNT {
        return Err(BookFieldError::PriceTooLarge);
    }
    if price.normalize().scale() > MONEY_SCALE {
        return Err(BookFieldError::PriceScale);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`BookFieldError::NegativeStock`] for a count below zero.
pub const fn validate_stock(count: i32) -> Result<(), BookFieldError> {
    if count < 0 {
        return Err(BookFieldError::NegativeStock);
    }
    Ok(())
}

/// A field a listing can be sorted by.
pub trait SortField: Copy + Sized {
    /// Parse the field name as it appears in `?ordering=`.
    fn from_name(name: &str) -> Option<Self>;

    /// Query-string name of the field.
    fn name(self) -> &'static str;
}

/// A parsed `?ordering=` value: a field, optionally prefixed with `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub descending: bool,
}

impl<F> Sort<F> {
    #[must_use]
    pub const fn asc(field: F) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    #[must_use]
    pub const fn desc(field: F) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// Ordering value naming no sortable field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot order by '{0}'")]
pub struct UnknownOrdering(pub String);

impl<F: SortField> FromStr for Sort<F> {
    type Err = UnknownOrdering;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, descending) = s
            .strip_prefix('-')
            .map_or((s, false), |rest| (rest, true));
        F::from_name(name)
            .map(|field| Self { field, descending })
            .ok_or_else(|| UnknownOrdering(s.to_owned()))
    }
}

impl<F: SortField> fmt::Display for Sort<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }
        f.write_str(self.field.name())
    }
}

/// Sortable book fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSortField {
    Title,
    Price,
    PublicationYear,
}

impl SortField for BookSortField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Self::Title),
            "price" => Some(Self::Price),
            "publication_year" => Some(Self::PublicationYear),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Price => "price",
            Self::PublicationYear => "publication_year",
        }
    }
}

impl Default for Sort<BookSortField> {
    fn default() -> Self {
        Self::asc(BookSortField::Title)
    }
}

/// Sortable order fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSortField {
    CreatedAt,
    IsPaid,
    Status,
    TotalCost,
}

impl SortField for OrderSortField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "created_at" => Some(Self::CreatedAt),
            "is_paid" => Some(Self::IsPaid),
            "status" => Some(Self::Status),
            "total_cost" => Some(Self::TotalCost),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::IsPaid => "is_paid",
            Self::Status => "status",
            Self::TotalCost => "total_cost",
        }
    }
}

impl Default for Sort<OrderSortField> {
    fn default() -> Self {
        Self::desc(OrderSortField::CreatedAt)
    }
}

/// Sortable user fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortField {
    Username,
    LastName,
}

impl SortField for UserSortField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "username" => Some(Self::Username),
            "last_name" => Some(Self::LastName),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::LastName => "last_name",
        }
    }
}

impl Default for Sort<UserSortField> {
    fn default() -> Self {
        Self::asc(UserSortField::Username)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_publication_year_floor() {
        assert_eq!(
            validate_publication_year(1989),
            Err(BookFieldError::PublicationYear(1989))
        );
        assert!(validate_publication_year(1990).is_ok());
        assert!(validate_publication_year(2024).is_ok());
    }

    #[test]
    fn test_price_and_stock() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price("-0.01".parse().unwrap()).is_err());
        assert!(validate_price("99999999.99".parse().unwrap()).is_ok());
        assert_eq!(
            validate_price("100000000".parse().unwrap()),
            Err(BookFieldError::PriceTooLarge)
        );
        assert_eq!(
            validate_price("79228162514264337593543950335".parse().unwrap()),
            Err(BookFieldError::PriceTooLarge)
        );
        assert!(validate_price("10.500".parse().unwrap()).is_ok());
        assert_eq!(
            validate_price("10.005".parse().unwrap()),
            Err(BookFieldError::PriceScale)
        );
        assert!(validate_stock(0).is_ok());
        assert_eq!(validate_stock(-1), Err(BookFieldError::NegativeStock));
    }

    #[test]
    fn test_title() {
        assert_eq!(validate_title("  "), Err(BookFieldError::EmptyTitle));
        assert!(validate_title("Дюна").is_ok());
        assert_eq!(
            validate_title(&"x".repeat(MAX_TITLE_LENGTH + 1)),
            Err(BookFieldError::TitleTooLong)
        );
    }

    #[test]
    fn test_parse_book_ordering() {
        let sort: Sort<BookSortField> = "-price".parse().unwrap();
        assert_eq!(sort, Sort::desc(BookSortField::Price));
        assert_eq!(sort.to_string(), "-price");

        let sort: Sort<BookSortField> = "publication_year".parse().unwrap();
        assert_eq!(sort, Sort::asc(BookSortField::PublicationYear));

        assert_eq!(
            "stock".parse::<Sort<BookSortField>>(),
            Err(UnknownOrdering("stock".to_owned()))
        );
    }

    #[test]
    fn test_default_orderings() {
        assert_eq!(Sort::<BookSortField>::default().to_string(), "title");
        assert_eq!(Sort::<OrderSortField>::default().to_string(), "-created_at");
        assert_eq!(Sort::<UserSortField>::default().to_string(), "username");
    }
}
