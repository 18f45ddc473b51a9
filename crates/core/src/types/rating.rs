//! Review ratings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error for a rating outside `1..=5`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max}, got {got}", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    pub got: i64,
}

/// A star rating from 1 to 5 attached to a review.
///
/// Reviews may omit the rating entirely; that is modelled as
/// `Option<Rating>` by callers, never as a zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i16")]
pub struct Rating(i16);

impl Rating {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 5;

    /// # Errors
    ///
    /// Returns [`RatingError`] when `value` is outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        i16::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { got: value })
    }

    #[must_use]
    pub const fn value(self) -> i16 {
        self.0
    }

    /// Mean of `ratings` to two decimal places, or `None` for no ratings.
    pub fn average(ratings: impl IntoIterator<Item = Self>) -> Option<Decimal> {
        let (sum, count) = ratings
            .into_iter()
            .fold((0_i64, 0_i64), |(sum, count), r| (sum + i64::from(r.0), count + 1));
        if count == 0 {
            return None;
        }
        Some((Decimal::from(sum) / Decimal::from(count)).round_dp(2))
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(5).unwrap().value(), 5);
        assert_eq!(Rating::new(6), Err(RatingError { got: 6 }));
        assert!(Rating::new(i64::from(i16::MAX) + 1).is_err());
    }

    #[test]
    fn test_average() {
        assert_eq!(Rating::average(Vec::new()), None);
        let ratings = [5, 4, 4].map(|v| Rating::new(v).unwrap());
        assert_eq!(Rating::average(ratings), Some("4.33".parse().unwrap()));
    }

    #[test]
    fn test_rating_serde() {
        let parsed: Option<Rating> = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, Some(Rating::new(4).unwrap()));

        let missing: Option<Rating> = serde_json::from_str("null").unwrap();
        assert_eq!(missing, None);

        assert!(serde_json::from_str::<Rating>("9").is_err());
        assert_eq!(serde_json::to_string(&Rating::new(3).unwrap()).unwrap(), "3");
    }
}
