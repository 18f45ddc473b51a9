//! Book reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookshop_core::{BookId, CommentId, Rating, UserId};

/// A review. At most one per (book, author).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(rename = "book")]
    pub book_id: BookId,
    #[serde(rename = "comment_author")]
    pub author_id: UserId,
    pub author_username: String,
    pub rating: Option<Rating>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub book_id: BookId,
    pub author_id: UserId,
    pub rating: Option<Rating>,
    pub comment: String,
}

/// Partial review payload. A present `rating: null` clears the rating.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPatch {
    #[serde(default, deserialize_with = "present")]
    pub rating: Option<Option<Rating>>,
    pub comment: Option<String>,
}

impl CommentPatch {
    pub fn apply(self, comment: &mut Comment) {
        if let Some(rating) = self.rating {
            comment.rating = rating;
        }
        if let Some(text) = self.comment {
            comment.comment = text;
        }
    }
}

/// Distinguish an explicit `null` from a missing field.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<Rating>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Rating>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_null_rating_clears() {
        let patch: CommentPatch = serde_json::from_str(r#"{"rating": null}"#).unwrap();
        assert_eq!(patch.rating, Some(None));

        let patch: CommentPatch = serde_json::from_str(r#"{"comment": "ok"}"#).unwrap();
        assert_eq!(patch.rating, None);

        assert!(serde_json::from_str::<CommentPatch>(r#"{"rating": 7}"#).is_err());
    }
}
