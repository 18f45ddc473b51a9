//! Order lifecycle status.
//!
//! The shop's order status is an explicit enumeration, but the transition
//! table is deliberately permissive: staff may move an order from any state
//! to any other (including re-entering the same state). Only one side effect
//! is tied to a transition - entering [`OrderStatus::Delivered`] stamps the
//! delivery date.

use serde::{Deserialize, Serialize};

/// Where an order is in its lifecycle.
///
/// Serialized as `snake_case`. The shop's original display labels are
/// accepted on input so existing clients keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted and being assembled.
    #[default]
    #[serde(alias = "В работе")]
    InProgress,
    /// Handed over to the delivery service.
    #[serde(alias = "Передан в службу доставки")]
    HandedToCourier,
    /// Received by the customer.
    #[serde(alias = "Доставлен")]
    Delivered,
    /// Cancelled by staff.
    #[serde(alias = "Отменен")]
    Canceled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::InProgress,
        Self::HandedToCourier,
        Self::Delivered,
        Self::Canceled,
    ];

    /// Position in the lifecycle, matching the declaration order of the
    /// `order_status` database enum. Sorting by status sorts by this.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::InProgress => 0,
            Self::HandedToCourier => 1,
            Self::Delivered => 2,
            Self::Canceled => 3,
        }
    }

    /// Wire label for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::HandedToCourier => "handed_to_courier",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        }
    }

    /// Human-facing label used by the shop's storefront.
    #[must_use]
    pub const fn display_label(self) -> &'static str {
        match self {
            Self::InProgress => "В работе",
            Self::HandedToCourier => "Передан в службу доставки",
            Self::Delivered => "Доставлен",
            Self::Canceled => "Отменен",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// The table is permissive: every pair is allowed. It exists so that a
    /// stricter policy, if the business ever asks for one, changes here only.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::InProgress | Self::HandedToCourier | Self::Delivered | Self::Canceled,
                Self::InProgress | Self::HandedToCourier | Self::Delivered | Self::Canceled,
            )
        )
    }

    /// Plan the transition from `self` to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the transition table forbids the move.
    pub const fn transition(self, next: Self) -> Result<StatusTransition, TransitionError> {
        if !self.can_transition_to(next) {
            return Err(TransitionError {
                from: self,
                to: next,
            });
        }
        Ok(StatusTransition {
            from: self,
            to: next,
            stamps_delivery: matches!(next, Self::Delivered),
        })
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s || status.display_label() == s)
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// A status label that names none of the lifecycle states.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

/// A transition refused by the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("order cannot move from {from} to {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// An approved status change and the side effects it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Record the current instant as the delivery date.
    pub stamps_delivery: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_in_progress() {
        assert_eq!(OrderStatus::default(), OrderStatus::InProgress);
    }

    #[test]
    fn test_parse_wire_and_display_labels() {
        assert_eq!(
            "handed_to_courier".parse::<OrderStatus>().unwrap(),
            OrderStatus::HandedToCourier
        );
        assert_eq!("Доставлен".parse::<OrderStatus>().unwrap(), OrderStatus::Delivered);
        assert_eq!(
            "shipped".parse::<OrderStatus>(),
            Err(UnknownStatus("shipped".to_owned()))
        );
    }

    #[test]
    fn test_serde_accepts_aliases() {
        let status: OrderStatus = serde_json::from_str("\"Отменен\"").unwrap();
        assert_eq!(status, OrderStatus::Canceled);
        assert_eq!(
            serde_json::to_string(&OrderStatus::HandedToCourier).unwrap(),
            "\"handed_to_courier\""
        );
    }

    #[test]
    fn test_rank_follows_lifecycle_order() {
        let ranks: Vec<u8> = OrderStatus::ALL.iter().map(|s| s.rank()).collect();
        assert_eq!(ranks, [0, 1, 2, 3]);
        assert!(OrderStatus::Canceled.rank() > OrderStatus::InProgress.rank());
    }

    #[test]
    fn test_every_transition_is_allowed() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert!(from.transition(to).is_ok(), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_only_delivered_stamps_delivery() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let transition = from.transition(to).unwrap();
                assert_eq!(transition.stamps_delivery, to == OrderStatus::Delivered);
            }
        }
    }
}
