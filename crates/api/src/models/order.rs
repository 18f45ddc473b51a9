//! Orders, their delivery address and line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bookshop_core::catalog::{OrderSortField, Sort};
use bookshop_core::{AddressId, BookId, OrderId, OrderStatus, OrderedBookId, PhoneNumber, UserId};

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "customer")]
    pub customer_id: UserId,
    /// Set once at placement.
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub shipping_cost: Decimal,
    pub total_cost: Decimal,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryAddress {
    pub id: AddressId,
    pub address: String,
    pub phone_number: PhoneNumber,
}

/// A line item. `price` is the unit price captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedBook {
    pub id: OrderedBookId,
    #[serde(rename = "book")]
    pub book_id: BookId,
    pub title: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
}

/// An order with everything it owns.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub delivery_address: Option<DeliveryAddress>,
    pub items: Vec<OrderedBook>,
}

/// A fully priced order ready to be written.
///
/// Built by the order workflow; storage writes it atomically or not at all.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: UserId,
    pub address: String,
    pub phone_number: PhoneNumber,
    pub lines: Vec<NewOrderLine>,
    pub shipping_cost: Decimal,
    pub total_cost: Decimal,
    pub payment_method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderLine {
    pub book_id: BookId,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Which orders a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderScope {
    /// `None` lists every customer's orders.
    pub customer_id: Option<UserId>,
    pub sort: Sort<OrderSortField>,
}

impl OrderScope {
    #[must_use]
    pub fn customer(customer_id: UserId) -> Self {
        Self {
            customer_id: Some(customer_id),
            sort: Sort::default(),
        }
    }
}
