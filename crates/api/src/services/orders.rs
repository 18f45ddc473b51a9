//! Order workflow: placement, payment and status changes.
//!
//! Pricing and input checks happen here; the storage layer writes the result
//! atomically and owns the stock guard.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use bookshop_core::catalog::{self, BookFieldError};
use bookshop_core::pricing::{self, CostMismatch, CostOverflow, PricedLine};
use bookshop_core::{
    BookId, OrderStatus, PhoneNumber, PhoneNumberError, TransitionError, UserId,
};

use crate::db::{BookRepository, OrderRepository, RepositoryError, Store};
use crate::models::{NewOrder, NewOrderLine, Order, OrderDetail};

/// Longest accepted delivery address.
const MAX_ADDRESS_LENGTH: usize = 500;

/// Errors raised by the order workflow.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("no items selected")]
    NoItems,

    #[error("quantity for book {book} must be positive, got {quantity}")]
    InvalidQuantity { book: BookId, quantity: i32 },

    #[error("invalid price for book {book}: {source}")]
    InvalidPrice { book: BookId, source: BookFieldError },

    #[error("delivery address cannot be empty")]
    EmptyAddress,

    #[error("delivery address must be at most {max} characters", max = MAX_ADDRESS_LENGTH)]
    AddressTooLong,

    #[error(transparent)]
    InvalidPhone(#[from] PhoneNumberError),

    #[error("book {0} does not exist")]
    BookNotFound(BookId),

    #[error("not enough copies of book {0} in stock")]
    InsufficientStock(BookId),

    #[error(transparent)]
    CostMismatch(#[from] CostMismatch),

    #[error(transparent)]
    CostOverflow(#[from] CostOverflow),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for OrderError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::InsufficientStock(book) => Self::InsufficientStock(book),
            other => Self::Repository(other),
        }
    }
}

/// Delivery details of an order.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingAddressInput {
    pub address: String,
    pub phone_number: String,
}

/// One requested line.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
    pub book: BookId,
    pub quantity: i32,
    /// Unit price to record. Defaults to the book's current price.
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// `POST /add-order/` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub shipping_address: ShippingAddressInput,
    #[serde(default)]
    pub order_items: Vec<OrderItemInput>,
    /// Checked against the computed shipping cost when present.
    #[serde(default)]
    pub shipping_price: Option<Decimal>,
    /// Checked against the computed total when present.
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub payment_method: String,
}

pub struct OrderService<'a> {
    store: &'a Store,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Validate, price and place an order for `customer`.
    ///
    /// Nothing is written unless every line can be served.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` describing the first problem found. On error no
    /// order, address or line exists and no stock has moved.
    pub async fn place(
        &self,
        customer: UserId,
        request: PlaceOrderRequest,
    ) -> Result<OrderDetail, OrderError> {
        if request.order_items.is_empty() {
            return Err(OrderError::NoItems);
        }

        let address = request.shipping_address.address.trim().to_owned();
        if address.is_empty() {
            return Err(OrderError::EmptyAddress);
        }
        if address.chars().count() > MAX_ADDRESS_LENGTH {
            return Err(OrderError::AddressTooLong);
        }
        let phone_number = PhoneNumber::parse(&request.shipping_address.phone_number)?;

        let mut lines = Vec::with_capacity(request.order_items.len());
        for item in &request.order_items {
            if item.quantity <= 0 {
                return Err(OrderError::InvalidQuantity {
                    book: item.book,
                    quantity: item.quantity,
                });
            }
            let unit_price = match item.price {
                Some(price) => price,
                None => {
                    self.store
                        .get_book(item.book)
                        .await?
                        .ok_or(OrderError::BookNotFound(item.book))?
                        .price
                }
            };
            catalog::validate_price(unit_price).map_err(|source| OrderError::InvalidPrice {
                book: item.book,
                source,
            })?;
            lines.push(NewOrderLine {
                book_id: item.book,
                quantity: item.quantity,
                unit_price,
            });
        }

        let priced: Vec<PricedLine> = lines
            .iter()
            .map(|line| PricedLine {
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();
        let costs = pricing::order_costs(&priced)?;
        costs.verify_declared(request.shipping_price, request.total_price)?;

        let order = NewOrder {
            customer_id: customer,
            address,
            phone_number,
            lines,
            shipping_cost: costs.shipping_cost,
            total_cost: costs.total_cost,
            payment_method: request.payment_method.trim().to_owned(),
        };

        let detail = match self.store.place_order(order).await {
            Ok(detail) => detail,
            Err(RepositoryError::InvalidReference(_)) => {
                return Err(self.first_missing_book(&request).await);
            }
            Err(other) => return Err(other.into()),
        };

        tracing::info!(
            order_id = %detail.order.id,
            customer_id = %customer,
            lines = detail.items.len(),
            total = %detail.order.total_cost,
            "order placed"
        );
        Ok(detail)
    }

    /// Name the first requested book that does not exist.
    async fn first_missing_book(&self, request: &PlaceOrderRequest) -> OrderError {
        for item in &request.order_items {
            match self.store.get_book(item.book).await {
                Ok(Some(_)) => {}
                Ok(None) => return OrderError::BookNotFound(item.book),
                Err(e) => return e.into(),
            }
        }
        OrderError::Repository(RepositoryError::InvalidReference(
            "book removed while the order was placed".to_owned(),
        ))
    }

    /// Mark `order` paid now. Repeating the call keeps it paid and moves the
    /// payment time forward.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the write fails.
    pub async fn pay(&self, order: &Order) -> Result<Order, OrderError> {
        let paid = self.store.mark_order_paid(order.id, Utc::now()).await?;
        tracing::info!(order_id = %paid.id, "order paid");
        Ok(paid)
    }

    /// Move `order` to `next`, stamping the delivery time on entering
    /// `delivered`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Transition` if the move is not allowed.
    pub async fn set_status(&self, order: &Order, next: OrderStatus) -> Result<Order, OrderError> {
        let transition = order.status.transition(next)?;
        let updated = self
            .store
            .set_order_status(order.id, transition, Utc::now())
            .await?;
        tracing::info!(
            order_id = %updated.id,
            from = %transition.from,
            to = %transition.to,
            "order status changed"
        );
        Ok(updated)
    }
}
