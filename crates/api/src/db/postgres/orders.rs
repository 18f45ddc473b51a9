//! Order queries, including the atomic placement write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use bookshop_core::catalog::OrderSortField;
use bookshop_core::{
    AddressId, BookId, OrderId, OrderStatus, OrderedBookId, PhoneNumber, StatusTransition, UserId,
};

use super::{PgStore, corrupt};
use crate::db::{OrderRepository, RepoResult, RepositoryError, classify_write_error};
use crate::models::{DeliveryAddress, NewOrder, Order, OrderDetail, OrderScope, OrderedBook};

const ORDER_COLUMNS: &str = "id, customer_id, created_at, status, is_paid, paid_at, \
                             delivered_at, shipping_cost, total_cost, payment_method";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: UserId,
    created_at: DateTime<Utc>,
    status: OrderStatus,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    shipping_cost: Decimal,
    total_cost: Decimal,
    payment_method: String,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            created_at: row.created_at,
            status: row.status,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            delivered_at: row.delivered_at,
            shipping_cost: row.shipping_cost,
            total_cost: row.total_cost,
            payment_method: row.payment_method,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    address: String,
    phone_number: String,
}

impl TryFrom<AddressRow> for DeliveryAddress {
    type Error = RepositoryError;

    fn try_from(row: AddressRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            address: row.address,
            phone_number: PhoneNumber::parse(&row.phone_number)
                .map_err(|e| corrupt("phone number", e))?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LineRow {
    id: OrderedBookId,
    book_id: BookId,
    title: String,
    image: Option<String>,
    quantity: i32,
    price: Decimal,
}

impl From<LineRow> for OrderedBook {
    fn from(row: LineRow) -> Self {
        Self {
            id: row.id,
            book_id: row.book_id,
            title: row.title,
            image: row.image,
            quantity: row.quantity,
            price: row.price,
        }
    }
}

/// Load an order with its address and lines on an open connection.
async fn load_detail(conn: &mut PgConnection, id: OrderId) -> RepoResult<Option<OrderDetail>> {
    let Some(order) = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let delivery_address = sqlx::query_as::<_, AddressRow>(
        "SELECT id, address, phone_number FROM delivery_addresses
         WHERE order_id = $1 ORDER BY id LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .map(DeliveryAddress::try_from)
    .transpose()?;

    let items = sqlx::query_as::<_, LineRow>(
        "SELECT ob.id, ob.book_id, b.title, b.image, ob.quantity, ob.price
         FROM ordered_books ob
         JOIN books b ON b.id = ob.book_id
         WHERE ob.order_id = $1
         ORDER BY ob.id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(OrderedBook::from)
    .collect();

    Ok(Some(OrderDetail {
        order: order.into(),
        delivery_address,
        items,
    }))
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn place_order(&self, order: NewOrder) -> RepoResult<OrderDetail> {
        let mut tx = self.pool().begin().await?;

        let order_id: OrderId = sqlx::query_scalar(
            "INSERT INTO orders (customer_id, shipping_cost, total_cost, payment_method)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(order.customer_id)
        .bind(order.shipping_cost)
        .bind(order.total_cost)
        .bind(&order.payment_method)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify_write_error(e, "order already exists"))?;

        sqlx::query(
            "INSERT INTO delivery_addresses (order_id, address, phone_number)
             VALUES ($1, $2, $3)",
        )
        .bind(order_id)
        .bind(&order.address)
        .bind(order.phone_number.as_str())
        .execute(&mut *tx)
        .await?;

        for line in &order.lines {
            // Compare-and-decrement: the row lock taken by UPDATE serializes
            // concurrent orders for the same book.
            let decremented = sqlx::query(
                "UPDATE books SET count_in_stock = count_in_stock - $1
                 WHERE id = $2 AND count_in_stock >= $1",
            )
            .bind(line.quantity)
            .bind(line.book_id)
            .execute(&mut *tx)
            .await?;

            if decremented.rows_affected() == 0 {
                let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM books WHERE id = $1")
                    .bind(line.book_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                // Dropping `tx` rolls everything back.
                return Err(match exists {
                    Some(_) => RepositoryError::InsufficientStock(line.book_id),
                    None => RepositoryError::InvalidReference(format!("book {}", line.book_id)),
                });
            }

            sqlx::query(
                "INSERT INTO ordered_books (order_id, book_id, quantity, price)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(line.book_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        let detail = load_detail(&mut *tx, order_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        Ok(detail)
    }

    async fn get_order(&self, id: OrderId) -> RepoResult<Option<OrderDetail>> {
        let mut conn = self.pool().acquire().await?;
        load_detail(&mut *conn, id).await
    }

    async fn list_orders(&self, scope: OrderScope) -> RepoResult<Vec<Order>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE TRUE"
        ));
        if let Some(customer_id) = scope.customer_id {
            query.push(" AND customer_id = ").push_bind(customer_id);
        }

        let column = match scope.sort.field {
            OrderSortField::CreatedAt => "created_at",
            OrderSortField::IsPaid => "is_paid",
            OrderSortField::Status => "status",
            OrderSortField::TotalCost => "total_cost",
        };
        let direction = if scope.sort.descending { "DESC" } else { "ASC" };
        query.push(format!(" ORDER BY {column} {direction}, id {direction}"));

        let rows = query
            .build_query_as::<OrderRow>()
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn mark_order_paid(&self, id: OrderId, at: DateTime<Utc>) -> RepoResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET is_paid = TRUE, paid_at = $2 WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        transition: StatusTransition,
        at: DateTime<Utc>,
    ) -> RepoResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders
             SET status = $2,
                 delivered_at = CASE WHEN $3 THEN $4 ELSE delivered_at END
             WHERE id = $1 AND status = $5
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(transition.to)
        .bind(transition.stamps_delivery)
        .bind(at)
        .bind(transition.from)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
                        .bind(id)
                        .fetch_one(self.pool())
                        .await?;
                if exists {
                    Err(RepositoryError::Conflict(
                        "order status changed since it was read".to_owned(),
                    ))
                } else {
                    Err(RepositoryError::NotFound)
                }
            }
        }
    }
}
