//! Order handlers.
//!
//! Placement needs a signed-in caller. Reading goes through the order-owner
//! policy (customers see their own orders, staff see all), payment through the
//! payer policy, and status changes are staff only.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use bookshop_core::catalog::{OrderSortField, Sort};
use bookshop_core::permission::{Access, Policy};
use bookshop_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{Caller, RequireAuth};
use crate::models::{Order, OrderDetail, OrderScope};
use crate::services::orders::PlaceOrderRequest;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub ordering: Option<String>,
}

/// `PUT /order_status/{id}/` body.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Place an order for the caller.
///
/// POST /add-order/
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<PlaceOrderRequest>,
) -> Result<ApiJson<OrderDetail>> {
    Policy::Authenticated.check_collection(Some(&user.identity()), Access::Create)?;
    let detail = state.orders().place(user.id, request).await?;
    Ok(ApiJson(detail))
}

/// The caller's orders; every order for staff.
///
/// GET /orders/
#[instrument(skip(state, caller))]
pub async fn index(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<ApiJson<Vec<Order>>> {
    caller.check(Policy::OrderOwner, Access::Read)?;

    let sort: Sort<OrderSortField> = match query.ordering.as_deref().map(str::trim) {
        None | Some("") => Sort::default(),
        Some(ordering) => ordering.parse()?,
    };
    let customer_id = match caller.user() {
        Some(user) if !user.is_staff => Some(user.id),
        _ => None,
    };

    let orders = state
        .store()
        .list_orders(OrderScope { customer_id, sort })
        .await?;
    Ok(ApiJson(orders))
}

/// GET /orders/{id}/
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiJson<OrderDetail>> {
    caller.check(Policy::OrderOwner, Access::Read)?;
    let detail = load(&state, id).await?;
    caller.check_object(Policy::OrderOwner, Access::Read, Some(detail.order.customer_id))?;
    Ok(ApiJson(detail))
}

/// Mark an order paid.
///
/// PUT /pay/{id}/
#[instrument(skip(state, caller))]
pub async fn pay(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiJson<Order>> {
    caller.check(Policy::OrderPayer, Access::Update)?;
    let detail = load(&state, id).await?;
    caller.check_object(Policy::OrderPayer, Access::Update, Some(detail.order.customer_id))?;
    Ok(ApiJson(state.orders().pay(&detail.order).await?))
}

/// Move an order to a new status.
///
/// PUT /order_status/{id}/
#[instrument(skip(state, caller, update))]
pub async fn set_status(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<ApiJson<Order>> {
    caller.check(Policy::StaffOnly, Access::Update)?;
    let detail = load(&state, id).await?;
    caller.check_object(Policy::StaffOnly, Access::Update, Some(detail.order.customer_id))?;
    Ok(ApiJson(
        state.orders().set_status(&detail.order, update.status).await?,
    ))
}

async fn load(state: &AppState, id: OrderId) -> Result<OrderDetail> {
    state
        .store()
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::not_found("order"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_update_accepts_labels() {
        let update: StatusUpdate = serde_json::from_str(r#"{"status": "delivered"}"#).unwrap();
        assert_eq!(update.status, OrderStatus::Delivered);

        let update: StatusUpdate =
            serde_json::from_str(r#"{"status": "Передан в службу доставки"}"#).unwrap();
        assert_eq!(update.status, OrderStatus::HandedToCourier);

        assert!(serde_json::from_str::<StatusUpdate>(r#"{"status": "lost"}"#).is_err());
    }
}
