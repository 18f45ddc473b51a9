#![allow(clippy::unwrap_used)]

//! Order workflow: placement, pricing, stock, payment and status changes.

use reqwest::StatusCode;
use serde_json::{Value, json};

use bookshop_integration_tests::{TestContext, dec};

fn order_body(lines: &Value) -> Value {
    json!({
        "shippingAddress": { "address": "Москва, ул. Тверская, 1", "phone_number": "+79161234567" },
        "orderItems": lines,
        "paymentMethod": "card"
    })
}

#[tokio::test]
async fn test_place_order_decrements_stock_and_charges_shipping() {
    let ctx = TestContext::new().await;
    let book = ctx.create_book("Пикник на обочине", "450.00", 5).await;
    let (customer, token) = ctx.signed_in("reader", false).await;

    let resp = ctx
        .post("/add-order/")
        .bearer_auth(&token)
        .json(&order_body(&json!([{ "book": book.id, "quantity": 3 }])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let order: Value = resp.json().await.unwrap();

    assert_eq!(ctx.stock_of(book.id).await, 2);
    assert_eq!(order["customer"], customer.id.as_i32());
    assert_eq!(order["status"], "in_progress");
    assert_eq!(order["is_paid"], false);
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert_eq!(dec(&order["items"][0]["price"]), dec(&json!("450.00")));
    assert_eq!(dec(&order["shipping_cost"]), dec(&json!("300")));
    assert_eq!(dec(&order["total_cost"]), dec(&json!("1650.00")));
    assert_eq!(order["delivery_address"]["phone_number"], "+79161234567");
}

#[tokio::test]
async fn test_multi_line_order_decrements_each_book() {
    let ctx = TestContext::new().await;
    let first = ctx.create_book("Пикник на обочине", "450.00", 5).await;
    let second = ctx.create_book("Трудно быть богом", "390.00", 4).await;
    let (_, token) = ctx.signed_in("reader", false).await;

    let resp = ctx
        .post("/add-order/")
        .bearer_auth(&token)
        .json(&order_body(&json!([
            { "book": first.id, "quantity": 2 },
            { "book": second.id, "quantity": 4 }
        ])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let order: Value = resp.json().await.unwrap();

    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(ctx.stock_of(first.id).await, 3);
    assert_eq!(ctx.stock_of(second.id).await, 0);
    // 2 * 450 + 4 * 390 = 2460, above the free shipping threshold.
    assert_eq!(dec(&order["shipping_cost"]), dec(&json!("0")));
    assert_eq!(dec(&order["total_cost"]), dec(&json!("2460")));
}

#[tokio::test]
async fn test_concurrent_orders_cannot_oversell() {
    let ctx = TestContext::new().await;
    let book = ctx.create_book("Последний экземпляр", "500.00", 1).await;
    let (_, alice) = ctx.signed_in("alice", false).await;
    let (_, bob) = ctx.signed_in("bob", false).await;
    let body = order_body(&json!([{ "book": book.id, "quantity": 1 }]));

    let (a, b) = tokio::join!(
        ctx.post("/add-order/").bearer_auth(&alice).json(&body).send(),
        ctx.post("/add-order/").bearer_auth(&bob).json(&body).send(),
    );
    let mut statuses = [a.unwrap().status(), b.unwrap().status()];
    statuses.sort();

    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);
    assert_eq!(ctx.stock_of(book.id).await, 0);
}

#[tokio::test]
async fn test_unstorable_line_price_rejected() {
    let ctx = TestContext::new().await;
    let book = ctx.create_book("Пикник на обочине", "450.00", 5).await;
    let (_, token) = ctx.signed_in("reader", false).await;

    for price in ["79228162514264337593543950335", "99999999.99", "10.005"] {
        let resp = ctx
            .post("/add-order/")
            .bearer_auth(&token)
            .json(&order_body(&json!([
                { "book": book.id, "quantity": 2, "price": price }
            ])))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{price}");
    }
    assert_eq!(ctx.stock_of(book.id).await, 5);
}

#[tokio::test]
async fn test_free_shipping_above_threshold() {
    let ctx = TestContext::new().await;
    let book = ctx.create_book("Собрание сочинений", "1100.00", 4).await;
    let (_, token) = ctx.signed_in("reader", false).await;

    let mut body = order_body(&json!([{ "book": book.id, "quantity": 2 }]));
    body["shippingPrice"] = json!("0");
    body["totalPrice"] = json!("2200.00");

    let resp = ctx
        .post("/add-order/")
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let order: Value = resp.json().await.unwrap();
    assert_eq!(dec(&order["shipping_cost"]), dec(&json!("0")));
    assert_eq!(dec(&order["total_cost"]), dec(&json!("2200")));
}

#[tokio::test]
async fn test_declared_total_mismatch_rejected() {
    let ctx = TestContext::new().await;
    let book = ctx.create_book("Пикник на обочине", "450.00", 5).await;
    let (_, token) = ctx.signed_in("reader", false).await;

    let mut body = order_body(&json!([{ "book": book.id, "quantity": 1 }]));
    body["totalPrice"] = json!("1.00");

    let resp = ctx
        .post("/add-order/")
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.stock_of(book.id).await, 5);
}

#[tokio::test]
async fn test_insufficient_stock_writes_nothing() {
    let ctx = TestContext::new().await;
    let plenty = ctx.create_book("Много", "100.00", 10).await;
    let scarce = ctx.create_book("Мало", "100.00", 1).await;
    let (_, token) = ctx.signed_in("reader", false).await;

    let resp = ctx
        .post("/add-order/")
        .bearer_auth(&token)
        .json(&order_body(&json!([
            { "book": plenty.id, "quantity": 2 },
            { "book": scarce.id, "quantity": 2 }
        ])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(ctx.stock_of(plenty.id).await, 10);
    assert_eq!(ctx.stock_of(scarce.id).await, 1);

    let orders: Vec<Value> = ctx
        .get("/orders/")
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_order_input_validation() {
    let ctx = TestContext::new().await;
    let book = ctx.create_book("Пикник на обочине", "450.00", 5).await;
    let (_, token) = ctx.signed_in("reader", false).await;

    let resp = ctx
        .post("/add-order/")
        .json(&order_body(&json!([{ "book": book.id, "quantity": 1 }])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    for lines in [
        json!([]),
        json!([{ "book": book.id, "quantity": 0 }]),
        json!([{ "book": 999, "quantity": 1 }]),
    ] {
        let resp = ctx
            .post("/add-order/")
            .bearer_auth(&token)
            .json(&order_body(&lines))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{lines}");
    }

    let mut body = order_body(&json!([{ "book": book.id, "quantity": 1 }]));
    body["shippingAddress"]["phone_number"] = json!("call me");
    let resp = ctx
        .post("/add-order/")
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(ctx.stock_of(book.id).await, 5);
}

async fn place(ctx: &TestContext, token: &str) -> Value {
    let book = ctx.create_book("Заказная", "100.00", 10).await;
    ctx.post("/add-order/")
        .bearer_auth(token)
        .json(&order_body(&json!([{ "book": book.id, "quantity": 1 }])))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_status_change_is_staff_only() {
    let ctx = TestContext::new().await;
    let (_, customer) = ctx.signed_in("reader", false).await;
    let (_, staff) = ctx.signed_in("manager", true).await;
    let order = place(&ctx, &customer).await;
    let path = format!("/order_status/{}/", order["id"]);
    let body = json!({ "status": "delivered" });

    let resp = ctx.put(&path).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = ctx
        .put(&path)
        .bearer_auth(&customer)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = ctx
        .put(&path)
        .bearer_auth(&staff)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["status"], "delivered");
    let delivered_at = updated["delivered_at"].clone();
    assert!(delivered_at.is_string());

    let resp = ctx
        .put(&path)
        .bearer_auth(&staff)
        .json(&json!({ "status": "Отменен" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["status"], "canceled");
    assert_eq!(updated["delivered_at"], delivered_at);

    let resp = ctx
        .put(&path)
        .bearer_auth(&staff)
        .json(&json!({ "status": "lost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pay_allowed_to_customer_and_staff_only() {
    let ctx = TestContext::new().await;
    let (_, owner) = ctx.signed_in("reader", false).await;
    let (_, stranger) = ctx.signed_in("stranger", false).await;
    let order = place(&ctx, &owner).await;
    let path = format!("/pay/{}/", order["id"]);

    let resp = ctx.put(&path).bearer_auth(&stranger).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = ctx.put(&path).bearer_auth(&owner).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let paid: Value = resp.json().await.unwrap();
    assert_eq!(paid["is_paid"], true);
    assert!(paid["paid_at"].is_string());
}

#[tokio::test]
async fn test_orders_scoped_to_customer() {
    let ctx = TestContext::new().await;
    let (_, alice) = ctx.signed_in("alice", false).await;
    let (_, bob) = ctx.signed_in("bob", false).await;
    let (_, staff) = ctx.signed_in("manager", true).await;
    let alices = place(&ctx, &alice).await;
    place(&ctx, &bob).await;

    let orders: Vec<Value> = ctx
        .get("/orders/")
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], alices["id"]);

    let orders: Vec<Value> = ctx
        .get("/orders/?ordering=total_cost")
        .bearer_auth(&staff)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(orders.len(), 2);

    let resp = ctx
        .get(&format!("/orders/{}/", alices["id"]))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = ctx.get("/orders/").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
