#![allow(clippy::unwrap_used)]

//! Reviews: one per book and author, author-or-staff writes.

use reqwest::StatusCode;
use serde_json::{Value, json};

use bookshop_integration_tests::TestContext;

#[tokio::test]
async fn test_second_review_of_same_book_rejected() {
    let ctx = TestContext::new().await;
    let book = ctx.create_book("Пикник на обочине", "450.00", 5).await;
    let (_, token) = ctx.signed_in("reader", false).await;

    let body = json!({ "book": book.id, "rating": 5, "comment": "Шедевр" });
    let resp = ctx
        .post("/comment/")
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let comment: Value = resp.json().await.unwrap();
    assert_eq!(comment["author_username"], "reader");

    let resp = ctx
        .post("/comment/")
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_review_input_validation() {
    let ctx = TestContext::new().await;
    let book = ctx.create_book("Пикник на обочине", "450.00", 5).await;
    let (_, token) = ctx.signed_in("reader", false).await;

    let resp = ctx
        .post("/comment/")
        .json(&json!({ "book": book.id, "comment": "anonymous" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = ctx
        .post("/comment/")
        .bearer_auth(&token)
        .json(&json!({ "book": book.id, "rating": 6, "comment": "too much" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx
        .post("/comment/")
        .bearer_auth(&token)
        .json(&json!({ "book": 999, "comment": "missing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_author_or_staff_may_change_review() {
    let ctx = TestContext::new().await;
    let book = ctx.create_book("Пикник на обочине", "450.00", 5).await;
    let (_, author) = ctx.signed_in("author", false).await;
    let (_, other) = ctx.signed_in("other", false).await;
    let (_, staff) = ctx.signed_in("manager", true).await;

    let comment: Value = ctx
        .post("/comment/")
        .bearer_auth(&author)
        .json(&json!({ "book": book.id, "rating": 3, "comment": "Неплохо" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let path = format!("/comment/{}/", comment["id"]);

    let resp = ctx.get(&path).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = ctx.get(&path).bearer_auth(&other).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx
        .patch(&path)
        .bearer_auth(&other)
        .json(&json!({ "rating": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = ctx
        .patch(&path)
        .bearer_auth(&author)
        .json(&json!({ "rating": null, "comment": "Передумал" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert!(updated["rating"].is_null());
    assert_eq!(updated["comment"], "Передумал");

    let resp = ctx.delete(&path).bearer_auth(&other).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = ctx.delete(&path).bearer_auth(&staff).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ctx.get(&path).bearer_auth(&author).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
