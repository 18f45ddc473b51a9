#![allow(clippy::unwrap_used)]

//! Cover uploads and media serving.

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use bookshop_integration_tests::TestContext;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn form(book_id: &str, file_name: &str, data: &'static [u8]) -> Form {
    Form::new()
        .text("book_id", book_id.to_owned())
        .part("image", Part::bytes(data).file_name(file_name.to_owned()))
}

#[tokio::test]
async fn test_staff_uploads_cover() {
    let ctx = TestContext::new().await;
    let book = ctx.create_book("Пикник на обочине", "450.00", 5).await;
    let (_, staff) = ctx.signed_in("manager", true).await;

    let resp = ctx
        .post("/upload_image/")
        .bearer_auth(&staff)
        .multipart(form(&book.id.to_string(), "cover.png", PNG))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    let image = updated["image"].as_str().unwrap().to_owned();
    assert!(image.starts_with("books/"));

    let resp = ctx.get(&format!("/media/{image}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), PNG);
}

#[tokio::test]
async fn test_upload_rejections() {
    let ctx = TestContext::new().await;
    let book = ctx.create_book("Пикник на обочине", "450.00", 5).await;
    let (_, customer) = ctx.signed_in("reader", false).await;
    let (_, staff) = ctx.signed_in("manager", true).await;

    let resp = ctx
        .post("/upload_image/")
        .bearer_auth(&customer)
        .multipart(form(&book.id.to_string(), "cover.png", PNG))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = ctx
        .post("/upload_image/")
        .bearer_auth(&staff)
        .multipart(form(&book.id.to_string(), "cover.png", b"plain text"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx
        .post("/upload_image/")
        .bearer_auth(&staff)
        .multipart(form("999", "cover.png", PNG))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
