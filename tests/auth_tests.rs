//! Unit tests for the webhook secret extractor

use axum::extract::FromRequestParts;
use axum::http::{HeaderValue, Request};
use tokio_recruit_bot::api::WebhookSecret;

async fn extract(req: Request<()>) -> WebhookSecret {
    let (mut parts, _) = req.into_parts();
    WebhookSecret::from_request_parts(&mut parts, &())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_secret_present() {
    let req = Request::builder()
        .header("X-Telegram-Bot-Api-Secret-Token", "s3cret")
        .body(())
        .unwrap();

    let secret = extract(req).await;

    assert_eq!(secret.0.as_deref(), Some(&b"s3cret"[..]));
    assert!(secret.matches("s3cret"));
    assert!(!secret.matches("s3cre"));
    assert!(!secret.matches("s3cret!"));
}

#[tokio::test]
async fn test_secret_missing_never_matches() {
    let req = Request::builder().body(()).unwrap();

    let secret = extract(req).await;

    assert_eq!(secret.0, None);
    assert!(!secret.matches("s3cret"));
    assert!(!secret.matches(""));
}

#[tokio::test]
async fn test_secret_invalid_utf8_is_a_mismatch() {
    let mut req = Request::builder().body(()).unwrap();
    req.headers_mut().insert(
        "X-Telegram-Bot-Api-Secret-Token",
        HeaderValue::from_bytes(&[0xFF, 0xFE]).unwrap(),
    );

    let secret = extract(req).await;

    assert_eq!(secret.0.as_deref(), Some(&[0xFF, 0xFE][..]));
    assert!(!secret.matches("s3cret"));
}
