//! End-to-end tests for the payment callback endpoint
//!
//! Drives the real axum router with an in-process request and a recording
//! notifier, backed by a throwaway SQLite file.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use metropay::core::AppResult;
use metropay::storage::db::{self, order_status, DbPool};
use metropay::telegram::Notifier;
use metropay::webhook::auth;
use metropay::webhook::create_webhook_router;

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(i64, i64, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_payment_confirmed(
        &self,
        tg_id: i64,
        order_id: i64,
        product_name: &str,
    ) -> AppResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((tg_id, order_id, product_name.to_string()));
        Ok(())
    }
}

struct TestService {
    // Keeps the SQLite file alive for the duration of the test
    _db_file: NamedTempFile,
    pool: Arc<DbPool>,
    notifier: Arc<RecordingNotifier>,
    router: axum::Router,
}

fn test_service(secret: Option<&str>) -> TestService {
    let db_file = NamedTempFile::new().unwrap();
    let pool = Arc::new(db::create_pool(db_file.path().to_str().unwrap()).unwrap());
    let notifier = Arc::new(RecordingNotifier::default());

    let dyn_notifier: Arc<dyn Notifier> = notifier.clone();
    let router = create_webhook_router(Arc::clone(&pool), dyn_notifier, secret.map(|s| s.to_string()));

    TestService {
        _db_file: db_file,
        pool,
        notifier,
        router,
    }
}

fn seed_order(pool: &DbPool, order_id: i64, tg_id: i64, product: &str) {
    let conn = db::get_connection(pool).unwrap();
    db::create_user(&conn, 1, tg_id).unwrap();
    db::create_product(&conn, 1, product).unwrap();
    db::create_order(&conn, order_id, 1, 1).unwrap();
}

fn order_status_of(pool: &DbPool, order_id: i64) -> String {
    let conn = db::get_connection(pool).unwrap();
    db::get_order(&conn, order_id).unwrap().unwrap().status
}

async fn post_callback(svc: &TestService, body: &str) -> (StatusCode, String) {
    post_callback_signed(svc, body, None).await
}

async fn post_callback_signed(
    svc: &TestService,
    body: &str,
    signature: Option<&str>,
) -> (StatusCode, String) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/payment/callback")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        request = request.header(auth::SIGNATURE_HEADER, sig);
    }
    let request = request.body(Body::from(body.to_string())).unwrap();

    let response = svc.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn malformed_body_returns_400_invalid() {
    let svc = test_service(None);

    for body in ["", "not json", "[1,2]", r#"{"amount": 100}"#] {
        let (status, text) = post_callback(&svc, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {:?}", body);
        assert_eq!(text, "Invalid");
    }
}

#[tokio::test]
async fn non_paid_status_is_ignored_without_mutation() {
    let svc = test_service(None);
    seed_order(&svc.pool, 42, 777, "Metro Royale Pass");

    let (status, text) =
        post_callback(&svc, r#"{"status": "PENDING", "amount": 250, "payload": "42"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Ignored");

    assert_eq!(order_status_of(&svc.pool, 42), order_status::AWAITING_SCREENSHOT);
    assert!(svc.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn zero_order_id_is_ignored() {
    let svc = test_service(None);

    let (status, text) = post_callback(&svc, r#"{"status": "PAID", "payload": "0"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Ignored");
}

#[tokio::test]
async fn confirmation_transitions_order_and_notifies_once() {
    let svc = test_service(None);
    seed_order(&svc.pool, 42, 777, "Metro Royale Pass");

    let (status, text) =
        post_callback(&svc, r#"{"status": "PAID", "amount": 250, "payload": "42"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "OK");

    assert_eq!(order_status_of(&svc.pool, 42), order_status::PAID);

    let sent = svc.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (tg_id, order_id, product) = &sent[0];
    assert_eq!(*tg_id, 777);
    assert_eq!(*order_id, 42);
    assert_eq!(product, "Metro Royale Pass");
}

#[tokio::test]
async fn replayed_confirmation_does_not_renotify() {
    let svc = test_service(None);
    seed_order(&svc.pool, 42, 777, "Metro Royale Pass");

    let body = r#"{"status": "PAID", "amount": 250, "payload": "42"}"#;
    let (status, text) = post_callback(&svc, body).await;
    assert_eq!((status, text.as_str()), (StatusCode::OK, "OK"));

    // The provider retries a delivery it already made; the order stays
    // paid and no second notification goes out.
    let (status, text) = post_callback(&svc, body).await;
    assert_eq!((status, text.as_str()), (StatusCode::OK, "OK"));

    assert_eq!(order_status_of(&svc.pool, 42), order_status::PAID);
    assert_eq!(svc.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_order_returns_ok_without_side_effects() {
    let svc = test_service(None);

    let (status, text) = post_callback(&svc, r#"{"status": "PAID", "payload": "9999"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "OK");
    assert!(svc.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn numeric_payload_is_accepted() {
    let svc = test_service(None);
    seed_order(&svc.pool, 7, 123, "UC 660");

    let (status, text) = post_callback(&svc, r#"{"status": "PAID", "payload": 7}"#).await;
    assert_eq!((status, text.as_str()), (StatusCode::OK, "OK"));
    assert_eq!(order_status_of(&svc.pool, 7), order_status::PAID);
}

#[tokio::test]
async fn missing_signature_is_rejected_when_secret_configured() {
    let svc = test_service(Some("topsecret"));
    seed_order(&svc.pool, 42, 777, "Metro Royale Pass");

    let body = r#"{"status": "PAID", "payload": "42"}"#;
    let (status, text) = post_callback(&svc, body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(text, "Unauthorized");

    let (status, text) = post_callback_signed(&svc, body, Some("deadbeef")).await;
    assert_eq!((status, text.as_str()), (StatusCode::UNAUTHORIZED, "Unauthorized"));

    // Nothing was touched
    assert_eq!(order_status_of(&svc.pool, 42), order_status::AWAITING_SCREENSHOT);
    assert!(svc.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn signed_confirmation_is_processed() {
    let svc = test_service(Some("topsecret"));
    seed_order(&svc.pool, 42, 777, "Metro Royale Pass");

    let body = r#"{"status": "PAID", "payload": "42"}"#;
    let sig = auth::sign_callback(body.as_bytes(), "topsecret");
    let (status, text) = post_callback_signed(&svc, body, Some(&sig)).await;

    assert_eq!((status, text.as_str()), (StatusCode::OK, "OK"));
    assert_eq!(order_status_of(&svc.pool, 42), order_status::PAID);
    assert_eq!(svc.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let svc = test_service(None);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = svc.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "metropay");
}
