use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::core::error::AppResult;
use crate::storage::db::{self, DbPool};
use crate::telegram::notifications::{self, Notifier};
use crate::webhook::auth;
use crate::webhook::payload::{classify_callback, CallbackOutcome};

// ============================================================================
// СОСТОЯНИЕ ПРИЛОЖЕНИЯ
// ============================================================================

/// Shared state для всех endpoints
#[derive(Clone)]
pub struct WebhookState {
    pub db_pool: Arc<DbPool>,
    pub notifier: Arc<dyn Notifier>,
    /// Общий секрет для подписи колбэков; `None` отключает проверку
    pub callback_secret: Option<String>,
}

// ============================================================================
// РОУТЕР
// ============================================================================

/// Создает роутер для приёма колбэков провайдера
pub fn create_webhook_router(
    db_pool: Arc<DbPool>,
    notifier: Arc<dyn Notifier>,
    callback_secret: Option<String>,
) -> Router {
    let state = WebhookState {
        db_pool,
        notifier,
        callback_secret,
    };

    Router::new()
        .route("/payment/callback", post(handle_payment_callback))
        .route("/health", get(health_check))
        .with_state(Arc::new(state))
}

/// Запускает веб-сервер приёма колбэков
pub async fn run_webhook_server(
    port: u16,
    db_pool: Arc<DbPool>,
    notifier: Arc<dyn Notifier>,
    callback_secret: Option<String>,
) -> anyhow::Result<()> {
    let app = create_webhook_router(db_pool, notifier, callback_secret);

    let addr = format!("0.0.0.0:{}", port);
    log::info!("💳 Payment callback server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutdown signal received, stopping callback server");
        })
        .await?;

    Ok(())
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "metropay"
    }))
}

/// POST /payment/callback - принять статус оплаты от провайдера
///
/// Контракт ответов фиксированный: провайдер смотрит только на код, но
/// тела ("Invalid"/"Ignored"/"OK") сохранены как у исходного эндпоинта.
/// Любой сбой после валидации тела логируется и всё равно отвечается
/// 200 OK — провайдер ретраит не-2xx, а ретраи доставки уведомления
/// берёт на себя outbox.
async fn handle_payment_callback(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if let Some(secret) = &state.callback_secret {
        let signature = headers
            .get(auth::SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if !auth::verify_callback_signature(&body, signature, secret) {
            log::warn!("Rejected callback with missing or invalid signature");
            return (StatusCode::UNAUTHORIZED, "Unauthorized");
        }
    }

    let order_id = match classify_callback(&body) {
        CallbackOutcome::Invalid => {
            log::warn!("Rejected malformed callback body ({} bytes)", body.len());
            return (StatusCode::BAD_REQUEST, "Invalid");
        }
        CallbackOutcome::Ignored => {
            log::info!("Ignoring non-actionable callback");
            return (StatusCode::OK, "Ignored");
        }
        CallbackOutcome::Confirmation { order_id } => order_id,
    };

    if let Err(e) = process_confirmation(&state, order_id).await {
        // The provider still gets its acknowledgement; the pending outbox
        // entry (if any) will be retried by the dispatcher.
        log::error!("Failed to process confirmation for order {}: {}", order_id, e);
    }

    (StatusCode::OK, "OK")
}

/// Обрабатывает подтверждение оплаты заказа.
///
/// Условный UPDATE выполняется всегда; постановка уведомления в outbox и
/// немедленная попытка отправки — только если UPDATE реально затронул
/// строку. Повтор того же колбэка после перехода не шлёт ничего.
async fn process_confirmation(state: &WebhookState, order_id: i64) -> AppResult<()> {
    let conn = db::get_connection(&state.db_pool)?;

    let affected = db::mark_order_paid(&conn, order_id)?;
    if affected == 0 {
        log::info!(
            "Order {} is not awaiting payment (unknown or already paid), nothing to do",
            order_id
        );
        return Ok(());
    }

    log::info!("Order {} transitioned to paid", order_id);
    db::enqueue_notification(&conn, order_id)?;
    drop(conn);

    notifications::dispatch_pending(&state.db_pool, state.notifier.as_ref()).await?;
    Ok(())
}
