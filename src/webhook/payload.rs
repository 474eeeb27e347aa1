//! Parsing and classification of the provider's callback body
//!
//! The provider POSTs a JSON object:
//!
//! ```json
//! { "status": "PAID", "amount": 250, "payload": "42" }
//! ```
//!
//! `status` is the payment state, `amount` is accepted but unused, and
//! `payload` carries the order id the shop put into the payment link —
//! either a JSON number or a numeric string depending on provider version.

use serde::Deserialize;
use serde_json::Value;

/// Сырое тело колбэка провайдера. Все поля опциональны и нетипизированы:
/// провайдер исторически слал и числа, и строки, поэтому приведение типов
/// делается ниже, а не в serde.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCallback {
    pub status: Option<Value>,
    /// Принимается, но не используется (сумма сверяется флоу оформления)
    pub amount: Option<Value>,
    pub payload: Option<Value>,
}

/// Результат классификации тела колбэка.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Тело не JSON-объект или нет ключа `status` → HTTP 400
    Invalid,
    /// Корректный, но не интересующий нас колбэк (не "PAID" или order id 0)
    Ignored,
    /// Подтверждение оплаты конкретного заказа
    Confirmation { order_id: i64 },
}

/// Classify a raw callback body.
///
/// Shape validation is the only hard failure: the body must decode as a
/// JSON object carrying a non-null `status`. Everything else well-formed
/// that is not an actionable confirmation is a deliberate no-op — the
/// provider sends many non-paid status updates.
pub fn classify_callback(raw: &[u8]) -> CallbackOutcome {
    let callback: ProviderCallback = match serde_json::from_slice(raw) {
        Ok(c) => c,
        Err(_) => return CallbackOutcome::Invalid,
    };

    // `null` deserializes to None, so this also rejects an explicit null status
    let status = match callback.status {
        Some(s) => s,
        None => return CallbackOutcome::Invalid,
    };

    let order_id = coerce_order_id(callback.payload.as_ref());

    if status.as_str() != Some("PAID") || order_id == 0 {
        return CallbackOutcome::Ignored;
    }

    CallbackOutcome::Confirmation { order_id }
}

/// Coerce the `payload` field to an order id.
///
/// Numbers truncate toward zero, numeric strings parse; anything else
/// (absent, null, arrays, garbage text) coerces to 0, which the caller
/// treats as "ignore".
fn coerce_order_id(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
