use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the provider's callback signature
pub const SIGNATURE_HEADER: &str = "X-Callback-Signature";

/// Валидация подписи колбэка платёжного провайдера
///
/// Провайдер подписывает сырое тело запроса HMAC-SHA256 с общим секретом
/// и передаёт hex-подпись в заголовке `X-Callback-Signature`.
///
/// # Аргументы
/// * `body` - Сырое тело запроса (до любого парсинга)
/// * `signature` - Значение заголовка с подписью
/// * `secret` - Общий секрет из конфигурации
///
/// # Возвращает
/// `true` если подпись совпала
pub fn verify_callback_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    expected.eq_ignore_ascii_case(signature.trim())
}

/// Compute the hex signature for a body; used by tests and by the shop's
/// own tooling when replaying callbacks manually.
pub fn sign_callback(body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
