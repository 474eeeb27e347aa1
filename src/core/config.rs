use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the service

/// Path to the shop SQLite database
/// Read from DATABASE_PATH environment variable
/// Defaults to "metro_shop.db" (the file the ordering flow writes to)
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "metro_shop.db".to_string()));

/// Path to the log file
/// Read from LOG_FILE_PATH environment variable
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "metropay.log".to_string()));

/// Telegram bot token used for buyer notifications
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Port the callback server listens on
/// Read from WEBHOOK_PORT environment variable
pub static WEBHOOK_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("WEBHOOK_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
});

/// Shared secret for provider callback signatures
/// Read from WEBHOOK_SECRET environment variable
/// When unset, callbacks are accepted without a signature check
pub static WEBHOOK_SECRET: Lazy<Option<String>> = Lazy::new(|| {
    env::var("WEBHOOK_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
});

/// Notification delivery configuration
pub mod notify {
    use super::Duration;

    /// Timeout for a single Telegram send (in seconds)
    /// One slow send must not stall the callback handler
    pub const SEND_TIMEOUT_SECS: u64 = 5;

    /// Telegram send timeout duration
    pub fn send_timeout() -> Duration {
        Duration::from_secs(SEND_TIMEOUT_SECS)
    }

    /// Maximum delivery attempts for a pending notification before giving up
    pub const MAX_ATTEMPTS: i32 = 5;

    /// Interval between dispatcher sweeps over pending notifications (in seconds)
    pub const RETRY_INTERVAL_SECS: u64 = 60;

    /// Dispatcher sweep interval duration
    pub fn retry_interval() -> Duration {
        Duration::from_secs(RETRY_INTERVAL_SECS)
    }
}
