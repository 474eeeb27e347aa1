//! Telegram bot integration and outbound notifications

pub mod bot;
pub mod notifications;

// Re-exports for convenience
pub use bot::create_bot;
pub use notifications::{dispatch_pending, Notifier, TelegramNotifier};
