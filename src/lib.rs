//! Metropay - payment-status webhook processor for the Metro Shop bot
//!
//! This library receives payment-provider callbacks, flips the matching
//! order from `awaiting_screenshot` to `paid` with a single conditional
//! update, and notifies the buyer over Telegram.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, and logging
//! - `storage`: SQLite pool and order/notification queries
//! - `webhook`: Callback parsing, signature check, and the axum server
//! - `telegram`: Bot creation and outbound notifications

pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;
pub mod webhook;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
pub use telegram::{Notifier, TelegramNotifier};
pub use webhook::{create_webhook_router, run_webhook_server, WebhookState};
