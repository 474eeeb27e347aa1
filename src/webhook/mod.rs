//! Payment-provider callback handling: parsing, signature check, HTTP server

pub mod auth;
pub mod payload;
pub mod server;

// Re-exports for convenience
pub use payload::{classify_callback, CallbackOutcome};
pub use server::{create_webhook_router, run_webhook_server, WebhookState};
