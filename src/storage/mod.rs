//! Database access for orders, users, products, and the notification outbox

pub mod db;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
