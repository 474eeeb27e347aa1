use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Result;

/// Статусы заказа, через которые проходит webhook-процессор.
///
/// Заказы создаются внешним флоу оформления со статусом
/// `awaiting_screenshot`; этот модуль переводит их в `paid` ровно один раз.
pub mod order_status {
    pub const AWAITING_SCREENSHOT: &str = "awaiting_screenshot";
    pub const PAID: &str = "paid";
}

/// Структура, представляющая заказ в базе данных.
#[derive(Debug, Clone)]
pub struct Order {
    /// ID заказа
    pub id: i64,
    /// Текущий статус ("awaiting_screenshot", "paid")
    pub status: String,
    /// ID покупателя (users.id)
    pub user_id: i64,
    /// ID товара (products.id)
    pub product_id: i64,
}

/// Данные получателя уведомления: результат join'а заказ→пользователь→товар.
#[derive(Debug, Clone)]
pub struct OrderRecipient {
    /// Telegram chat ID покупателя
    pub tg_id: i64,
    /// Название товара для текста уведомления
    pub product_name: String,
}

/// Запись в outbox уведомлений об оплате.
///
/// PRIMARY KEY по order_id гарантирует не больше одного уведомления
/// на переход заказа в `paid`.
#[derive(Debug, Clone)]
pub struct PendingNotification {
    pub order_id: i64,
    pub status: String,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub created_at: String,
}

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and ensures the
/// schema exists.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Returns
///
/// Returns a `DbPool` on success or an `r2d2::Error` if pool creation fails.
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    // Ensure schema is up to date on first connection
    let conn = pool.get()?;
    if let Err(e) = migrate_schema(&conn) {
        log::warn!("Failed to migrate schema: {}", e);
        // Don't fail on migration errors, as they might be expected
    }

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is automatically returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Ensure all required tables exist
///
/// The orders/users/products tables are owned by the shop's ordering flow;
/// creating them here only matters for fresh databases and tests. The
/// payment_notifications outbox is owned by this service.
fn migrate_schema(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            tg_id INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'awaiting_screenshot',
            user_id INTEGER NOT NULL,
            product_id INTEGER NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS payment_notifications (
            order_id INTEGER PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

/// Переводит заказ в статус `paid`, если он ждёт подтверждения оплаты.
///
/// Условный UPDATE — единственный механизм защиты от гонок: из нескольких
/// одновременных одинаковых колбэков только один увидит
/// `awaiting_screenshot` и выполнит переход, остальные станут no-op.
///
/// # Arguments
///
/// * `conn` - Соединение с базой данных
/// * `order_id` - ID заказа из payload колбэка
///
/// # Returns
///
/// Количество затронутых строк: 1 если переход произошёл, 0 если заказ
/// не найден или уже оплачен. Ноль строк — не ошибка.
pub fn mark_order_paid(conn: &DbConnection, order_id: i64) -> Result<usize> {
    let affected = conn.execute(
        "UPDATE orders SET status = ?1 WHERE id = ?2 AND status = ?3",
        &[
            &order_status::PAID as &dyn rusqlite::ToSql,
            &order_id as &dyn rusqlite::ToSql,
            &order_status::AWAITING_SCREENSHOT as &dyn rusqlite::ToSql,
        ],
    )?;
    Ok(affected)
}

/// Получает данные для уведомления: Telegram ID покупателя и название товара.
///
/// # Returns
///
/// `Ok(Some(OrderRecipient))` если заказ и связанные строки существуют,
/// `Ok(None)` если join не дал результата (неизвестный заказ либо
/// отсутствующий пользователь/товар).
pub fn get_order_recipient(conn: &DbConnection, order_id: i64) -> Result<Option<OrderRecipient>> {
    let mut stmt = conn.prepare(
        "SELECT u.tg_id, p.name FROM orders o
         JOIN users u ON o.user_id = u.id
         JOIN products p ON o.product_id = p.id
         WHERE o.id = ?",
    )?;
    let mut rows = stmt.query(&[&order_id as &dyn rusqlite::ToSql])?;

    if let Some(row) = rows.next()? {
        Ok(Some(OrderRecipient {
            tg_id: row.get(0)?,
            product_name: row.get(1)?,
        }))
    } else {
        Ok(None)
    }
}

/// Получает заказ по ID.
pub fn get_order(conn: &DbConnection, order_id: i64) -> Result<Option<Order>> {
    let mut stmt =
        conn.prepare("SELECT id, status, user_id, product_id FROM orders WHERE id = ?")?;
    let mut rows = stmt.query(&[&order_id as &dyn rusqlite::ToSql])?;

    if let Some(row) = rows.next()? {
        Ok(Some(Order {
            id: row.get(0)?,
            status: row.get(1)?,
            user_id: row.get(2)?,
            product_id: row.get(3)?,
        }))
    } else {
        Ok(None)
    }
}

/// Создает пользователя (используется флоу оформления и тестами).
pub fn create_user(conn: &DbConnection, id: i64, tg_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, tg_id) VALUES (?1, ?2)",
        &[&id as &dyn rusqlite::ToSql, &tg_id as &dyn rusqlite::ToSql],
    )?;
    Ok(())
}

/// Создает товар (используется флоу оформления и тестами).
pub fn create_product(conn: &DbConnection, id: i64, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO products (id, name) VALUES (?1, ?2)",
        &[&id as &dyn rusqlite::ToSql, &name as &dyn rusqlite::ToSql],
    )?;
    Ok(())
}

/// Создает заказ в статусе `awaiting_screenshot`.
pub fn create_order(conn: &DbConnection, id: i64, user_id: i64, product_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO orders (id, status, user_id, product_id) VALUES (?1, ?2, ?3, ?4)",
        &[
            &id as &dyn rusqlite::ToSql,
            &order_status::AWAITING_SCREENSHOT as &dyn rusqlite::ToSql,
            &user_id as &dyn rusqlite::ToSql,
            &product_id as &dyn rusqlite::ToSql,
        ],
    )?;
    Ok(())
}

/// Ставит уведомление об оплате в outbox.
///
/// INSERT OR IGNORE по order_id: повторная постановка для того же заказа —
/// no-op, что и даёт "не больше одного уведомления на переход".
pub fn enqueue_notification(conn: &DbConnection, order_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO payment_notifications (order_id, status) VALUES (?1, 'pending')",
        &[&order_id as &dyn rusqlite::ToSql],
    )?;
    Ok(())
}

/// Получает ожидающие отправки уведомления с запасом попыток.
pub fn get_pending_notifications(
    conn: &DbConnection,
    max_retries: i32,
) -> Result<Vec<PendingNotification>> {
    let mut stmt = conn.prepare(
        "SELECT order_id, status, retry_count, error_message, created_at
         FROM payment_notifications
         WHERE status = 'pending' AND retry_count < ?1
         ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(&[&max_retries as &dyn rusqlite::ToSql], |row| {
        Ok(PendingNotification {
            order_id: row.get(0)?,
            status: row.get(1)?,
            retry_count: row.get(2)?,
            error_message: row.get(3)?,
            created_at: row.get(4)?,
        })
    })?;

    let mut pending = Vec::new();
    for row in rows {
        pending.push(row?);
    }
    Ok(pending)
}

/// Помечает уведомление как отправленное.
pub fn mark_notification_sent(conn: &DbConnection, order_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE payment_notifications
         SET status = 'sent', error_message = NULL, updated_at = CURRENT_TIMESTAMP
         WHERE order_id = ?1",
        &[&order_id as &dyn rusqlite::ToSql],
    )?;
    Ok(())
}

/// Увеличивает счетчик попыток после неудачной отправки.
///
/// Запись остаётся в статусе `pending` до исчерпания попыток, после чего
/// диспетчер перестаёт её выбирать.
pub fn mark_notification_failed(
    conn: &DbConnection,
    order_id: i64,
    error_message: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE payment_notifications
         SET retry_count = retry_count + 1,
             error_message = ?1,
             updated_at = CURRENT_TIMESTAMP
         WHERE order_id = ?2",
        &[
            &error_message as &dyn rusqlite::ToSql,
            &order_id as &dyn rusqlite::ToSql,
        ],
    )?;
    Ok(())
}
