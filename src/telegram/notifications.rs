use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;

use crate::core::config;
use crate::core::error::AppResult;
use crate::storage::db::{self, DbPool};

/// Канал доставки уведомлений покупателю.
///
/// Отдельный трейт, чтобы webhook-процессор и диспетчер outbox не зависели
/// от Telegram напрямую: тесты подставляют запись вызовов вместо сети.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Отправляет покупателю подтверждение оплаты заказа.
    async fn send_payment_confirmed(
        &self,
        tg_id: i64,
        order_id: i64,
        product_name: &str,
    ) -> AppResult<()>;
}

/// Текст уведомления об автоматическом подтверждении оплаты.
pub fn payment_confirmed_text(order_id: i64, product_name: &str) -> String {
    format!(
        "Payment confirmed automatically 🎉\nOrder #{} — {}.",
        order_id, product_name
    )
}

/// `Notifier` поверх Telegram Bot API.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_payment_confirmed(
        &self,
        tg_id: i64,
        order_id: i64,
        product_name: &str,
    ) -> AppResult<()> {
        self.bot
            .send_message(ChatId(tg_id), payment_confirmed_text(order_id, product_name))
            .await?;
        Ok(())
    }
}

/// Прогоняет outbox: отправляет все ожидающие уведомления.
///
/// Вызывается сразу после успешного перехода заказа в `paid` и периодически
/// из main — так сбой отправки не теряет уведомление, а лишь откладывает его
/// до следующего прохода. Ошибки отдельных записей логируются и учитываются
/// в retry_count, не прерывая проход.
///
/// # Returns
///
/// Количество успешно отправленных уведомлений.
pub async fn dispatch_pending(pool: &DbPool, notifier: &dyn Notifier) -> AppResult<usize> {
    let conn = db::get_connection(pool)?;
    let pending = db::get_pending_notifications(&conn, config::notify::MAX_ATTEMPTS)?;

    let mut sent = 0usize;
    for entry in pending {
        let recipient = match db::get_order_recipient(&conn, entry.order_id)? {
            Some(r) => r,
            None => {
                // Order row vanished or user/product is missing; counts as
                // a failed attempt so the entry eventually stops being picked up.
                log::warn!(
                    "No recipient for order {}, skipping notification",
                    entry.order_id
                );
                db::mark_notification_failed(&conn, entry.order_id, "recipient not found")?;
                continue;
            }
        };

        match notifier
            .send_payment_confirmed(recipient.tg_id, entry.order_id, &recipient.product_name)
            .await
        {
            Ok(()) => {
                db::mark_notification_sent(&conn, entry.order_id)?;
                log::info!(
                    "Payment notification sent: order {} -> tg {}",
                    entry.order_id,
                    recipient.tg_id
                );
                sent += 1;
            }
            Err(e) => {
                log::error!(
                    "Failed to send notification for order {} (attempt {}): {}",
                    entry.order_id,
                    entry.retry_count + 1,
                    e
                );
                db::mark_notification_failed(&conn, entry.order_id, &e.to_string())?;
            }
        }
    }

    Ok(sent)
}

/// Запускает фоновый цикл повторной доставки уведомлений.
pub fn spawn_retry_loop(pool: Arc<DbPool>, notifier: Arc<dyn Notifier>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config::notify::retry_interval());
        // First tick fires immediately; skip it, the handler already tried once.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match dispatch_pending(&pool, notifier.as_ref()).await {
                Ok(0) => {}
                Ok(sent) => log::info!("Retry sweep delivered {} pending notification(s)", sent),
                Err(e) => log::error!("Notification retry sweep failed: {}", e),
            }
        }
    });
}
