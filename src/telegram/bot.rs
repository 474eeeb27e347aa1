//! Bot instance creation
//!
//! The bot is only used to push payment confirmations; it never polls for
//! updates. The underlying HTTP client carries a bounded timeout so one
//! slow Telegram call cannot stall the callback handler.

use reqwest::ClientBuilder;
use teloxide::prelude::*;

use crate::core::config;

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token or invalid BOT_API_URL
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::BOT_TOKEN.clone();
    if token.is_empty() {
        return Err(anyhow::anyhow!(
            "BOT_TOKEN (or TELOXIDE_TOKEN) environment variable not set"
        ));
    }

    let client = ClientBuilder::new()
        .timeout(config::notify::send_timeout())
        .build()?;

    // Check if local Bot API server is configured
    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = url::Url::parse(&bot_api_url)
            .map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        Bot::with_client(token, client).set_api_url(url)
    } else {
        Bot::with_client(token, client)
    };

    Ok(bot)
}
