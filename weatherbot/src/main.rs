//! Binary crate for the Telegram weather bot.
//!
//! This crate focuses on:
//! - Long-polling the Telegram Bot API for commands
//! - Dispatching `/start`, `/help` and `/weather`
//! - Process startup: `.env` loading, logging, configuration

use tracing_subscriber::EnvFilter;
use weatherbot_core::{BotConfig, WeatherClient};

mod dispatcher;
mod telegram;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::from_env()?;
    let weather = WeatherClient::new()?;
    let bot = telegram::TelegramClient::new(&config.telegram_token)?;

    dispatcher::run(&bot, &weather, &config).await
}
