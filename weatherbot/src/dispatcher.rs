use anyhow::Result;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use weatherbot_core::{BotConfig, Endpoint, FetchError, WeatherClient, format_report};

use crate::telegram::{Message, TelegramClient};

/// Pause before polling again after a failed `getUpdates`.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

const FETCH_FAILED_REPLY: &str = "❌ Could not retrieve weather data. Please try again later.";
const REPORT_FAILED_REPLY: &str = "⚠️ Could not process the weather data from the provider.";

/// The chat commands the bot reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Weather,
}

impl Command {
    /// Match a message text against the known commands.
    ///
    /// Only the first whitespace-separated token counts, and a `@botname`
    /// suffix (group chats) is stripped before matching. Anything that is
    /// not a known command yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        let command = first.strip_prefix('/')?;
        let command = command.split_once('@').map_or(command, |(name, _)| name);

        match command {
            "start" | "help" => Some(Command::Help),
            "weather" => Some(Command::Weather),
            _ => None,
        }
    }
}

/// Poll for updates and answer commands until the process is stopped.
///
/// A failed poll is logged and retried after a short pause; everything else
/// is handled per update, so one bad message never stops the loop.
pub async fn run(bot: &TelegramClient, weather: &WeatherClient, config: &BotConfig) -> Result<()> {
    info!(city = %config.query.city, "bot is polling for commands");

    let mut offset = 0;

    loop {
        let updates = match bot.get_updates(offset).await {
            Ok(updates) => updates,
            Err(err) => {
                warn!(error = %err, "failed to poll for updates");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else { continue };
            let Some(text) = message.text.as_deref() else { continue };
            let Some(command) = Command::parse(text) else { continue };

            handle_command(bot, weather, config, command, &message).await;
        }
    }
}

async fn handle_command(
    bot: &TelegramClient,
    weather: &WeatherClient,
    config: &BotConfig,
    command: Command,
    message: &Message,
) {
    debug!(?command, chat = message.chat.id, "handling command");

    let reply = match command {
        Command::Help => help_text(&config.query.city),
        Command::Weather => weather_reply(weather, config).await,
    };

    // Quoting fails when the triggering message has been deleted; the
    // answer still has to go out, so fall back to a plain send.
    if let Err(err) = bot.reply(message.chat.id, message.message_id, &reply).await {
        warn!(error = %err, chat = message.chat.id, "reply failed, sending without quote");

        if let Err(err) = bot.send_message(message.chat.id, &reply).await {
            error!(error = %err, chat = message.chat.id, "failed to send reply");
        }
    }
}

/// Fetch current conditions and the forecast, then format the report.
///
/// Every failure recovers into a canned reply, and the two failure kinds
/// stay distinguishable for the user.
async fn weather_reply(weather: &WeatherClient, config: &BotConfig) -> String {
    let current = match weather.fetch(Endpoint::Current, &config.query).await {
        Ok(raw) => raw,
        Err(err) => return fetch_failed(Endpoint::Current, &err),
    };

    let forecast = match weather.fetch(Endpoint::Forecast, &config.query).await {
        Ok(raw) => raw,
        Err(err) => return fetch_failed(Endpoint::Forecast, &err),
    };

    match format_report(&current, &forecast, &config.query, &config.report) {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "provider response did not fit the report");
            REPORT_FAILED_REPLY.to_string()
        }
    }
}

fn fetch_failed(endpoint: Endpoint, err: &FetchError) -> String {
    error!(%endpoint, error = %err, "weather fetch failed");
    FETCH_FAILED_REPLY.to_string()
}

fn help_text(city: &str) -> String {
    format!(
        "🌤️ I am the weather bot for {city}\n\nSend /weather to get the current conditions and forecast"
    )
}
