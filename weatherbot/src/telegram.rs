use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// How long the server may hold an idle `getUpdates` call.
const POLL_TIMEOUT_SECS: u64 = 25;

/// Must stay above `POLL_TIMEOUT_SECS` so idle polls return empty instead
/// of timing out client-side.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(35);

/// Why a Bot API call produced no usable response.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("request to Telegram failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Telegram answered, but with `ok: false`.
    #[error("Telegram API error {code}: {description}")]
    Api { code: i32, description: String },

    #[error("could not decode Telegram response: {0}")]
    Decode(String),
}

/// Incoming update from `getUpdates`. Only message updates matter here;
/// everything else decodes with `message: None` and is skipped upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Every Bot API response wraps its payload in this envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i32>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_parameters: Option<ReplyParameters>,
}

#[derive(Debug, Serialize)]
struct ReplyParameters {
    message_id: i64,
}

/// Thin client for the Telegram Bot API.
///
/// Covers the two methods the bot needs, `getUpdates` and `sendMessage`.
/// Holds no mutable state.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> anyhow::Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    /// Client with a custom API root, used by tests to target a local mock.
    pub fn with_base_url(base_url: impl Into<String>, token: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for the Telegram Bot API")?;

        Ok(Self { http, base_url: base_url.into(), token: token.to_string() })
    }

    /// Long-poll for updates past `offset`. Returns an empty vec when the
    /// poll window expires without traffic.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        self.call("getUpdates", &GetUpdatesRequest { offset, timeout: POLL_TIMEOUT_SECS }).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message, TelegramError> {
        self.call("sendMessage", &SendMessageRequest { chat_id, text, reply_parameters: None })
            .await
    }

    /// Send `text` quoting the message it answers.
    pub async fn reply(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<Message, TelegramError> {
        self.call(
            "sendMessage",
            &SendMessageRequest {
                chat_id,
                text,
                reply_parameters: Some(ReplyParameters { message_id }),
            },
        )
        .await
    }

    async fn call<R, T>(&self, method: &str, payload: &R) -> Result<T, TelegramError>
    where
        R: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);

        debug!(method, "calling Bot API");

        let res = self.http.post(&url).json(payload).send().await?;
        let body = res.text().await?;

        // Error responses still carry the envelope, so decode before
        // looking at anything else.
        let envelope: ApiEnvelope<T> =
            serde_json::from_str(&body).map_err(|e| TelegramError::Decode(e.to_string()))?;

        if !envelope.ok {
            return Err(TelegramError::Api {
                code: envelope.error_code.unwrap_or_default(),
                description: envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::Decode("envelope carries no result".to_string()))
    }
}
