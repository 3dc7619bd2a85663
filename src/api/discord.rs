// Outbound calls to the chat platform: follow-up messages and guild
// command registration.

use std::collections::VecDeque;
use std::future::Future;

use serde_json::{json, Value};
use thiserror::Error;

use crate::language::Language;
use crate::metrics;
use crate::render::{body_budget, chunk_bodies, MESSAGE_LIMIT};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Smallest message bound used when re-chunking rejected follow-ups.
pub const MIN_MESSAGE_LIMIT: usize = 500;
/// Maximum number of times the bound is lowered for one answer.
pub const MAX_RECHUNKS: u32 = 4;

/// Ephemeral message flag.
pub const EPHEMERAL: u64 = 1 << 6;

const OPTION_STRING: u8 = 3;
const OPTION_BOOLEAN: u8 = 5;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("message rejected as too long (HTTP {0})")]
    Oversized(u16),
    #[error("chat API answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("chat API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    application_id: Option<String>,
    token: Option<String>,
    guild_id: u64,
}

impl DiscordClient {
    pub fn new(
        api_base: &str,
        application_id: Option<String>,
        token: Option<String>,
        guild_id: u64,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            application_id,
            token,
            guild_id,
        }
    }

    fn application_id(&self) -> Result<&str, DeliveryError> {
        self.application_id
            .as_deref()
            .ok_or(DeliveryError::NotConfigured("DISCORD_APPLICATION_ID"))
    }

    /// Whether startup command registration can run.
    pub fn can_register(&self) -> bool {
        self.application_id.is_some() && self.token.is_some()
    }

    /// Post one ephemeral follow-up to the interaction identified by
    /// `interaction_token`.
    pub async fn send_followup(&self, interaction_token: &str, content: &str) -> Result<(), DeliveryError> {
        let url = format!(
            "{}/webhooks/{}/{}",
            self.api_base,
            self.application_id()?,
            interaction_token
        );
        let response = self
            .http
            .post(&url)
            .json(&json!({ "content": content, "flags": EPHEMERAL }))
            .send()
            .await?;
        check_status(response).await
    }

    /// Overwrite the guild's commands with [`command_definitions`].
    pub async fn register_commands(&self) -> Result<usize, DeliveryError> {
        let token = self
            .token
            .as_deref()
            .ok_or(DeliveryError::NotConfigured("DISCORD_BOT_TOKEN"))?;
        let url = format!(
            "{}/applications/{}/guilds/{}/commands",
            self.api_base,
            self.application_id()?,
            self.guild_id
        );
        let commands = command_definitions();
        let count = commands.as_array().map_or(0, Vec::len);
        let response = self
            .http
            .put(&url)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {token}"))
            .json(&commands)
            .send()
            .await?;
        check_status(response).await?;
        Ok(count)
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), DeliveryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let code = status.as_u16();
    if code == 400 || code == 413 {
        return Err(DeliveryError::Oversized(code));
    }
    let body = response.text().await.unwrap_or_default();
    Err(DeliveryError::Status { status: code, body })
}

/// One slash command per language.
pub fn command_definitions() -> Value {
    let commands: Vec<Value> = Language::ALL
        .iter()
        .map(|language| {
            json!({
                "name": language.command_name(),
                "description": language.command_description(),
                "options": [
                    {
                        "type": OPTION_STRING,
                        "name": "pokemon",
                        "description": "Pokémon",
                        "required": true,
                        "autocomplete": true,
                    },
                    {
                        "type": OPTION_BOOLEAN,
                        "name": "all",
                        "description": match language {
                            Language::Fr => "Afficher aussi les champs vides",
                            Language::En => "Also show empty fields",
                        },
                        "required": false,
                    },
                ],
            })
        })
        .collect();
    Value::Array(commands)
}

/// Deliver `text` as a sequence of messages through `send`. Messages after
/// the first carry the language's continuation prefix. A message rejected
/// as oversized triggers a re-chunk of it and everything after it at 3/4
/// of the current bound (never below [`MIN_MESSAGE_LIMIT`], at most
/// [`MAX_RECHUNKS`] times).
/// Returns the number of messages delivered.
pub async fn deliver_chunked<F, Fut>(
    text: &str,
    language: Language,
    mut send: F,
) -> Result<usize, DeliveryError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), DeliveryError>>,
{
    let prefix = language.continuation_prefix();
    let mut limit = MESSAGE_LIMIT;
    let mut rechunks = 0;
    let mut pending: VecDeque<String> = chunk_bodies(text, body_budget(limit, prefix)).into();
    let mut sent = 0;

    while let Some(body) = pending.pop_front() {
        let message = if sent == 0 {
            body.clone()
        } else {
            format!("{prefix}{body}")
        };
        match send(message).await {
            Ok(()) => {
                sent += 1;
                metrics::FOLLOWUP_MESSAGES_TOTAL.inc();
            }
            Err(DeliveryError::Oversized(status)) if rechunks < MAX_RECHUNKS && limit > MIN_MESSAGE_LIMIT => {
                limit = (limit * 3 / 4).max(MIN_MESSAGE_LIMIT);
                rechunks += 1;
                metrics::FOLLOWUP_RECHUNKS_TOTAL.inc();
                tracing::warn!(status, limit, "Follow-up rejected, re-chunking");
                let budget = body_budget(limit, prefix);
                let rest: Vec<String> = std::iter::once(body).chain(pending.drain(..)).collect();
                pending = rest.iter().flat_map(|b| chunk_bodies(b, budget)).collect();
            }
            Err(e) => return Err(e),
        }
    }
    Ok(sent)
}
