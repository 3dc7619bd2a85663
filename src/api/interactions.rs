// Chat interaction webhook: ping, slash commands and autocomplete.
//
// Commands with results are acknowledged immediately with a deferred reply;
// the rendered text follows as one or more follow-up messages.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::discord::{deliver_chunked, EPHEMERAL};
use super::{json_error, AppState};
use crate::language::Language;

pub const PING: u8 = 1;
pub const APPLICATION_COMMAND: u8 = 2;
pub const AUTOCOMPLETE: u8 = 4;

const RESPONSE_PONG: u8 = 1;
const RESPONSE_MESSAGE: u8 = 4;
const RESPONSE_DEFERRED: u8 = 5;
const RESPONSE_AUTOCOMPLETE: u8 = 8;

const POKEMON_OPTION: &str = "pokemon";
const ALL_OPTION: &str = "all";

#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub data: Option<CommandData>,
}

#[derive(Debug, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub focused: bool,
}

impl CommandData {
    fn option(&self, name: &str) -> Option<&Value> {
        self.options
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_ref())
    }

    fn focused_text(&self) -> &str {
        self.options
            .iter()
            .find(|o| o.focused)
            .and_then(|o| o.value.as_ref())
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

fn message(content: String) -> Value {
    json!({
        "type": RESPONSE_MESSAGE,
        "data": { "content": content, "flags": EPHEMERAL },
    })
}

pub async fn handle_interaction(
    State(state): State<AppState>,
    Json(interaction): Json<Interaction>,
) -> impl IntoResponse {
    match interaction.kind {
        PING => Json(json!({ "type": RESPONSE_PONG })).into_response(),
        AUTOCOMPLETE => {
            let Some(data) = &interaction.data else {
                return json_error(StatusCode::BAD_REQUEST, "missing interaction data").into_response();
            };
            let language = Language::from_command(&data.name).unwrap_or_default();
            let choices = state.suggestions(data.focused_text(), language);
            Json(json!({
                "type": RESPONSE_AUTOCOMPLETE,
                "data": { "choices": choices },
            }))
            .into_response()
        }
        APPLICATION_COMMAND => handle_command(state, interaction).await.into_response(),
        other => {
            tracing::debug!(kind = other, "Ignoring unsupported interaction");
            json_error(StatusCode::BAD_REQUEST, "unsupported interaction type").into_response()
        }
    }
}

async fn handle_command(state: AppState, interaction: Interaction) -> impl IntoResponse {
    let Some(data) = interaction.data else {
        return json_error(StatusCode::BAD_REQUEST, "missing interaction data").into_response();
    };
    let Some(language) = Language::from_command(&data.name) else {
        return json_error(StatusCode::BAD_REQUEST, "unknown command").into_response();
    };
    let Some(query) = data.option(POKEMON_OPTION).and_then(Value::as_str).map(str::to_string) else {
        return json_error(StatusCode::BAD_REQUEST, "missing pokemon option").into_response();
    };
    let show_all = data
        .option(ALL_OPTION)
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let Some(lookup) = state.lookup(&query, language, show_all) else {
        return Json(message(language.not_found(&query))).into_response();
    };

    let token = interaction.token;
    let discord = state.discord.clone();
    tokio::spawn(async move {
        let delivered = deliver_chunked(&lookup.text, language, |content| {
            let discord = discord.clone();
            let token = token.clone();
            async move { discord.send_followup(&token, &content).await }
        })
        .await;
        match delivered {
            Ok(count) => tracing::debug!(query = %query, messages = count, "Delivered lookup"),
            Err(e) => tracing::error!(query = %query, "Follow-up delivery failed: {e}"),
        }
    });

    Json(json!({
        "type": RESPONSE_DEFERRED,
        "data": { "flags": EPHEMERAL },
    }))
    .into_response()
}
