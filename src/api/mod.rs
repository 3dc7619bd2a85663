// HTTP API routes: spawn lookups, autocomplete, chat interactions, status.

pub mod discord;
pub mod interactions;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Json, Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::Database;
use crate::extract::SpawnRow;
use crate::language::Language;
use crate::lookup::{SpawnIndex, Suggestion};
use crate::metrics;
use crate::queue::WarmupQueue;
use crate::render::{self, MESSAGE_LIMIT};
use crate::translation::TranslationStore;

use discord::DiscordClient;

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub index: Arc<SpawnIndex>,
    pub translations: Arc<TranslationStore>,
    pub warmup: WarmupQueue,
    pub discord: Arc<DiscordClient>,
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

fn internal_error(e: sqlx::Error) -> impl IntoResponse {
    tracing::error!("Database error: {e}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/interactions", post(interactions::handle_interaction))
        .route("/api/spawns/{name}", get(get_spawns))
        .route("/api/autocomplete", get(autocomplete))
        .route("/api/status", get(status))
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

async fn track_requests(req: Request, next: Next) -> impl IntoResponse {
    let method = req.method().to_string();
    let endpoint = metrics::normalize_path(req.uri().path());
    let started = Instant::now();
    let response = next.run(req).await;
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), endpoint.as_str(), response.status().as_str()])
        .inc();
    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint.as_str()])
        .observe(started.elapsed().as_secs_f64());
    response
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "spawn-index" }))
}

async fn metrics_handler() -> impl IntoResponse {
    metrics::gather_metrics()
}

// ── Lookup ────────────────────────────────────────────────────────────

/// Result of resolving a user query against the index.
pub struct Lookup {
    pub rows: Vec<SpawnRow>,
    pub text: String,
}

impl AppState {
    /// Rows for `query`, by identifier or by translated name. Identifiers
    /// without a cached translation are queued for warm-up; the answer uses
    /// the raw identifier meanwhile.
    pub fn lookup(&self, query: &str, language: Language, show_all: bool) -> Option<Lookup> {
        metrics::LOOKUPS_TOTAL
            .with_label_values(&[language.code()])
            .inc();

        let mut rows = self.index.find_by_name(query);
        if rows.is_empty() {
            if let Some(identifier) = self.translations.resolve_identifier(query) {
                rows = self.index.find_by_name(&identifier);
            }
        }
        if rows.is_empty() {
            metrics::LOOKUP_MISSES_TOTAL
                .with_label_values(&[language.code()])
                .inc();
            tracing::debug!(query, "Lookup found no rows");
            return None;
        }

        for row in &rows {
            if !self.translations.is_complete(&row.pokemon) {
                self.warmup.enqueue(&row.pokemon);
            }
        }
        let text = render::render_rows(&rows, language, show_all, |id| {
            self.translations.display_name(id, language)
        });
        Some(Lookup {
            rows: rows.into_iter().cloned().collect(),
            text,
        })
    }

    pub fn suggestions(&self, query: &str, language: Language) -> Vec<Suggestion> {
        metrics::AUTOCOMPLETE_REQUESTS_TOTAL.inc();
        self.index
            .autocomplete(query, |id| self.translations.display_name(id, language))
    }
}

// ── Handlers ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SpawnParams {
    pub lang: Option<String>,
    pub all: Option<bool>,
}

#[derive(Serialize)]
struct SpawnResponse {
    query: String,
    language: Language,
    rows: Vec<SpawnRow>,
    text: String,
    messages: Vec<String>,
}

fn parse_language(raw: Option<&str>) -> Result<Language, String> {
    match raw {
        None => Ok(Language::default()),
        Some(code) => Language::from_code(code).ok_or_else(|| format!("unsupported language: {code}")),
    }
}

async fn get_spawns(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<SpawnParams>,
) -> impl IntoResponse {
    let language = match parse_language(params.lang.as_deref()) {
        Ok(language) => language,
        Err(msg) => return json_error(StatusCode::BAD_REQUEST, &msg).into_response(),
    };
    match state.lookup(&name, language, params.all.unwrap_or(false)) {
        Some(lookup) => {
            let messages =
                render::chunk_message(&lookup.text, MESSAGE_LIMIT, language.continuation_prefix());
            let body = SpawnResponse {
                query: name,
                language,
                rows: lookup.rows,
                text: lookup.text,
                messages,
            };
            (StatusCode::OK, Json(json!(body))).into_response()
        }
        None => json_error(StatusCode::NOT_FOUND, &language.not_found(&name)).into_response(),
    }
}

#[derive(Deserialize)]
pub struct AutocompleteParams {
    pub q: Option<String>,
    pub lang: Option<String>,
}

async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> impl IntoResponse {
    let language = match parse_language(params.lang.as_deref()) {
        Ok(language) => language,
        Err(msg) => return json_error(StatusCode::BAD_REQUEST, &msg).into_response(),
    };
    let query = params.q.unwrap_or_default();
    (StatusCode::OK, Json(json!(state.suggestions(&query, language)))).into_response()
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.bucket_counts().await {
        Ok(buckets) => (
            StatusCode::OK,
            Json(json!({
                "rows": state.index.len(),
                "pokemon": state.index.pokemon_count(),
                "buckets": buckets,
                "translations": state.translations.len(),
                "translations_unsaved": state.translations.pending_changes(),
                "warmup_queue": state.warmup.status(),
            })),
        )
            .into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}
