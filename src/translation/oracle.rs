// Remote translation oracle and the bounded-retry enrichment step.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{TranslationError, TranslationStore};
use crate::language::Language;
use crate::metrics;

pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";

/// What the oracle knows about one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleAnswer {
    Found(HashMap<Language, String>),
    /// Definitive: the oracle has no such entity.
    NotFound,
}

#[async_trait]
pub trait TranslationOracle: Send + Sync {
    async fn fetch(&self, identifier: &str) -> Result<OracleAnswer, TranslationError>;
}

// ── HTTP oracle ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SpeciesResponse {
    #[serde(default)]
    names: Vec<SpeciesName>,
}

#[derive(Deserialize)]
struct SpeciesName {
    name: String,
    language: NamedResource,
}

#[derive(Deserialize)]
struct NamedResource {
    name: String,
}

/// Species endpoint of a PokeAPI-compatible service. One response carries
/// the names for every language.
pub struct HttpOracle {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOracle {
    pub fn new(base_url: &str) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// URL slug of the species behind a spawn identifier: the first word,
/// without any `namespace:` prefix (`cobblemon:vulpix alolan` -> `vulpix`,
/// `Mr_Mime` -> `mr-mime`).
pub fn species_slug(identifier: &str) -> String {
    let species = identifier.split_whitespace().next().unwrap_or_default();
    let species = species.rsplit(':').next().unwrap_or(species);
    species
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            '_' => Some('-'),
            '.' | '\'' => None,
            c => Some(c),
        })
        .collect()
}

#[async_trait]
impl TranslationOracle for HttpOracle {
    async fn fetch(&self, identifier: &str) -> Result<OracleAnswer, TranslationError> {
        let url = format!("{}/pokemon-species/{}", self.base_url, species_slug(identifier));
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(OracleAnswer::NotFound);
        }
        if !status.is_success() {
            return Err(TranslationError::Status(status.as_u16()));
        }
        let species: SpeciesResponse = response.json().await?;
        let names = species
            .names
            .into_iter()
            .filter_map(|n| Language::from_code(&n.language.name).map(|l| (l, n.name)))
            .collect();
        Ok(OracleAnswer::Found(names))
    }
}

// ── Retry and enrichment ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Ask the oracle up to `policy.attempts` times. `NotFound` is an answer,
/// not a failure, and is never retried.
pub async fn fetch_with_retry(
    oracle: &dyn TranslationOracle,
    identifier: &str,
    policy: RetryPolicy,
) -> Result<OracleAnswer, TranslationError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match oracle.fetch(identifier).await {
            Ok(answer) => return Ok(answer),
            Err(e) if attempt < attempts => {
                tracing::warn!(identifier, attempt, "Translation fetch failed, retrying: {e}");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    Found,
    NotFound,
    /// Retries exhausted; recorded as absent.
    Failed,
    /// Already cached or being fetched elsewhere.
    Skipped,
}

impl EnrichOutcome {
    pub fn label(self) -> &'static str {
        match self {
            EnrichOutcome::Found => "found",
            EnrichOutcome::NotFound => "not_found",
            EnrichOutcome::Failed => "failed",
            EnrichOutcome::Skipped => "skipped",
        }
    }
}

/// Fetch and cache the names of `identifier` unless already known.
pub async fn enrich(
    store: Arc<TranslationStore>,
    oracle: Arc<dyn TranslationOracle>,
    identifier: String,
    policy: RetryPolicy,
) -> EnrichOutcome {
    if !store.try_begin(&identifier) {
        return EnrichOutcome::Skipped;
    }
    let (names, outcome) = match fetch_with_retry(oracle.as_ref(), &identifier, policy).await {
        Ok(OracleAnswer::Found(names)) => (names, EnrichOutcome::Found),
        Ok(OracleAnswer::NotFound) => (HashMap::new(), EnrichOutcome::NotFound),
        Err(e) => {
            tracing::error!(identifier = %identifier, "Giving up on translation: {e}");
            (HashMap::new(), EnrichOutcome::Failed)
        }
    };
    // Recording may checkpoint the cache file.
    let writer = store.clone();
    let id = identifier.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || writer.record(&id, &names)).await {
        tracing::error!(identifier = %identifier, "Recording translation failed: {e}");
    }
    store.finish(&identifier);
    metrics::TRANSLATION_FETCHES_TOTAL
        .with_label_values(&[outcome.label()])
        .inc();
    outcome
}
