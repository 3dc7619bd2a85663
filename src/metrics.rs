// Prometheus metrics definitions for the spawn lookup service.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Spawn rows loaded into the lookup index.
    pub static ref SPAWN_ROWS_LOADED: IntGauge =
        IntGauge::new("spawnindex_spawn_rows_loaded", "Spawn rows loaded into the index").unwrap();

    /// Identifiers waiting for a translation fetch.
    pub static ref WARMUP_QUEUE_DEPTH: IntGauge =
        IntGauge::new("spawnindex_warmup_queue_depth", "Identifiers waiting for translation").unwrap();

    /// Translation fetches currently running.
    pub static ref WARMUP_WORKERS_ACTIVE: IntGauge =
        IntGauge::new("spawnindex_warmup_workers_active", "Translation warm-up workers currently active").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Spawn lookups, by answer language.
    pub static ref LOOKUPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("spawnindex_lookups_total", "Total spawn lookups"),
        &["language"],
    )
    .unwrap();

    /// Lookups that matched no row, by answer language.
    pub static ref LOOKUP_MISSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("spawnindex_lookup_misses_total", "Lookups that matched no row"),
        &["language"],
    )
    .unwrap();

    pub static ref AUTOCOMPLETE_REQUESTS_TOTAL: IntCounter = IntCounter::new(
        "spawnindex_autocomplete_requests_total",
        "Total autocomplete requests",
    )
    .unwrap();

    /// Translation enrichment attempts, by outcome.
    pub static ref TRANSLATION_FETCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("spawnindex_translation_fetches_total", "Translation enrichment attempts"),
        &["outcome"],
    )
    .unwrap();

    /// Follow-up messages delivered to the chat channel.
    pub static ref FOLLOWUP_MESSAGES_TOTAL: IntCounter = IntCounter::new(
        "spawnindex_followup_messages_total",
        "Follow-up messages delivered",
    )
    .unwrap();

    /// Follow-ups rejected as too long and re-chunked smaller.
    pub static ref FOLLOWUP_RECHUNKS_TOTAL: IntCounter = IntCounter::new(
        "spawnindex_followup_rechunks_total",
        "Follow-ups re-chunked after rejection",
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("spawnindex_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "spawnindex_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SPAWN_ROWS_LOADED.clone()),
        Box::new(WARMUP_QUEUE_DEPTH.clone()),
        Box::new(WARMUP_WORKERS_ACTIVE.clone()),
        Box::new(LOOKUPS_TOTAL.clone()),
        Box::new(LOOKUP_MISSES_TOTAL.clone()),
        Box::new(AUTOCOMPLETE_REQUESTS_TOTAL.clone()),
        Box::new(TRANSLATION_FETCHES_TOTAL.clone()),
        Box::new(FOLLOWUP_MESSAGES_TOTAL.clone()),
        Box::new(FOLLOWUP_RECHUNKS_TOTAL.clone()),
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(API_REQUEST_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            tracing::debug!("Metric not registered: {e}");
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Normalize a URL path for metric labels: the Pokémon name in
/// `/api/spawns/{name}` becomes `:name` to bound cardinality.
pub fn normalize_path(path: &str) -> String {
    let mut previous = "";
    path.split('/')
        .map(|segment| {
            let label = if previous == "spawns" && !segment.is_empty() {
                ":name"
            } else {
                segment
            };
            previous = segment;
            label
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_static_routes() {
        assert_eq!(normalize_path("/api/autocomplete"), "/api/autocomplete");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/interactions"), "/interactions");
    }

    #[test]
    fn test_normalize_path_with_names() {
        assert_eq!(normalize_path("/api/spawns/pikachu"), "/api/spawns/:name");
        assert_eq!(normalize_path("/api/spawns/"), "/api/spawns/");
    }

    #[test]
    fn test_gather_metrics_returns_string() {
        register_metrics();
        register_metrics();
        LOOKUPS_TOTAL.with_label_values(&["fr"]).inc();
        let output = gather_metrics();
        assert!(output.contains("spawnindex_lookups_total"));
    }

    #[test]
    fn test_metric_increments() {
        WARMUP_QUEUE_DEPTH.set(3);
        assert_eq!(WARMUP_QUEUE_DEPTH.get(), 3);
        WARMUP_QUEUE_DEPTH.set(0);

        let before = FOLLOWUP_RECHUNKS_TOTAL.get();
        FOLLOWUP_RECHUNKS_TOTAL.inc();
        assert!(FOLLOWUP_RECHUNKS_TOTAL.get() > before);

        TRANSLATION_FETCHES_TOTAL.with_label_values(&["found"]).inc();
        API_REQUEST_DURATION_SECONDS
            .with_label_values(&["/api/spawns/:name"])
            .observe(0.01);
    }
}
