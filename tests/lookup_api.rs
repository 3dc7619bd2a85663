// HTTP surface of the lookup service, driven in-process through the router.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use spawn_index::api::{self, discord::DiscordClient, AppState};
use spawn_index::db::Database;
use spawn_index::extract::SpawnRow;
use spawn_index::language::Language;
use spawn_index::lookup::SpawnIndex;
use spawn_index::queue::WarmupQueue;
use spawn_index::translation::TranslationStore;

fn row(pokemon: &str, bucket: &str, biomes: &str) -> SpawnRow {
    SpawnRow {
        pokemon: pokemon.into(),
        bucket: bucket.into(),
        biomes: biomes.into(),
        best_biomes: Some(biomes.into()),
        competitors: Some(0),
        ..Default::default()
    }
}

async fn app() -> (Router, AppState) {
    let rows = vec![
        row("pikachu", "rare", "minecraft:forest"),
        row("bulbasaur", "common", "minecraft:jungle"),
        row("pichu", "common", "minecraft:forest"),
    ];
    let db = Database::new("sqlite::memory:").await.unwrap();
    db.replace_rows(&rows).await.unwrap();

    let translations = TranslationStore::in_memory();
    translations.record(
        "bulbasaur",
        &HashMap::from([
            (Language::Fr, "Bulbizarre".to_string()),
            (Language::En, "Bulbasaur".to_string()),
        ]),
    );

    let state = AppState {
        db: Arc::new(db),
        index: Arc::new(SpawnIndex::from_rows(rows)),
        translations: Arc::new(translations),
        warmup: WarmupQueue::new(),
        // Nothing listens here; follow-ups fail and are only logged.
        discord: Arc::new(DiscordClient::new(
            "http://127.0.0.1:9",
            Some("42".into()),
            None,
            1,
        )),
    };
    (api::router(state.clone()), state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn interaction(payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/interactions")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app().await;
    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_spawns_by_identifier() {
    let (app, state) = app().await;
    let (status, body) = send(app, get("/api/spawns/PIKACHU?lang=en")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["language"], "en");
    assert_eq!(body["rows"].as_array().unwrap().len(), 1);
    assert_eq!(body["rows"][0]["Bucket"], "rare");
    let text = body["text"].as_str().unwrap();
    assert!(text.starts_with("🔍 **Spawn information for pikachu**"));
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);

    // No cached translation: answered with the identifier, queued for warm-up.
    assert_eq!(state.warmup.dequeue().as_deref(), Some("pikachu"));
}

#[tokio::test]
async fn test_spawns_by_translated_name() {
    let (app, state) = app().await;
    let (status, body) = send(app, get("/api/spawns/bulbizarre")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["language"], "fr");
    let text = body["text"].as_str().unwrap();
    assert!(text.starts_with("🔍 **Informations sur Bulbizarre (bulbasaur)**"));
    assert!(state.warmup.is_empty());
}

#[tokio::test]
async fn test_spawns_show_all_renders_sentinel() {
    let (app, _) = app().await;
    let (_, body) = send(app, get("/api/spawns/pichu?lang=en&all=true")).await;
    assert!(body["text"].as_str().unwrap().contains("🔑 **Key item** : ∅"));
}

#[tokio::test]
async fn test_spawns_not_found_and_bad_language() {
    let (app, _) = app().await;
    let (status, body) = send(app.clone(), get("/api/spawns/mewtwo")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("mewtwo"));

    let (status, _) = send(app, get("/api/spawns/pikachu?lang=de")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_autocomplete_endpoint() {
    let (app, _) = app().await;
    let (status, body) = send(app, get("/api/autocomplete?q=CHU")).await;
    assert_eq!(status, StatusCode::OK);
    let values: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["value"].as_str().unwrap())
        .collect();
    assert_eq!(values, vec!["pichu", "pikachu"]);
}

#[tokio::test]
async fn test_status_reports_buckets() {
    let (app, _) = app().await;
    let (status, body) = send(app, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], 3);
    assert_eq!(body["pokemon"], 3);
    assert_eq!(body["buckets"][0], json!({ "bucket": "common", "row_count": 2 }));
    assert_eq!(body["translations"], 1);
    assert_eq!(body["translations_unsaved"], 1);
}

#[tokio::test]
async fn test_interaction_ping() {
    let (app, _) = app().await;
    let (status, body) = send(app, interaction(json!({ "type": 1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "type": 1 }));
}

#[tokio::test]
async fn test_interaction_command_is_deferred() {
    let (app, _) = app().await;
    let payload = json!({
        "type": 2,
        "token": "abc",
        "data": {
            "name": "where_en",
            "options": [
                { "name": "pokemon", "type": 3, "value": "Pikachu" },
                { "name": "all", "type": 5, "value": false }
            ]
        }
    });
    let (status, body) = send(app, interaction(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], 5);
    assert_eq!(body["data"]["flags"], 64);
}

#[tokio::test]
async fn test_interaction_command_not_found_answers_immediately() {
    let (app, _) = app().await;
    let payload = json!({
        "type": 2,
        "token": "abc",
        "data": { "name": "where", "options": [{ "name": "pokemon", "type": 3, "value": "mewtwo" }] }
    });
    let (_, body) = send(app, interaction(payload)).await;
    assert_eq!(body["type"], 4);
    assert_eq!(
        body["data"]["content"],
        "❌ Aucune information trouvée pour **mewtwo**."
    );
}

#[tokio::test]
async fn test_interaction_unknown_command_rejected() {
    let (app, _) = app().await;
    let payload = json!({
        "type": 2,
        "data": { "name": "when", "options": [{ "name": "pokemon", "type": 3, "value": "pichu" }] }
    });
    let (status, _) = send(app, interaction(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_interaction_autocomplete() {
    let (app, _) = app().await;
    let payload = json!({
        "type": 4,
        "data": {
            "name": "where",
            "options": [{ "name": "pokemon", "type": 3, "value": "bulbi", "focused": true }]
        }
    });
    let (_, body) = send(app, interaction(payload)).await;
    assert_eq!(body["type"], 8);
    assert_eq!(
        body["data"]["choices"],
        json!([{ "name": "Bulbizarre (bulbasaur)", "value": "bulbasaur" }])
    );
}

#[tokio::test]
async fn test_metrics_endpoint() {
    spawn_index::metrics::register_metrics();
    let (app, _) = app().await;
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
