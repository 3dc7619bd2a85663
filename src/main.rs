use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use spawn_index::api::{self, discord::DiscordClient, AppState};
use spawn_index::config::{Config, DEFAULT_DATABASE_URL, DEFAULT_TAGS_FILE};
use spawn_index::db::Database;
use spawn_index::extract::{ExtractOptions, DEFAULT_SEPARATOR};
use spawn_index::lookup::SpawnIndex;
use spawn_index::metrics;
use spawn_index::pipeline::{self, PipelineInput};
use spawn_index::queue::{spawn_warmup_worker, WarmupQueue};
use spawn_index::tags::{ResolveMode, TagResolver};
use spawn_index::translation::{
    HttpOracle, RetryPolicy, TranslationOracle, TranslationStore, DEFAULT_CHECKPOINT_EVERY,
};
use spawn_index::worker_pool::WarmupPool;

const WARMUP_WORKERS: usize = 4;
const WARMUP_POLL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(author, version, about = "Pokémon spawn table builder and lookup service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the spawn table from a directory of spawn-pool configs.
    Extract {
        /// Root searched recursively for spawn_pool_world directories.
        target_dir: PathBuf,
        #[arg(long, env = "SPAWN_DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database: String,
        /// Also write the table as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Supplementary rows as CSV with a header row. Spreadsheets must be
        /// exported to CSV first; .xlsx files are not read.
        #[arg(long, value_name = "CSV")]
        additional: Option<PathBuf>,
        #[arg(long, env = "BIOME_TAGS_FILE", default_value = DEFAULT_TAGS_FILE)]
        tags: PathBuf,
        /// Drop biome tokens that resolve to no known biome.
        #[arg(long)]
        strict_biomes: bool,
        #[arg(long, env = "LIST_SEPARATOR", default_value = DEFAULT_SEPARATOR)]
        separator: String,
    },
    /// Serve lookups over HTTP and the chat interaction webhook.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Extract {
            target_dir,
            database,
            csv,
            additional,
            tags,
            strict_biomes,
            separator,
        } => {
            let input = PipelineInput {
                target_dir,
                tags_file: Some(tags),
                additional,
                options: ExtractOptions {
                    separator,
                    biome_mode: ResolveMode::from_strict_flag(strict_biomes),
                },
            };
            extract(input, &database, csv).await
        }
        Command::Serve { port } => {
            let config = match Config::load(port) {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!("Invalid configuration: {e}");
                    std::process::exit(1);
                }
            };
            serve(config).await
        }
    }
}

async fn extract(input: PipelineInput, database_url: &str, csv: Option<PathBuf>) -> anyhow::Result<()> {
    if !input.target_dir.is_dir() {
        anyhow::bail!("{} is not a directory", input.target_dir.display());
    }
    let output = pipeline::run(&input);
    tracing::info!(
        rows = output.rows.len(),
        ranked = output.stats.ranked,
        excluded = output.stats.excluded,
        buckets = output.stats.buckets,
        "Ranked spawn rows"
    );

    let db = Database::new(database_url)
        .await
        .with_context(|| format!("opening {database_url}"))?;
    let stored = db.replace_rows(&output.rows).await?;
    tracing::info!(rows = stored, database = database_url, "Stored spawn table");

    if let Some(path) = csv {
        spawn_index::export::write_csv(&path, &output.rows)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    metrics::register_metrics();

    let db = Database::new(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;
    let mut rows = db.load_rows().await?;

    // Tables built with older tag data may still hold tag tokens.
    if config.tags_file.is_file() {
        let registry = pipeline::load_registry(Some(config.tags_file.as_path()), None);
        let options = ExtractOptions {
            separator: config.separator.clone(),
            biome_mode: ResolveMode::Lenient,
        };
        let stats = pipeline::refresh_biomes(&mut rows, &TagResolver::new(&registry), &options);
        tracing::info!(ranked = stats.ranked, excluded = stats.excluded, "Refreshed stored biomes");
    }

    let index = Arc::new(SpawnIndex::from_rows(rows));
    metrics::SPAWN_ROWS_LOADED.set(index.len() as i64);
    tracing::info!(rows = index.len(), pokemon = index.pokemon_count(), "Loaded spawn index");

    let translations = Arc::new(TranslationStore::load(
        &config.translation_cache,
        DEFAULT_CHECKPOINT_EVERY,
    ));
    let warmup = WarmupQueue::new();
    for name in index.names() {
        if !translations.is_complete(name) {
            warmup.enqueue(name);
        }
    }
    tracing::info!(pending = warmup.depth(), "Queued translation warm-up");

    let oracle: Arc<dyn TranslationOracle> = Arc::new(HttpOracle::new(&config.translation_api_base)?);
    spawn_warmup_worker(
        warmup.clone(),
        WarmupPool::new(WARMUP_WORKERS),
        translations.clone(),
        oracle,
        RetryPolicy::default(),
        WARMUP_POLL,
    );

    let discord = Arc::new(DiscordClient::new(
        &config.discord_api_base,
        config.application_id.clone(),
        config.discord_token.clone(),
        config.guild_id,
    ));
    if discord.can_register() {
        match discord.register_commands().await {
            Ok(count) => tracing::info!(commands = count, guild = config.guild_id, "Registered guild commands"),
            Err(e) => tracing::error!("Command registration failed: {e}"),
        }
    } else {
        tracing::warn!("Bot token or application id missing, skipping command registration");
    }

    let state = AppState {
        db: Arc::new(db),
        index,
        translations: translations.clone(),
        warmup,
        discord,
    };
    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    tracing::info!("Spawn lookup service listening on port {}", config.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tokio::task::spawn_blocking(move || translations.save()).await??;
    tracing::info!("Translation cache saved, shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_additional_rows_are_csv() {
        let command = Cli::command();
        let extract = command.find_subcommand("extract").unwrap();
        let additional = extract
            .get_arguments()
            .find(|arg| arg.get_id() == "additional")
            .unwrap();
        assert!(additional.get_help().unwrap().to_string().contains("CSV"));

        let cli = Cli::try_parse_from(["spawn-index", "extract", "mods", "--additional", "extra.csv"]).unwrap();
        match cli.command {
            Command::Extract { additional, .. } => assert_eq!(additional, Some(PathBuf::from("extra.csv"))),
            Command::Serve { .. } => panic!("parsed the wrong subcommand"),
        }
    }
}
