// Spawn rule extraction: JSON spawn pools -> flat SpawnRow records.

pub mod additional;
pub mod preset;
pub mod row;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::{Map, Value};
use thiserror::Error;
use walkdir::WalkDir;

use crate::tags::{ResolveMode, TagResolver};
use preset::{PresetTable, CONDITION_KEY};
pub use row::{split_joined, Column, SpawnRow};

/// Directory name that holds spawn pool files.
pub const SPAWN_POOL_DIR: &str = "spawn_pool_world";
pub const SPAWN_FILE_EXTENSION: &str = "json";
pub const DEFAULT_SEPARATOR: &str = ", ";

/// Condition keys with this suffix are collected as stone requirements.
pub const STONE_REQUIREMENT_SUFFIX: &str = "_stone_requirement";
pub const CUSTOM_TEAM_KEY: &str = "custom_pokemons_in_team";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Joins list-valued fields.
    pub separator: String,
    /// Treatment of unresolvable biome tokens.
    pub biome_mode: ResolveMode,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            biome_mode: ResolveMode::Lenient,
        }
    }
}

/// Render a scalar as table text. Missing and null become `""`.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Like [`value_text`], with boolean-like strings lowercased.
pub fn bool_text(value: Option<&Value>) -> String {
    let text = value_text(value);
    if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
        text.to_ascii_lowercase()
    } else {
        text
    }
}

fn list_items(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| value_text(Some(v)))
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Converts spawn records into rows.
pub struct Extractor<'a> {
    resolver: TagResolver<'a>,
    presets: &'a PresetTable,
    options: ExtractOptions,
}

impl<'a> Extractor<'a> {
    pub fn new(resolver: TagResolver<'a>, presets: &'a PresetTable, options: ExtractOptions) -> Self {
        Self {
            resolver,
            presets,
            options,
        }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Project one spawn record onto a row. `None` when the record or its
    /// condition block is not an object.
    pub fn extract_record(&self, record: &Value) -> Option<SpawnRow> {
        let Value::Object(record) = record else {
            return None;
        };
        let record = self.presets.expand(record.clone());
        let empty = Map::new();
        let condition = match record.get(CONDITION_KEY) {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(c)) => c,
            Some(_) => return None,
        };
        let sep = self.options.separator.as_str();
        let get = |key: &str| condition.get(key);
        let join = |key: &str| list_items(get(key)).join(sep);

        let biome_tokens = list_items(get("biomes"));
        let biomes = self.resolver.resolve_joined(
            biome_tokens.iter().map(String::as_str),
            self.options.biome_mode,
            sep,
        );

        let stone_requirements = condition
            .iter()
            .filter_map(|(key, value)| {
                let stone = key.strip_suffix(STONE_REQUIREMENT_SUFFIX)?;
                Some(format!("{stone}: {}", value_text(Some(value))))
            })
            .collect::<Vec<_>>()
            .join(sep);

        Some(SpawnRow {
            pokemon: value_text(record.get("pokemon")),
            bucket: value_text(record.get("bucket")),
            dimensions: join("dimensions"),
            biomes,
            structures: join("structures"),
            moon_phase: value_text(get("moonPhase")),
            can_see_sky: bool_text(get("canSeeSky")),
            min_x: value_text(get("minX")),
            min_y: value_text(get("minY")),
            min_z: value_text(get("minZ")),
            max_x: value_text(get("maxX")),
            max_y: value_text(get("maxY")),
            max_z: value_text(get("maxZ")),
            min_light: value_text(get("minLight")),
            max_light: value_text(get("maxLight")),
            min_sky_light: value_text(get("minSkyLight")),
            max_sky_light: value_text(get("maxSkyLight")),
            time_range: value_text(get("timeRange")),
            is_raining: bool_text(get("isRaining")),
            is_thundering: bool_text(get("isThundering")),
            is_slime_chunk: bool_text(get("isSlimeChunk")),
            labels: join("labels"),
            label_mode: value_text(get("labelMode")),
            min_width: value_text(get("minWidth")),
            max_width: value_text(get("maxWidth")),
            min_height: value_text(get("minHeight")),
            max_height: value_text(get("maxHeight")),
            needed_nearby_blocks: join("neededNearbyBlocks"),
            needed_base_blocks: join("neededBaseBlocks"),
            min_depth: value_text(get("minDepth")),
            max_depth: value_text(get("maxDepth")),
            fluid_is_source: bool_text(get("fluidIsSource")),
            fluid_block: value_text(get("fluidBlock")),
            key_item: value_text(get("key_item")),
            stone_requirements,
            custom_pokemons_in_team: team_text(get(CUSTOM_TEAM_KEY), sep),
            best_biomes: None,
            competitors: None,
        })
    }

    /// Rows for every record in a document's `spawns` list. Malformed
    /// records are logged and skipped.
    pub fn extract_document(&self, doc: &Value, origin: &Path) -> Vec<SpawnRow> {
        let Some(spawns) = doc.get("spawns").and_then(Value::as_array) else {
            return Vec::new();
        };
        spawns
            .iter()
            .enumerate()
            .filter_map(|(i, record)| {
                let row = self.extract_record(record);
                if row.is_none() {
                    tracing::error!(
                        path = %origin.display(),
                        index = i,
                        "Malformed spawn record skipped"
                    );
                }
                row
            })
            .collect()
    }

    pub fn extract_file(&self, path: &Path) -> Result<Vec<SpawnRow>, ExtractError> {
        let text = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: Value = serde_json::from_str(&text).map_err(|source| ExtractError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.extract_document(&doc, path))
    }

    /// Extract every spawn file under `root`, in parallel across files.
    /// Failed files are logged and contribute no rows.
    pub fn extract_tree(&self, root: &Path) -> Vec<SpawnRow> {
        let files = find_spawn_files(root);
        tracing::info!(root = %root.display(), files = files.len(), "Extracting spawn pools");
        files
            .par_iter()
            .map(|path| match self.extract_file(path) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::error!(path = %path.display(), "{e}");
                    Vec::new()
                }
            })
            .flatten()
            .collect()
    }
}

fn team_text(value: Option<&Value>, sep: &str) -> String {
    let Some(Value::Array(entries)) = value else {
        return String::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let species = value_text(entry.get("species"));
            if species.is_empty() {
                return None;
            }
            Some(format!("{species}: {}", value_text(entry.get("count"))))
        })
        .collect::<Vec<_>>()
        .join(sep)
}

/// Files with the spawn extension directly inside any `spawn_pool_world`
/// directory under `root`, sorted by path.
pub fn find_spawn_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir() && entry.file_name() == SPAWN_POOL_DIR)
        .flat_map(|dir| {
            WalkDir::new(dir.path())
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .collect::<Vec<_>>()
        })
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(SPAWN_FILE_EXTENSION))
        })
        .collect();
    files.sort();
    files
}
