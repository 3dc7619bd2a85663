// Biome tag registry: tag -> biome sets, parsed from the tag reference table
// and from data-pack biome tag files.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use walkdir::WalkDir;

/// Prefix marking a token as a tag rather than a concrete biome.
pub const TAG_MARKER: char = '#';

const REGISTRY_HEADER: &str = "registry name";
const TAGS_HEADER: &str = "tags";

/// Delimiters probed, in order, when the table is not bordered.
const DELIMITER_CANDIDATES: [u8; 3] = [b'\t', b';', b','];

#[derive(Debug, Error)]
pub enum TagError {
    #[error("failed to read tag source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid delimited tag table: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid biome tag file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Layout of a tag reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// `| Biome | Registry name | Tags |` rows with `+---+` borders.
    Bordered,
    /// Columns located by header text offsets.
    FixedWidth,
    /// Delimited rows (CSV quoting honored).
    Delimited(u8),
}

/// Strip the tag marker, if any.
pub fn strip_marker(token: &str) -> &str {
    token.strip_prefix(TAG_MARKER).unwrap_or(token)
}

/// Marker-prefixed form of a tag.
pub fn with_marker(token: &str) -> String {
    format!("{TAG_MARKER}{}", strip_marker(token))
}

fn is_well_formed_entity(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(TAG_MARKER)
        && !name.eq_ignore_ascii_case(REGISTRY_HEADER)
        && !name.chars().any(|c| c.is_whitespace() || c == '|')
        && !name.chars().all(|c| matches!(c, '-' | '=' | '+'))
}

/// Forward and validity indexes over biome tags.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    valid_entities: HashSet<String>,
    valid_tags: HashSet<String>,
    tag_to_entities: HashMap<String, BTreeSet<String>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `entity` carries every tag in `tags`.
    /// Malformed or empty entity names are skipped.
    pub fn insert<'a>(&mut self, entity: &str, tags: impl IntoIterator<Item = &'a str>) {
        let entity = entity.trim();
        if !is_well_formed_entity(entity) {
            return;
        }
        self.valid_entities.insert(entity.to_string());
        for tag in tags {
            let tag = tag.trim();
            if strip_marker(tag).is_empty() {
                continue;
            }
            self.add_member(tag, entity);
        }
    }

    /// Declare `members` (biomes or nested tags) under `tag`. Members do not
    /// become known biomes; only the reference table declares those.
    pub fn add_tag_members<'a>(&mut self, tag: &str, members: impl IntoIterator<Item = &'a str>) {
        let tag = tag.trim();
        if strip_marker(tag).is_empty() {
            return;
        }
        for member in members {
            let member = member.trim();
            if member.is_empty() {
                continue;
            }
            self.add_member(tag, member);
        }
    }

    fn add_member(&mut self, tag: &str, member: &str) {
        let bare = strip_marker(tag).to_string();
        let marked = with_marker(tag);
        for key in [bare, marked] {
            self.valid_tags.insert(key.clone());
            self.tag_to_entities
                .entry(key)
                .or_default()
                .insert(member.to_string());
        }
    }

    pub fn is_entity(&self, name: &str) -> bool {
        self.valid_entities.contains(name)
    }

    /// Marker-agnostic tag existence check.
    pub fn is_tag(&self, tag: &str) -> bool {
        self.valid_tags.contains(tag) || self.valid_tags.contains(strip_marker(tag))
    }

    /// Members declared under `tag`, checking the prefixed form first.
    pub fn members(&self, tag: &str) -> Option<&BTreeSet<String>> {
        let bare = strip_marker(tag);
        self.tag_to_entities
            .get(&with_marker(bare))
            .or_else(|| self.tag_to_entities.get(bare))
    }

    /// Number of distinct tags, counting each tag once regardless of marker.
    pub fn tag_count(&self) -> usize {
        self.valid_tags
            .iter()
            .filter(|t| !t.starts_with(TAG_MARKER))
            .count()
    }

    pub fn entity_count(&self) -> usize {
        self.valid_entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid_entities.is_empty() && self.valid_tags.is_empty()
    }

    // ── Reference table ──────────────────────────────────────────────

    /// Read and parse a tag reference table, auto-detecting its layout.
    pub fn load_table(path: &Path) -> Result<Self, TagError> {
        let text = std::fs::read_to_string(path).map_err(|source| TagError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::parse_table(&text)?;
        tracing::info!(
            path = %path.display(),
            tags = registry.tag_count(),
            biomes = registry.entity_count(),
            "Loaded biome tag table"
        );
        Ok(registry)
    }

    pub fn parse_table(text: &str) -> Result<Self, TagError> {
        let mut registry = Self::new();
        match detect_format(text) {
            Some(TableFormat::Bordered) => registry.parse_bordered(text),
            Some(TableFormat::FixedWidth) => registry.parse_fixed_width(text),
            Some(TableFormat::Delimited(delimiter)) => registry.parse_delimited(text, delimiter)?,
            None => {}
        }
        Ok(registry)
    }

    fn parse_bordered(&mut self, text: &str) {
        let mut registry_col = 2;
        let mut tags_col = 3;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('+') || !line.starts_with('|') {
                continue;
            }
            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            if line.to_ascii_lowercase().contains(REGISTRY_HEADER) {
                if let Some((r, t)) = header_columns(&parts) {
                    registry_col = r;
                    tags_col = t;
                }
                continue;
            }
            let (Some(registry), Some(tags)) = (parts.get(registry_col), parts.get(tags_col)) else {
                continue;
            };
            if registry.is_empty() || tags.is_empty() {
                continue;
            }
            self.insert(registry, tags.split(','));
        }
    }

    fn parse_fixed_width(&mut self, text: &str) {
        let mut offsets: Option<(usize, usize)> = None;

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let chars: Vec<char> = line.chars().collect();
            let Some((registry_at, tags_at)) = offsets else {
                offsets = fixed_width_offsets(line);
                continue;
            };
            let trimmed = line.trim();
            if trimmed.chars().all(|c| matches!(c, '-' | '=' | ' ')) {
                continue;
            }
            let slice = |from: usize, to: usize| -> String {
                chars
                    .get(from.min(chars.len())..to.min(chars.len()))
                    .map(|s| s.iter().collect::<String>())
                    .unwrap_or_default()
            };
            let registry = slice(registry_at, tags_at);
            let tags = slice(tags_at, chars.len());
            let (registry, tags) = (registry.trim(), tags.trim());
            if registry.is_empty() || tags.is_empty() {
                continue;
            }
            self.insert(registry, tags.split(','));
        }

        if offsets.is_none() {
            tracing::warn!("Fixed-width tag table has no 'Registry name' / 'Tags' header");
        }
    }

    fn parse_delimited(&mut self, text: &str, delimiter: u8) -> Result<(), TagError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        let (registry_col, tags_col) = header_columns(&header_refs).unwrap_or((0, 1));

        for record in reader.records() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Skipping malformed tag table row: {e}");
                    continue;
                }
            };
            let (Some(registry), Some(tags)) = (record.get(registry_col), record.get(tags_col))
            else {
                continue;
            };
            if registry.is_empty() || tags.is_empty() {
                continue;
            }
            self.insert(registry, tags.split(','));
        }
        Ok(())
    }

    // ── Data-pack biome tags ─────────────────────────────────────────

    /// Ingest one `{"values": [...]}` biome tag document as `tag`.
    pub fn ingest_tag_json(&mut self, tag: &str, text: &str) -> Result<(), serde_json::Error> {
        let doc: TagFile = serde_json::from_str(text)?;
        let members: Vec<String> = doc.values.into_iter().map(TagValue::into_id).collect();
        self.add_tag_members(tag, members.iter().map(String::as_str));
        Ok(())
    }

    /// Walk `root` for `data/<ns>/tags/worldgen/biome/**.json` files and
    /// ingest each as `#<ns>:<path>`. Unreadable files are logged and skipped.
    pub fn ingest_datapack_tags(&mut self, root: &Path) -> usize {
        let mut ingested = 0;
        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(tag) = datapack_tag_name(root, path) else {
                continue;
            };
            let result = std::fs::read_to_string(path)
                .map_err(|source| TagError::Io {
                    path: path.to_path_buf(),
                    source,
                })
                .and_then(|text| {
                    self.ingest_tag_json(&tag, &text).map_err(|source| TagError::Json {
                        path: path.to_path_buf(),
                        source,
                    })
                });
            match result {
                Ok(()) => ingested += 1,
                Err(e) => tracing::warn!("{e}"),
            }
        }
        ingested
    }
}

#[derive(Deserialize)]
struct TagFile {
    #[serde(default)]
    values: Vec<TagValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagValue {
    Plain(String),
    Entry { id: String },
}

impl TagValue {
    fn into_id(self) -> String {
        match self {
            TagValue::Plain(id) | TagValue::Entry { id } => id,
        }
    }
}

/// `data/<ns>/tags/worldgen/biome/<path>.json` -> `#<ns>:<path>`.
fn datapack_tag_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let ext = relative.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case("json") {
        return None;
    }
    let stem = relative.with_extension("");
    let parts: Vec<&str> = stem
        .iter()
        .map(|p| p.to_str())
        .collect::<Option<_>>()?;
    let data_at = parts.iter().rposition(|p| *p == "data")?;
    let rest = &parts[data_at + 1..];
    match rest {
        [namespace, "tags", "worldgen", "biome", path @ ..] if !path.is_empty() => {
            Some(format!("{TAG_MARKER}{namespace}:{}", path.join("/")))
        }
        _ => None,
    }
}

/// Locate the registry-name and tags columns in a header row.
fn header_columns(parts: &[&str]) -> Option<(usize, usize)> {
    let registry = parts
        .iter()
        .position(|p| p.trim().eq_ignore_ascii_case(REGISTRY_HEADER))?;
    let tags = parts
        .iter()
        .position(|p| p.trim().to_ascii_lowercase().starts_with(TAGS_HEADER))?;
    Some((registry, tags))
}

fn fixed_width_offsets(header: &str) -> Option<(usize, usize)> {
    let lower = header.to_lowercase();
    let registry_byte = lower.find(REGISTRY_HEADER)?;
    let tags_byte = lower[registry_byte..].find(TAGS_HEADER)? + registry_byte;
    let registry_at = lower[..registry_byte].chars().count();
    let tags_at = lower[..tags_byte].chars().count();
    Some((registry_at, tags_at))
}

/// Probe the first meaningful line to decide how the table is laid out.
pub fn detect_format(text: &str) -> Option<TableFormat> {
    let first = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    if first.starts_with('+') || first.starts_with('|') {
        return Some(TableFormat::Bordered);
    }
    let best = DELIMITER_CANDIDATES
        .iter()
        .map(|&d| (d, first.split(d as char).count()))
        .filter(|&(_, columns)| columns >= 2)
        .max_by_key(|&(_, columns)| columns);
    match best {
        Some((delimiter, _)) => Some(TableFormat::Delimited(delimiter)),
        None => Some(TableFormat::FixedWidth),
    }
}
