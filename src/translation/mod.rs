// Translated Pokémon display names: a persisted cache plus background
// enrichment from a remote oracle.

pub mod oracle;

pub use oracle::{
    enrich, fetch_with_retry, EnrichOutcome, HttpOracle, OracleAnswer, RetryPolicy,
    TranslationOracle,
};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::language::Language;

/// New entries between two automatic saves.
pub const DEFAULT_CHECKPOINT_EVERY: usize = 25;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("translation oracle answered HTTP {0}")]
    Status(u16),
    #[error("cannot access translation cache {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("translation cache is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Cache state of one (identifier, language) pair. `Absent` is terminal:
/// the oracle was asked and has no name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationState {
    Known(String),
    Absent,
    Unknown,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
    /// identifier -> language code -> name (`null` when absent).
    #[serde(default)]
    entries: BTreeMap<String, BTreeMap<String, Option<String>>>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, HashMap<Language, Option<String>>>,
    /// Lowercased display name -> identifier.
    reverse: HashMap<String, String>,
    in_flight: HashSet<String>,
    unsaved: usize,
}

impl Inner {
    fn set(&mut self, identifier: &str, language: Language, name: Option<String>) {
        if let Some(name) = &name {
            self.reverse.insert(name.to_lowercase(), identifier.to_string());
        }
        self.entries
            .entry(identifier.to_string())
            .or_default()
            .insert(language, name);
    }
}

/// Shared translation cache. Cheap to query from request handlers; written
/// by the warm-up workers.
#[derive(Debug)]
pub struct TranslationStore {
    path: Option<PathBuf>,
    checkpoint_every: usize,
    inner: Mutex<Inner>,
    /// Held for a whole save; the temp file path is shared.
    save_lock: Mutex<()>,
}

fn key(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

impl TranslationStore {
    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            inner: Mutex::new(Inner::default()),
            save_lock: Mutex::new(()),
        }
    }

    /// Load the cache at `path`. A missing file starts empty; an unreadable
    /// or corrupt one is logged and also starts empty.
    pub fn load(path: &Path, checkpoint_every: usize) -> Self {
        let mut inner = Inner::default();
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<CacheFile>(&text) {
                Ok(file) => {
                    for (identifier, names) in file.entries {
                        for (code, name) in names {
                            if let Some(language) = Language::from_code(&code) {
                                inner.set(&key(&identifier), language, name);
                            }
                        }
                    }
                    tracing::info!(
                        path = %path.display(),
                        entries = inner.entries.len(),
                        "Loaded translation cache"
                    );
                }
                Err(e) => tracing::warn!(path = %path.display(), "Ignoring corrupt translation cache: {e}"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No translation cache yet");
            }
            Err(e) => tracing::warn!(path = %path.display(), "Cannot read translation cache: {e}"),
        }
        Self {
            path: Some(path.to_path_buf()),
            checkpoint_every: checkpoint_every.max(1),
            inner: Mutex::new(inner),
            save_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self, identifier: &str, language: Language) -> TranslationState {
        let inner = self.lock();
        match inner.entries.get(&key(identifier)).and_then(|e| e.get(&language)) {
            Some(Some(name)) => TranslationState::Known(name.clone()),
            Some(None) => TranslationState::Absent,
            None => TranslationState::Unknown,
        }
    }

    pub fn display_name(&self, identifier: &str, language: Language) -> Option<String> {
        match self.state(identifier, language) {
            TranslationState::Known(name) => Some(name),
            _ => None,
        }
    }

    /// Every supported language has a known or absent entry.
    pub fn is_complete(&self, identifier: &str) -> bool {
        let inner = self.lock();
        inner
            .entries
            .get(&key(identifier))
            .is_some_and(|e| Language::ALL.iter().all(|l| e.contains_key(l)))
    }

    /// Identifier whose translated name (any language) equals `name`.
    pub fn resolve_identifier(&self, name: &str) -> Option<String> {
        self.lock().reverse.get(&name.trim().to_lowercase()).cloned()
    }

    /// Record an oracle answer. Languages missing from `names` are stored
    /// as absent.
    pub fn record(&self, identifier: &str, names: &HashMap<Language, String>) {
        {
            let mut inner = self.lock();
            for language in Language::ALL {
                inner.set(&key(identifier), language, names.get(&language).cloned());
            }
            inner.unsaved += 1;
        }
        self.checkpoint();
    }

    /// Record a definitive absence for every language.
    pub fn record_absent(&self, identifier: &str) {
        self.record(identifier, &HashMap::new());
    }

    /// Manual correction of one name.
    pub fn set_override(&self, identifier: &str, language: Language, name: &str) {
        {
            let mut inner = self.lock();
            inner.set(&key(identifier), language, Some(name.to_string()));
            inner.unsaved += 1;
        }
        self.checkpoint();
    }

    /// Claim `identifier` for a fetch. Fails when it is already complete or
    /// another worker holds it.
    pub fn try_begin(&self, identifier: &str) -> bool {
        let id = key(identifier);
        let mut inner = self.lock();
        let complete = inner
            .entries
            .get(&id)
            .is_some_and(|e| Language::ALL.iter().all(|l| e.contains_key(l)));
        !complete && inner.in_flight.insert(id)
    }

    pub fn finish(&self, identifier: &str) {
        self.lock().in_flight.remove(&key(identifier));
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Changes recorded since the last snapshot was taken for saving.
    pub fn pending_changes(&self) -> usize {
        self.lock().unsaved
    }

    fn checkpoint(&self) {
        let due = self.lock().unsaved >= self.checkpoint_every;
        if due {
            if let Err(e) = self.save() {
                tracing::error!("Translation cache checkpoint failed: {e}");
            }
        }
    }

    /// Write the cache through a temp file and rename it into place. Saves
    /// are serialized; changes recorded meanwhile count toward the next one.
    pub fn save(&self) -> Result<(), TranslationError> {
        let Some(path) = &self.path else {
            self.lock().unsaved = 0;
            return Ok(());
        };
        let _saving = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (file, saved) = {
            let mut inner = self.lock();
            let entries = inner
                .entries
                .iter()
                .map(|(id, names)| {
                    let names = names
                        .iter()
                        .map(|(lang, name)| (lang.code().to_string(), name.clone()))
                        .collect();
                    (id.clone(), names)
                })
                .collect();
            let file = CacheFile {
                saved_at: Some(Utc::now()),
                entries,
            };
            (file, std::mem::take(&mut inner.unsaved))
        };

        if let Err(e) = write_atomically(path, &file) {
            self.lock().unsaved += saved;
            return Err(e);
        }
        tracing::debug!(path = %path.display(), entries = file.entries.len(), "Saved translation cache");
        Ok(())
    }
}

fn write_atomically(path: &Path, file: &CacheFile) -> Result<(), TranslationError> {
    let io_err = |source: std::io::Error| TranslationError::Io {
        path: path.to_path_buf(),
        source,
    };
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(file)?).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)
}
