// In-memory index over the persisted spawn table, keyed by Pokémon name.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::extract::SpawnRow;
use crate::render::display_name;

/// Maximum suggestions returned by [`SpawnIndex::autocomplete`].
pub const AUTOCOMPLETE_LIMIT: usize = 25;

/// One autocomplete choice: a display label and the identifier to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct SpawnIndex {
    rows: Vec<SpawnRow>,
    /// Lowercased identifier -> row positions, in table order.
    by_name: HashMap<String, Vec<usize>>,
    /// Lowercased identifier -> identifier as first seen, sorted.
    names: BTreeMap<String, String>,
}

impl SpawnIndex {
    pub fn from_rows(rows: Vec<SpawnRow>) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut names = BTreeMap::new();
        for (i, row) in rows.iter().enumerate() {
            let name = row.pokemon.trim();
            if name.is_empty() {
                continue;
            }
            let key = name.to_lowercase();
            by_name.entry(key.clone()).or_default().push(i);
            names.entry(key).or_insert_with(|| name.to_string());
        }
        Self { rows, by_name, names }
    }

    /// Rows whose identifier equals `name`, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Vec<&SpawnRow> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(|positions| positions.iter().map(|&i| &self.rows[i]).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&name.trim().to_lowercase())
    }

    /// Up to [`AUTOCOMPLETE_LIMIT`] identifiers containing `query`, sorted.
    /// `translate` supplies display names, which are matched too.
    pub fn autocomplete<F>(&self, query: &str, translate: F) -> Vec<Suggestion>
    where
        F: Fn(&str) -> Option<String>,
    {
        let needle = query.trim().to_lowercase();
        self.names
            .iter()
            .filter_map(|(key, name)| {
                let translated = translate(name);
                let matches = key.contains(&needle)
                    || translated
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&needle));
                matches.then(|| Suggestion {
                    name: display_name(name, translated.as_deref()),
                    value: name.clone(),
                })
            })
            .take(AUTOCOMPLETE_LIMIT)
            .collect()
    }

    /// Distinct identifiers, sorted case-insensitively.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.values().map(String::as_str)
    }

    pub fn rows(&self) -> &[SpawnRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn pokemon_count(&self) -> usize {
        self.names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pokemon: &str, bucket: &str) -> SpawnRow {
        SpawnRow {
            pokemon: pokemon.into(),
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    fn index() -> SpawnIndex {
        SpawnIndex::from_rows(vec![
            row("pikachu", "rare"),
            row("Pichu", "common"),
            row("pikachu", "ultra-rare"),
            row("raichu", "rare"),
            row("", "common"),
        ])
    }

    #[test]
    fn test_find_by_name_case_insensitive() {
        let index = index();
        let rows = index.find_by_name("PIKACHU");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bucket, "rare");
        assert_eq!(rows[1].bucket, "ultra-rare");
        assert_eq!(index.find_by_name(" pichu ").len(), 1);
        assert!(index.find_by_name("pika").is_empty());
        assert!(index.find_by_name("").is_empty());
    }

    #[test]
    fn test_autocomplete_substring_sorted() {
        let index = index();
        let values: Vec<String> = index
            .autocomplete("CHU", |_| None)
            .into_iter()
            .map(|s| s.value)
            .collect();
        assert_eq!(values, vec!["Pichu", "pikachu", "raichu"]);
    }

    #[test]
    fn test_autocomplete_matches_translations() {
        let index = index();
        let found = index.autocomplete("rai", |id| (id == "pichu").then(|| "Pichu".into()));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "raichu");

        let found = index.autocomplete("Bulbi", |_| None);
        assert!(found.is_empty());

        let found = index.autocomplete("éclair", |id| (id == "raichu").then(|| "Raichu-Éclair".into()));
        assert_eq!(found[0].name, "Raichu-Éclair (raichu)");
    }

    #[test]
    fn test_autocomplete_limit() {
        let rows = (0..40).map(|i| row(&format!("mon{i:02}"), "common")).collect();
        let index = SpawnIndex::from_rows(rows);
        let found = index.autocomplete("", |_| None);
        assert_eq!(found.len(), AUTOCOMPLETE_LIMIT);
        assert_eq!(found[0].value, "mon00");
    }

    #[test]
    fn test_names_skip_blank_identifiers() {
        let index = index();
        assert_eq!(index.pokemon_count(), 3);
        assert_eq!(index.len(), 5);
        assert!(index.contains("Raichu"));
    }
}
