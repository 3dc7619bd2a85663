// Batch pipeline: tag sources -> extraction -> additional rows -> ranking.

use std::path::{Path, PathBuf};

use crate::extract::additional::load_additional;
use crate::extract::preset::BUILTIN_PRESETS;
use crate::extract::{split_joined, ExtractOptions, Extractor, SpawnRow};
use crate::ranking::{self, RankStats};
use crate::tags::{TagRegistry, TagResolver};

/// Inputs of one extraction run.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub target_dir: PathBuf,
    pub tags_file: Option<PathBuf>,
    pub additional: Option<PathBuf>,
    pub options: ExtractOptions,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub rows: Vec<SpawnRow>,
    pub stats: RankStats,
}

/// Load the tag reference table (if any) plus data-pack biome tags under
/// `target_dir`. A missing or unreadable table is logged, not fatal.
pub fn load_registry(tags_file: Option<&Path>, target_dir: Option<&Path>) -> TagRegistry {
    let mut registry = match tags_file {
        Some(path) => TagRegistry::load_table(path).unwrap_or_else(|e| {
            tracing::warn!("Continuing without tag table: {e}");
            TagRegistry::new()
        }),
        None => TagRegistry::new(),
    };
    if let Some(dir) = target_dir {
        let ingested = registry.ingest_datapack_tags(dir);
        if ingested > 0 {
            tracing::info!(files = ingested, "Ingested data-pack biome tags");
        }
    }
    registry
}

/// Run the full batch: extract, merge additional rows, rank.
pub fn run(input: &PipelineInput) -> PipelineOutput {
    let registry = load_registry(input.tags_file.as_deref(), Some(&input.target_dir));
    let resolver = TagResolver::new(&registry);
    let extractor = Extractor::new(resolver, &BUILTIN_PRESETS, input.options.clone());

    let mut rows = extractor.extract_tree(&input.target_dir);
    tracing::info!(rows = rows.len(), "Extracted spawn rows");

    if let Some(path) = &input.additional {
        rows.extend(load_additional(path, &resolver, &input.options));
    }

    let stats = ranking::rank(&mut rows, &input.options.separator);
    for (bucket, population) in ranking::bucket_population(&rows) {
        tracing::debug!(bucket = %bucket, population, "Bucket population");
    }
    PipelineOutput { rows, stats }
}

/// Re-expand any tag tokens left in stored Biomes columns. Concrete biomes
/// are unchanged, so this is a no-op on tables built with the same tags.
pub fn reresolve_biomes(rows: &mut [SpawnRow], resolver: &TagResolver<'_>, options: &ExtractOptions) {
    for row in rows.iter_mut() {
        if row.biomes.is_empty() {
            continue;
        }
        let tokens: Vec<String> = split_joined(&row.biomes, &options.separator)
            .map(str::to_string)
            .collect();
        row.biomes = resolver.resolve_joined(
            tokens.iter().map(String::as_str),
            options.biome_mode,
            &options.separator,
        );
    }
}

/// Re-expand leftover tags in a stored table, then rank it again so every
/// Best Biomes and Competitors value reflects the new Biomes columns.
pub fn refresh_biomes(
    rows: &mut [SpawnRow],
    resolver: &TagResolver<'_>,
    options: &ExtractOptions,
) -> RankStats {
    reresolve_biomes(rows, resolver, options);
    ranking::rank(rows, &options.separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reresolve_biomes_expands_leftover_tags() {
        let mut registry = TagRegistry::new();
        registry.insert("minecraft:swamp", ["#minecraft:is_swamp"]);
        registry.insert("minecraft:mangrove_swamp", ["#minecraft:is_swamp"]);
        let resolver = TagResolver::new(&registry);

        let mut rows = vec![SpawnRow {
            pokemon: "wooper".into(),
            biomes: "minecraft:is_swamp, minecraft:river".into(),
            ..Default::default()
        }];
        let options = ExtractOptions::default();
        reresolve_biomes(&mut rows, &resolver, &options);
        assert_eq!(
            rows[0].biomes,
            "minecraft:mangrove_swamp, minecraft:river, minecraft:swamp"
        );

        let once = rows.clone();
        reresolve_biomes(&mut rows, &resolver, &options);
        assert_eq!(rows, once);
    }

    #[test]
    fn test_refresh_biomes_reranks_expanded_rows() {
        let mut registry = TagRegistry::new();
        registry.insert("minecraft:swamp", ["#minecraft:is_swamp"]);
        registry.insert("minecraft:mangrove_swamp", ["#minecraft:is_swamp"]);
        let resolver = TagResolver::new(&registry);
        let options = ExtractOptions::default();

        let row = |pokemon: &str, biomes: &str| SpawnRow {
            pokemon: pokemon.into(),
            bucket: "common".into(),
            biomes: biomes.into(),
            ..Default::default()
        };
        let mut rows = vec![
            row("wooper", "minecraft:is_swamp"),
            row("lotad", "minecraft:swamp"),
        ];
        ranking::rank(&mut rows, &options.separator);

        let stats = refresh_biomes(&mut rows, &resolver, &options);
        assert_eq!(stats.ranked, 2);
        assert_eq!(rows[0].biomes, "minecraft:mangrove_swamp, minecraft:swamp");
        assert_eq!(rows[0].best_biomes.as_deref(), Some("minecraft:mangrove_swamp"));
        assert_eq!(rows[0].competitors, Some(0));
        assert_eq!(rows[1].competitors, Some(1));

        let mut reranked = rows.clone();
        ranking::rank(&mut reranked, &options.separator);
        assert_eq!(rows, reranked);
    }

    #[test]
    fn test_load_registry_without_sources() {
        let registry = load_registry(Some(Path::new("/nonexistent/tags.txt")), None);
        assert!(registry.is_empty());
    }
}
