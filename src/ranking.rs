// Competition ranking: for every spawn row, the biomes where the fewest
// other Pokémon in the same bucket could spawn alongside it.
//
// Cost is quadratic in bucket size times biome count. Buckets hold tens to
// low hundreds of rows today; the per-bucket biome index keeps the inner scan
// to rows that actually share the biome.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::extract::{split_joined, SpawnRow};

/// Attributes a rival must agree with (or leave unset) to compete.
#[derive(Debug, Clone)]
struct Profile<'a> {
    identity: String,
    biomes: BTreeSet<&'a str>,
    key_item: &'a str,
    nearby_blocks: BTreeSet<&'a str>,
    base_blocks: BTreeSet<&'a str>,
    stone_requirements: &'a str,
    custom_team: &'a str,
}

impl<'a> Profile<'a> {
    fn new(row: &'a SpawnRow, separator: &str) -> Self {
        Self {
            identity: row.pokemon.trim().to_lowercase(),
            biomes: split_joined(&row.biomes, separator).collect(),
            key_item: row.key_item.trim(),
            nearby_blocks: split_joined(&row.needed_nearby_blocks, separator).collect(),
            base_blocks: split_joined(&row.needed_base_blocks, separator).collect(),
            stone_requirements: row.stone_requirements.trim(),
            custom_team: row.custom_pokemons_in_team.trim(),
        }
    }

    fn compatible(&self, other: &Profile<'_>) -> bool {
        text_compatible(self.key_item, other.key_item)
            && set_compatible(&self.nearby_blocks, &other.nearby_blocks)
            && set_compatible(&self.base_blocks, &other.base_blocks)
            && text_compatible(self.stone_requirements, other.stone_requirements)
            && text_compatible(self.custom_team, other.custom_team)
    }
}

fn text_compatible(a: &str, b: &str) -> bool {
    a.is_empty() || b.is_empty() || a == b
}

fn set_compatible(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> bool {
    a.is_empty() || b.is_empty() || a == b
}

/// Whether two rows could occupy the same biome slot: on each of key item,
/// nearby blocks, base blocks, stone requirements and custom team, either
/// side leaves it unset or both hold the same value.
pub fn compatible(a: &SpawnRow, b: &SpawnRow, separator: &str) -> bool {
    Profile::new(a, separator).compatible(&Profile::new(b, separator))
}

/// Summary of one ranking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankStats {
    pub ranked: usize,
    pub excluded: usize,
    pub buckets: usize,
}

/// Identities of the rows competing with `rows[index]` in `biome`.
pub fn rivals_in_biome(rows: &[SpawnRow], index: usize, biome: &str, separator: &str) -> BTreeSet<String> {
    let profiles: Vec<Profile<'_>> = rows.iter().map(|r| Profile::new(r, separator)).collect();
    let me = &rows[index];
    let candidates: Vec<usize> = (0..rows.len())
        .filter(|&j| rows[j].bucket == me.bucket && profiles[j].biomes.contains(biome))
        .collect();
    rivals(&profiles, index, &candidates)
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn rivals<'p>(profiles: &'p [Profile<'_>], index: usize, candidates: &[usize]) -> BTreeSet<&'p str> {
    let me = &profiles[index];
    candidates
        .iter()
        .map(|&j| &profiles[j])
        .filter(|other| other.identity != me.identity && me.compatible(other))
        .map(|other| other.identity.as_str())
        .collect()
}

/// Fill `best_biomes` and `competitors` for every row, in one pass over the
/// complete row set.
///
/// Rows without a bucket or Pokémon are excluded and keep both fields
/// absent. Rows without biomes get an empty subset and zero competitors.
pub fn rank(rows: &mut [SpawnRow], separator: &str) -> RankStats {
    let results = compute(rows, separator);
    let mut stats = RankStats::default();
    for (row, result) in rows.iter_mut().zip(results.outcomes) {
        match result {
            Some((best, count)) => {
                row.best_biomes = Some(best);
                row.competitors = Some(count);
                stats.ranked += 1;
            }
            None => {
                row.best_biomes = None;
                row.competitors = None;
                stats.excluded += 1;
            }
        }
    }
    stats.buckets = results.buckets;
    tracing::info!(
        ranked = stats.ranked,
        excluded = stats.excluded,
        buckets = stats.buckets,
        "Ranked spawn competition"
    );
    stats
}

struct Computed {
    outcomes: Vec<Option<(String, u32)>>,
    buckets: usize,
}

fn compute(rows: &[SpawnRow], separator: &str) -> Computed {
    let profiles: Vec<Profile<'_>> = rows.iter().map(|r| Profile::new(r, separator)).collect();

    let mut buckets: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        let bucket = row.bucket.trim();
        if bucket.is_empty() || profiles[i].identity.is_empty() {
            continue;
        }
        buckets.entry(bucket).or_default().push(i);
    }

    let mut outcomes: Vec<Option<(String, u32)>> = vec![None; rows.len()];
    for members in buckets.values() {
        let mut by_biome: HashMap<&str, Vec<usize>> = HashMap::new();
        for &i in members {
            for &biome in &profiles[i].biomes {
                by_biome.entry(biome).or_default().push(i);
            }
        }

        for &i in members {
            let biomes = &profiles[i].biomes;
            if biomes.is_empty() {
                outcomes[i] = Some((String::new(), 0));
                continue;
            }
            let counts: Vec<(&str, usize)> = biomes
                .iter()
                .map(|&biome| {
                    let candidates = by_biome.get(biome).map(Vec::as_slice).unwrap_or(&[]);
                    (biome, rivals(&profiles, i, candidates).len())
                })
                .collect();
            let min = counts.iter().map(|&(_, n)| n).min().unwrap_or(0);
            let best: Vec<&str> = counts
                .iter()
                .filter(|&&(_, n)| n == min)
                .map(|&(biome, _)| biome)
                .collect();
            outcomes[i] = Some((best.join(separator), min as u32));
        }
    }

    Computed {
        outcomes,
        buckets: buckets.len(),
    }
}

/// Distinct Pokémon per bucket, ignoring biomes and compatibility.
pub fn bucket_population(rows: &[SpawnRow]) -> HashMap<String, usize> {
    let mut seen: HashMap<String, HashSet<String>> = HashMap::new();
    for row in rows {
        let bucket = row.bucket.trim();
        let identity = row.pokemon.trim().to_lowercase();
        if bucket.is_empty() || identity.is_empty() {
            continue;
        }
        seen.entry(bucket.to_string()).or_default().insert(identity);
    }
    seen.into_iter().map(|(b, ids)| (b, ids.len())).collect()
}
