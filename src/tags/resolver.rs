// Tag resolution: expands biome tag references into concrete biome sets.

use std::collections::{BTreeSet, HashSet};

use super::registry::{strip_marker, TagRegistry, TAG_MARKER};

/// Namespaces that may stand in for one another when a tag is missing
/// under the namespace it was written with. Tried in listed order.
pub const NAMESPACE_FALLBACKS: &[(&str, &[&str])] = &[
    ("biome", &["minecraft", "cobblemon", "c"]),
    ("minecraft", &["cobblemon", "c", "biome"]),
    ("cobblemon", &["minecraft", "c", "biome"]),
    ("c", &["minecraft", "cobblemon", "biome"]),
];

/// Namespaces whose ids are accepted as literal biomes in strict mode
/// even when the registry has never seen them.
pub const LITERAL_NAMESPACES: &[&str] = &["minecraft", "cobblemon"];

const CONDITION_TAG_PATTERN: &str = "is_";

/// How unresolvable tokens are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Keep only registry-valid biomes; unresolved tags are dropped.
    Strict,
    /// Keep unresolved tags verbatim (without the marker) and every literal.
    #[default]
    Lenient,
}

impl ResolveMode {
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            ResolveMode::Strict
        } else {
            ResolveMode::Lenient
        }
    }
}

/// Whether a biome-list token should be treated as a tag reference.
pub fn looks_like_tag(token: &str) -> bool {
    token.starts_with(TAG_MARKER) || token.contains(CONDITION_TAG_PATTERN)
}

/// Alternate spellings of an `is_*` tag under the fallback namespaces.
pub fn fallback_candidates(tag: &str) -> Vec<String> {
    let bare = strip_marker(tag);
    let Some((namespace, path)) = bare.split_once(':') else {
        return Vec::new();
    };
    if !path.starts_with(CONDITION_TAG_PATTERN) {
        return Vec::new();
    }
    NAMESPACE_FALLBACKS
        .iter()
        .find(|(ns, _)| *ns == namespace)
        .map(|(_, alternates)| {
            alternates
                .iter()
                .map(|alt| format!("{alt}:{path}"))
                .collect()
        })
        .unwrap_or_default()
}

fn has_literal_namespace(token: &str) -> bool {
    token
        .split_once(':')
        .is_some_and(|(ns, path)| !path.is_empty() && LITERAL_NAMESPACES.contains(&ns))
}

/// Resolves tag references against a [`TagRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct TagResolver<'a> {
    registry: &'a TagRegistry,
}

impl<'a> TagResolver<'a> {
    pub fn new(registry: &'a TagRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a TagRegistry {
        self.registry
    }

    /// Fully expand `token` into concrete biome names.
    ///
    /// A concrete registry biome resolves to itself. An unknown tag resolves
    /// to the empty set; callers decide whether to keep the raw token.
    pub fn resolve(&self, token: &str) -> BTreeSet<String> {
        let mut visited = HashSet::new();
        self.resolve_inner(token.trim(), &mut visited)
    }

    fn resolve_inner(&self, token: &str, visited: &mut HashSet<String>) -> BTreeSet<String> {
        let bare = strip_marker(token);
        if bare.is_empty() || !visited.insert(bare.to_string()) {
            return BTreeSet::new();
        }

        if let Some(members) = self.registry.members(bare) {
            return self.expand_members(members, visited);
        }
        if self.registry.is_entity(bare) {
            return BTreeSet::from([bare.to_string()]);
        }
        for candidate in fallback_candidates(bare) {
            if let Some(members) = self.registry.members(&candidate) {
                return self.expand_members(members, visited);
            }
        }
        BTreeSet::new()
    }

    fn expand_members(
        &self,
        members: &BTreeSet<String>,
        visited: &mut HashSet<String>,
    ) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for member in members {
            if member.starts_with(TAG_MARKER) {
                out.extend(self.resolve_inner(member, visited));
            } else {
                out.insert(member.clone());
            }
        }
        out
    }

    /// Expand a list of biome tokens. Output is deduplicated and sorted.
    pub fn resolve_string_list<'t>(
        &self,
        tokens: impl IntoIterator<Item = &'t str>,
        mode: ResolveMode,
    ) -> Vec<String> {
        let mut out = BTreeSet::new();
        for token in tokens {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if looks_like_tag(token) {
                let resolved = self.resolve(token);
                match mode {
                    ResolveMode::Strict => out.extend(
                        resolved
                            .into_iter()
                            .filter(|biome| self.registry.is_entity(biome)),
                    ),
                    ResolveMode::Lenient if resolved.is_empty() => {
                        out.insert(strip_marker(token).to_string());
                    }
                    ResolveMode::Lenient => out.extend(resolved),
                }
            } else {
                let keep = match mode {
                    ResolveMode::Strict => {
                        self.registry.is_entity(token) || has_literal_namespace(token)
                    }
                    ResolveMode::Lenient => true,
                };
                if keep {
                    out.insert(token.to_string());
                }
            }
        }
        out.into_iter().collect()
    }

    /// Resolve and join with `separator`.
    pub fn resolve_joined<'t>(
        &self,
        tokens: impl IntoIterator<Item = &'t str>,
        mode: ResolveMode,
        separator: &str,
    ) -> String {
        self.resolve_string_list(tokens, mode).join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TagRegistry {
        let mut registry = TagRegistry::new();
        registry.insert("minecraft:forest", ["#minecraft:is_forest"]);
        registry.insert("minecraft:birch_forest", ["#minecraft:is_forest"]);
        registry.insert("minecraft:desert", ["#cobblemon:is_arid"]);
        registry.insert("minecraft:badlands", ["cobblemon:is_arid", "#c:is_badlands"]);
        registry
    }

    #[test]
    fn test_resolve_direct_tag() {
        let registry = registry();
        let resolver = TagResolver::new(&registry);
        let forest = resolver.resolve("#minecraft:is_forest");
        assert_eq!(
            forest.into_iter().collect::<Vec<_>>(),
            vec!["minecraft:birch_forest", "minecraft:forest"]
        );
    }

    #[test]
    fn test_resolve_marker_agnostic() {
        let registry = registry();
        let resolver = TagResolver::new(&registry);
        for tag in ["minecraft:is_forest", "cobblemon:is_arid", "c:is_badlands"] {
            assert_eq!(resolver.resolve(&format!("#{tag}")), resolver.resolve(tag));
        }
    }

    #[test]
    fn test_resolve_concrete_is_identity() {
        let registry = registry();
        let resolver = TagResolver::new(&registry);
        assert_eq!(
            resolver.resolve("minecraft:desert"),
            BTreeSet::from(["minecraft:desert".to_string()])
        );
    }

    #[test]
    fn test_resolve_namespace_fallback() {
        let registry = registry();
        let resolver = TagResolver::new(&registry);
        // Only declared under cobblemon:, written with biome:.
        let arid = resolver.resolve("#biome:is_arid");
        assert!(arid.contains("minecraft:desert"));
        assert!(arid.contains("minecraft:badlands"));
        assert!(resolver.resolve("#biome:not_a_condition").is_empty());
    }

    #[test]
    fn test_fallback_candidates_are_explicit() {
        assert_eq!(
            fallback_candidates("#c:is_forest"),
            vec!["minecraft:is_forest", "cobblemon:is_forest", "biome:is_forest"]
        );
        assert!(fallback_candidates("#modded:is_forest").is_empty());
        assert!(fallback_candidates("minecraft:forest").is_empty());
    }

    #[test]
    fn test_unknown_tag_resolves_empty() {
        let registry = registry();
        let resolver = TagResolver::new(&registry);
        assert!(resolver.resolve("#minecraft:is_moon").is_empty());
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut registry = TagRegistry::new();
        registry.add_tag_members("#a:is_loop", ["#a:is_loop", "minecraft:plains"]);
        let resolver = TagResolver::new(&registry);
        assert_eq!(
            resolver.resolve("#a:is_loop"),
            BTreeSet::from(["minecraft:plains".to_string()])
        );
    }

    #[test]
    fn test_mutual_reference_terminates() {
        let mut registry = TagRegistry::new();
        registry.add_tag_members("#a:is_x", ["#b:is_y", "minecraft:river"]);
        registry.add_tag_members("#b:is_y", ["#a:is_x", "minecraft:beach"]);
        let resolver = TagResolver::new(&registry);
        let resolved = resolver.resolve("#a:is_x");
        assert_eq!(resolved.len(), 2);
        assert!(resolved.contains("minecraft:beach"));
        assert_eq!(resolver.resolve("b:is_y"), resolved);
    }

    #[test]
    fn test_strict_mode_drops_unresolved() {
        let registry = registry();
        let resolver = TagResolver::new(&registry);
        let out = resolver.resolve_string_list(
            [
                "#minecraft:is_forest",
                "#minecraft:is_moon",
                "minecraft:plains",
                "mystery_biome",
                "minecraft:desert",
            ],
            ResolveMode::Strict,
        );
        assert_eq!(
            out,
            vec![
                "minecraft:birch_forest",
                "minecraft:desert",
                "minecraft:forest",
                "minecraft:plains",
            ]
        );
    }

    #[test]
    fn test_strict_mode_filters_datapack_members() {
        let mut registry = registry();
        registry
            .ingest_tag_json(
                "#mymod:woods",
                r##"{"values": ["#minecraft:is_forest", "minecraft:dark_forest"]}"##,
            )
            .unwrap();
        let resolver = TagResolver::new(&registry);

        let strict = resolver.resolve_string_list(["#mymod:woods"], ResolveMode::Strict);
        assert_eq!(strict, vec!["minecraft:birch_forest", "minecraft:forest"]);

        let lenient = resolver.resolve_string_list(["#mymod:woods"], ResolveMode::Lenient);
        assert!(lenient.contains(&"minecraft:dark_forest".to_string()));
    }

    #[test]
    fn test_lenient_mode_preserves_unresolved() {
        let registry = registry();
        let resolver = TagResolver::new(&registry);
        let out = resolver.resolve_string_list(
            ["#minecraft:is_moon", "mystery_biome", "cobblemon:is_arid"],
            ResolveMode::Lenient,
        );
        assert_eq!(
            out,
            vec![
                "minecraft:badlands",
                "minecraft:desert",
                "minecraft:is_moon",
                "mystery_biome",
            ]
        );
    }

    #[test]
    fn test_resolve_joined_dedupes_and_sorts() {
        let registry = registry();
        let resolver = TagResolver::new(&registry);
        let joined = resolver.resolve_joined(
            ["minecraft:forest", "#minecraft:is_forest", " minecraft:forest "],
            ResolveMode::Lenient,
            ", ",
        );
        assert_eq!(joined, "minecraft:birch_forest, minecraft:forest");
    }
}
