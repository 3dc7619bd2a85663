// Text rendering of spawn rows for chat answers: labels per language,
// empty-value sentinel and length-bounded chunking.

use std::borrow::Cow;

use crate::extract::{Column, SpawnRow};
use crate::language::Language;

/// Display token for empty, missing or NaN-like values.
pub const EMPTY_SENTINEL: &str = "∅";

/// Maximum characters per chat message.
pub const MESSAGE_LIMIT: usize = 2000;

const LIST_SEPARATOR: &str = ", ";

/// Normalize a cell for display: blank, `nan`, `none` and `null` all
/// render as [`EMPTY_SENTINEL`].
pub fn safe_field(value: Option<&str>) -> Cow<'_, str> {
    let Some(value) = value else {
        return Cow::Borrowed(EMPTY_SENTINEL);
    };
    let trimmed = value.trim();
    let missing = trimmed.is_empty()
        || trimmed == EMPTY_SENTINEL
        || ["nan", "none", "null"]
            .iter()
            .any(|m| trimmed.eq_ignore_ascii_case(m));
    if missing {
        Cow::Borrowed(EMPTY_SENTINEL)
    } else {
        Cow::Borrowed(value)
    }
}

/// Emoji and label of a column in `language`.
pub fn label(column: Column, language: Language) -> (&'static str, &'static str) {
    let (emoji, fr, en) = match column {
        Column::Pokemon => ("🔍", "Pokémon", "Pokémon"),
        Column::Bucket => ("📌", "Rareté", "Bucket"),
        Column::Dimensions => ("🌍", "Dimensions", "Dimensions"),
        Column::Biomes => ("🏞️", "Biomes", "Biomes"),
        Column::Structures => ("🏰", "Structures", "Structures"),
        Column::MoonPhase => ("🌙", "Phase de lune", "Moon phase"),
        Column::CanSeeSky => ("☀️", "Ciel visible", "Can see sky"),
        Column::MinX => ("⬅️", "X min", "Min X"),
        Column::MinY => ("⬇️", "Y min", "Min Y"),
        Column::MinZ => ("↙️", "Z min", "Min Z"),
        Column::MaxX => ("➡️", "X max", "Max X"),
        Column::MaxY => ("⬆️", "Y max", "Max Y"),
        Column::MaxZ => ("↗️", "Z max", "Max Z"),
        Column::MinLight => ("💡", "Lumière min", "Min light"),
        Column::MaxLight => ("💡", "Lumière max", "Max light"),
        Column::MinSkyLight => ("🌤️", "Lumière du ciel min", "Min sky light"),
        Column::MaxSkyLight => ("🌤️", "Lumière du ciel max", "Max sky light"),
        Column::TimeRange => ("⏰", "Moment de la journée", "Time range"),
        Column::IsRaining => ("☔", "Pluie", "Raining"),
        Column::IsThundering => ("⚡", "Orage", "Thundering"),
        Column::IsSlimeChunk => ("🟢", "Chunk à slime", "Slime chunk"),
        Column::Labels => ("🏷️", "Étiquettes", "Labels"),
        Column::LabelMode => ("📋", "Mode d'étiquettes", "Label mode"),
        Column::MinWidth => ("📏", "Largeur min", "Min width"),
        Column::MaxWidth => ("📐", "Largeur max", "Max width"),
        Column::MinHeight => ("↕️", "Hauteur min", "Min height"),
        Column::MaxHeight => ("↕️", "Hauteur max", "Max height"),
        Column::NeededNearbyBlocks => ("🧱", "Blocs proches requis", "Needed nearby blocks"),
        Column::NeededBaseBlocks => ("🧱", "Blocs de base requis", "Needed base blocks"),
        Column::MinDepth => ("⚓", "Profondeur min", "Min depth"),
        Column::MaxDepth => ("⚓", "Profondeur max", "Max depth"),
        Column::FluidIsSource => ("🔄", "Fluide source", "Fluid is source"),
        Column::FluidBlock => ("🌊", "Bloc de fluide", "Fluid block"),
        Column::KeyItem => ("🔑", "Objet clé", "Key item"),
        Column::StoneRequirements => ("🪨", "Pierres requises", "Stone requirements"),
        Column::CustomPokemonsInTeam => ("👥", "Pokémon requis dans l'équipe", "Required team"),
        Column::BestBiomes => ("🎯", "Meilleurs biomes", "Best biomes"),
        Column::Competitors => ("⚔️", "Concurrents", "Competitors"),
    };
    match language {
        Language::Fr => (emoji, fr),
        Language::En => (emoji, en),
    }
}

/// Title shown for a Pokémon: the translated name with the identifier
/// when they differ.
pub fn display_name(identifier: &str, translated: Option<&str>) -> String {
    match translated {
        Some(name) if !name.eq_ignore_ascii_case(identifier) => format!("{name} ({identifier})"),
        _ => identifier.to_string(),
    }
}

/// One formatted block for `row`. Without `show_all`, empty fields are
/// omitted; with it they render as the sentinel.
pub fn render_row(row: &SpawnRow, language: Language, title: &str, show_all: bool) -> String {
    let mut lines = vec![language.header(title)];
    for &column in Column::ALL.iter().filter(|&&c| c != Column::Pokemon) {
        let text = row.text(column);
        let value = safe_field(Some(&*text));
        if value == EMPTY_SENTINEL && !show_all {
            continue;
        }
        let (emoji, label) = label(column, language);
        lines.push(format!("{emoji} **{label}** : {value}"));
    }
    lines.join("\n")
}

/// Blocks for every row, separated by a blank line.
pub fn render_rows<F>(rows: &[&SpawnRow], language: Language, show_all: bool, translate: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    rows.iter()
        .map(|row| {
            let translated = translate(&row.pokemon);
            let title = display_name(&safe_field(Some(row.pokemon.as_str())), translated.as_deref());
            render_row(row, language, &title, show_all)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ── Chunking ─────────────────────────────────────────────────────────

/// Split `text` into messages of at most `limit` characters. Every message
/// after the first starts with `prefix`. No content is dropped: overlong
/// lines are split at list separators, then at character boundaries.
pub fn chunk_message(text: &str, limit: usize, prefix: &str) -> Vec<String> {
    let budget = body_budget(limit, prefix);
    chunk_bodies(text, budget)
        .into_iter()
        .enumerate()
        .map(|(i, body)| if i == 0 { body } else { format!("{prefix}{body}") })
        .collect()
}

/// Characters left for content once `prefix` is accounted for.
pub fn body_budget(limit: usize, prefix: &str) -> usize {
    limit.saturating_sub(prefix.chars().count()).max(1)
}

/// Pack lines into bodies of at most `budget` characters.
pub fn chunk_bodies(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        for piece in split_long_line(line, budget) {
            let piece_len = piece.chars().count();
            if !current.is_empty() && current_len + 1 + piece_len > budget {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(&piece);
            current_len += piece_len;
        }
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Split one line into pieces of at most `max` characters whose
/// concatenation is the original line.
fn split_long_line(line: &str, max: usize) -> Vec<String> {
    if line.chars().count() <= max {
        return vec![line.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for token in line.split_inclusive(LIST_SEPARATOR) {
        let token_len = token.chars().count();
        if token_len > max {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = token.chars().collect();
            let mut parts: Vec<String> = chars.chunks(max).map(|c| c.iter().collect()).collect();
            if let Some(last) = parts.pop() {
                pieces.extend(parts);
                current_len = last.chars().count();
                current = last;
            }
            continue;
        }
        if current_len + token_len > max {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push_str(token);
        current_len += token_len;
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_field_sentinel() {
        assert_eq!(safe_field(None), EMPTY_SENTINEL);
        assert_eq!(safe_field(Some("")), EMPTY_SENTINEL);
        assert_eq!(safe_field(Some("   ")), EMPTY_SENTINEL);
        assert_eq!(safe_field(Some("NaN")), EMPTY_SENTINEL);
        assert_eq!(safe_field(Some("null")), EMPTY_SENTINEL);
        assert_eq!(safe_field(Some("0")), "0");
        assert_eq!(safe_field(Some("false")), "false");
    }

    fn sample() -> SpawnRow {
        SpawnRow {
            pokemon: "bulbasaur".into(),
            bucket: "rare".into(),
            biomes: "minecraft:forest, minecraft:jungle".into(),
            min_y: "0".into(),
            best_biomes: Some("minecraft:jungle".into()),
            competitors: Some(4),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_row_omits_empty_fields() {
        let text = render_row(&sample(), Language::Fr, "Bulbizarre (bulbasaur)", false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "🔍 **Informations sur Bulbizarre (bulbasaur)**");
        assert!(lines.contains(&"📌 **Rareté** : rare"));
        assert!(lines.contains(&"⬇️ **Y min** : 0"));
        assert!(lines.contains(&"⚔️ **Concurrents** : 4"));
        assert!(!text.contains(EMPTY_SENTINEL));
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_render_row_show_all_uses_sentinel() {
        let text = render_row(&sample(), Language::En, "bulbasaur", true);
        assert!(text.contains("🔑 **Key item** : ∅"));
        // Header plus every column except the name.
        assert_eq!(text.lines().count(), Column::ALL.len());
    }

    #[test]
    fn test_render_rows_translates_titles() {
        let first = sample();
        let mut second = sample();
        second.bucket = "ultra-rare".into();
        let text = render_rows(&[&first, &second], Language::Fr, false, |id| {
            (id == "bulbasaur").then(|| "Bulbizarre".to_string())
        });
        assert_eq!(text.matches("Informations sur Bulbizarre (bulbasaur)").count(), 2);
        assert!(text.contains("\n\n🔍"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("pikachu", Some("Pikachu")), "pikachu");
        assert_eq!(display_name("bulbasaur", Some("Bulbizarre")), "Bulbizarre (bulbasaur)");
        assert_eq!(display_name("mew", None), "mew");
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_message("hello\nworld", MESSAGE_LIMIT, "(cont.) ");
        assert_eq!(chunks, vec!["hello\nworld".to_string()]);
    }

    #[test]
    fn test_chunks_respect_limit_and_keep_every_item() {
        let items: Vec<String> = (0..300).map(|i| format!("minecraft:biome_{i}")).collect();
        let text = format!("🏞️ **Biomes** : {}\n🔑 **Key item** : x", items.join(", "));
        let prefix = "(suite) ";
        let chunks = chunk_message(&text, 200, prefix);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(chunk.chars().count() <= 200, "chunk {i} too long");
            assert_eq!(chunk.starts_with(prefix), i > 0);
        }
        let joined: String = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| if i == 0 { c.as_str() } else { &c[prefix.len()..] })
            .collect::<Vec<_>>()
            .join("");
        for item in &items {
            assert!(joined.contains(item.as_str()), "{item} lost");
        }
        assert!(joined.ends_with("🔑 **Key item** : x"));
    }

    #[test]
    fn test_unbreakable_token_is_hard_split() {
        let token = "x".repeat(45);
        let chunks = chunk_message(&token, 20, "> ");
        let bodies: String = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| if i == 0 { c.clone() } else { c["> ".len()..].to_string() })
            .collect();
        assert_eq!(bodies, token);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn test_split_long_line_reassembles() {
        let line = "a, bb, ccc, dddd, eeeee, ffffff";
        let pieces = split_long_line(line, 8);
        assert_eq!(pieces.concat(), line);
        assert!(pieces.iter().all(|p| p.chars().count() <= 8));
    }
}
