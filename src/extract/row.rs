// Flat spawn row: one per spawn rule, with a fixed ordered column set.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

macro_rules! spawn_columns {
    ($($variant:ident => $field:ident : $header:literal),* $(,)?) => {
        /// Output columns, in table order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Column {
            $($variant,)*
            BestBiomes,
            Competitors,
        }

        /// One extracted spawn rule. Every text column defaults to `""`.
        /// `best_biomes`/`competitors` are written only by the ranker.
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct SpawnRow {
            $(
                #[serde(rename = $header, default)]
                pub $field: String,
            )*
            #[serde(rename = "Best Biomes", default)]
            pub best_biomes: Option<String>,
            #[serde(rename = "Competitors", default)]
            pub competitors: Option<u32>,
        }

        impl Column {
            pub const ALL: &'static [Column] = &[
                $(Column::$variant,)*
                Column::BestBiomes,
                Column::Competitors,
            ];

            pub fn header(self) -> &'static str {
                match self {
                    $(Column::$variant => $header,)*
                    Column::BestBiomes => "Best Biomes",
                    Column::Competitors => "Competitors",
                }
            }
        }

        impl SpawnRow {
            /// Text of one column; ranker columns render blank when absent.
            pub fn text(&self, column: Column) -> Cow<'_, str> {
                match column {
                    $(Column::$variant => Cow::Borrowed(self.$field.as_str()),)*
                    Column::BestBiomes => Cow::Borrowed(self.best_biomes.as_deref().unwrap_or("")),
                    Column::Competitors => self
                        .competitors
                        .map(|n| Cow::Owned(n.to_string()))
                        .unwrap_or(Cow::Borrowed("")),
                }
            }

            /// Mutable access to a text column. Ranker columns are not exposed.
            pub fn text_mut(&mut self, column: Column) -> Option<&mut String> {
                match column {
                    $(Column::$variant => Some(&mut self.$field),)*
                    Column::BestBiomes | Column::Competitors => None,
                }
            }
        }
    };
}

spawn_columns! {
    Pokemon => pokemon: "Pokemon",
    Bucket => bucket: "Bucket",
    Dimensions => dimensions: "Dimensions",
    Biomes => biomes: "Biomes",
    Structures => structures: "Structures",
    MoonPhase => moon_phase: "Moon Phase",
    CanSeeSky => can_see_sky: "Can See Sky",
    MinX => min_x: "Min X",
    MinY => min_y: "Min Y",
    MinZ => min_z: "Min Z",
    MaxX => max_x: "Max X",
    MaxY => max_y: "Max Y",
    MaxZ => max_z: "Max Z",
    MinLight => min_light: "Min Light",
    MaxLight => max_light: "Max Light",
    MinSkyLight => min_sky_light: "Min Sky Light",
    MaxSkyLight => max_sky_light: "Max Sky Light",
    TimeRange => time_range: "Time Range",
    IsRaining => is_raining: "Is Raining",
    IsThundering => is_thundering: "Is Thundering",
    IsSlimeChunk => is_slime_chunk: "Is Slime Chunk",
    Labels => labels: "Labels",
    LabelMode => label_mode: "Label Mode",
    MinWidth => min_width: "Min Width",
    MaxWidth => max_width: "Max Width",
    MinHeight => min_height: "Min Height",
    MaxHeight => max_height: "Max Height",
    NeededNearbyBlocks => needed_nearby_blocks: "Needed Nearby Blocks",
    NeededBaseBlocks => needed_base_blocks: "Needed Base Blocks",
    MinDepth => min_depth: "Min Depth",
    MaxDepth => max_depth: "Max Depth",
    FluidIsSource => fluid_is_source: "Fluid Is Source",
    FluidBlock => fluid_block: "Fluid Block",
    KeyItem => key_item: "Key Item",
    StoneRequirements => stone_requirements: "Stone Requirements",
    CustomPokemonsInTeam => custom_pokemons_in_team: "Custom Pokemons In Team",
}

impl Column {
    pub fn from_header(header: &str) -> Option<Column> {
        let header = header.trim();
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.header().eq_ignore_ascii_case(header))
    }
}

/// Split a separator-joined list back into trimmed, non-empty items.
pub fn split_joined<'a>(text: &'a str, separator: &str) -> impl Iterator<Item = &'a str> + 'a {
    let trimmed = separator.trim();
    let pattern = if trimmed.is_empty() {
        separator.to_string()
    } else {
        trimmed.to_string()
    };
    let items: Vec<&'a str> = if pattern.is_empty() {
        vec![text]
    } else {
        text.split(pattern.as_str()).collect()
    };
    items.into_iter().map(str::trim).filter(|s| !s.is_empty())
}
