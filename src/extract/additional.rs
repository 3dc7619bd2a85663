// Supplementary rows from a spreadsheet export (CSV), merged after the
// config-derived rows.

use std::path::Path;

use super::row::{split_joined, Column, SpawnRow};
use super::ExtractOptions;
use crate::tags::TagResolver;

/// Supplementary sheet header -> output column.
pub const ADDITIONAL_COLUMN_MAP: &[(&str, Column)] = &[
    ("Pokémon", Column::Pokemon),
    ("Pokemon", Column::Pokemon),
    ("Bucket", Column::Bucket),
    ("Biomes", Column::Biomes),
    ("Time", Column::TimeRange),
    ("skyLightMin", Column::MinSkyLight),
    ("skyLightMax", Column::MaxSkyLight),
    ("canSeeSky", Column::CanSeeSky),
];

fn map_header(header: &str) -> Option<Column> {
    let header = header.trim();
    ADDITIONAL_COLUMN_MAP
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(header))
        .map(|(_, column)| *column)
}

fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || cell.eq_ignore_ascii_case("nan")
}

/// Parse supplementary rows. Unmapped columns are ignored; every column
/// not present in the sheet stays blank. Biomes are resolved like config rows.
pub fn parse_additional<R: std::io::Read>(
    reader: R,
    resolver: &TagResolver<'_>,
    options: &ExtractOptions,
) -> Result<Vec<SpawnRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mapping: Vec<Option<Column>> = reader.headers()?.iter().map(map_header).collect();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let mut row = SpawnRow::default();
        for (cell, column) in record.iter().zip(&mapping) {
            let Some(column) = column else { continue };
            if is_missing(cell) {
                continue;
            }
            let value = match column {
                Column::Biomes => resolver.resolve_joined(
                    split_joined(cell, ","),
                    options.biome_mode,
                    &options.separator,
                ),
                Column::CanSeeSky => super::bool_text(Some(&cell.into())),
                _ => cell.to_string(),
            };
            if let Some(slot) = row.text_mut(*column) {
                *slot = value;
            }
        }
        if row != SpawnRow::default() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Read supplementary rows from `path`. Failures are logged and yield no rows.
pub fn load_additional(
    path: &Path,
    resolver: &TagResolver<'_>,
    options: &ExtractOptions,
) -> Vec<SpawnRow> {
    let result = std::fs::File::open(path)
        .map_err(csv::Error::from)
        .and_then(|file| parse_additional(file, resolver, options));
    match result {
        Ok(rows) => {
            tracing::info!(path = %path.display(), rows = rows.len(), "Merged additional rows");
            rows
        }
        Err(e) => {
            tracing::error!(path = %path.display(), "Failed to read additional sheet: {e}");
            Vec::new()
        }
    }
}
