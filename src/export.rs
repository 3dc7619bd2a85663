// CSV export of the spawn table for spreadsheet users.

use std::io::Write;
use std::path::Path;

use crate::extract::{Column, SpawnRow};

/// Write `rows` as CSV with a header row, in fixed column order.
/// The header is written even when there are no rows.
pub fn write_rows<W: Write>(writer: W, rows: &[SpawnRow]) -> Result<(), csv::Error> {
    let mut out = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    out.write_record(Column::ALL.iter().map(|c| c.header()))?;
    for row in rows {
        let cells: Vec<_> = Column::ALL.iter().map(|&c| row.text(c)).collect();
        out.write_record(cells.iter().map(|cell| cell.as_bytes()))?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, rows: &[SpawnRow]) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_rows(file, rows)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Wrote CSV export");
    Ok(())
}

/// Read rows back from a CSV export. A blank Best Biomes cell reads back
/// as absent; CSV cannot tell "no biomes" from "excluded" there.
pub fn read_rows<R: std::io::Read>(reader: R) -> Result<Vec<SpawnRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    reader.deserialize().collect()
}
