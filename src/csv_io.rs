use crate::error::{ForumError, Result};
use crate::table::{Table, Value};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub fn artifact_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.csv"))
}

/// Reads a headed CSV file. Rows with more fields than the header, or that fail to
/// decode, are skipped with a warning; short rows are padded with nulls.
pub fn read_table(path: &Path, name: &str) -> Result<Table> {
    if !path.exists() {
        return Err(ForumError::NotFound { path: path.to_path_buf() });
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let width = columns.len();
    let mut table = Table::new(name, columns);
    let mut skipped = 0usize;

    for rec in reader.records() {
        let rec = match rec {
            Ok(r) => r,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                skipped += 1;
                let line = e.position().map(|p| p.line());
                tracing::warn!(table = name, ?line, error = %e, "skipping malformed row");
                continue;
            }
        };
        if rec.len() > width {
            skipped += 1;
            let line = rec.position().map(|p| p.line());
            tracing::warn!(table = name, ?line, expected = width, found = rec.len(), "skipping row with too many fields");
            continue;
        }
        table.push_row(rec.iter().map(Value::from_cell).collect());
    }

    tracing::info!(table = name, rows = table.len(), columns = width, skipped, path = %path.display(), "table loaded");
    Ok(table)
}

/// Writes `table` as `<dir>/<table name>.csv`; returns the row count.
pub fn write_table(table: &Table, dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir)?;
    let path = artifact_path(dir, table.name());
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    tracing::debug!(path = %path.display(), rows = table.len(), "table written");
    Ok(table.len())
}

/// Writes typed rows under an explicit header, so empty results still carry their schema.
pub fn write_records<T: Serialize>(rows: &[T], headers: &[&str], dir: &Path, name: &str) -> Result<usize> {
    fs::create_dir_all(dir)?;
    let path = artifact_path(dir, name);
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(&path)?;
    writer.write_record(headers)?;
    for r in rows {
        writer.serialize(r)?;
    }
    writer.flush()?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "records written");
    Ok(rows.len())
}
