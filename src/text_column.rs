//! Per-cell text anonymization of one column, with the reversal mapping kept beside
//! each row in an auxiliary column. The mapping is stored as serialized JSON and is
//! never inspected here.

use crate::error::Result;
use crate::table::{Table, Value};
use crate::text_anonymizer::{TextAnonymizer, TextMapping};
use rayon::prelude::*;

pub fn mapping_column_name(column: &str) -> String {
    format!("_{column}_AnonymizationMap")
}

/// Anonymizes every non-null cell of `column` that has no stored mapping yet.
/// Returns the number of cells processed.
pub fn anonymize_column(
    table: &mut Table,
    column: &str,
    anonymizer: &dyn TextAnonymizer,
    parallel: bool,
) -> Result<usize> {
    let idx = table.require_column(column)?;
    let map_col = mapping_column_name(column);
    let map_idx = table.column_index(&map_col);

    // (text, existing mapping) per row
    let cells: Vec<(Value, Value)> = table
        .rows()
        .iter()
        .map(|r| (r[idx].clone(), map_idx.map(|m| r[m].clone()).unwrap_or_default()))
        .collect();

    let anonymize_cell = |(text, existing): &(Value, Value)| -> Result<(Value, Value, bool)> {
        if !existing.is_null() {
            return Ok((text.clone(), existing.clone(), false));
        }
        match text.render() {
            Some(s) => {
                let (anon, mapping) = anonymizer.anonymize(&s);
                Ok((Value::Text(anon), Value::Text(mapping.to_json()?), true))
            }
            None => Ok((Value::Null, Value::Null, false)),
        }
    };

    let results: Vec<(Value, Value, bool)> = if parallel {
        cells.par_iter().map(anonymize_cell).collect::<Result<_>>()?
    } else {
        cells.iter().map(anonymize_cell).collect::<Result<_>>()?
    };

    let processed = results.iter().filter(|(_, _, done)| *done).count();
    let (texts, maps): (Vec<Value>, Vec<Value>) = results.into_iter().map(|(t, m, _)| (t, m)).unzip();
    table.set_column(column, texts);
    table.set_column(&map_col, maps);
    tracing::info!(table = table.name(), column, cells = processed, parallel, "text column anonymized");
    Ok(processed)
}

/// Restores original text for an authorized consumer. The auxiliary column is dropped.
pub fn deanonymize_column(table: &Table, column: &str, anonymizer: &dyn TextAnonymizer) -> Result<Table> {
    let idx = table.require_column(column)?;
    let map_col = mapping_column_name(column);
    let map_idx = table.require_column(&map_col)?;

    let mut restored = Vec::with_capacity(table.len());
    for row in table.rows() {
        let value = match (row[idx].as_str(), row[map_idx].as_str()) {
            (Some(text), Some(raw)) => Value::Text(anonymizer.deanonymize(text, &TextMapping::from_json(raw)?)),
            _ => row[idx].clone(),
        };
        restored.push(value);
    }

    let mut out = table.clone();
    out.set_column(column, restored);
    out.drop_column(&map_col);
    Ok(out)
}
