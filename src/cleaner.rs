//! Record cleaning: blank cells to null, empty rows out, HTML to text, dates parsed.
//!
//! [`clean`] never touches the table it is given; the cleaned copy is returned.

use crate::{dates, html};
use crate::table::{Table, Value};

#[derive(Debug, Clone)]
pub struct CleanOptions {
    /// Free-text column converted from HTML to plain text.
    pub text_column: String,
    /// Candidate date columns in priority order; only the first present one is parsed.
    pub date_columns: Vec<String>,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            text_column: "MessageText".to_string(),
            date_columns: vec!["PostedDate".to_string(), "PostDate".to_string(), "StartDate".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub rows_in: usize,
    pub rows_dropped: usize,
    pub blank_cells: usize,
    pub unparseable_dates: usize,
}

pub fn clean(table: &Table, opts: &CleanOptions) -> Table {
    clean_with_stats(table, opts).0
}

pub fn clean_with_stats(table: &Table, opts: &CleanOptions) -> (Table, CleanStats) {
    let mut out = table.clone();
    let mut stats = CleanStats { rows_in: table.len(), ..Default::default() };

    // HTML goes first so that markup-only cells are caught by the blank check below.
    if let Some(idx) = out.column_index(&opts.text_column) {
        out.map_column(idx, |v| match v {
            Value::Text(s) => Value::Text(html::strip_html(s)),
            other => other.clone(),
        });
    }

    let width = out.columns().len();
    for idx in 0..width {
        out.map_column(idx, |v| match v {
            Value::Text(s) if s.trim().is_empty() => {
                stats.blank_cells += 1;
                Value::Null
            }
            other => other.clone(),
        });
    }

    out.retain(|row| row.iter().any(|v| !v.is_null()));
    stats.rows_dropped = stats.rows_in - out.len();

    if let Some((name, idx)) = out.first_present(&opts.date_columns) {
        out.map_column(idx, |v| match v {
            Value::Text(s) => match dates::parse_date(s) {
                Some(d) => Value::Date(d),
                None => {
                    stats.unparseable_dates += 1;
                    Value::Null
                }
            },
            other => other.clone(),
        });
        if stats.unparseable_dates > 0 {
            tracing::debug!(table = out.name(), column = name, count = stats.unparseable_dates, "unparseable dates set to null");
        }
    }

    tracing::info!(
        table = out.name(),
        rows_in = stats.rows_in,
        rows_dropped = stats.rows_dropped,
        blank_cells = stats.blank_cells,
        "table cleaned"
    );
    (out, stats)
}
