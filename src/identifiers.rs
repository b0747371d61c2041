//! Stable person-id remapping shared by every table of one run.
//!
//! Original ids are gathered across all tables, put in natural order and numbered
//! `user_1 .. user_k`. The same input set always yields the same map, whatever
//! the row order. The persisted map allows re-identification and is sensitive.

use crate::table::{Table, Value};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

pub const SYNTHETIC_PREFIX: &str = "user_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    #[serde(rename = "OriginalID")]
    pub original_id: String,
    #[serde(rename = "AnonymizedID")]
    pub anonymized_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMap {
    entries: Vec<MappingEntry>,
    lookup: AHashMap<String, usize>,
}

impl IdentifierMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.lookup.get(original).map(|&i| self.entries[i].anonymized_id.as_str())
    }

    /// Entries in assignment order.
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Auditable two-column form (`OriginalID`, `AnonymizedID`).
    pub fn to_table(&self, name: &str) -> Table {
        let mut t = Table::new(name, vec!["OriginalID".to_string(), "AnonymizedID".to_string()]);
        for e in &self.entries {
            t.push_row(vec![Value::text(&e.original_id), Value::text(&e.anonymized_id)]);
        }
        t
    }
}

/// Numeric order when every id is a number, lexicographic otherwise.
fn natural_sort(ids: &mut [String]) {
    let all_numeric = ids.iter().all(|s| parse_numeric(s).is_some());
    if all_numeric {
        ids.sort_by(|a, b| {
            let (x, y) = (parse_numeric(a).unwrap_or(0.0), parse_numeric(b).unwrap_or(0.0));
            x.total_cmp(&y).then_with(|| a.cmp(b))
        });
    } else {
        ids.sort();
    }
}

fn parse_numeric(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

pub fn build_mapping(tables: &[Table], id_column: &str) -> IdentifierMap {
    let mut seen: AHashSet<String> = AHashSet::new();
    for t in tables {
        if let Some(idx) = t.column_index(id_column) {
            seen.extend(t.column_values(idx).filter_map(Value::render));
        }
    }
    let mut ids: Vec<String> = seen.into_iter().collect();
    natural_sort(&mut ids);

    let mut map = IdentifierMap::default();
    for (i, original) in ids.into_iter().enumerate() {
        map.lookup.insert(original.clone(), i);
        map.entries.push(MappingEntry {
            original_id: original,
            anonymized_id: format!("{SYNTHETIC_PREFIX}{}", i + 1),
        });
    }
    tracing::info!(column = id_column, ids = map.len(), "identifier mapping built");
    map
}

/// Rewrites `id_column` in place in every table carrying it. Values absent from the
/// map become null. Returns the number of cells rewritten.
pub fn apply_mapping(tables: &mut [Table], id_column: &str, map: &IdentifierMap) -> usize {
    let mut rewritten = 0usize;
    for t in tables.iter_mut() {
        let Some(idx) = t.column_index(id_column) else { continue };
        t.map_column(idx, |v| {
            let mapped = v.render().and_then(|orig| map.get(&orig).map(Value::text));
            match mapped {
                Some(m) => {
                    rewritten += 1;
                    m
                }
                None => Value::Null,
            }
        });
    }
    rewritten
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCount {
    #[serde(rename = "AnonymizedID")]
    pub anonymized_id: String,
    #[serde(rename = "Count")]
    pub count: usize,
}

/// Occurrences of each id across all tables, most frequent first; ties keep first appearance.
pub fn count_ids(tables: &[Table], id_column: &str) -> Vec<IdCount> {
    let mut index: AHashMap<String, usize> = AHashMap::new();
    let mut out: Vec<IdCount> = Vec::new();
    for t in tables {
        let Some(idx) = t.column_index(id_column) else { continue };
        for id in t.column_values(idx).filter_map(Value::render) {
            match index.get(&id) {
                Some(&i) => out[i].count += 1,
                None => {
                    index.insert(id.clone(), out.len());
                    out.push(IdCount { anonymized_id: id, count: 1 });
                }
            }
        }
    }
    // stable: equal counts stay in first-appearance order
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

pub fn top_ids(tables: &[Table], id_column: &str, n: usize) -> Vec<IdCount> {
    let mut counts = count_ids(tables, id_column);
    counts.truncate(n);
    counts
}
