//! Batch run: load, clean, anonymize, aggregate, segment. Each stage finishes
//! before the next begins and writes its checkpoint artifacts to the output dir.

use crate::cleaner;
use crate::config::PipelineConfig;
use crate::csv_io;
use crate::error::Result;
use crate::identifiers::{self, IdentifierMap};
use crate::metrics;
use crate::segment::{self, POSTER_COUNT_HEADERS};
use crate::table::Table;
use crate::text_anonymizer::{PatternAnonymizer, TextAnonymizer};
use crate::text_column;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MAPPING_ARTIFACT: &str = "anonymization_mapping";
const ID_COUNT_HEADERS: [&str; 2] = ["AnonymizedID", "Count"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableProfile {
    pub name: String,
    pub rows: usize,
    pub rows_dropped: usize,
    pub unparseable_dates: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub output_dir: PathBuf,
    pub tables: Vec<TableProfile>,
    pub mapped_ids: usize,
    pub text_cells_anonymized: usize,
    pub account_types: Vec<String>,
    pub artifacts: Vec<Artifact>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

struct Checkpoint<'a> {
    dir: &'a Path,
    artifacts: Vec<Artifact>,
}

impl<'a> Checkpoint<'a> {
    fn table(&mut self, t: &Table) -> Result<()> {
        let rows = csv_io::write_table(t, self.dir)?;
        self.record(t.name(), rows);
        Ok(())
    }

    fn records<T: Serialize>(&mut self, name: &str, headers: &[&str], rows: &[T]) -> Result<()> {
        let n = csv_io::write_records(rows, headers, self.dir, name)?;
        self.record(name, n);
        Ok(())
    }

    fn record(&mut self, name: &str, rows: usize) {
        tracing::info!(artifact = name, rows, "artifact written");
        self.artifacts.push(Artifact { name: name.to_string(), rows });
    }
}

fn find<'t>(tables: &'t [Table], name: &str) -> Option<&'t Table> {
    tables.iter().find(|t| t.name() == name)
}

fn without_column(t: &Table, column: &str) -> Table {
    let mut out = t.clone();
    out.drop_column(column);
    out
}

/// Runs with the built-in pattern anonymizer, seeded with `config.known_names`.
pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    let anonymizer = PatternAnonymizer::with_names_limit(&config.known_names, config.name_pattern_size_limit)?;
    run_with(config, &anonymizer)
}

pub fn run_with(config: &PipelineConfig, anonymizer: &dyn TextAnonymizer) -> Result<RunReport> {
    std::fs::create_dir_all(&config.output_dir)?;
    let mut report = RunReport { output_dir: config.output_dir.clone(), ..Default::default() };
    let mut ckpt = Checkpoint { dir: &config.output_dir, artifacts: Vec::new() };

    // load + clean
    let clean_opts = config.clean_options();
    let mut tables: Vec<Table> = Vec::with_capacity(config.tables.len());
    for name in &config.tables {
        let raw = csv_io::read_table(&csv_io::artifact_path(&config.data_dir, name), name)?;
        let (cleaned, stats) = cleaner::clean_with_stats(&raw, &clean_opts);
        report.tables.push(TableProfile {
            name: name.clone(),
            rows: cleaned.len(),
            rows_dropped: stats.rows_dropped,
            unparseable_dates: stats.unparseable_dates,
            columns: cleaned.columns().len(),
            column_names: cleaned.columns().to_vec(),
        });
        tables.push(cleaned);
    }

    // identifiers
    let map: IdentifierMap = identifiers::build_mapping(&tables, &config.id_column);
    identifiers::apply_mapping(&mut tables, &config.id_column, &map);
    report.mapped_ids = map.len();
    ckpt.table(&map.to_table(MAPPING_ARTIFACT))?;
    let top = identifiers::top_ids(&tables, &config.id_column, config.top_n);
    ckpt.records(&format!("anonymized_top_{}", config.top_n), &ID_COUNT_HEADERS, &top)?;

    // free text
    if config.anonymize_text {
        for t in tables.iter_mut().filter(|t| t.has_column(&config.text_column)) {
            report.text_cells_anonymized +=
                text_column::anonymize_column(t, &config.text_column, anonymizer, config.parallel)?;
        }
    }

    for t in &tables {
        ckpt.table(&t.clone().with_name(format!("{}_cleaned_anonymized", t.name())))?;
    }

    // aggregates
    let messages = find(&tables, "messages");
    let topics = find(&tables, "topics");
    let cfg = config.metrics();
    match messages {
        Some(m) => {
            ckpt.records("words_chars_per_user", &metrics::USER_WORDS_HEADERS, &metrics::words_and_chars_per_user(m, &cfg)?)?;
            ckpt.records("words_chars_per_topic", &metrics::TOPIC_WORDS_HEADERS, &metrics::words_and_chars_per_topic(m, &cfg)?)?;
            ckpt.records("messages_per_topic", &metrics::TOPIC_MESSAGES_HEADERS, &metrics::messages_per_topic(m, &cfg)?)?;
            ckpt.records("topics_per_user", &metrics::USER_TOPICS_HEADERS, &metrics::topics_per_user(m, &cfg)?)?;
            ckpt.records("words_per_user_per_month", &metrics::USER_MONTH_HEADERS, &metrics::words_per_user_per_month(m, &cfg)?)?;
        }
        None => {
            tracing::warn!("messages table not loaded, aggregates skipped");
            report.skipped.push("aggregates".to_string());
        }
    }
    match metrics::word_frequency(messages, &config.text_column) {
        Some(freq) => ckpt.records("word_count_message_text", &metrics::WORD_COUNT_HEADERS, &freq)?,
        None => report.skipped.push("word_count_message_text".to_string()),
    }
    match metrics::posts_per_topic(topics, messages, &cfg.topic_column) {
        Some(ranked) => {
            ckpt.table(&ranked)?;
            ckpt.table(&ranked.head(config.top_n).with_name(format!("top_{}_topics_by_post_count", config.top_n)))?;
        }
        None => report.skipped.push("topics_with_post_counts".to_string()),
    }

    // segmentation; reversal maps stay in the cleaned_anonymized checkpoints only
    let map_col = text_column::mapping_column_name(&config.text_column);
    match (find(&tables, "groups"), topics, messages) {
        (Some(g), Some(t), Some(m)) => {
            let (g, t, m) = (without_column(g, &map_col), without_column(t, &map_col), without_column(m, &map_col));
            let partitions = segment::split_by_account_type(&g, &t, &m, &config.segment_columns())?;
            for p in &partitions {
                ckpt.table(&p.groups)?;
                ckpt.table(&p.topics)?;
                ckpt.table(&p.messages)?;
                report.account_types.push(p.account_type.clone());
            }
            for board in segment::top_posters(&partitions, config.top_n, &config.id_column) {
                ckpt.records(&board.artifact_name(config.top_n), &POSTER_COUNT_HEADERS, &board.posters)?;
            }
        }
        _ => {
            tracing::warn!("groups, topics and messages are all needed for segmentation, stage skipped");
            report.skipped.push("segmentation".to_string());
        }
    }

    let profiles_path = config.output_dir.join("table_profiles.json");
    std::fs::write(&profiles_path, serde_json::to_string_pretty(&report.tables)?)?;

    report.artifacts = ckpt.artifacts;
    tracing::info!(artifacts = report.artifacts.len(), "pipeline finished");
    Ok(report)
}

/// Loads one persisted checkpoint table, e.g. `messages_cleaned_anonymized`.
pub fn load_checkpoint(output_dir: &Path, name: &str) -> Result<Table> {
    csv_io::read_table(&csv_io::artifact_path(output_dir, name), name)
}

/// Loads the sensitive id map back from disk.
pub fn load_mapping(output_dir: &Path) -> Result<Table> {
    let t = load_checkpoint(output_dir, MAPPING_ARTIFACT)?;
    t.require_column("OriginalID")?;
    t.require_column("AnonymizedID")?;
    Ok(t)
}
