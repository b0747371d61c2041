use crate::cleaner::CleanOptions;
use crate::error::{ForumError, Result};
use crate::metrics::MetricsConfig;
use crate::segment::SegmentColumns;
use crate::text_anonymizer::NAME_PATTERN_SIZE_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub tables: Vec<String>,
    pub id_column: String,
    pub text_column: String,
    pub date_columns: Vec<String>,
    pub month_date_columns: Vec<String>,
    pub account_type_column: String,
    pub top_n: usize,
    pub anonymize_text: bool,
    /// Spread per-cell text anonymization over the rayon pool.
    pub parallel: bool,
    pub known_names: Vec<String>,
    /// Compiled-size ceiling for the known-name matcher, in bytes.
    pub name_pattern_size_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            tables: ["accounts", "groups", "messages", "topics"].iter().map(|s| s.to_string()).collect(),
            id_column: "PosterID".to_string(),
            text_column: "MessageText".to_string(),
            date_columns: vec!["PostedDate".to_string(), "PostDate".to_string(), "StartDate".to_string()],
            month_date_columns: vec!["PostDate".to_string(), "PostedDate".to_string()],
            account_type_column: "AccountID".to_string(),
            top_n: 100,
            anonymize_text: true,
            parallel: false,
            known_names: Vec::new(),
            name_pattern_size_limit: NAME_PATTERN_SIZE_LIMIT,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ForumError::NotFound { path: path.to_path_buf() });
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn clean_options(&self) -> CleanOptions {
        CleanOptions {
            text_column: self.text_column.clone(),
            date_columns: self.date_columns.clone(),
        }
    }

    pub fn metrics(&self) -> MetricsConfig {
        MetricsConfig {
            id_column: self.id_column.clone(),
            text_column: self.text_column.clone(),
            month_date_columns: self.month_date_columns.clone(),
            ..MetricsConfig::default()
        }
    }

    pub fn segment_columns(&self) -> SegmentColumns {
        SegmentColumns {
            account_type_column: self.account_type_column.clone(),
            id_column: self.id_column.clone(),
            ..SegmentColumns::default()
        }
    }
}
