use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForumError {
    #[error("source not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("table `{table}` is missing required column `{column}`")]
    MissingColumn { table: String, column: String },
    #[error("unknown query: {0}")]
    UnknownQuery(String),
    #[error("known-name pattern could not be built: {0}")]
    NamePattern(#[from] regex::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ForumError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        ForumError::MissingColumn { table: table.to_string(), column: column.to_string() }
    }

    /// True for the conditions an API layer reports as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForumError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ForumError>;
