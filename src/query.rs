use crate::csv_io;
use crate::error::{ForumError, Result};
use crate::metrics::{self, MetricsConfig, TopicMessages, TopicWords, UserMonthWords, UserTopics, UserWords, WordCount};
use crate::table::Table;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const MESSAGES_SOURCE: &str = "messages_cleaned_anonymized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    WordsPerUser,
    WordsPerTopic,
    MessagesPerTopic,
    TopicsPerUser,
    WordsPerUserPerMonth,
    WordFrequency,
}

impl QueryKind {
    pub const ALL: [QueryKind; 6] = [
        QueryKind::WordsPerUser,
        QueryKind::WordsPerTopic,
        QueryKind::MessagesPerTopic,
        QueryKind::TopicsPerUser,
        QueryKind::WordsPerUserPerMonth,
        QueryKind::WordFrequency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::WordsPerUser => "words-per-user",
            QueryKind::WordsPerTopic => "words-per-topic",
            QueryKind::MessagesPerTopic => "messages-per-topic",
            QueryKind::TopicsPerUser => "topics-per-user",
            QueryKind::WordsPerUserPerMonth => "words-per-user-per-month",
            QueryKind::WordFrequency => "word-frequency",
        }
    }
}

impl FromStr for QueryKind {
    type Err = ForumError;

    fn from_str(s: &str) -> Result<Self> {
        QueryKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ForumError::UnknownQuery(s.to_string()))
    }
}

/// Read-only access to the derived metrics, computed on demand from the persisted
/// cleaned and anonymized messages. Each query accepts an exact-match poster filter
/// applied to the messages before aggregation.
pub struct QueryService {
    source: PathBuf,
    config: MetricsConfig,
}

impl QueryService {
    pub fn new(output_dir: &Path) -> Self {
        Self::with_source(csv_io::artifact_path(output_dir, MESSAGES_SOURCE), MetricsConfig::default())
    }

    pub fn with_source(source: PathBuf, config: MetricsConfig) -> Self {
        Self { source, config }
    }

    fn load(&self, poster: Option<&str>) -> Result<Table> {
        let messages = csv_io::read_table(&self.source, MESSAGES_SOURCE)?;
        match poster {
            None => Ok(messages),
            Some(id) => {
                let idx = messages.require_column(&self.config.id_column)?;
                Ok(messages.filter(|row| row[idx].as_str() == Some(id)))
            }
        }
    }

    pub fn words_per_user(&self, poster: Option<&str>) -> Result<Vec<UserWords>> {
        metrics::words_and_chars_per_user(&self.load(poster)?, &self.config)
    }

    pub fn words_per_topic(&self, poster: Option<&str>) -> Result<Vec<TopicWords>> {
        metrics::words_and_chars_per_topic(&self.load(poster)?, &self.config)
    }

    pub fn messages_per_topic(&self, poster: Option<&str>) -> Result<Vec<TopicMessages>> {
        metrics::messages_per_topic(&self.load(poster)?, &self.config)
    }

    pub fn topics_per_user(&self, poster: Option<&str>) -> Result<Vec<UserTopics>> {
        metrics::topics_per_user(&self.load(poster)?, &self.config)
    }

    pub fn words_per_user_per_month(&self, poster: Option<&str>) -> Result<Vec<UserMonthWords>> {
        metrics::words_per_user_per_month(&self.load(poster)?, &self.config)
    }

    /// Empty rather than an error when the text column is absent.
    pub fn word_frequency(&self, poster: Option<&str>) -> Result<Vec<WordCount>> {
        let messages = self.load(poster)?;
        Ok(metrics::word_frequency(Some(&messages), &self.config.text_column).unwrap_or_default())
    }

    /// Dispatch by route-style name; the result is a JSON array of records.
    pub fn run(&self, kind: QueryKind, poster: Option<&str>) -> Result<serde_json::Value> {
        match kind {
            QueryKind::WordsPerUser => records(self.words_per_user(poster)?),
            QueryKind::WordsPerTopic => records(self.words_per_topic(poster)?),
            QueryKind::MessagesPerTopic => records(self.messages_per_topic(poster)?),
            QueryKind::TopicsPerUser => records(self.topics_per_user(poster)?),
            QueryKind::WordsPerUserPerMonth => records(self.words_per_user_per_month(poster)?),
            QueryKind::WordFrequency => records(self.word_frequency(poster)?),
        }
    }
}

fn records<T: Serialize>(rows: Vec<T>) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(rows)?)
}
