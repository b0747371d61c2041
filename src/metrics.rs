//! Derived usage metrics over cleaned, anonymized message tables.
//!
//! Every function is pure: inputs are borrowed, results are fresh rows. Results are
//! sorted with stable sorts, so equal keys keep the order in which they first appear.
//!
//! Missing-column policy differs between metrics. The per-user, per-topic and
//! monthly metrics fail with [`ForumError::MissingColumn`]; [`word_frequency`] and
//! [`posts_per_topic`] return `None` instead.

use crate::dates;
use crate::error::{ForumError, Result};
use crate::table::{Table, Value};
use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub id_column: String,
    pub topic_column: String,
    pub text_column: String,
    /// Candidate post-date columns, first present wins.
    pub month_date_columns: Vec<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            id_column: "PosterID".to_string(),
            topic_column: "ForumTopicID".to_string(),
            text_column: "MessageText".to_string(),
            month_date_columns: vec!["PostDate".to_string(), "PostedDate".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWords {
    #[serde(rename = "PosterID")]
    pub poster_id: String,
    pub word_count: usize,
    pub char_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicWords {
    #[serde(rename = "ForumTopicID")]
    pub topic_id: String,
    pub word_count: usize,
    pub char_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMessages {
    #[serde(rename = "ForumTopicID")]
    pub topic_id: String,
    pub message_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTopics {
    #[serde(rename = "PosterID")]
    pub poster_id: String,
    pub topic_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMonthWords {
    #[serde(rename = "PosterID")]
    pub poster_id: String,
    pub year_month: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    #[serde(rename = "Word")]
    pub word: String,
    #[serde(rename = "Count")]
    pub count: usize,
}

pub const USER_WORDS_HEADERS: [&str; 3] = ["PosterID", "word_count", "char_count"];
pub const TOPIC_WORDS_HEADERS: [&str; 3] = ["ForumTopicID", "word_count", "char_count"];
pub const TOPIC_MESSAGES_HEADERS: [&str; 2] = ["ForumTopicID", "message_count"];
pub const USER_TOPICS_HEADERS: [&str; 2] = ["PosterID", "topic_count"];
pub const USER_MONTH_HEADERS: [&str; 3] = ["PosterID", "year_month", "word_count"];
pub const WORD_COUNT_HEADERS: [&str; 2] = ["Word", "Count"];

/// Whitespace-delimited tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Unicode scalar values, not bytes.
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

fn text_of(v: &Value) -> Option<String> {
    v.render()
}

/// Accumulators iterated in first-appearance order of their keys.
struct FirstSeen<K, A> {
    index: AHashMap<K, usize>,
    groups: Vec<(K, A)>,
}

impl<K: Hash + Eq + Clone, A: Default> FirstSeen<K, A> {
    fn new() -> Self {
        Self { index: AHashMap::new(), groups: Vec::new() }
    }

    fn slot(&mut self, key: K) -> &mut A {
        let i = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                let i = self.groups.len();
                self.index.insert(key.clone(), i);
                self.groups.push((key, A::default()));
                i
            }
        };
        &mut self.groups[i].1
    }

    fn into_groups(self) -> Vec<(K, A)> {
        self.groups
    }
}

fn words_and_chars_by(messages: &Table, key_column: &str, text_column: &str) -> Result<Vec<(String, (usize, usize))>> {
    let key_idx = messages.require_column(key_column)?;
    let text_idx = messages.require_column(text_column)?;
    let mut acc: FirstSeen<String, (usize, usize)> = FirstSeen::new();
    for row in messages.rows() {
        let Some(key) = row[key_idx].render() else { continue };
        let (w, c) = text_of(&row[text_idx])
            .map(|t| (word_count(&t), char_count(&t)))
            .unwrap_or((0, 0));
        let slot = acc.slot(key);
        slot.0 += w;
        slot.1 += c;
    }
    let mut groups = acc.into_groups();
    groups.sort_by(|a, b| (b.1).0.cmp(&(a.1).0));
    Ok(groups)
}

pub fn words_and_chars_per_user(messages: &Table, cfg: &MetricsConfig) -> Result<Vec<UserWords>> {
    Ok(words_and_chars_by(messages, &cfg.id_column, &cfg.text_column)?
        .into_iter()
        .map(|(poster_id, (word_count, char_count))| UserWords { poster_id, word_count, char_count })
        .collect())
}

pub fn words_and_chars_per_topic(messages: &Table, cfg: &MetricsConfig) -> Result<Vec<TopicWords>> {
    Ok(words_and_chars_by(messages, &cfg.topic_column, &cfg.text_column)?
        .into_iter()
        .map(|(topic_id, (word_count, char_count))| TopicWords { topic_id, word_count, char_count })
        .collect())
}

fn count_rows_by(messages: &Table, idx: usize) -> Vec<(String, usize)> {
    let mut acc: FirstSeen<String, usize> = FirstSeen::new();
    for row in messages.rows() {
        if let Some(key) = row[idx].render() {
            *acc.slot(key) += 1;
        }
    }
    let mut groups = acc.into_groups();
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    groups
}

pub fn messages_per_topic(messages: &Table, cfg: &MetricsConfig) -> Result<Vec<TopicMessages>> {
    let idx = messages.require_column(&cfg.topic_column)?;
    Ok(count_rows_by(messages, idx)
        .into_iter()
        .map(|(topic_id, message_count)| TopicMessages { topic_id, message_count })
        .collect())
}

/// Distinct topics each user posted in.
pub fn topics_per_user(messages: &Table, cfg: &MetricsConfig) -> Result<Vec<UserTopics>> {
    let id_idx = messages.require_column(&cfg.id_column)?;
    let topic_idx = messages.require_column(&cfg.topic_column)?;
    let mut acc: FirstSeen<String, AHashSet<String>> = FirstSeen::new();
    for row in messages.rows() {
        let Some(user) = row[id_idx].render() else { continue };
        let topics = acc.slot(user);
        if let Some(topic) = row[topic_idx].render() {
            topics.insert(topic);
        }
    }
    let mut out: Vec<UserTopics> = acc
        .into_groups()
        .into_iter()
        .map(|(poster_id, topics)| UserTopics { poster_id, topic_count: topics.len() })
        .collect();
    out.sort_by(|a, b| b.topic_count.cmp(&a.topic_count));
    Ok(out)
}

fn post_date(v: &Value) -> Option<chrono::NaiveDateTime> {
    match v {
        Value::Date(d) => Some(*d),
        Value::Text(s) => dates::parse_date(s),
        Value::Null => None,
    }
}

/// Word totals per `(user, YYYY-MM)`. Rows without a usable post date are left out
/// of this metric only.
pub fn words_per_user_per_month(messages: &Table, cfg: &MetricsConfig) -> Result<Vec<UserMonthWords>> {
    let id_idx = messages.require_column(&cfg.id_column)?;
    let text_idx = messages.require_column(&cfg.text_column)?;
    let (_, date_idx) = messages.first_present(&cfg.month_date_columns).ok_or_else(|| {
        let wanted = cfg.month_date_columns.first().map(String::as_str).unwrap_or("PostDate");
        ForumError::missing_column(messages.name(), wanted)
    })?;

    let mut acc: FirstSeen<(String, String), usize> = FirstSeen::new();
    let mut undated = 0usize;
    for row in messages.rows() {
        let Some(user) = row[id_idx].render() else { continue };
        let Some(date) = post_date(&row[date_idx]) else {
            undated += 1;
            continue;
        };
        let words = text_of(&row[text_idx]).map(|t| word_count(&t)).unwrap_or(0);
        *acc.slot((user, dates::month_key(&date))) += words;
    }
    if undated > 0 {
        tracing::debug!(table = messages.name(), rows = undated, "rows without post date excluded from monthly words");
    }

    let mut out: Vec<UserMonthWords> = acc
        .into_groups()
        .into_iter()
        .map(|((poster_id, year_month), word_count)| UserMonthWords { poster_id, year_month, word_count })
        .collect();
    out.sort_by(|a, b| a.poster_id.cmp(&b.poster_id).then_with(|| a.year_month.cmp(&b.year_month)));
    Ok(out)
}

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Corpus-wide token counts, most frequent first. Ties keep corpus order of first
/// appearance. `None` when the table or its text column is absent.
pub fn word_frequency(messages: Option<&Table>, text_column: &str) -> Option<Vec<WordCount>> {
    let messages = messages?;
    let idx = messages.column_index(text_column)?;
    let mut acc: FirstSeen<String, usize> = FirstSeen::new();
    for text in messages.column_values(idx).filter_map(text_of) {
        for token in text.split_whitespace() {
            let word = RE_NON_WORD.replace_all(token, "").to_lowercase();
            if word.is_empty() {
                continue;
            }
            *acc.slot(word) += 1;
        }
    }
    let mut out: Vec<WordCount> = acc
        .into_groups()
        .into_iter()
        .map(|(word, count)| WordCount { word, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    Some(out)
}

pub const POST_COUNT_COLUMN: &str = "PostCount";

/// Every topic with its message count (`PostCount`, zero when it has none), most
/// posted first. `None` when either table or its topic column is absent.
pub fn posts_per_topic(topics: Option<&Table>, messages: Option<&Table>, topic_column: &str) -> Option<Table> {
    let (topics, messages) = (topics?, messages?);
    let topic_idx = topics.column_index(topic_column)?;
    let msg_idx = messages.column_index(topic_column)?;

    let counts: AHashMap<String, usize> = count_rows_by(messages, msg_idx).into_iter().collect();
    let mut ranked: Vec<(usize, Vec<Value>)> = topics
        .rows()
        .iter()
        .map(|r| {
            let n = r[topic_idx].render().and_then(|k| counts.get(&k).copied()).unwrap_or(0);
            (n, r.clone())
        })
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    let mut columns = topics.columns().to_vec();
    let existing = topics.column_index(POST_COUNT_COLUMN);
    if existing.is_none() {
        columns.push(POST_COUNT_COLUMN.to_string());
    }
    let mut out = Table::new("topics_with_post_counts", columns);
    for (n, mut row) in ranked {
        match existing {
            Some(i) => row[i] = Value::Text(n.to_string()),
            None => row.push(Value::Text(n.to_string())),
        }
        out.push_row(row);
    }
    Some(out)
}
