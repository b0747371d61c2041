//! Partitioning by account type and per-partition poster leaderboards.
//!
//! Groups are split on their account-type column, topics follow their group and
//! messages follow their topic. Nothing here anonymizes; inputs must already have
//! been through the identifier and text anonymization stages.

use crate::error::Result;
use crate::table::{Table, Value};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct SegmentColumns {
    pub account_type_column: String,
    pub group_column: String,
    pub topic_column: String,
    pub id_column: String,
}

impl Default for SegmentColumns {
    fn default() -> Self {
        Self {
            account_type_column: "AccountID".to_string(),
            group_column: "ForumGroupID".to_string(),
            topic_column: "ForumTopicID".to_string(),
            id_column: "PosterID".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountTypePartition {
    pub account_type: String,
    pub groups: Table,
    pub topics: Table,
    pub messages: Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosterCount {
    #[serde(rename = "PosterID")]
    pub poster_id: String,
    #[serde(rename = "PostCount")]
    pub post_count: usize,
}

pub const POSTER_COUNT_HEADERS: [&str; 2] = ["PosterID", "PostCount"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaderboard {
    pub account_type: String,
    pub posters: Vec<PosterCount>,
}

impl Leaderboard {
    pub fn artifact_name(&self, n: usize) -> String {
        format!("top_{n}_posters_account_type_{}", self.account_type)
    }
}

fn key_set(table: &Table, idx: usize) -> AHashSet<String> {
    table.column_values(idx).filter_map(Value::render).collect()
}

fn keep_where_in(table: &Table, idx: usize, keys: &AHashSet<String>, name: String) -> Table {
    table
        .filter(|row| row[idx].render().map(|k| keys.contains(&k)).unwrap_or(false))
        .with_name(name)
}

/// One partition per distinct account type, in order of first appearance in `groups`.
/// Rows with a null account type belong to no partition.
pub fn split_by_account_type(
    groups: &Table,
    topics: &Table,
    messages: &Table,
    cols: &SegmentColumns,
) -> Result<Vec<AccountTypePartition>> {
    let type_idx = groups.require_column(&cols.account_type_column)?;
    let group_idx = groups.require_column(&cols.group_column)?;
    let topic_group_idx = topics.require_column(&cols.group_column)?;
    let topic_idx = topics.require_column(&cols.topic_column)?;
    let message_topic_idx = messages.require_column(&cols.topic_column)?;

    let mut order: Vec<String> = Vec::new();
    let mut seen: AHashSet<String> = AHashSet::new();
    for t in groups.column_values(type_idx).filter_map(Value::render) {
        if seen.insert(t.clone()) {
            order.push(t);
        }
    }

    let mut partitions = Vec::with_capacity(order.len());
    for account_type in order {
        let g = groups
            .filter(|row| row[type_idx].render().as_deref() == Some(account_type.as_str()))
            .with_name(format!("groups_account_type_{account_type}"));
        let group_ids = key_set(&g, group_idx);
        let t = keep_where_in(topics, topic_group_idx, &group_ids, format!("topics_account_type_{account_type}"));
        let topic_ids = key_set(&t, topic_idx);
        let m = keep_where_in(messages, message_topic_idx, &topic_ids, format!("messages_account_type_{account_type}"));
        tracing::info!(
            account_type = %account_type,
            groups = g.len(),
            topics = t.len(),
            messages = m.len(),
            "account type partition"
        );
        partitions.push(AccountTypePartition { account_type, groups: g, topics: t, messages: m });
    }
    Ok(partitions)
}

/// Top `n` posters by message count in each partition. Partitions whose messages
/// carry no id column are skipped; equal counts keep partition row order.
pub fn top_posters(partitions: &[AccountTypePartition], n: usize, id_column: &str) -> Vec<Leaderboard> {
    let mut boards = Vec::with_capacity(partitions.len());
    for p in partitions {
        let Some(idx) = p.messages.column_index(id_column) else {
            tracing::warn!(account_type = %p.account_type, column = id_column, "no poster column, leaderboard skipped");
            continue;
        };
        let mut index: AHashMap<String, usize> = AHashMap::new();
        let mut posters: Vec<PosterCount> = Vec::new();
        for id in p.messages.column_values(idx).filter_map(Value::render) {
            match index.get(&id) {
                Some(&i) => posters[i].post_count += 1,
                None => {
                    index.insert(id.clone(), posters.len());
                    posters.push(PosterCount { poster_id: id, post_count: 1 });
                }
            }
        }
        posters.sort_by(|a, b| b.post_count.cmp(&a.post_count));
        posters.truncate(n);
        boards.push(Leaderboard { account_type: p.account_type.clone(), posters });
    }
    boards
}
