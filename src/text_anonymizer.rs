//! Free-text anonymization with a reversible mapping.
//!
//! Identifying tokens are replaced by typed placeholders such as `<EMAIL_1>`. The
//! returned [`TextMapping`] is all that is needed to undo the replacement, so it has
//! to be stored and guarded like the original text.

use crate::error::Result;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Captures, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Two-directional contract consumed by the pipeline. Implementations may be
/// non-deterministic; only `deanonymize(anonymize(x)) == x` is relied upon.
pub trait TextAnonymizer: Send + Sync {
    fn anonymize(&self, text: &str) -> (String, TextMapping);
    fn deanonymize(&self, text: &str, mapping: &TextMapping) -> String;
}

/// Opaque reversal capability for one anonymized cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextMapping {
    entries: BTreeMap<String, String>,
}

impl TextMapping {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Default compiled-size ceiling for the known-name matcher.
pub const NAME_PATTERN_SIZE_LIMIT: usize = 256 * (1 << 20);

// Anything already shaped like a placeholder is itself masked, which keeps the
// reverse pass unambiguous.
static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[A-Z]+_[0-9]+>").unwrap());

static RE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:[a-zA-Z][a-zA-Z0-9+.-]*://|www\.)[^\s"'<>]+[^\s"'<>.,;:!?)]"#).unwrap()
});

static RE_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static RE_IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b").unwrap()
});

// Finnish personal identity code: DDMMYY, century sign, individual number, checksum.
static RE_HETU: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[0-3]\d[01]\d\d{2}[-+A-FU-Y]\d{3}[0-9A-FHJ-NPR-Y]\b").unwrap()
});

static RE_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,3}[ -]?)?\b\d{2,4}[ -]?\d{3}[ -]?\d{3,4}\b").unwrap()
});

static RE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@[A-Za-z0-9_]{2,}").unwrap());

/// Regex-driven anonymizer: URLs, e-mails, IPs, identity codes, phone numbers,
/// @mentions and an optional list of known person names.
pub struct PatternAnonymizer {
    names: Option<Regex>,
}

impl Default for PatternAnonymizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternAnonymizer {
    pub fn new() -> Self {
        Self { names: None }
    }

    /// Adds literal names that are always replaced (whole words, case-sensitive).
    pub fn with_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_names_limit(names, NAME_PATTERN_SIZE_LIMIT)
    }

    /// Like [`with_names`](Self::with_names) with an explicit compiled-size ceiling.
    /// A name list too large for the ceiling is an error, never a silently
    /// disabled matcher.
    pub fn with_names_limit<I, S>(names: I, size_limit: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Longest first so "Anna Maria" wins over "Anna".
        let list: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .sorted_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
            .dedup()
            .collect();
        if list.is_empty() {
            return Ok(Self::new());
        }
        let alternation = list.iter().map(|n| regex::escape(n)).join("|");
        let names = RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
            .size_limit(size_limit)
            .dfa_size_limit(size_limit)
            .build()
            .map_err(|e| {
                tracing::error!(names = list.len(), size_limit, error = %e, "known-name matcher too large");
                e
            })?;
        tracing::debug!(names = list.len(), "known-name matcher built");
        Ok(Self { names: Some(names) })
    }

    fn detectors(&self) -> Vec<(&'static str, &Regex)> {
        let mut d: Vec<(&'static str, &Regex)> = vec![
            ("RAW", &*RE_PLACEHOLDER),
            ("URL", &*RE_URL),
            ("EMAIL", &*RE_EMAIL),
            ("IP", &*RE_IPV4),
            ("HETU", &*RE_HETU),
            ("PHONE", &*RE_PHONE),
            ("MENTION", &*RE_MENTION),
        ];
        if let Some(re) = self.names.as_ref() {
            d.push(("NAME", re));
        }
        d
    }

    /// Non-overlapping spans; earlier detectors win any overlap.
    fn find_spans(&self, text: &str) -> Vec<(usize, usize, &'static str)> {
        let mut spans: Vec<(usize, usize, &'static str)> = Vec::new();
        for (kind, re) in self.detectors() {
            for m in re.find_iter(text) {
                let overlaps = spans.iter().any(|(s, e, _)| m.start() < *e && *s < m.end());
                if !overlaps {
                    spans.push((m.start(), m.end(), kind));
                }
            }
        }
        spans.sort_by_key(|(s, _, _)| *s);
        spans
    }
}

impl TextAnonymizer for PatternAnonymizer {
    fn anonymize(&self, text: &str) -> (String, TextMapping) {
        let spans = self.find_spans(text);
        if spans.is_empty() {
            return (text.to_string(), TextMapping::default());
        }
        let mut out = String::with_capacity(text.len());
        let mut mapping = TextMapping::default();
        let mut by_original: BTreeMap<(&'static str, &str), String> = BTreeMap::new();
        let mut per_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut last = 0usize;
        for (start, end, kind) in spans {
            out.push_str(&text[last..start]);
            let original = &text[start..end];
            let placeholder = by_original
                .entry((kind, original))
                .or_insert_with(|| {
                    let n = per_kind.entry(kind).or_insert(0);
                    *n += 1;
                    format!("<{kind}_{n}>")
                })
                .clone();
            mapping.entries.insert(placeholder.clone(), original.to_string());
            out.push_str(&placeholder);
            last = end;
        }
        out.push_str(&text[last..]);
        (out, mapping)
    }

    fn deanonymize(&self, text: &str, mapping: &TextMapping) -> String {
        if mapping.is_empty() {
            return text.to_string();
        }
        RE_PLACEHOLDER
            .replace_all(text, |caps: &Captures| {
                let token = &caps[0];
                mapping.entries.get(token).cloned().unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }
}
