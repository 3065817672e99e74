use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::guard::DEFAULT_WINDOW_DAYS;
use super::GuardError;

/// One accepted quote as kept in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    pub date: NaiveDate,
    pub quote_text: String,
    pub quote_author: String,
    pub canonical_author: String,
    pub normalized_form: String,
    pub content_hash: String,
    pub token_set: BTreeSet<String>,
    pub trigram_set: BTreeSet<String>,
    pub lang: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// A record exactly as it appears in the store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItem {
    pub date: String,
    pub quote_text: String,
    pub quote_author: String,
    #[serde(default)]
    pub norm: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub trigrams: Vec<String>,
    #[serde(default)]
    pub author_id: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

impl Default for StoreMeta {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            last_updated: None,
        }
    }
}

fn default_window_days() -> i64 {
    DEFAULT_WINDOW_DAYS
}

fn default_lang() -> String {
    "en".to_string()
}

/// The whole store file: `{ "meta": {...}, "items": [...] }`.
///
/// Loading reads items as `serde_json::Value` so one malformed item can be
/// dropped without losing the rest of the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument<I = StoredItem> {
    #[serde(default)]
    pub meta: StoreMeta,
    #[serde(default = "Vec::new")]
    pub items: Vec<I>,
}

impl From<&QuoteRecord> for StoredItem {
    fn from(record: &QuoteRecord) -> Self {
        StoredItem {
            date: record.date.format("%Y-%m-%d").to_string(),
            quote_text: record.quote_text.clone(),
            quote_author: record.quote_author.clone(),
            norm: record.normalized_form.clone(),
            hash: record.content_hash.clone(),
            tokens: record.token_set.iter().cloned().collect(),
            trigrams: record.trigram_set.iter().cloned().collect(),
            author_id: record.canonical_author.clone(),
            lang: record.lang.clone(),
        }
    }
}

/// Parses a candidate date. Only plain `YYYY-MM-DD` is accepted.
pub fn parse_candidate_date(raw: &str) -> Result<NaiveDate, GuardError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| GuardError::InvalidDate {
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Parses a stored date, which older stores may have written with a time part.
pub fn parse_stored_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.contains('T') {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|dt| dt.date())
            .ok()
            .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}

/// `2026-10-18T09:30:00Z`
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Writes `doc` next to `path` and renames it into place, so an interrupted
/// write leaves the previous file intact.
pub fn write_atomic(path: &Path, doc: &StoreDocument) -> Result<(), GuardError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let body = serde_json::to_vec_pretty(doc)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&body)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| GuardError::Io(e.error))?;
    Ok(())
}
