use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::aliases::{AliasTable, SourceStatus};
use super::clock::Clock;
use super::lock::StoreLock;
use super::normalize::{content_hash, jaccard, normalize, token_set, trigram_set};
use super::store::{
    format_timestamp, parse_candidate_date, parse_stored_date, write_atomic, QuoteRecord,
    StoreDocument, StoreMeta, StoredItem,
};
use super::GuardError;

pub const DEFAULT_WINDOW_DAYS: i64 = 400;

/// Similarity cut-offs. A candidate is rejected when a score reaches its
/// threshold (`>=`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub same_author_jaccard: f64,
    pub any_author_jaccard: f64,
    pub any_author_trigram: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            same_author_jaccard: 0.90,
            any_author_jaccard: 0.80,
            any_author_trigram: 0.85,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub store_path: PathBuf,
    pub aliases_path: PathBuf,
    pub window_days: i64,
    pub thresholds: Thresholds,
    /// Language tag written on new records.
    pub language: String,
}

impl GuardConfig {
    pub fn new(store_path: impl Into<PathBuf>, aliases_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            aliases_path: aliases_path.into(),
            window_days: DEFAULT_WINDOW_DAYS,
            thresholds: Thresholds::default(),
            language: "en".to_string(),
        }
    }

    pub fn with_window_days(mut self, window_days: i64) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into().to_lowercase();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    ExactDuplicate,
    NearDuplicateSameAuthor,
    NearDuplicateAnyAuthor,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::ExactDuplicate => "exact_duplicate",
            RejectReason::NearDuplicateSameAuthor => "near_duplicate_same_author",
            RejectReason::NearDuplicateAnyAuthor => "near_duplicate_any_author",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `check_and_register`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Admission {
    Accepted {
        hash: String,
    },
    Rejected {
        reason: RejectReason,
        /// Date of the stored quote that blocked the candidate.
        conflicts_with: NaiveDate,
        #[serde(skip_serializing_if = "Option::is_none")]
        jaccard: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        trigrams: Option<f64>,
    },
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted { .. })
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Admission::Accepted { .. } => None,
            Admission::Rejected { reason, .. } => Some(*reason),
        }
    }
}

/// What `QuoteGuard::load` found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadStatus {
    pub store: SourceStatus,
    pub aliases: SourceStatus,
    /// Stored items discarded because they were malformed or their date
    /// could not be parsed.
    pub dropped_records: usize,
}

/// Rolling-window near-duplicate detector over previously used quotes.
pub struct QuoteGuard {
    config: GuardConfig,
    clock: Arc<dyn Clock>,
    aliases: AliasTable,
    records: Vec<QuoteRecord>,
    last_updated: Option<String>,
    status: LoadStatus,
}

impl QuoteGuard {
    /// Loads history and aliases. Missing or corrupt files never fail the
    /// load; they leave the guard empty and are reported in `load_status`.
    pub fn load(config: GuardConfig, clock: Arc<dyn Clock>) -> Self {
        let (aliases, alias_status) = AliasTable::load(&config.aliases_path);

        let mut guard = Self {
            config,
            clock,
            aliases,
            records: Vec::new(),
            last_updated: None,
            status: LoadStatus {
                store: SourceStatus::Missing,
                aliases: alias_status,
                dropped_records: 0,
            },
        };

        let raw = match std::fs::read_to_string(&guard.config.store_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No quote store at {}, starting with empty history",
                    guard.config.store_path.display()
                );
                return guard;
            }
            Err(e) => {
                warn!(
                    "Could not read quote store {}, starting with empty history: {e}",
                    guard.config.store_path.display()
                );
                guard.status.store = SourceStatus::Corrupt {
                    reason: e.to_string(),
                };
                return guard;
            }
        };

        let doc: StoreDocument<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "Quote store {} is corrupt, starting with empty history: {e}",
                    guard.config.store_path.display()
                );
                guard.status.store = SourceStatus::Corrupt {
                    reason: e.to_string(),
                };
                return guard;
            }
        };

        guard.last_updated = doc.meta.last_updated;
        for (index, value) in doc.items.into_iter().enumerate() {
            let item: StoredItem = match serde_json::from_value(value) {
                Ok(item) => item,
                Err(e) => {
                    warn!("Dropping malformed stored quote #{index}: {e}");
                    guard.status.dropped_records += 1;
                    continue;
                }
            };
            match parse_stored_date(&item.date) {
                // Derived fields are rebuilt so hashes and author ids always
                // match the current normalization and alias table.
                Some(date) => {
                    let record = guard.build_record(&item.quote_text, &item.quote_author, date, &item.lang);
                    guard.records.push(record);
                }
                None => {
                    warn!("Dropping stored quote with unparsable date '{}'", item.date);
                    guard.status.dropped_records += 1;
                }
            }
        }

        guard.status.store = SourceStatus::Loaded {
            entries: guard.records.len(),
        };
        info!(
            "Loaded {} quotes from {}",
            guard.records.len(),
            guard.config.store_path.display()
        );
        guard
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn records(&self) -> &[QuoteRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Tests a candidate quote against the window and admits it if fresh.
    ///
    /// Admitted quotes are visible to the next call immediately. A rejected
    /// candidate leaves the history untouched, so the caller can retry the
    /// same day with another quote.
    ///
    /// The window is measured back from the clock, not from `quote_date`: a
    /// candidate dated `window_days` or more before today is admitted but
    /// pruned on the next call, so it never blocks later backfilled quotes.
    pub fn check_and_register(
        &mut self,
        quote_text: &str,
        quote_author: &str,
        quote_date: &str,
    ) -> Result<Admission, GuardError> {
        let date = parse_candidate_date(quote_date)?;

        self.prune();

        let lang = self.config.language.clone();
        let candidate = self.build_record(quote_text, quote_author, date, &lang);
        let t = self.config.thresholds;

        for record in &self.records {
            if record.content_hash == candidate.content_hash {
                debug!("Rejected '{quote_text}': exact duplicate of {}", record.date);
                return Ok(Admission::Rejected {
                    reason: RejectReason::ExactDuplicate,
                    conflicts_with: record.date,
                    jaccard: None,
                    trigrams: None,
                });
            }

            let same_author = record.canonical_author == candidate.canonical_author;
            let jac = jaccard(&candidate.token_set, &record.token_set);
            let tri = jaccard(&candidate.trigram_set, &record.trigram_set);

            if same_author && jac >= t.same_author_jaccard {
                debug!("Rejected '{quote_text}': same-author near duplicate (jaccard={jac:.3})");
                return Ok(Admission::Rejected {
                    reason: RejectReason::NearDuplicateSameAuthor,
                    conflicts_with: record.date,
                    jaccard: Some(jac),
                    trigrams: None,
                });
            }
            if jac >= t.any_author_jaccard || tri >= t.any_author_trigram {
                debug!(
                    "Rejected '{quote_text}': near duplicate (jaccard={jac:.3}, trigrams={tri:.3})"
                );
                return Ok(Admission::Rejected {
                    reason: RejectReason::NearDuplicateAnyAuthor,
                    conflicts_with: record.date,
                    jaccard: Some(jac),
                    trigrams: Some(tri),
                });
            }
        }

        let hash = candidate.content_hash.clone();
        debug!("Admitted quote by '{}' for {date}", candidate.canonical_author);
        self.records.push(candidate);
        self.last_updated = Some(format_timestamp(self.clock.now()));
        Ok(Admission::Accepted { hash })
    }

    /// Normalized forms of the most recent in-window quotes, oldest first.
    pub fn banned_norms(&self, limit: usize) -> Vec<String> {
        let today = self.clock.now().date_naive();
        let in_window: Vec<&QuoteRecord> = self
            .records
            .iter()
            .filter(|r| within_window(r.date, today, self.config.window_days))
            .collect();
        let skip = in_window.len().saturating_sub(limit);
        in_window
            .into_iter()
            .skip(skip)
            .map(|r| r.normalized_form.clone())
            .collect()
    }

    /// Persists the pruned history, replacing the store file atomically.
    pub fn save(&mut self) -> Result<(), GuardError> {
        self.prune();
        let doc = StoreDocument {
            meta: StoreMeta {
                window_days: self.config.window_days,
                last_updated: Some(
                    self.last_updated
                        .clone()
                        .unwrap_or_else(|| format_timestamp(self.clock.now())),
                ),
            },
            items: self.records.iter().map(StoredItem::from).collect(),
        };
        write_atomic(&self.config.store_path, &doc)?;
        info!(
            "Saved {} quotes to {}",
            self.records.len(),
            self.config.store_path.display()
        );
        Ok(())
    }

    /// Drops records that fell out of the window, measured from the clock.
    fn prune(&mut self) {
        let today = self.clock.now().date_naive();
        let before = self.records.len();
        let window_days = self.config.window_days;
        self.records
            .retain(|r| within_window(r.date, today, window_days));
        let pruned = before - self.records.len();
        if pruned > 0 {
            debug!("Pruned {pruned} quotes older than {window_days} days");
        }
    }

    fn build_record(&self, text: &str, author: &str, date: NaiveDate, lang: &str) -> QuoteRecord {
        let norm_text = normalize(text);
        let canonical_author = self.aliases.canonical_author(author);
        let normalized_form = format!("{norm_text} | {}", canonical_author.replace('_', " "));
        QuoteRecord {
            date,
            quote_text: text.to_string(),
            quote_author: author.to_string(),
            content_hash: content_hash(&normalized_form),
            token_set: token_set(&norm_text),
            trigram_set: trigram_set(&norm_text),
            canonical_author,
            normalized_form,
            lang: lang.to_string(),
        }
    }
}

/// A record dated `date` is inside the window when fewer than `window_days`
/// whole days separate it from `today`. Future-dated records are inside.
fn within_window(date: NaiveDate, today: NaiveDate, window_days: i64) -> bool {
    (today - date).num_days() < window_days
}

/// Runs `f` against a guard loaded under an exclusive store lock, then saves.
///
/// Concurrent pipeline runs against the same store queue up here instead of
/// overwriting each other's history. Nothing is saved if `f` fails.
pub fn with_locked_store<T, F>(
    config: GuardConfig,
    clock: Arc<dyn Clock>,
    f: F,
) -> Result<T, GuardError>
where
    F: FnOnce(&mut QuoteGuard) -> Result<T, GuardError>,
{
    let mut lock = StoreLock::open(&config.store_path)?;
    let _held = lock.acquire()?;
    let mut guard = QuoteGuard::load(config, clock);
    let out = f(&mut guard)?;
    guard.save()?;
    Ok(out)
}
