use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::normalize::normalize;
use crate::config::ordered_map;

/// Outcome of reading one of the guard's input files.
///
/// Lets operators tell a first run (`Missing`) apart from a damaged file
/// (`Corrupt`); both degrade to an empty collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Loaded { entries: usize },
    Missing,
    Corrupt { reason: String },
}

impl SourceStatus {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, SourceStatus::Corrupt { .. })
    }
}

/// Canonical author id → alternate spellings, resolved on normalized text.
/// When a spelling is listed under two ids, the one earlier in the file wins.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    lookup: HashMap<String, String>,
}

impl AliasTable {
    pub fn from_entries(entries: Vec<(String, Vec<String>)>) -> Self {
        let mut lookup = HashMap::new();
        for (key, spellings) in &entries {
            lookup
                .entry(normalize(key))
                .or_insert_with(|| key.clone());
            for spelling in spellings {
                lookup
                    .entry(normalize(spelling))
                    .or_insert_with(|| key.clone());
            }
        }
        Self { lookup }
    }

    /// Reads a YAML mapping of `canonical_id: [spelling, ...]`.
    /// Never fails: a missing or unparsable file yields an empty table.
    pub fn load(path: &Path) -> (Self, SourceStatus) {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No author alias table at {}", path.display());
                return (Self::default(), SourceStatus::Missing);
            }
            Err(e) => {
                warn!("Could not read author aliases {}: {e}", path.display());
                return (
                    Self::default(),
                    SourceStatus::Corrupt {
                        reason: e.to_string(),
                    },
                );
            }
        };

        if raw.trim().is_empty() {
            return (Self::default(), SourceStatus::Loaded { entries: 0 });
        }

        match ordered_map::<_, Vec<String>>(serde_yaml::Deserializer::from_str(&raw)) {
            Ok(entries) => {
                let count = entries.len();
                (Self::from_entries(entries), SourceStatus::Loaded { entries: count })
            }
            Err(e) => {
                warn!(
                    "Author alias table {} is unparsable, ignoring it: {e}",
                    path.display()
                );
                (
                    Self::default(),
                    SourceStatus::Corrupt {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    /// Resolves an author to its canonical id. Unknown authors become the
    /// slug of their normalized name.
    pub fn canonical_author(&self, author: &str) -> String {
        let normalized = normalize(author);
        match self.lookup.get(&normalized) {
            Some(key) => key.clone(),
            None => normalized.replace(' ', "_"),
        }
    }
}
