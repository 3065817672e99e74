use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;

use crate::quotes::guard::DEFAULT_WINDOW_DAYS;

/// Runtime configuration for the month runner binary.
///
/// Only `main` reads the environment; library code receives this struct
/// (or the pieces it needs) explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub year: i32,
    pub month: u32,
    pub language: String,
    pub quote_window_days: i64,
    /// Present only when model calls are enabled (`USE_OPENAI=1`).
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub write_to_sheets: bool,
    pub sheet_output: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config_dir = PathBuf::from(env_or("CONFIG_DIR", "config"));
        let data_dir = PathBuf::from(env_or("DATA_DIR", "data"));

        let (year, month) = match std::env::var("TARGET_MONTH") {
            Ok(raw) => parse_target_month(&raw)?,
            Err(_) => {
                let today = Utc::now().date_naive();
                (today.year(), today.month())
            }
        };

        let openai_api_key = if env_flag("USE_OPENAI") {
            Some(require_env("OPENAI_API_KEY")?)
        } else {
            None
        };

        let sheet_output = std::env::var("SHEET_OUTPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("posts.jsonl"));

        Ok(Config {
            year,
            month,
            language: env_or("LANGUAGE", "EN"),
            quote_window_days: std::env::var("QUOTE_WINDOW_DAYS")
                .unwrap_or_else(|_| DEFAULT_WINDOW_DAYS.to_string())
                .parse::<i64>()
                .context("QUOTE_WINDOW_DAYS must be a whole number of days")?,
            openai_api_key,
            openai_model: env_or("OPENAI_MODEL", crate::llm_client::DEFAULT_MODEL),
            write_to_sheets: env_flag("WRITE_TO_SHEETS"),
            sheet_output,
            rust_log: env_or("RUST_LOG", "info"),
            config_dir,
            data_dir,
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("used_quotes.json")
    }

    pub fn aliases_path(&self) -> PathBuf {
        self.config_dir.join("author_aliases.yml")
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).map(|v| v.trim() == "1").unwrap_or(false)
}

/// Parses `YYYY-MM`.
pub fn parse_target_month(raw: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .with_context(|| format!("TARGET_MONTH must look like 2026-10, got '{raw}'"))?;
    Ok((date.year(), date.month()))
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Reads and parses a YAML file from the config directory.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigFileError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigFileError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a plain-text file from the config directory.
pub fn read_text(path: &Path) -> Result<String, ConfigFileError> {
    std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Deserializes a string-keyed mapping into `(key, value)` pairs in file
/// order. A null or empty document yields no entries.
///
/// Config files where the first matching entry wins (seasons, author
/// aliases) go through this instead of a sorted map.
pub fn ordered_map<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct OrderedVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, T>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_any(OrderedVisitor(PhantomData))
}
