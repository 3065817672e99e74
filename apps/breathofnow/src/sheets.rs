//! Content-sheet rows and the writers that store them.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::calendar::DayPlan;
use crate::models::post::DailyPost;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("sheet I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sheet row is not valid JSON at line {line}: {source}")]
    BadRow {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("sheet serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One row of the content master sheet. Field names are the sheet headers.
/// Posting status columns are left for the publishing step to fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Weekday")]
    pub weekday: String,
    #[serde(rename = "Tradition")]
    pub tradition: String,
    #[serde(rename = "Was it posted?")]
    pub was_posted: String,
    #[serde(rename = "Time_Carousel")]
    pub time_carousel: String,
    #[serde(rename = "Time_Poem")]
    pub time_poem: String,
    #[serde(rename = "Time_Image")]
    pub time_image: String,
    #[serde(rename = "Timezone")]
    pub timezone: String,
    #[serde(rename = "Quote")]
    pub quote: String,
    #[serde(rename = "Meditation 1")]
    pub meditation_1: String,
    #[serde(rename = "Meditation 2")]
    pub meditation_2: String,
    #[serde(rename = "Journal Prompt 1")]
    pub journal_prompt_1: String,
    #[serde(rename = "Journal Prompt 2")]
    pub journal_prompt_2: String,
    #[serde(rename = "CTA")]
    pub cta: String,
    #[serde(rename = "Caption")]
    pub caption: String,
    #[serde(rename = "First Comment")]
    pub first_comment: String,
    #[serde(rename = "Story Action")]
    pub story_action: String,
    #[serde(rename = "Poem")]
    pub poem: String,
    #[serde(rename = "Poem Caption")]
    pub poem_caption: String,
    #[serde(rename = "Poem 1st Comment")]
    pub poem_first_comment: String,
    #[serde(rename = "Poem Story Action")]
    pub poem_story_action: String,
    #[serde(rename = "Image creation prompt")]
    pub image_prompt: String,
    #[serde(rename = "Image Caption")]
    pub image_caption: String,
    #[serde(rename = "Image 1st Comment")]
    pub image_first_comment: String,
    #[serde(rename = "Image Story Action")]
    pub image_story_action: String,
}

impl SheetRow {
    pub fn from_post(day: &DayPlan, post: &DailyPost) -> Self {
        Self {
            date: day.date_iso(),
            weekday: day.weekday.clone(),
            tradition: day.tradition.clone(),
            was_posted: String::new(),
            time_carousel: day.time_carousel.clone(),
            time_poem: day.time_reel.clone(),
            time_image: day.time_image.clone(),
            timezone: day.timezone.clone(),
            quote: format!("{} — {}", post.quote_text, post.quote_author),
            meditation_1: post.med1.clone(),
            meditation_2: post.med2.clone(),
            journal_prompt_1: post.jp1.clone(),
            journal_prompt_2: post.jp2.clone(),
            cta: post.cta_line.clone(),
            caption: format!(
                "{}\n{}",
                post.carousel_caption,
                post.carousel_hashtags.join(" ")
            ),
            first_comment: post.carousel_first_comment.clone(),
            story_action: post.story_action.clone(),
            poem: post.poem_text.clone(),
            poem_caption: post.poem_caption.clone(),
            poem_first_comment: post.poem_first_comment.clone(),
            poem_story_action: post.poem_story_action.clone(),
            image_prompt: post.image_prompt.clone(),
            image_caption: post.image_caption.clone(),
            image_first_comment: post.image_first_comment.clone(),
            image_story_action: post.image_story_action.clone(),
        }
    }
}

/// Filled in by hand once a post goes out; regenerating a day keeps it.
const STATUS_COLUMN: &str = "Was it posted?";

/// Destination for generated rows.
pub trait SheetWriter: Send + Sync {
    /// Writes `rows`, returning how many were written.
    fn write_rows(&self, rows: &[SheetRow]) -> Result<usize, SheetError>;
}

/// Logs rows instead of writing them.
pub struct DryRunSheetWriter;

impl SheetWriter for DryRunSheetWriter {
    fn write_rows(&self, rows: &[SheetRow]) -> Result<usize, SheetError> {
        for row in rows {
            info!("[DRY] {} {} {}", row.date, row.tradition, row.quote);
        }
        Ok(rows.len())
    }
}

/// Keeps the sheet as a JSON-lines file, one row per date.
///
/// A row whose `Date` already exists replaces it in place; new dates are
/// appended. The posting status and columns this crate does not know about
/// are preserved.
pub struct JsonlSheetWriter {
    path: PathBuf,
}

impl JsonlSheetWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing(&self) -> Result<Vec<serde_json::Value>, SheetError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|source| SheetError::BadRow { line: i + 1, source })
            })
            .collect()
    }
}

impl SheetWriter for JsonlSheetWriter {
    fn write_rows(&self, rows: &[SheetRow]) -> Result<usize, SheetError> {
        let mut existing = self.read_existing()?;

        for row in rows {
            let value = serde_json::to_value(row)?;
            let slot = existing
                .iter_mut()
                .find(|v| v.get("Date").and_then(|d| d.as_str()) == Some(row.date.as_str()));
            match slot {
                Some(old) => {
                    if let (Some(old), Some(new)) = (old.as_object_mut(), value.as_object()) {
                        for (k, v) in new {
                            if k == STATUS_COLUMN && old.contains_key(k) {
                                continue;
                            }
                            old.insert(k.clone(), v.clone());
                        }
                    }
                }
                None => existing.push(value),
            }
        }

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        for value in &existing {
            serde_json::to_writer(&mut tmp, value)?;
            tmp.write_all(b"\n")?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| SheetError::Io(e.error))?;

        info!("Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(rows.len())
    }
}
