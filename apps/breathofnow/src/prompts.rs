//! Prompt assembly for the daily post request.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::calendar::DayPlan;
use crate::config::{read_text, read_yaml, ConfigFileError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisualSpec {
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Per-tradition hashtag sets and visual identity keywords.
#[derive(Debug, Clone, Default)]
pub struct PromptResources {
    /// `hashtag_sets.yml`: tradition → list of hashtag sets.
    pub hashtag_sets: BTreeMap<String, Vec<Vec<String>>>,
    /// `visual_identity.yml`: tradition → keywords.
    pub visual_identity: BTreeMap<String, VisualSpec>,
}

impl PromptResources {
    pub fn load(config_dir: &Path) -> Result<Self, ConfigFileError> {
        let hashtag_sets: Option<BTreeMap<String, Vec<Vec<String>>>> =
            read_yaml(&config_dir.join("hashtag_sets.yml"))?;
        let visual_identity: Option<BTreeMap<String, Option<VisualSpec>>> =
            read_yaml(&config_dir.join("visual_identity.yml"))?;
        Ok(Self {
            hashtag_sets: hashtag_sets.unwrap_or_default(),
            visual_identity: visual_identity
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, v.unwrap_or_default()))
                .collect(),
        })
    }

    /// First configured hashtag set for the tradition.
    pub fn hashtags(&self, tradition: &str) -> &[String] {
        self.hashtag_sets
            .get(tradition)
            .and_then(|sets| sets.first())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn visual_keywords(&self, tradition: &str) -> &[String] {
        self.visual_identity
            .get(tradition)
            .map(|v| v.keywords.as_slice())
            .unwrap_or(&[])
    }
}

/// Reads the system prompt from `prompt_system.txt`.
pub fn load_system_prompt(config_dir: &Path) -> Result<String, ConfigFileError> {
    read_text(&config_dir.join("prompt_system.txt"))
}

/// Per-day context for the model. Plain `key: value` lines.
pub fn build_user_message(
    day: &DayPlan,
    resources: &PromptResources,
    banned_norms: &[String],
    language: &str,
) -> String {
    let lines = [
        format!("date: {}", day.date_iso()),
        format!("weekday: {}", day.weekday),
        format!("timezone: {}", day.timezone),
        format!("season: {}", day.season),
        format!("week_theme: {}", day.week_theme),
        format!("tradition: {}", day.tradition),
        format!(
            "visual_keywords_for_tradition: {}",
            resources.visual_keywords(&day.tradition).join(", ")
        ),
        format!(
            "hashtag_sets_for_tradition: {}",
            resources.hashtags(&day.tradition).join(", ")
        ),
        format!("banned_quotes_norms: {}", banned_norms.join("; ")),
        format!("language: {language}"),
        "Return ONLY JSON for this day per the schema.".to_string(),
    ];
    lines.join("\n")
}
