//! Month plan: which tradition, theme and posting slots each day gets.

use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ordered_map, read_yaml, ConfigFileError};

const THEME_CYCLE_WEEKS: i64 = 4;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("no season configured for month={0}")]
    NoSeason(u32),

    #[error("weekly_pattern must have 7 entries for season {season} (found {found})")]
    BadWeeklyPattern { season: String, found: usize },

    #[error(transparent)]
    Config(#[from] ConfigFileError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonSpec {
    #[serde(default)]
    pub months: Vec<u32>,
    /// Tradition per weekday, Monday first.
    #[serde(default)]
    pub weekly_pattern: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostingTimes {
    #[serde(default = "default_carousel")]
    pub carousel: String,
    #[serde(default = "default_reel")]
    pub reel: String,
    #[serde(default = "default_image")]
    pub image: String,
}

impl Default for PostingTimes {
    fn default() -> Self {
        Self {
            carousel: default_carousel(),
            reel: default_reel(),
            image: default_image(),
        }
    }
}

fn default_carousel() -> String {
    "09:00".to_string()
}

fn default_reel() -> String {
    "12:00".to_string()
}

fn default_image() -> String {
    "18:00".to_string()
}

fn default_timezone() -> String {
    "Europe/Lisbon".to_string()
}

/// `rotation.yml`
#[derive(Debug, Clone, Deserialize)]
pub struct RotationConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// In file order; the first season listing a month owns it.
    #[serde(default, deserialize_with = "ordered_map")]
    pub seasons: Vec<(String, SeasonSpec)>,
    #[serde(default)]
    pub posting_times: PostingTimes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeEntry {
    pub name: String,
}

/// `weekly_themes.yml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeeklyThemes {
    #[serde(default)]
    pub cycle: Vec<ThemeEntry>,
}

/// One calendar day of the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub weekday: String,
    pub season: String,
    pub week_theme: String,
    pub tradition: String,
    pub timezone: String,
    pub time_carousel: String,
    pub time_reel: String,
    pub time_image: String,
}

impl DayPlan {
    pub fn date_iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Loads `rotation.yml` and `weekly_themes.yml` from `config_dir` and plans the month.
pub fn load_month_plan(year: i32, month: u32, config_dir: &Path) -> Result<Vec<DayPlan>, PlanError> {
    let rotation: RotationConfig = read_yaml(&config_dir.join("rotation.yml"))?;
    let themes: WeeklyThemes = read_yaml(&config_dir.join("weekly_themes.yml"))?;
    build_month_plan(year, month, &rotation, &themes)
}

pub fn build_month_plan(
    year: i32,
    month: u32,
    rotation: &RotationConfig,
    themes: &WeeklyThemes,
) -> Result<Vec<DayPlan>, PlanError> {
    let first_day =
        NaiveDate::from_ymd_opt(year, month, 1).ok_or(PlanError::InvalidMonth { year, month })?;

    let (season_name, season) = rotation
        .seasons
        .iter()
        .find(|(_, spec)| spec.months.contains(&month))
        .ok_or(PlanError::NoSeason(month))?;

    if season.weekly_pattern.len() != 7 {
        return Err(PlanError::BadWeeklyPattern {
            season: season_name.clone(),
            found: season.weekly_pattern.len(),
        });
    }

    // Theme weeks count from the Monday on or before the 1st.
    let anchor = first_day - Duration::days(first_day.weekday().num_days_from_monday() as i64);

    let days = first_day
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|d| {
            let weekday = d.weekday();
            let week_index = ((d - anchor).num_days() / 7 % THEME_CYCLE_WEEKS) as usize;
            DayPlan {
                date: d,
                weekday: weekday_name(weekday).to_string(),
                season: season_name.clone(),
                week_theme: themes
                    .cycle
                    .get(week_index)
                    .map(|t| t.name.clone())
                    .unwrap_or_default(),
                tradition: season.weekly_pattern[weekday.num_days_from_monday() as usize].clone(),
                timezone: rotation.timezone.clone(),
                time_carousel: rotation.posting_times.carousel.clone(),
                time_reel: rotation.posting_times.reel.clone(),
                time_image: rotation.posting_times.image.clone(),
            }
        })
        .collect();

    Ok(days)
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROTATION: &str = r#"
timezone: Europe/Lisbon
posting_times:
  carousel: "08:30"
seasons:
  Autumn:
    months: [9, 10, 11]
    weekly_pattern: [Zen, Stoic, Sufi, Taoist, Zen, Vedanta, Christian Mystic]
  Winter:
    months: [12, 1, 2]
    weekly_pattern: [Zen, Zen, Zen, Zen, Zen, Zen]
"#;

    const THEMES: &str = r#"
cycle:
  - name: Impermanence
  - name: Detachment
  - name: Compassion
  - name: Presence
"#;

    fn rotation() -> RotationConfig {
        serde_yaml::from_str(ROTATION).unwrap()
    }

    fn themes() -> WeeklyThemes {
        serde_yaml::from_str(THEMES).unwrap()
    }

    #[test]
    fn test_plan_covers_every_day() {
        let plan = build_month_plan(2026, 10, &rotation(), &themes()).unwrap();
        assert_eq!(plan.len(), 31);
        assert_eq!(plan[0].date_iso(), "2026-10-01");
        assert_eq!(plan[30].date_iso(), "2026-10-31");
        assert!(plan.iter().all(|d| d.season == "Autumn"));
    }

    #[test]
    fn test_tradition_follows_weekday() {
        let plan = build_month_plan(2026, 10, &rotation(), &themes()).unwrap();
        // 2026-10-01 is a Thursday
        assert_eq!(plan[0].weekday, "Thursday");
        assert_eq!(plan[0].tradition, "Taoist");
        assert_eq!(plan[3].weekday, "Sunday");
        assert_eq!(plan[3].tradition, "Christian Mystic");
    }

    #[test]
    fn test_week_theme_cycles_from_anchor_monday() {
        let plan = build_month_plan(2026, 10, &rotation(), &themes()).unwrap();
        // Anchor is Monday 2026-09-28: days 1-4 are week 0, 5-11 week 1.
        assert_eq!(plan[3].week_theme, "Impermanence");
        assert_eq!(plan[4].week_theme, "Detachment");
        assert_eq!(plan[18].week_theme, "Presence");
        // Week 4 wraps back to the start of the cycle.
        assert_eq!(plan[25].week_theme, "Impermanence");
    }

    #[test]
    fn test_posting_time_defaults() {
        let plan = build_month_plan(2026, 10, &rotation(), &themes()).unwrap();
        assert_eq!(plan[0].time_carousel, "08:30");
        assert_eq!(plan[0].time_reel, "12:00");
        assert_eq!(plan[0].time_image, "18:00");
        assert_eq!(plan[0].timezone, "Europe/Lisbon");
    }

    #[test]
    fn test_missing_theme_cycle_is_blank() {
        let plan = build_month_plan(2026, 10, &rotation(), &WeeklyThemes::default()).unwrap();
        assert!(plan.iter().all(|d| d.week_theme.is_empty()));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            build_month_plan(2026, 13, &rotation(), &themes()),
            Err(PlanError::InvalidMonth { .. })
        ));
        assert!(matches!(
            build_month_plan(2026, 4, &rotation(), &themes()),
            Err(PlanError::NoSeason(4))
        ));
        assert!(matches!(
            build_month_plan(2026, 12, &rotation(), &themes()),
            Err(PlanError::BadWeeklyPattern { found: 6, .. })
        ));
    }

    #[test]
    fn test_first_listed_season_wins_shared_month() {
        let rotation: RotationConfig = serde_yaml::from_str(
            r#"
seasons:
  Samhain:
    months: [10]
    weekly_pattern: [Sufi, Sufi, Sufi, Sufi, Sufi, Sufi, Sufi]
  Autumn:
    months: [9, 10, 11]
    weekly_pattern: [Zen, Zen, Zen, Zen, Zen, Zen, Zen]
"#,
        )
        .unwrap();
        let october = build_month_plan(2026, 10, &rotation, &themes()).unwrap();
        assert!(october.iter().all(|d| d.season == "Samhain" && d.tradition == "Sufi"));
        let november = build_month_plan(2026, 11, &rotation, &themes()).unwrap();
        assert_eq!(november[0].season, "Autumn");
    }

    #[test]
    fn test_load_from_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rotation.yml"), ROTATION).unwrap();
        std::fs::write(dir.path().join("weekly_themes.yml"), THEMES).unwrap();
        let plan = load_month_plan(2026, 11, dir.path()).unwrap();
        assert_eq!(plan.len(), 30);

        let missing = load_month_plan(2026, 11, &dir.path().join("nope"));
        assert!(matches!(
            missing,
            Err(PlanError::Config(ConfigFileError::Read { .. }))
        ));
    }
}
