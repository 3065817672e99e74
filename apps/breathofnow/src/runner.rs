//! Month orchestration: plan → prompt → model → validate → quote guard → row.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::calendar::{load_month_plan, DayPlan};
use crate::errors::AppError;
use crate::llm_client::ContentModel;
use crate::models::post::DailyPost;
use crate::prompts::{build_user_message, load_system_prompt, PromptResources};
use crate::quotes::lock::StoreLock;
use crate::quotes::{Admission, Clock, GuardConfig, QuoteGuard};
use crate::sheets::{SheetRow, SheetWriter};
use crate::validation::validate_post;

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub language: String,
    /// Model calls allowed per day before the day is skipped.
    pub attempts_per_day: u32,
    /// How many recent quotes to list as off-limits in the prompt.
    pub banned_norms_limit: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            language: "EN".to_string(),
            attempts_per_day: 2,
            banned_norms_limit: 200,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonthSummary {
    pub rows: Vec<SheetRow>,
    pub skipped_days: Vec<NaiveDate>,
    /// Candidates turned away by validation or the quote guard.
    pub rejected_attempts: usize,
}

/// Drives one content model over a month plan.
pub struct MonthRunner<'a> {
    model: &'a dyn ContentModel,
    system_prompt: String,
    resources: PromptResources,
    settings: RunSettings,
}

impl<'a> MonthRunner<'a> {
    pub fn new(
        model: &'a dyn ContentModel,
        system_prompt: String,
        resources: PromptResources,
        settings: RunSettings,
    ) -> Self {
        Self {
            model,
            system_prompt,
            resources,
            settings,
        }
    }

    /// Generates every planned day, admitting quotes through `guard`.
    ///
    /// A day that produces no valid, fresh post within the attempt budget is
    /// skipped; the rest of the month continues.
    pub async fn run_days(
        &self,
        plan: &[DayPlan],
        guard: &mut QuoteGuard,
    ) -> Result<MonthSummary, AppError> {
        let mut summary = MonthSummary::default();

        for day in plan {
            info!("[{}] {} • {}", day.date_iso(), day.tradition, day.week_theme);

            match self.generate_day(day, guard, &mut summary).await? {
                Some(post) => summary.rows.push(SheetRow::from_post(day, &post)),
                None => {
                    warn!("Skipping day {} (no valid payload)", day.date_iso());
                    summary.skipped_days.push(day.date);
                }
            }
        }

        Ok(summary)
    }

    async fn generate_day(
        &self,
        day: &DayPlan,
        guard: &mut QuoteGuard,
        summary: &mut MonthSummary,
    ) -> Result<Option<DailyPost>, AppError> {
        let banned = guard.banned_norms(self.settings.banned_norms_limit);
        let user_msg = build_user_message(day, &self.resources, &banned, &self.settings.language);
        let keywords = self.resources.visual_keywords(&day.tradition);

        for attempt in 1..=self.settings.attempts_per_day {
            let post = match self.model.generate(&self.system_prompt, &user_msg).await {
                Ok(post) => post,
                Err(e) => {
                    warn!("  - No payload returned (attempt {attempt}): {e}");
                    continue;
                }
            };

            let report = validate_post(&post, &day.tradition, keywords);
            if !report.passed {
                warn!("  - Validation failed (attempt {attempt}): {:?}", report.errors);
                summary.rejected_attempts += 1;
                continue;
            }

            match guard.check_and_register(&post.quote_text, &post.quote_author, &day.date_iso())? {
                Admission::Accepted { .. } => return Ok(Some(post)),
                rejected => {
                    warn!(
                        "  - Quote rejected (attempt {attempt}): {}",
                        serde_json::to_string(&rejected).unwrap_or_default()
                    );
                    summary.rejected_attempts += 1;
                }
            }
        }

        Ok(None)
    }
}

/// Where a month run reads and writes.
#[derive(Debug, Clone)]
pub struct MonthJob {
    pub year: i32,
    pub month: u32,
    pub config_dir: PathBuf,
    pub guard: GuardConfig,
    pub settings: RunSettings,
}

/// Runs a whole month under the quote store lock.
///
/// History is saved before any rows are written, so a sheet failure never
/// loses admitted quotes.
pub async fn run_month(
    job: MonthJob,
    model: &dyn ContentModel,
    clock: Arc<dyn Clock>,
    writer: Option<&dyn SheetWriter>,
) -> Result<MonthSummary, AppError> {
    let plan = load_month_plan(job.year, job.month, &job.config_dir)?;
    let system_prompt = load_system_prompt(&job.config_dir)?;
    let resources = PromptResources::load(&job.config_dir)?;

    let mut lock = StoreLock::open(&job.guard.store_path)?;
    let _held = lock.acquire()?;

    let mut guard = QuoteGuard::load(job.guard, clock);
    let status = guard.load_status();
    if status.store.is_corrupt() || status.aliases.is_corrupt() {
        warn!("Quote guard started degraded: {status:?}");
    }

    let runner = MonthRunner::new(model, system_prompt, resources, job.settings);
    let summary = runner.run_days(&plan, &mut guard).await?;
    guard.save()?;

    if let Some(writer) = writer {
        if !summary.rows.is_empty() {
            let written = writer.write_rows(&summary.rows)?;
            info!("[Sheets] Wrote {written} rows.");
        }
    }

    info!(
        "Done. Generated {} row(s), skipped {} day(s).",
        summary.rows.len(),
        summary.skipped_days.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::models::post::fixtures::valid_post;
    use crate::quotes::FixedClock;
    use crate::sheets::JsonlSheetWriter;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses in call order.
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<DailyPost, LlmError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<DailyPost, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContentModel for ScriptedModel {
        async fn generate(&self, _system: &str, user: &str) -> Result<DailyPost, LlmError> {
            self.calls.lock().unwrap().push(user.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()))
    }

    fn zen_day(d: u32) -> DayPlan {
        DayPlan {
            date: NaiveDate::from_ymd_opt(2026, 11, d).unwrap(),
            weekday: "Monday".to_string(),
            season: "Autumn".to_string(),
            week_theme: "Presence".to_string(),
            tradition: "Zen".to_string(),
            timezone: "Europe/Lisbon".to_string(),
            time_carousel: "09:00".to_string(),
            time_reel: "12:00".to_string(),
            time_image: "18:00".to_string(),
        }
    }

    fn zen_resources() -> PromptResources {
        let mut r = PromptResources::default();
        r.visual_identity.insert(
            "Zen".to_string(),
            crate::prompts::VisualSpec {
                keywords: vec!["ensō".to_string()],
            },
        );
        r
    }

    fn guard(dir: &tempfile::TempDir) -> QuoteGuard {
        let config = GuardConfig::new(dir.path().join("used_quotes.json"), dir.path().join("aliases.yml"));
        QuoteGuard::load(config, clock())
    }

    #[tokio::test]
    async fn test_duplicate_quote_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let mut guard = guard(&dir);
        let model = ScriptedModel::new(vec![
            Ok(valid_post("Be water, my friend.", "Bruce Lee")),
            Ok(valid_post("Be water, my friend!", "Bruce Lee")),
            Ok(valid_post("The quieter you become, the more you can hear.", "Ram Dass")),
        ]);
        let runner = MonthRunner::new(&model, "sys".to_string(), zen_resources(), RunSettings::default());

        let summary = runner.run_days(&[zen_day(2), zen_day(3)], &mut guard).await.unwrap();
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.rejected_attempts, 1);
        assert!(summary.skipped_days.is_empty());
        assert_eq!(summary.rows[1].quote, "The quieter you become, the more you can hear. — Ram Dass");
        assert_eq!(guard.len(), 2);

        // The second day's prompt lists the first day's quote as banned.
        let calls = model.calls.lock().unwrap();
        assert!(calls[1].contains("banned_quotes_norms: be water my friend | bruce lee"));
    }

    #[tokio::test]
    async fn test_day_skipped_after_attempt_budget() {
        let dir = tempfile::tempdir().unwrap();
        let mut guard = guard(&dir);
        let mut invalid = valid_post("Let go.", "Ajahn Chah");
        invalid.jp1 = "Let go of something.".to_string();
        let model = ScriptedModel::new(vec![
            Err(LlmError::EmptyContent),
            Ok(invalid),
            Ok(valid_post("Let go.", "Ajahn Chah")),
        ]);
        let runner = MonthRunner::new(&model, "sys".to_string(), zen_resources(), RunSettings::default());

        let summary = runner.run_days(&[zen_day(2), zen_day(3)], &mut guard).await.unwrap();
        assert_eq!(summary.skipped_days, vec![NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()]);
        assert_eq!(summary.rows.len(), 1);
        assert_eq!(summary.rows[0].date, "2026-11-03");
        assert_eq!(guard.len(), 1);
    }

    #[tokio::test]
    async fn test_run_month_end_to_end() {
        let config_dir = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            config_dir.path().join("rotation.yml"),
            "seasons:\n  Autumn:\n    months: [11]\n    weekly_pattern: [Zen, Zen, Zen, Zen, Zen, Zen, Zen]\n",
        )
        .unwrap();
        std::fs::write(config_dir.path().join("weekly_themes.yml"), "cycle:\n  - name: Presence\n").unwrap();
        std::fs::write(config_dir.path().join("hashtag_sets.yml"), "Zen:\n  - [\"#Zen\"]\n").unwrap();
        std::fs::write(config_dir.path().join("visual_identity.yml"), "Zen:\n  keywords: [ensō]\n").unwrap();
        std::fs::write(config_dir.path().join("prompt_system.txt"), "You write calm posts.").unwrap();

        // Only the first day gets a usable post; the other 29 are skipped.
        let model = ScriptedModel::new(vec![Ok(valid_post("Be water.", "Bruce Lee"))]);
        let store = data_dir.path().join("used_quotes.json");
        let job = MonthJob {
            year: 2026,
            month: 11,
            config_dir: config_dir.path().to_path_buf(),
            guard: GuardConfig::new(&store, config_dir.path().join("author_aliases.yml")),
            settings: RunSettings::default(),
        };
        let writer = JsonlSheetWriter::new(data_dir.path().join("posts.jsonl"));

        let summary = run_month(job, &model, clock(), Some(&writer)).await.unwrap();
        assert_eq!(summary.rows.len(), 1);
        assert_eq!(summary.skipped_days.len(), 29);

        let reloaded = QuoteGuard::load(
            GuardConfig::new(&store, config_dir.path().join("author_aliases.yml")),
            clock(),
        );
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.records()[0].date, NaiveDate::from_ymd_opt(2026, 11, 1).unwrap());

        let sheet = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(sheet.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_run_month_requires_config_files() {
        let config_dir = tempfile::tempdir().unwrap();
        let model = ScriptedModel::new(vec![]);
        let job = MonthJob {
            year: 2026,
            month: 11,
            config_dir: config_dir.path().to_path_buf(),
            guard: GuardConfig::new(
                config_dir.path().join("used_quotes.json"),
                config_dir.path().join("author_aliases.yml"),
            ),
            settings: RunSettings::default(),
        };
        let err = run_month(job, &model, clock(), None).await.unwrap_err();
        assert!(matches!(err, AppError::Plan(_)));
    }
}
