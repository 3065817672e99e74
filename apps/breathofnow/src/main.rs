use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use breathofnow::config::Config;
use breathofnow::llm_client::{ContentModel, DisabledModel, LlmClient};
use breathofnow::quotes::{GuardConfig, SystemClock};
use breathofnow::runner::{run_month, MonthJob, RunSettings};
use breathofnow::sheets::{DryRunSheetWriter, JsonlSheetWriter, SheetWriter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting BreathOfNow generator v{}", env!("CARGO_PKG_VERSION"));
    info!("Target month: {}-{:02}", config.year, config.month);

    let model: Box<dyn ContentModel> = match &config.openai_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone(), config.openai_model.clone())
                .context("Failed to build HTTP client")?;
            info!("LLM client initialized (model: {})", client.model());
            Box::new(client)
        }
        None => {
            info!("USE_OPENAI is not set; running without model calls");
            Box::new(DisabledModel)
        }
    };

    let writer: Box<dyn SheetWriter> = if config.write_to_sheets {
        info!("Sheet output: {}", config.sheet_output.display());
        Box::new(JsonlSheetWriter::new(config.sheet_output.clone()))
    } else {
        Box::new(DryRunSheetWriter)
    };

    let guard = GuardConfig::new(config.store_path(), config.aliases_path())
        .with_window_days(config.quote_window_days)
        .with_language(config.language.clone());

    let job = MonthJob {
        year: config.year,
        month: config.month,
        config_dir: config.config_dir.clone(),
        guard,
        settings: RunSettings {
            language: config.language.clone(),
            ..RunSettings::default()
        },
    };

    let summary = run_month(job, model.as_ref(), Arc::new(SystemClock), Some(writer.as_ref()))
        .await
        .context("Month run failed")?;

    info!(
        "Generated {} row(s); skipped days: {:?}",
        summary.rows.len(),
        summary.skipped_days
    );
    Ok(())
}
