use thiserror::Error;

use crate::calendar::PlanError;
use crate::config::ConfigFileError;
use crate::llm_client::LlmError;
use crate::quotes::GuardError;
use crate::sheets::SheetError;

/// Pipeline-level error type. Each variant wraps the owning module's error so
/// callers can still match on the root cause.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigFileError),

    #[error("Calendar error: {0}")]
    Plan(#[from] PlanError),

    #[error("Quote guard error: {0}")]
    Guard(#[from] GuardError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),
}
