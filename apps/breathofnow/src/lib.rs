//! BreathOfNow monthly content pipeline.
//!
//! The centre of the crate is [`quotes`], the rolling-window quote guard.
//! The other modules plan the month, prompt the model, validate its output
//! and write sheet rows around it.

pub mod calendar;
pub mod config;
pub mod errors;
pub mod llm_client;
pub mod models;
pub mod prompts;
pub mod quotes;
pub mod runner;
pub mod sheets;
pub mod validation;
