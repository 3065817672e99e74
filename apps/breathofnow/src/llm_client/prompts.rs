// Cross-cutting prompt fragments appended by the client itself.
// Day-specific prompt text lives in crate::prompts.

/// Appended to every system prompt so responses stay machine-readable even
/// when a model ignores the structured-output format.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Name under which the response schema is registered with the API.
pub const SCHEMA_NAME: &str = "BreathOfNowDailyPost";

pub fn system_with_json_rule(system: &str) -> String {
    format!("{}\n\n{JSON_ONLY_SYSTEM}", system.trim_end())
}
