use serde::{Deserialize, Serialize};

/// One day of generated content, as the model must return it.
///
/// Unknown fields are refused so a drifting model response fails parsing
/// instead of silently losing content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailyPost {
    pub quote_text: String,
    pub quote_author: String,
    pub med1: String,
    pub med2: String,
    pub jp1: String,
    pub jp2: String,
    pub cta_line: String,
    pub carousel_caption: String,
    pub carousel_hashtags: Vec<String>,
    pub carousel_first_comment: String,
    pub story_action: String,
    pub poem_text: String,
    pub poem_caption: String,
    pub poem_first_comment: String,
    pub poem_story_action: String,
    pub image_prompt: String,
    pub image_caption: String,
    pub image_first_comment: String,
    pub image_story_action: String,
}

impl DailyPost {
    /// Names of the string fields, in schema order.
    pub const TEXT_FIELDS: &'static [&'static str] = &[
        "quote_text",
        "quote_author",
        "med1",
        "med2",
        "jp1",
        "jp2",
        "cta_line",
        "carousel_caption",
        "carousel_first_comment",
        "story_action",
        "poem_text",
        "poem_caption",
        "poem_first_comment",
        "poem_story_action",
        "image_prompt",
        "image_caption",
        "image_first_comment",
        "image_story_action",
    ];

    /// Strict JSON schema handed to the model as its structured-output format.
    pub fn json_schema() -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for field in Self::TEXT_FIELDS {
            properties.insert(field.to_string(), serde_json::json!({ "type": "string" }));
        }
        properties.insert(
            "carousel_hashtags".to_string(),
            serde_json::json!({
                "type": "array",
                "items": { "type": "string" },
            }),
        );
        let required: Vec<&str> = Self::TEXT_FIELDS
            .iter()
            .copied()
            .chain(std::iter::once("carousel_hashtags"))
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}
