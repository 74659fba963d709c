use serde::{Deserialize, Serialize};

pub const DEFAULT_TUTOR_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_SPECIALIST_MODEL: &str = "gemini-2.0-flash-exp";

/// Sampling temperature for tutoring answers
pub const TUTOR_TEMPERATURE: f32 = 0.7;

/// Model, key and output limit a client sends with every request
#[derive(Debug, Clone)]
pub(crate) struct GeminiModel {
    pub api_key: String,
    pub model_name: String,
    pub max_output_tokens: Option<i32>,
}

impl GeminiModel {
    pub fn new(api_key: String, model_name: Option<String>, max_output_tokens: Option<i32>) -> Self {
        Self {
            api_key,
            model_name: model_name.unwrap_or_else(|| DEFAULT_TUTOR_MODEL.to_string()),
            max_output_tokens,
        }
    }

    /// Sampling settings for one prompt
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: Some(TUTOR_TEMPERATURE),
            max_output_tokens: self.max_output_tokens,
        }
    }
}

/// `generateContent` request body
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// A request holding one user turn
    pub fn user_prompt(prompt: &str, generation_config: GenerationConfig) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part::text(prompt.to_string())],
                role: Some("user".to_string()),
            }],
            generation_config: Some(generation_config),
        }
    }
}

/// Content structure for requests
#[derive(Serialize, Clone, Debug, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Part structure for a piece of content
#[derive(Serialize, Clone, Debug, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: String) -> Self {
        Self { text: Some(text) }
    }
}

#[derive(Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i32>,
}

/// Response from Gemini API
#[derive(Deserialize, Debug, Serialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Candidate in the response
#[derive(Deserialize, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<ContentResponsePart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Content part in the response
#[derive(Deserialize, Debug, Serialize)]
pub struct ContentResponsePart {
    #[serde(default)]
    pub parts: Vec<PartResponse>,
    pub role: Option<String>,
}

/// Part response from the API
#[derive(Deserialize, Debug, Serialize)]
pub struct PartResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
