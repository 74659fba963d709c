use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::errors::{GeminiError, GeminiResult};
use crate::llm::LLMClient;
use crate::types::*;

/// Client for interacting with the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    model: GeminiModel,
}

impl GeminiClient {
    /// Create a new Gemini API client for the configured tutor model
    pub fn new(config: &GeminiConfig) -> GeminiResult<Self> {
        Self::with_model(config, config.model_name.clone())
    }

    /// Create a client that talks to a specific model, sharing the API key of `config`
    pub fn with_model(config: &GeminiConfig, model_name: Option<String>) -> GeminiResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                GeminiError::ConfigError(
                    "API key is required to initialize the Gemini client".to_string(),
                )
            })?;

        let model = GeminiModel::new(api_key, model_name, config.max_output_tokens);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, model })
    }

    /// Get the base API URL
    fn get_base_url(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model.model_name, self.model.api_key
        )
    }

    /// Generate content using the Gemini API
    pub async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> GeminiResult<GenerateContentResponse> {
        let url = self.get_base_url();

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                GeminiError::ResponseError(format!("Failed to read error response: {}", e))
            })?;

            return Err(GeminiError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        let response_body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GeminiError::ParsingError(format!("Failed to parse response: {}", e)))?;

        Ok(response_body)
    }

    pub(crate) fn create_prompt_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest::user_prompt(prompt, self.model.generation_config())
    }

    /// Helper method to extract text from a response
    pub fn extract_text_from_response(response: &GenerateContentResponse) -> GeminiResult<String> {
        let candidate = response.candidates.first().ok_or_else(|| {
            GeminiError::ResponseError("No candidates in response".to_string())
        })?;

        if let Some(reason) = &candidate.finish_reason {
            if reason != "STOP" {
                warn!(finish_reason = %reason, "Gemini generation did not stop normally");
            }
        }

        let content = candidate
            .content
            .as_ref()
            .ok_or_else(|| GeminiError::ResponseError("No content in candidate".to_string()))?;

        let part = content
            .parts
            .first()
            .ok_or_else(|| GeminiError::ResponseError("No parts in content".to_string()))?;

        let text = part
            .text
            .as_ref()
            .ok_or_else(|| GeminiError::ResponseError("No text in part".to_string()))?;

        Ok(text.clone())
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> GeminiResult<String> {
        debug!(
            model = %self.model.model_name,
            prompt_len = prompt.len(),
            "Generating text with Gemini"
        );
        let request = self.create_prompt_request(prompt);
        let response = self.generate_content(request).await?;
        Self::extract_text_from_response(&response)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn model_name(&self) -> String {
        self.model.model_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: Option<&str>) -> GeminiConfig {
        GeminiConfig {
            api_key: key.map(str::to_string),
            ..GeminiConfig::default()
        }
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = GeminiClient::new(&config_with_key(None));
        assert!(matches!(result, Err(GeminiError::ConfigError(_))));

        let result = GeminiClient::new(&config_with_key(Some("   ")));
        assert!(matches!(result, Err(GeminiError::ConfigError(_))));
    }

    #[test]
    fn test_with_model_overrides_model_name() {
        let config = config_with_key(Some("secret"));
        let client =
            GeminiClient::with_model(&config, Some(DEFAULT_SPECIALIST_MODEL.to_string())).unwrap();
        assert_eq!(client.model_name(), DEFAULT_SPECIALIST_MODEL);
        assert_eq!(client.provider_name(), "gemini");
        assert!(client.get_base_url().contains("gemini-2.0-flash-exp:generateContent"));
    }

    #[test]
    fn test_prompt_request_serialization() {
        let client = GeminiClient::new(&config_with_key(Some("secret"))).unwrap();
        let request = client.create_prompt_request("What is 2+2?");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "What is 2+2?");
        let temperature = json["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_prompt_request_carries_output_limit() {
        let config = GeminiConfig {
            max_output_tokens: Some(256),
            ..config_with_key(Some("secret"))
        };
        let client = GeminiClient::new(&config).unwrap();
        let json = serde_json::to_value(client.create_prompt_request("Explain gravity")).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn test_extract_text_from_response() {
        let body = r#"{
            "candidates": [
                {
                    "content": { "parts": [{ "text": "Four." }], "role": "model" },
                    "finishReason": "STOP"
                }
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let text = GeminiClient::extract_text_from_response(&response).unwrap();
        assert_eq!(text, "Four.");
    }

    #[test]
    fn test_extract_text_rejects_empty_response() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        let result = GeminiClient::extract_text_from_response(&response);
        assert!(matches!(result, Err(GeminiError::ResponseError(_))));

        let body = r#"{ "candidates": [ { "content": { "parts": [], "role": "model" } } ] }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let result = GeminiClient::extract_text_from_response(&response);
        assert!(matches!(result, Err(GeminiError::ResponseError(_))));
    }
}
