//! Inference API boundary.
//!
//! [`InferenceClient`] sends one prompt and returns the response text. Any
//! failure aborts the advisory invocation; nothing is archived.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const SYSTEM_MESSAGE: &str = "You are an expert in climate risk assessment and building maintenance in Denmark. Give concrete, actionable advice based on the sensor and building registry data provided.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("inference API rejected the credentials: {0}")]
    Auth(String),

    #[error("inference API rate limit reached: {0}")]
    RateLimited(String),

    #[error("inference API unreachable: {0}")]
    Network(String),

    #[error("inference API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("inference API returned an unusable response: {0}")]
    Malformed(String),
}

pub trait InferenceClient {
    /// Model identifier recorded with each analysis.
    fn model(&self) -> &str;

    fn complete(&self, prompt: &str) -> Result<String, InferenceError>;
}

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible `chat/completions` client.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    settings: CompletionSettings,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: String, settings: CompletionSettings) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| InferenceError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            settings,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }
}

impl InferenceClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.settings.model
    }

    fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);
        log::debug!("POST {} ({} prompt chars)", url, prompt.len());

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| InferenceError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }
        extract_content(&body)
    }
}

fn classify_failure(status: StatusCode, body: &str) -> InferenceError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("no details").to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InferenceError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => InferenceError::RateLimited(message),
        _ => InferenceError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn extract_content(body: &str) -> Result<String, InferenceError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::Malformed(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| InferenceError::Malformed("no choices in response".to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_system_and_user_messages() {
        let client = OpenAiClient::new(
            "https://api.example.test/v1/",
            "sk-test".into(),
            CompletionSettings {
                model: "gpt-4".into(),
                max_tokens: 1000,
                temperature: 0.3,
            },
        )
        .unwrap();

        let json = serde_json::to_value(client.request_body("How humid?")).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "How humid?");
        assert_eq!(client.base_url, "https://api.example.test/v1");
    }

    #[test]
    fn extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Open a window."}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "Open a window.");
    }

    #[test]
    fn empty_choices_are_malformed() {
        assert!(matches!(extract_content(r#"{"choices":[]}"#), Err(InferenceError::Malformed(_))));
        assert!(matches!(extract_content("not json"), Err(InferenceError::Malformed(_))));
    }

    #[test]
    fn classifies_http_failures() {
        let body = r#"{"error":{"message":"Incorrect API key provided"}}"#;
        assert_eq!(
            classify_failure(StatusCode::UNAUTHORIZED, body),
            InferenceError::Auth("Incorrect API key provided".into())
        );
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, ""),
            InferenceError::RateLimited(_)
        ));
        assert_eq!(
            classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "oops"),
            InferenceError::Api {
                status: 500,
                message: "Internal Server Error".into()
            }
        );
    }
}
