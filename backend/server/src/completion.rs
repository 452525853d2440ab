//! # Completion Provider
//!
//! OpenAI-compatible chat completions, used to turn a user's impact totals
//! into a short natural-language summary.
//!
//! One request per `/chat` call: a system prompt plus the user's message, no
//! streaming, no tools, no retries. Any OpenAI-compatible base URL works, the
//! `/v1` path is appended here.
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, InvalidHeaderValue},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Level, event, info, instrument};

use crate::config::CompletionConfig;

const API_VERSION: &str = "v1";

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Completion provider is not configured")]
    NotConfigured,

    #[error("Completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Completion provider responded {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Unexpected completion response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Completion provider returned an empty reply")]
    EmptyReply,

    #[error("Invalid completion API key: {0}")]
    InvalidKey(#[from] InvalidHeaderValue),
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system_prompt: &str, message: &str) -> Result<String, CompletionError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
}

impl Message {
    fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: Some(content.to_string()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<Message>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: Message,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatCompletionChoice>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if it carries any.
    pub fn into_reply(self) -> Result<String, CompletionError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(CompletionError::EmptyReply)
    }
}

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))?,
        );

        let base_url = config.base_url.trim_end_matches('/');

        Ok(Self {
            client: Client::builder().default_headers(headers).build()?,
            base_url: format!("{base_url}/{API_VERSION}"),
            model: config.model.clone(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    #[instrument(level = "debug", skip(self, system_prompt, message), fields(model = %self.model))]
    async fn complete(&self, system_prompt: &str, message: &str) -> Result<String, CompletionError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                Message::new(Role::System, system_prompt),
                Message::new(Role::User, message),
            ],
        };

        let response = self.client.post(self.chat_url()).json(&request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(CompletionError::Status { status, body: text });
        }
        event!(Level::TRACE, response = text);

        serde_json::from_str::<ChatCompletionResponse>(&text)?.into_reply()
    }
}

pub fn init_completion(
    config: Option<&CompletionConfig>,
) -> Result<Option<Arc<dyn CompletionProvider>>, CompletionError> {
    let Some(config) = config else {
        return Ok(None);
    };

    info!("Using completion model {} at {}", config.model, config.base_url);
    let provider: Arc<dyn CompletionProvider> = Arc::new(OpenAiProvider::new(config)?);

    Ok(Some(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: vec![
                Message::new(Role::System, "be brief"),
                Message::new(Role::User, "hi"),
            ],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_reply_from_first_choice() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"chatcmpl-1","object":"chat.completion","created":1,"model":"gpt-4o-mini",
                "choices":[{"index":0,"message":{"role":"assistant","content":"  Nice work!  "},
                "finish_reason":"stop"}]}"#,
        )
        .unwrap();

        assert_eq!(response.into_reply().unwrap(), "Nice work!");
    }

    #[test]
    fn test_empty_reply() {
        let response: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(response.into_reply(), Err(CompletionError::EmptyReply)));

        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
        )
        .unwrap();
        assert!(matches!(response.into_reply(), Err(CompletionError::EmptyReply)));
    }

    #[test]
    fn test_chat_url() {
        let provider = OpenAiProvider::new(&CompletionConfig {
            api_key: "sk-test".to_string(),
            base_url: "http://localhost:4000/".to_string(),
            model: "local".to_string(),
        })
        .unwrap();

        assert_eq!(provider.chat_url(), "http://localhost:4000/v1/chat/completions");
    }
}
