use crate::error::{LlmError, Result};
use crate::prompt;
use fluxa_core::config::GeneratorConfig;
use fluxa_core::orchestrator::{BackendError, GenerationBackend, GenerationRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// ChatBackend
// ---------------------------------------------------------------------------

/// OpenAI-compatible `chat/completions` client.
pub struct ChatBackend {
    client: reqwest::blocking::Client,
    settings: GeneratorConfig,
    api_key: String,
}

impl ChatBackend {
    pub fn new(settings: GeneratorConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            settings,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    /// System prompt, optional few-shot pair, then the tutorial.
    pub fn messages(&self, request: &GenerationRequest<'_>) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(prompt::SYSTEM_PROMPT)];
        if self.settings.few_shot {
            messages.extend(prompt::few_shot_examples());
        }
        messages.push(ChatMessage::user(prompt::user_prompt(
            request.content,
            request.source,
            request.source_kind,
        )));
        messages
    }

    /// One round-trip. Returns the first choice's message content.
    pub fn complete_chat(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let body = ChatRequest {
            model: &self.settings.model,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            messages: self.messages(request),
        };

        tracing::debug!(model = %self.settings.model, url = %self.endpoint(), "chat completion request");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

impl GenerationBackend for ChatBackend {
    fn name(&self) -> String {
        format!("chat:{}", self.settings.model)
    }

    fn complete(&self, request: &GenerationRequest<'_>) -> std::result::Result<String, BackendError> {
        self.complete_chat(request).map_err(BackendError::new)
    }
}
