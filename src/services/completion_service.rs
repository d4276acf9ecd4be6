use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CompletionConfig;

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Rewrite style requested by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Summary,
    Grammar,
    Improve,
    Conversational,
    /// Fallback for any tag we don't recognise.
    General,
}

impl PromptMode {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "summary" => PromptMode::Summary,
            "grammar" => PromptMode::Grammar,
            "improve" => PromptMode::Improve,
            "conversational" => PromptMode::Conversational,
            _ => PromptMode::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptMode::Summary => "summary",
            PromptMode::Grammar => "grammar",
            PromptMode::Improve => "improve",
            PromptMode::Conversational => "conversational",
            PromptMode::General => "general",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            PromptMode::Summary => concat!(
                "You are an expert writing assistant. ",
                "Provide a clear, concise, well-structured summary of the given content. ",
                "Do not add commentary. ",
                "Do not explain that it is a summary. ",
                "Return only the summarized text."
            ),
            PromptMode::Grammar => concat!(
                "You are a professional grammar correction engine. ",
                "Rewrite the text with corrected grammar and clarity. ",
                "Do not explain the changes. ",
                "Do not provide alternatives. ",
                "Do not add commentary. ",
                "Return only the corrected text."
            ),
            PromptMode::Improve => concat!(
                "You are a professional content strategist. ",
                "Enhance the writing to make it more engaging, structured, and impactful. ",
                "Preserve the author's core message. ",
                "Do not use markdown formatting symbols such as **, *, or #. ",
                "Do not explain changes. ",
                "Return only the improved version."
            ),
            PromptMode::Conversational => concat!(
                "You are a friendly and intelligent assistant. ",
                "Rewrite the content in a more natural, conversational tone ",
                "while keeping it professional and clear."
            ),
            PromptMode::General => "You are an intelligent writing assistant.",
        }
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP client could not be built: {0}")]
    Client(String),

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Upstream reply could not be read: {0}")]
    InvalidReply(String),
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Thin client for an OpenAI-compatible chat completions endpoint.
pub struct CompletionProxy {
    config: CompletionConfig,
    http: reqwest::Client,
}

impl CompletionProxy {
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Client(e.to_string()))?;

        Ok(Self { config, http })
    }

    /// Send `prompt` with the system prompt for `mode` and return the reply text. No retries.
    pub async fn generate(&self, prompt: &str, mode: PromptMode) -> Result<String, CompletionError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: mode.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
        };

        let url = format!("{}{}", self.config.base_url, CHAT_COMPLETIONS_PATH);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidReply(e.to_string()))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::InvalidReply("reply contained no message content".to_string()))
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Transport(format!("Request timed out: {}", e))
    } else if e.is_connect() {
        CompletionError::Transport(format!("Connection failed: {}", e))
    } else {
        CompletionError::Transport(format!("Network error: {}", e))
    }
}
