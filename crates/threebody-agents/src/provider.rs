use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use threebody_models::ReasoningConfig;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::prompts::SYSTEM_PROMPT;

/// A text-completion backend. Mockable for testing.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, AgentError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions endpoint (Groq, OpenAI, local servers).
pub struct ChatCompletionsProvider {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl ChatCompletionsProvider {
    pub fn new(config: &ReasoningConfig, api_key: String) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ReasoningProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        "chat_completions"
    }

    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        debug!(model = %self.model, url = %self.api_url, "Requesting chat completion");

        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Chat completion rejected");
            return Err(AgentError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(AgentError::EmptyResponse)
    }
}

/// Runs the `claude` CLI in print mode and returns its stdout.
pub struct ClaudeCliProvider {
    binary: String,
    model: String,
    timeout: Duration,
}

impl ClaudeCliProvider {
    pub fn new(model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: "claude".to_string(),
            model: model.into(),
            timeout,
        }
    }

    /// Use a different executable, e.g. a wrapper script.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl ReasoningProvider for ClaudeCliProvider {
    fn name(&self) -> &str {
        "claude_cli"
    }

    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        debug!(model = %self.model, binary = %self.binary, "Invoking claude CLI");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary)
                .args([
                    "-p",
                    prompt,
                    "--system-prompt",
                    SYSTEM_PROMPT,
                    "--model",
                    &self.model,
                    "--output-format",
                    "text",
                ])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| AgentError::Timeout(self.timeout.as_secs()))?
        .map_err(|e| AgentError::Cli(format!("Failed to spawn {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr, "Claude CLI failed");
            return Err(AgentError::Cli(format!(
                "{} exited {}: {}",
                self.binary, output.status, stderr
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if stdout.trim().is_empty() {
            return Err(AgentError::EmptyResponse);
        }
        Ok(stdout)
    }
}
