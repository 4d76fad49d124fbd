//! The model seam.
//!
//! `LlmClient` is the boundary the runtime delegates to; everything behind
//! it (prompt assembly, the tool-call loop, provider wire formats) is
//! swappable. `ChatCompletionsClient` is the one shipped implementation and
//! speaks the OpenAI-compatible chat completions dialect, which covers both
//! hosted OpenAI and a local Ollama daemon.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use salescope_core::config::{LlmConfig, LlmProvider};

use crate::tools::ToolRegistry;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Answer `question` under `instruction`, calling tools from the
    /// registry as the model requests them.
    async fn answer(
        &self,
        instruction: &str,
        question: &str,
        tools: &ToolRegistry,
    ) -> Result<String>;
}

/// Bound on model<->tool round trips within a single question. Prevents a
/// model that keeps requesting tools from looping forever.
const MAX_TOOL_TURNS: usize = 8;

pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    max_retries: u32,
}

impl ChatCompletionsClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("building llm http client")?;

        Ok(Self {
            http,
            endpoint: chat_endpoint(config),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn complete_once(&self, body: &Value) -> Result<ChatMessageWire> {
        let mut attempt = 0;
        let response = loop {
            let mut request = self.http.post(&self.endpoint).json(body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key.expose_secret());
            }

            match request.send().await {
                Ok(response) => break response,
                Err(error) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "agent.llm.retry",
                        attempt,
                        error = %error,
                        "transport failure, retrying completion"
                    );
                }
                Err(error) => return Err(error).context("llm transport failure"),
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("llm provider returned status {status}: {body}");
        }

        let completion: ChatResponseWire =
            response.json().await.context("decoding llm completion")?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| anyhow!("llm completion contained no choices"))
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn answer(
        &self,
        instruction: &str,
        question: &str,
        tools: &ToolRegistry,
    ) -> Result<String> {
        let mut messages = vec![
            json!({"role": "system", "content": instruction}),
            json!({"role": "user", "content": question}),
        ];
        let descriptors = tools.descriptors();

        for turn in 0..MAX_TOOL_TURNS {
            let mut body = json!({"model": self.model, "messages": messages});
            if !descriptors.is_empty() {
                body["tools"] = serde_json::to_value(&descriptors)?;
            }

            let message = self.complete_once(&body).await?;

            if message.tool_calls.is_empty() {
                return Ok(message.content.unwrap_or_default());
            }

            debug!(
                event_name = "agent.llm.tool_turn",
                turn,
                requested = message.tool_calls.len()
            );

            messages.push(json!({
                "role": "assistant",
                "content": message.content,
                "tool_calls": message.tool_calls,
            }));

            for call in &message.tool_calls {
                let input: Value =
                    serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);
                let result = tools.dispatch(&call.function.name, input).await;
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": result,
                }));
            }
        }

        bail!("model exceeded {MAX_TOOL_TURNS} tool turns without a final answer")
    }
}

fn chat_endpoint(config: &LlmConfig) -> String {
    match config.provider {
        LlmProvider::OpenAi => {
            let base = config.base_url.as_deref().unwrap_or("https://api.openai.com/v1");
            format!("{}/chat/completions", base.trim_end_matches('/'))
        }
        // Ollama serves the OpenAI-compatible surface under /v1.
        LlmProvider::Ollama => {
            let base = config.base_url.as_deref().unwrap_or("http://localhost:11434");
            format!("{}/v1/chat/completions", base.trim_end_matches('/'))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponseWire {
    #[serde(default)]
    choices: Vec<ChatChoiceWire>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceWire {
    message: ChatMessageWire,
}

#[derive(Debug, Deserialize)]
struct ChatMessageWire {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallWire>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ToolCallWire {
    id: String,
    #[serde(rename = "type", default)]
    kind: String,
    function: FunctionCallWire,
}

#[derive(Debug, Deserialize, Serialize)]
struct FunctionCallWire {
    name: String,
    arguments: String,
}
