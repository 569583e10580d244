//! Gemini `generateContent` wire format and HTTP client

use anyhow::{Context as _, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

use super::bridge::ChatModel;
use super::tools::ToolDefinition;
use crate::WayfarerError;
use crate::config::AssistantConfig;

/// A structured tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// The serialized result of a tool invocation, fed back to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// One content part: plain text, a function call, or a function response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: name.into(),
                args,
            }),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self {
            function_response: Some(FunctionResponse {
                name: name.into(),
                response,
            }),
            ..Default::default()
        }
    }
}

/// One conversation entry: a role plus its parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    #[must_use]
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    /// Function responses are delivered back to the model as a user entry.
    #[must_use]
    pub fn function_responses(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }

    /// All function calls in this entry, in the order the model supplied them.
    #[must_use]
    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.parts
            .iter()
            .filter_map(|p| p.function_call.as_ref())
            .collect()
    }

    /// Concatenated text of all text parts.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// HTTP client for the generative-language API
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    tool_declarations: Vec<Value>,
}

impl GeminiClient {
    pub fn new(config: &AssistantConfig, tools: &[ToolDefinition]) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("Assistant API key is not configured"))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
            .build()
            .context("Failed to build assistant HTTP client")?;

        let tool_declarations = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.input_schema,
                })
            })
            .collect();

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            tool_declarations,
        })
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    #[tracing::instrument(name = "generate_content", level = "debug", skip_all)]
    async fn complete(&self, system_prompt: &str, history: &[Content]) -> Result<Content> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = json!({
            "systemInstruction": {"parts": [{"text": system_prompt}]},
            "contents": history,
            "tools": [
                {"functionDeclarations": self.tool_declarations},
                // Provider-side open-ended web search.
                {"googleSearch": {}},
            ],
        });

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(
                WayfarerError::api(format!("Assistant API returned HTTP {status}: {detail}"))
                    .into(),
            );
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse assistant response")?;

        parsed
            .candidates
            .and_then(|mut c| {
                if c.is_empty() {
                    None
                } else {
                    c.remove(0).content
                }
            })
            .ok_or_else(|| anyhow!("Assistant returned no candidates"))
    }
}
