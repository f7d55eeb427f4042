use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use ledgerlens_structure::{Instruction, LanguageModel, ModelError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::auth::{Credentials, ANTHROPIC_ENV, OPENAI_ENV};
use crate::config::LlmSection;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAI),
            other => bail!("unknown llm provider {other:?} (expected anthropic or openai)"),
        }
    }
}

/// Build the configured model client. Fails early when its key is missing.
pub fn build_model(
    section: &LlmSection,
    provider: Provider,
    creds: &Credentials,
    client: reqwest::Client,
) -> Result<Arc<dyn LanguageModel>> {
    let settings = |key: &Option<String>, env: &str, default_base: &str| -> Result<Settings> {
        let api_key = key
            .clone()
            .ok_or_else(|| anyhow!("missing API key; set {env} or run: ledgerlens auth set"))?;
        Ok(Settings {
            api_key,
            model: section.model.clone(),
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| default_base.to_string()),
            temperature: section.temperature,
            max_tokens: section.max_tokens,
        })
    };

    let model: Arc<dyn LanguageModel> = match provider {
        Provider::Anthropic => Arc::new(AnthropicClient {
            client,
            settings: settings(&creds.anthropic_api_key, ANTHROPIC_ENV, ANTHROPIC_BASE_URL)?,
        }),
        Provider::OpenAI => Arc::new(OpenAiClient {
            client,
            settings: settings(&creds.openai_api_key, OPENAI_ENV, OPENAI_BASE_URL)?,
        }),
    };
    Ok(model)
}

#[derive(Debug, Clone)]
struct Settings {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl Settings {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn request_error(provider: &str, e: reqwest::Error) -> ModelError {
    ModelError::Request(format!("{provider} request: {e}"))
}

async fn check_status(provider: &str, resp: reqwest::Response) -> Result<reqwest::Response, ModelError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let txt = resp.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ModelError::Auth(format!("{provider} error: {status} {txt}")))
        }
        _ => Err(ModelError::Request(format!("{provider} error: {status} {txt}"))),
    }
}

// --- Anthropic ---

pub struct AnthropicClient {
    client: reqwest::Client,
    settings: Settings,
}

#[derive(Debug, Serialize)]
struct Msg {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicReq {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Msg>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResp {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    t: String,
    text: Option<String>,
}

impl AnthropicClient {
    fn body(&self, instruction: &Instruction) -> AnthropicReq {
        AnthropicReq {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system: instruction.system.clone(),
            messages: vec![Msg {
                role: "user".to_string(),
                content: instruction.user.clone(),
            }],
        }
    }
}

fn anthropic_text(resp: AnthropicResp) -> String {
    let mut s = String::new();
    for b in resp.content {
        if b.t == "text" {
            if let Some(t) = b.text {
                s.push_str(&t);
            }
        }
    }
    s.trim().to_string()
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    fn name(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, instruction: &Instruction) -> Result<String, ModelError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.settings.api_key)
            .map_err(|_| ModelError::MissingCredentials("anthropic key is not a valid header value".to_string()))?;
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .client
            .post(self.settings.url("/v1/messages"))
            .headers(headers)
            .json(&self.body(instruction))
            .send()
            .await
            .map_err(|e| request_error("anthropic", e))?;
        let resp = check_status("anthropic", resp).await?;

        let out: AnthropicResp = resp
            .json()
            .await
            .map_err(|e| ModelError::Request(format!("parse anthropic response: {e}")))?;
        Ok(anthropic_text(out))
    }
}

// --- OpenAI ---

pub struct OpenAiClient {
    client: reqwest::Client,
    settings: Settings,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    t: &'static str,
}

#[derive(Debug, Serialize)]
struct OpenAiReq {
    model: String,
    messages: Vec<Msg>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResp {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MsgOut,
}

#[derive(Debug, Deserialize)]
struct MsgOut {
    content: Option<String>,
}

impl OpenAiClient {
    fn body(&self, instruction: &Instruction) -> OpenAiReq {
        OpenAiReq {
            model: self.settings.model.clone(),
            messages: vec![
                Msg {
                    role: "system".to_string(),
                    content: instruction.system.clone(),
                },
                Msg {
                    role: "user".to_string(),
                    content: instruction.user.clone(),
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            response_format: instruction
                .json_only
                .then_some(ResponseFormat { t: "json_object" }),
        }
    }
}

fn openai_text(resp: OpenAiResp) -> String {
    resp.choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    fn name(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, instruction: &Instruction) -> Result<String, ModelError> {
        let resp = self
            .client
            .post(self.settings.url("/v1/chat/completions"))
            .header(AUTHORIZATION, format!("Bearer {}", self.settings.api_key))
            .json(&self.body(instruction))
            .send()
            .await
            .map_err(|e| request_error("openai", e))?;
        let resp = check_status("openai", resp).await?;

        let out: OpenAiResp = resp
            .json()
            .await
            .map_err(|e| ModelError::Request(format!("parse openai response: {e}")))?;
        Ok(openai_text(out))
    }
}
