//! OpenAI-compatible chat.completions client.
//!
//! We request a JSON-schema constrained response and hand back the raw message text.
//! Calls are instrumented and log model name, latency and token usage (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::error::GenerationError;
use crate::generation::GenerationRequest;
use crate::generator::ExamGenerator;

const SCHEMA_NAME: &str = "exam_content";

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(120))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  fn chat_request(&self, req: &GenerationRequest) -> ChatCompletionRequest {
    ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: req.system.clone() },
        ChatMessageReq { role: "user".into(), content: req.prompt.clone() },
      ],
      temperature: req.temperature,
      response_format: ResponseFormat {
        r#type: "json_schema".into(),
        json_schema: JsonSchemaFormat { name: SCHEMA_NAME.into(), schema: req.schema.clone() },
      },
    }
  }
}

#[async_trait]
impl ExamGenerator for OpenAI {
  fn name(&self) -> &str { "openai" }

  #[instrument(level = "info", skip(self, req), fields(model = %self.model, prompt_len = req.prompt.len()))]
  async fn generate(&self, req: &GenerationRequest) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let body = self.chat_request(req);
    let start = Instant::now();

    let res = self.client.post(&url)
      .header(USER_AGENT, "examgenius-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&body).send().await.map_err(|e| GenerationError::Call(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      error!(elapsed = ?start.elapsed(), %status, "OpenAI call failed");
      return Err(GenerationError::Call(format!("OpenAI HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| GenerationError::Call(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = first_message_text(body).ok_or(GenerationError::EmptyResponse)?;
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");
    Ok(text)
  }
}

fn first_message_text(body: ChatCompletionResponse) -> Option<String> {
  body.choices.into_iter().next()
    .and_then(|c| c.message.content)
    .filter(|t| !t.trim().is_empty())
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  response_format: ResponseFormat,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")] r#type: String,
  json_schema: JsonSchemaFormat,
}
#[derive(Serialize)]
struct JsonSchemaFormat { name: String, schema: Value }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{GenerationSettings, Prompts};
  use crate::domain::ExamConfig;
  use crate::generation::build_request;

  fn client() -> OpenAI {
    OpenAI {
      client: reqwest::Client::new(),
      api_key: "sk-test".into(),
      base_url: "http://localhost".into(),
      model: "gpt-4o-mini".into(),
    }
  }

  #[test]
  fn request_embeds_schema_and_temperature() {
    let cfg: ExamConfig = serde_json::from_str(r#"{"subject":"Biologi","mcCount":3}"#).unwrap();
    let req = build_request(&cfg, &Prompts::default(), &GenerationSettings::default());
    let body = serde_json::to_value(client().chat_request(&req)).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["temperature"], 0.5);
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["response_format"]["type"], "json_schema");
    assert_eq!(body["response_format"]["json_schema"]["schema"], req.schema);
  }

  #[test]
  fn blank_content_counts_as_no_payload() {
    let body: ChatCompletionResponse =
      serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();
    assert_eq!(first_message_text(body), None);
    let body: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
    assert_eq!(first_message_text(body), None);
  }

  #[test]
  fn extracts_vendor_error_message() {
    let msg = extract_openai_error(r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#);
    assert_eq!(msg.as_deref(), Some("Incorrect API key provided"));
    assert_eq!(extract_openai_error("<html>"), None);
  }
}
