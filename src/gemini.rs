//! Google Gemini `generateContent` client.
//!
//! Gemini takes its response schema in OpenAPI style with upper-case type names,
//! so the neutral schema from `generation::output_schema` is converted first.
//!
//! NOTE: the API key travels in the query string; it is never logged.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::error::GenerationError;
use crate::generation::GenerationRequest;
use crate::generator::ExamGenerator;

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY (or API_KEY); otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY")
      .or_else(|_| std::env::var("API_KEY"))
      .ok()
      .filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(120))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  fn content_request(&self, req: &GenerationRequest) -> GenerateContentRequest {
    GenerateContentRequest {
      system_instruction: Some(Content { role: None, parts: vec![Part { text: req.system.clone() }] }),
      contents: vec![Content { role: Some("user".into()), parts: vec![Part { text: req.prompt.clone() }] }],
      generation_config: GenerationConfig {
        response_mime_type: "application/json".into(),
        response_schema: to_gemini_schema(&req.schema),
        temperature: req.temperature,
      },
    }
  }
}

#[async_trait]
impl ExamGenerator for Gemini {
  fn name(&self) -> &str { "gemini" }

  #[instrument(level = "info", skip(self, req), fields(model = %self.model, prompt_len = req.prompt.len()))]
  async fn generate(&self, req: &GenerationRequest) -> Result<String, GenerationError> {
    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let body = self.content_request(req);
    let start = Instant::now();

    let res = self.client.post(&url)
      .query(&[("key", self.api_key.as_str())])
      .header(USER_AGENT, "examgenius-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&body).send().await
      // reqwest errors may carry the URL, which carries the key.
      .map_err(|e| GenerationError::Call(e.without_url().to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or(body);
      error!(elapsed = ?start.elapsed(), %status, "Gemini call failed");
      return Err(GenerationError::Call(format!("Gemini HTTP {}: {}", status, msg)));
    }

    let body: GenerateContentResponse = res.json().await
      .map_err(|e| GenerationError::Call(e.without_url().to_string()))?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    let text = candidate_text(body).ok_or(GenerationError::EmptyResponse)?;
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");
    Ok(text)
  }
}

/// Recursively upper-case every `"type"` value ("object" -> "OBJECT").
pub fn to_gemini_schema(schema: &Value) -> Value {
  match schema {
    Value::Object(map) => Value::Object(
      map.iter()
        .map(|(k, v)| {
          let v = match (k.as_str(), v) {
            ("type", Value::String(t)) => Value::String(t.to_uppercase()),
            _ => to_gemini_schema(v),
          };
          (k.clone(), v)
        })
        .collect(),
    ),
    Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
    other => other.clone(),
  }
}

/// Concatenated text parts of the first candidate.
fn candidate_text(body: GenerateContentResponse) -> Option<String> {
  let content = body.candidates.into_iter().next()?.content?;
  let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
  if text.trim().is_empty() { None } else { Some(text) }
}

// --- DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<Content>,
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}
#[derive(Serialize)]
struct Content {
  #[serde(skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  parts: Vec<Part>,
}
#[derive(Serialize)]
struct Part { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  response_mime_type: String,
  response_schema: Value,
  temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate { #[serde(default)] content: Option<ContentResp> }
#[derive(Deserialize)]
struct ContentResp { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize)]
struct PartResp { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  use crate::generation::output_schema;

  #[test]
  fn schema_types_are_upper_cased_everywhere() {
    let g = to_gemini_schema(&output_schema());
    assert_eq!(g["type"], "OBJECT");
    assert_eq!(g["properties"]["title"]["type"], "STRING");
    let item = &g["properties"]["questions"]["items"];
    assert_eq!(g["properties"]["questions"]["type"], "ARRAY");
    assert_eq!(item["properties"]["id"]["type"], "INTEGER");
    assert_eq!(item["properties"]["options"]["items"]["type"], "STRING");
    // Property names and enum values are untouched.
    assert!(item["properties"].get("type").is_some());
    assert_eq!(item["properties"]["type"]["enum"], json!(["multiple_choice", "essay"]));
    assert_eq!(g["required"], json!(["title", "questions"]));
  }

  #[test]
  fn request_uses_json_mime_type() {
    let client = Gemini {
      client: reqwest::Client::new(),
      api_key: "k".into(),
      base_url: "http://localhost".into(),
      model: "gemini-2.5-flash".into(),
    };
    let req = GenerationRequest { system: "s".into(), prompt: "p".into(), schema: output_schema(), temperature: 0.5 };
    let body = serde_json::to_value(client.content_request(&req)).unwrap();
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(body["generationConfig"]["temperature"], 0.5);
    assert_eq!(body["contents"][0]["parts"][0]["text"], "p");
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "s");
  }

  #[test]
  fn joins_candidate_parts() {
    let body: GenerateContentResponse = serde_json::from_value(json!({
      "candidates": [{ "content": { "parts": [{ "text": "{\"title\":" }, { "text": "\"X\"}" }] } }]
    }))
    .unwrap();
    assert_eq!(candidate_text(body).as_deref(), Some("{\"title\":\"X\"}"));
  }

  #[test]
  fn missing_candidates_mean_no_payload() {
    let body: GenerateContentResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
    assert_eq!(candidate_text(body), None);
    let body: GenerateContentResponse = serde_json::from_value(json!({ "candidates": [{}] })).unwrap();
    assert_eq!(candidate_text(body), None);
  }
}
