//! Minimal Gemini client for streamed text generation.
//!
//! One call per generation: `streamGenerateContent` with `alt=sse`. Each
//! server-sent event carries a partial `GenerateContentResponse`; the text
//! parts of its first candidate become one fragment. No retries.
//!
//! NOTE: the API key travels in the `x-goog-api-key` header and is never logged.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::config::DEFAULT_GEMINI_BASE_URL;

const SSE_EVENT_SEPARATOR: &str = "\n\n";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Per-call knobs forwarded to the model.
#[derive(Clone, Debug, PartialEq)]
pub struct CallSettings {
  pub model: String,
  pub temperature: f32,
  pub max_output_tokens: u32,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerateError {
  #[error("request failed: {0}")]
  Http(String),
  #[error("Gemini HTTP {status}: {message}")]
  Api { status: u16, message: String },
  #[error("malformed stream event: {0}")]
  Malformed(String),
}

/// Finite, non-restartable sequence of text fragments.
pub type FragmentStream = BoxStream<'static, Result<String, GenerateError>>;

/// Producer side of a generation. Implemented by `Gemini` and by test stubs.
pub trait TextGenerator: Send + Sync {
  fn stream(&self, prompt: String, settings: CallSettings) -> FragmentStream;
}

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  api_key: String,
  pub base_url: String,
}

impl Gemini {
  /// Construct the client if we find GOOGLE_API_KEY; otherwise return None.
  pub fn from_env(timeout: Duration) -> Option<Self> {
    let api_key = std::env::var("GOOGLE_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.into());
    Self::new(api_key, base_url, timeout)
  }

  pub fn new(api_key: String, base_url: String, timeout: Duration) -> Option<Self> {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "problem_forge", error = %e, "Failed to build HTTP client");
        return None;
      }
    };
    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string() })
  }

  fn stream_url(&self, model: &str) -> String {
    format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, model)
  }

  fn request_body(prompt: String, settings: &CallSettings) -> GenerateContentRequest {
    GenerateContentRequest {
      contents: vec![Content { role: "user".into(), parts: vec![PartReq { text: prompt }] }],
      generation_config: GenerationConfig {
        temperature: settings.temperature,
        max_output_tokens: settings.max_output_tokens,
      },
    }
  }
}

impl TextGenerator for Gemini {
  #[instrument(level = "info", skip(self, prompt), fields(model = %settings.model, prompt_len = prompt.len()))]
  fn stream(&self, prompt: String, settings: CallSettings) -> FragmentStream {
    let request = self
      .client
      .post(self.stream_url(&settings.model))
      .header(USER_AGENT, "problem-forge/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, self.api_key.as_str())
      .json(&Self::request_body(prompt, &settings));

    let start = Instant::now();
    stream::unfold(Phase::Pending(request), move |phase| async move {
      next_fragment(phase, start).await
    })
    .boxed()
  }
}

enum Phase {
  Pending(reqwest::RequestBuilder),
  Reading {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    pending: Vec<u8>,
    buffer: String,
    ready: VecDeque<String>,
  },
  Draining(VecDeque<String>),
  Done,
}

/// Drive the unfold state machine until a fragment, an error, or the end.
async fn next_fragment(mut phase: Phase, start: Instant) -> Option<(Result<String, GenerateError>, Phase)> {
  loop {
    phase = match phase {
      Phase::Done => return None,
      Phase::Draining(mut ready) => {
        let fragment = ready.pop_front()?;
        return Some((Ok(fragment), Phase::Draining(ready)));
      }
      Phase::Pending(request) => match open_stream(request).await {
        Ok(body) => Phase::Reading { body, pending: Vec::new(), buffer: String::new(), ready: VecDeque::new() },
        Err(e) => {
          error!(target: "generation", elapsed = ?start.elapsed(), error = %e, "Gemini call failed");
          return Some((Err(e), Phase::Done));
        }
      },
      Phase::Reading { mut body, mut pending, mut buffer, mut ready } => {
        if let Some(fragment) = ready.pop_front() {
          return Some((Ok(fragment), Phase::Reading { body, pending, buffer, ready }));
        }
        match body.next().await {
          Some(Ok(bytes)) => {
            pending.extend_from_slice(&bytes);
            decode_utf8_prefix(&mut pending, &mut buffer);
            for payload in drain_sse_events(&mut buffer) {
              match fragment_from_event(&payload) {
                Ok(Some(text)) => ready.push_back(text),
                Ok(None) => {}
                Err(e) => return Some((Err(e), Phase::Done)),
              }
            }
            Phase::Reading { body, pending, buffer, ready }
          }
          Some(Err(e)) => {
            error!(target: "generation", elapsed = ?start.elapsed(), error = %e, "Gemini stream interrupted");
            return Some((Err(GenerateError::Http(e.to_string())), Phase::Done));
          }
          None => {
            // A final event may arrive without the trailing blank line.
            buffer.push_str(&String::from_utf8_lossy(&pending));
            buffer.push_str(SSE_EVENT_SEPARATOR);
            for payload in drain_sse_events(&mut buffer) {
              if let Ok(Some(text)) = fragment_from_event(&payload) {
                ready.push_back(text);
              }
            }
            info!(target: "generation", elapsed = ?start.elapsed(), "Gemini stream finished");
            Phase::Draining(ready)
          }
        }
      }
    };
  }
}

/// Move the longest valid UTF-8 prefix of `pending` into `out`.
/// A multi-byte char split across network chunks stays in `pending`.
fn decode_utf8_prefix(pending: &mut Vec<u8>, out: &mut String) {
  let valid = match std::str::from_utf8(pending.as_slice()) {
    Ok(_) => Some(pending.len()),
    Err(e) if e.error_len().is_none() => Some(e.valid_up_to()),
    Err(_) => None,
  };
  match valid {
    Some(n) => {
      out.push_str(&String::from_utf8_lossy(&pending[..n]));
      pending.drain(..n);
    }
    None => {
      out.push_str(&String::from_utf8_lossy(pending.as_slice()));
      pending.clear();
    }
  }
}

async fn open_stream(request: reqwest::RequestBuilder) -> Result<BoxStream<'static, reqwest::Result<Vec<u8>>>, GenerateError> {
  let res = request.send().await.map_err(|e| GenerateError::Http(e.to_string()))?;
  if !res.status().is_success() {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    let message = extract_gemini_error(&body).unwrap_or(body);
    return Err(GenerateError::Api { status: status.as_u16(), message });
  }
  Ok(res.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec())).boxed())
}

/// Text of one SSE payload; None for events without text (e.g. usage-only).
fn fragment_from_event(payload: &str) -> Result<Option<String>, GenerateError> {
  let event: GenerateContentResponse =
    serde_json::from_str(payload).map_err(|e| GenerateError::Malformed(e.to_string()))?;

  if let Some(usage) = &event.usage_metadata {
    debug!(target: "generation", prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
  }

  let text: String = event
    .candidates
    .first()
    .and_then(|c| c.content.as_ref())
    .map(|content| content.parts.iter().filter_map(|p| p.text.as_deref()).collect())
    .unwrap_or_default();

  Ok((!text.is_empty()).then_some(text))
}

/// Drain complete SSE events from `buffer` and return their `data:` payloads.
/// An incomplete trailing event stays in the buffer for the next chunk.
pub fn drain_sse_events(buffer: &mut String) -> Vec<String> {
  let mut events = Vec::new();
  if buffer.contains('\r') {
    *buffer = buffer.replace("\r\n", "\n");
  }

  while let Some(idx) = buffer.find(SSE_EVENT_SEPARATOR) {
    let raw_event: String = buffer.drain(..idx + SSE_EVENT_SEPARATOR.len()).collect();
    let data: Vec<&str> = raw_event
      .lines()
      .filter_map(|line| line.strip_prefix("data:"))
      .map(str::trim_start)
      .collect();
    if !data.is_empty() {
      let payload = data.join("\n");
      if !payload.trim().is_empty() {
        events.push(payload);
      }
    }
  }
  events
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

// --- Gemini DTOs ---

#[derive(Serialize)]
struct GenerateContentRequest {
  contents: Vec<Content>,
  #[serde(rename = "generationConfig")]
  generation_config: GenerationConfig,
}
#[derive(Serialize)]
struct Content { role: String, parts: Vec<PartReq> }
#[derive(Serialize)]
struct PartReq { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig { temperature: f32, max_output_tokens: u32 }

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

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn drains_complete_events_and_keeps_the_rest() {
    let mut buffer = String::from("data: {\"a\":1}\n\ndata: {\"b\":2}\r\n\r\ndata: {\"c\"");
    let events = drain_sse_events(&mut buffer);
    assert_eq!(events, vec!["{\"a\":1}", "{\"b\":2}"]);
    assert_eq!(buffer, "data: {\"c\"");

    buffer.push_str(":3}\n\n");
    assert_eq!(drain_sse_events(&mut buffer), vec!["{\"c\":3}"]);
    assert!(buffer.is_empty());
  }

  #[test]
  fn split_multibyte_chars_wait_for_the_next_chunk() {
    let bytes = "Бодлого".as_bytes();
    let mut pending = bytes[..3].to_vec();
    let mut out = String::new();
    decode_utf8_prefix(&mut pending, &mut out);
    assert_eq!(out, "Б");
    assert_eq!(pending.len(), 1);

    pending.extend_from_slice(&bytes[3..]);
    decode_utf8_prefix(&mut pending, &mut out);
    assert_eq!(out, "Бодлого");
    assert!(pending.is_empty());
  }

  #[test]
  fn non_data_lines_are_ignored() {
    let mut buffer = String::from(": keep-alive\n\nevent: ping\ndata: x\n\n");
    assert_eq!(drain_sse_events(&mut buffer), vec!["x"]);
  }

  #[test]
  fn fragment_joins_candidate_parts() {
    let payload = r#"{"candidates":[{"content":{"parts":[{"text":"1. **Problem:** "},{"text":"Find x."}],"role":"model"}}]}"#;
    assert_eq!(fragment_from_event(payload), Ok(Some("1. **Problem:** Find x.".into())));
  }

  #[test]
  fn usage_only_event_has_no_fragment() {
    let payload = r#"{"usageMetadata":{"promptTokenCount":10,"totalTokenCount":12}}"#;
    assert_eq!(fragment_from_event(payload), Ok(None));
    assert!(matches!(fragment_from_event("not json"), Err(GenerateError::Malformed(_))));
  }

  #[test]
  fn error_body_message_is_extracted() {
    let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
    assert_eq!(extract_gemini_error(body).as_deref(), Some("API key not valid."));
    assert_eq!(extract_gemini_error("<html>"), None);
  }

  #[test]
  fn request_body_carries_generation_config() {
    let settings = CallSettings { model: "gemini-1.5-flash".into(), temperature: 0.5, max_output_tokens: 4096 };
    let body = serde_json::to_value(Gemini::request_body("hi".into(), &settings)).expect("json");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    assert_eq!(body["generationConfig"]["temperature"], 0.5);
  }

  #[test]
  fn stream_url_trims_trailing_slash() {
    let g = Gemini::new("k".into(), "http://localhost:9/v1beta/".into(), Duration::from_secs(1)).expect("client");
    assert_eq!(g.stream_url("gemini-1.5-pro"), "http://localhost:9/v1beta/models/gemini-1.5-pro:streamGenerateContent?alt=sse");
  }
}
