//! One interaction cycle, shared by the HTTP and WebSocket handlers:
//! validate → build instruction → stream fragments → extract → remember.
//!
//! Failures never escape as errors. They reach the user as text (a warning
//! fragment or an inline error annotation) and as the returned outcome.

use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog;
use crate::docx::{write_docx, DocxError};
use crate::domain::{GenerationRequest, RequestError};
use crate::extract::extract_problems_in;
use crate::gemini::CallSettings;
use crate::prompt::{build_instruction, vocabulary};
use crate::state::AppState;
use crate::util::trunc_for_log;

/// How a generation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
  /// Full text received; the problems are stored in the session.
  Completed { problems: Vec<String> },
  /// The service failed mid-way; the partial text was shown with an error note.
  Failed { message: String },
  /// Nothing was sent to the service.
  Rejected { reason: Rejection },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Rejection {
  #[error("no API key configured (GOOGLE_API_KEY)")]
  MissingCredential,
  #[error("invalid request: {0}")]
  InvalidRequest(RequestError),
}

/// Fill the fields the form may leave out from the configured defaults.
pub fn apply_defaults(state: &AppState, req: &mut GenerationRequest) {
  if req.model_name.trim().is_empty() {
    req.model_name = state.settings.default_model.clone();
  }
}

/// Run one generation, sending every displayable fragment to `tx`.
///
/// If the receiver goes away the stream is dropped and the session is left
/// untouched.
#[instrument(
  level = "info",
  skip(state, req, tx),
  fields(%session_id, subject = ?req.subject, topic = %req.topic, subtopic = %req.subtopic, count = req.count, model = %req.model_name)
)]
pub async fn run_generation(
  state: Arc<AppState>,
  session_id: String,
  mut req: GenerationRequest,
  tx: mpsc::Sender<String>,
) -> GenerationOutcome {
  apply_defaults(&state, &mut req);
  let vocab = vocabulary(req.language);

  if let Err(e) = req.validate() {
    warn!(target: "generation", error = %e, "Rejected generation request");
    let text = match &e {
      RequestError::EmptySourceProblem => vocab.empty_source_warning.to_string(),
      other => format!("{}: {}\n", vocab.invalid_request_warning, other),
    };
    let _ = tx.send(text).await;
    return GenerationOutcome::Rejected { reason: Rejection::InvalidRequest(e) };
  }

  let Some(generator) = state.generator.clone() else {
    warn!(target: "generation", "No generator configured; GOOGLE_API_KEY missing");
    let _ = tx.send(vocab.missing_key_warning.to_string()).await;
    return GenerationOutcome::Rejected { reason: Rejection::MissingCredential };
  };

  if !catalog::contains(req.language, req.subject, &req.topic, &req.subtopic) {
    debug!(target: "generation", "Topic/subtopic outside the built-in catalog; using it as given");
  }

  let prompt = build_instruction(&req);
  info!(target: "generation", prompt_len = prompt.len(), preview = %trunc_for_log(&req.source_problem, 40), "Instruction built");

  let settings = CallSettings {
    model: req.model_name.clone(),
    temperature: req.temperature,
    max_output_tokens: state.settings.max_output_tokens,
  };
  let mut fragments = generator.stream(prompt, settings);
  let mut collected: Vec<String> = Vec::new();

  while let Some(item) = fragments.next().await {
    match item {
      Ok(fragment) => {
        if tx.send(fragment.clone()).await.is_err() {
          warn!(target: "generation", received = collected.len(), "Client went away; abandoning generation");
          return GenerationOutcome::Failed { message: "client disconnected".into() };
        }
        collected.push(fragment);
      }
      Err(e) => {
        error!(target: "generation", error = %e, received = collected.len(), "Generation failed");
        let _ = tx.send(format!("\n\n❌ {}: {}", vocab.error_label, e)).await;
        return GenerationOutcome::Failed { message: e.to_string() };
      }
    }
  }

  let text = collected.concat();
  let problems = extract_problems_in(req.language, &text);
  info!(target: "generation", text_len = text.len(), problems = problems.len(), "Generation completed");
  state.sessions.store_generation(&session_id, text, problems.clone()).await;
  GenerationOutcome::Completed { problems }
}

/// Problems remembered for the session (empty if nothing was generated).
pub async fn problems_for(state: &AppState, session_id: &str) -> Vec<String> {
  state.sessions.get(session_id).await.map(|s| s.problems).unwrap_or_default()
}

/// The session's problems as a docx file, or None if nothing was generated yet.
#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn docx_for(state: &AppState, session_id: &str) -> Option<Result<Vec<u8>, DocxError>> {
  let data = state.sessions.get(session_id).await?;
  if data.last_generated.is_empty() {
    return None;
  }
  Some(write_docx(&data.problems))
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn clear_session(state: &AppState, session_id: &str) -> bool {
  state.sessions.clear(session_id).await
}

#[cfg(test)]
pub(crate) mod testing {
  use futures::stream;

  use crate::config::GenerationSettings;
  use crate::gemini::{CallSettings, FragmentStream, GenerateError, TextGenerator};
  use crate::state::AppState;
  use std::sync::{Arc, Mutex};

  /// Replays canned fragments and remembers the last prompt and settings.
  pub struct StubGenerator {
    pub fragments: Vec<Result<String, GenerateError>>,
    pub seen: Mutex<Option<(String, CallSettings)>>,
  }

  impl StubGenerator {
    pub fn new(fragments: Vec<Result<String, GenerateError>>) -> Arc<Self> {
      Arc::new(Self { fragments, seen: Mutex::new(None) })
    }
  }

  impl TextGenerator for StubGenerator {
    fn stream(&self, prompt: String, settings: CallSettings) -> FragmentStream {
      if let Ok(mut seen) = self.seen.lock() {
        *seen = Some((prompt, settings));
      }
      Box::pin(stream::iter(self.fragments.clone()))
    }
  }

  pub fn state_with(generator: Option<Arc<StubGenerator>>) -> Arc<AppState> {
    let generator = generator.map(|g| g as Arc<dyn TextGenerator>);
    Arc::new(AppState::new(GenerationSettings::default(), generator))
  }
}

#[cfg(test)]
mod tests {
  use super::testing::*;
  use super::*;
  use crate::domain::sample_request;
  use crate::gemini::GenerateError;

  async fn run(state: Arc<AppState>, req: GenerationRequest) -> (GenerationOutcome, String) {
    let (tx, mut rx) = mpsc::channel(64);
    let outcome = run_generation(state, "s1".into(), req, tx).await;
    let mut shown = String::new();
    while let Some(f) = rx.recv().await {
      shown.push_str(&f);
    }
    (outcome, shown)
  }

  #[tokio::test]
  async fn completed_generation_is_stored_in_session() {
    let stub = StubGenerator::new(vec![
      Ok("1. **Problem:** Find x.\n   **Topic:** Algebra - Equations\n".into()),
      Ok("2. **Problem:** Find y.\n".into()),
    ]);
    let state = state_with(Some(stub.clone()));
    let mut req = sample_request();
    req.model_name.clear();

    let (outcome, shown) = run(state.clone(), req).await;
    assert_eq!(outcome, GenerationOutcome::Completed { problems: vec!["Find x.".into(), "Find y.".into()] });
    assert!(shown.starts_with("1. **Problem:** Find x."));

    let session = state.sessions.get("s1").await.expect("session");
    assert_eq!(session.last_generated, shown);
    assert_eq!(problems_for(&state, "s1").await, vec!["Find x.", "Find y."]);

    let seen = stub.seen.lock().expect("lock").clone().expect("called");
    assert!(seen.0.contains("Solve x^2 - 5x + 6 = 0."));
    assert_eq!(seen.1.model, "gemini-1.5-flash");
    assert_eq!(seen.1.max_output_tokens, 4096);
  }

  #[tokio::test]
  async fn service_failure_is_reported_inline_and_not_stored() {
    let stub = StubGenerator::new(vec![
      Ok("1. **Problem:** partial".into()),
      Err(GenerateError::Api { status: 429, message: "quota".into() }),
    ]);
    let state = state_with(Some(stub));
    let (outcome, shown) = run(state.clone(), sample_request()).await;

    assert!(matches!(outcome, GenerationOutcome::Failed { .. }));
    assert!(shown.starts_with("1. **Problem:** partial"));
    assert!(shown.ends_with("\n\n❌ Error: Gemini HTTP 429: quota"));
    assert!(state.sessions.get("s1").await.is_none());
  }

  #[tokio::test]
  async fn missing_credential_short_circuits() {
    let (outcome, shown) = run(state_with(None), sample_request()).await;
    assert_eq!(outcome, GenerationOutcome::Rejected { reason: Rejection::MissingCredential });
    assert!(shown.contains("GOOGLE_API_KEY"));
  }

  #[test]
  fn rejection_reads_as_a_sentence() {
    assert_eq!(Rejection::MissingCredential.to_string(), "no API key configured (GOOGLE_API_KEY)");
    let reason = Rejection::InvalidRequest(RequestError::EmptySourceProblem);
    assert_eq!(reason.to_string(), "invalid request: source problem is empty");
  }

  #[tokio::test]
  async fn blank_source_problem_never_reaches_the_service() {
    let stub = StubGenerator::new(vec![Ok("unused".into())]);
    let state = state_with(Some(stub.clone()));
    let mut req = sample_request();
    req.source_problem = "   ".into();

    let (outcome, shown) = run(state, req).await;
    assert_eq!(
      outcome,
      GenerationOutcome::Rejected { reason: Rejection::InvalidRequest(RequestError::EmptySourceProblem) }
    );
    assert!(shown.contains("source problem"));
    assert!(stub.seen.lock().expect("lock").is_none());
  }

  #[tokio::test]
  async fn docx_requires_a_generation() {
    let state = state_with(Some(StubGenerator::new(vec![Ok("1. Solve.\n".into())])));
    assert!(docx_for(&state, "s1").await.is_none());

    let (outcome, _) = run(state.clone(), sample_request()).await;
    assert!(matches!(outcome, GenerationOutcome::Completed { .. }));
    let bytes = docx_for(&state, "s1").await.expect("generated").expect("docx");
    assert!(bytes.starts_with(b"PK"));

    assert!(clear_session(&state, "s1").await);
    assert!(docx_for(&state, "s1").await.is_none());
  }
}
