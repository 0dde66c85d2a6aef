//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::{convert::Infallible, sync::Arc};

use axum::{
  body::Body,
  extract::{Query, State},
  http::{header, HeaderValue, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use futures::stream;
use tokio::sync::mpsc;
use tracing::{error, info, instrument};

use crate::catalog::example_problem;
use crate::docx::{DOCX_FILE_NAME, DOCX_MIME};
use crate::domain::Language;
use crate::logic::{clear_session, docx_for, problems_for, run_generation};
use crate::protocol::*;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-session-id";
const FRAGMENT_BUFFER: usize = 32;

fn language_or_default(state: &AppState, raw: Option<&str>) -> Language {
  raw.and_then(Language::parse).unwrap_or(state.settings.language)
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generator: state.generator.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_catalog(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LanguageQuery>,
) -> impl IntoResponse {
  let language = language_or_default(&state, q.language.as_deref());
  Json(catalog_out(language, &state.settings))
}

#[instrument(level = "info", skip(state), fields(subject = ?q.subject, topic = %q.topic, subtopic = %q.subtopic))]
pub async fn http_get_example(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ExampleQuery>,
) -> impl IntoResponse {
  let language = language_or_default(&state, q.language.as_deref());
  Json(ExampleOut { problem: example_problem(language, q.subject, &q.topic, &q.subtopic) })
}

/// Streams the generated text as a chunked `text/plain` body.
/// The session id used is echoed in the `x-session-id` header.
#[instrument(level = "info", skip(state, body), fields(source_len = body.request.source_problem.len()))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Response {
  let session_id = AppState::session_id_or_new(body.session_id);
  let (tx, rx) = mpsc::channel::<String>(FRAGMENT_BUFFER);

  let task_state = state.clone();
  let task_session = session_id.clone();
  tokio::spawn(async move {
    let outcome = run_generation(task_state, task_session.clone(), body.request, tx).await;
    info!(target: "generation", session_id = %task_session, ?outcome, "HTTP generation finished");
  });

  let fragments = stream::unfold(rx, |mut rx| async move {
    rx.recv().await.map(|text| (Ok::<_, Infallible>(text), rx))
  });

  let mut res = Response::new(Body::from_stream(fragments));
  let headers = res.headers_mut();
  headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
  headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
  if let Ok(v) = HeaderValue::from_str(&session_id) {
    headers.insert(SESSION_HEADER, v);
  }
  res
}

#[instrument(level = "info", skip(state), fields(session_id = %q.session_id))]
pub async fn http_get_problems(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionQuery>,
) -> impl IntoResponse {
  let generated = state.sessions.get(&q.session_id).await.is_some();
  let problems = problems_for(&state, &q.session_id).await;
  info!(target: "generation", session_id = %q.session_id, count = problems.len(), "HTTP problems served");
  Json(ProblemsOut { problems, generated })
}

#[instrument(level = "info", skip(state), fields(session_id = %q.session_id))]
pub async fn http_get_download(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionQuery>,
) -> Response {
  match docx_for(&state, &q.session_id).await {
    None => (
      StatusCode::NOT_FOUND,
      Json(serde_json::json!({ "error": "nothing generated for this session" })),
    )
      .into_response(),
    Some(Err(e)) => {
      error!(target: "problem_forge", session_id = %q.session_id, error = %e, "docx packaging failed");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": e.to_string() })),
      )
        .into_response()
    }
    Some(Ok(bytes)) => {
      info!(target: "generation", session_id = %q.session_id, bytes = bytes.len(), "HTTP docx served");
      (
        [
          (header::CONTENT_TYPE, DOCX_MIME.to_string()),
          (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", DOCX_FILE_NAME)),
        ],
        bytes,
      )
        .into_response()
    }
  }
}

#[instrument(level = "info", skip(state, body), fields(session_id = %body.session_id))]
pub async fn http_post_clear(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ClearIn>,
) -> impl IntoResponse {
  let cleared = clear_session(&state, &body.session_id).await;
  Json(ClearOut { cleared })
}

#[cfg(test)]
mod tests {
  use axum::body::to_bytes;
  use axum::http::Request;
  use tower::ServiceExt;

  use super::*;
  use crate::logic::testing::{state_with, StubGenerator};
  use crate::routes::build_router;

  const GENERATE_BODY: &str = r#"{"sessionId":"s-42","subject":"math","topic":"Algebra","subtopic":"Equations","sourceProblem":"Solve x + 1 = 2."}"#;

  async fn body_string(res: Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8")
  }

  fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::builder()
      .method("POST")
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .expect("request")
  }

  fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
  }

  #[tokio::test]
  async fn generate_streams_then_download_serves_docx() {
    let stub = StubGenerator::new(vec![
      Ok("1. **Problem:** Solve x + 3 = 5.\n".into()),
      Ok("   **Topic:** Algebra - Equations\n2. **Problem:** Solve 2x = 8.\n".into()),
    ]);
    let app = build_router(state_with(Some(stub)));

    let res = app.clone().oneshot(get("/api/v1/download?sessionId=s-42")).await.expect("response");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.clone().oneshot(post_json("/api/v1/generate", GENERATE_BODY)).await.expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[SESSION_HEADER], "s-42");
    let text = body_string(res).await;
    assert!(text.contains("Solve 2x = 8."));

    // The body ends only once the generation task has stored the session.
    let res = app.clone().oneshot(get("/api/v1/problems?sessionId=s-42")).await.expect("response");
    let v: serde_json::Value = serde_json::from_str(&body_string(res).await).expect("json");
    assert_eq!(v["generated"], true);
    let problems = v["problems"].as_array().cloned().unwrap_or_default();
    assert_eq!(problems, vec![serde_json::json!("Solve x + 3 = 5."), serde_json::json!("Solve 2x = 8.")]);

    let res = app.clone().oneshot(get("/api/v1/download?sessionId=s-42")).await.expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], DOCX_MIME);
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    assert!(bytes.starts_with(b"PK"));

    let res = app.clone().oneshot(post_json("/api/v1/clear", r#"{"sessionId":"s-42"}"#)).await.expect("response");
    assert!(body_string(res).await.contains("true"));
    let res = app.oneshot(get("/api/v1/download?sessionId=s-42")).await.expect("response");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn generate_without_key_answers_with_warning() {
    let app = build_router(state_with(None));
    let res = app.oneshot(post_json("/api/v1/generate", GENERATE_BODY)).await.expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_string(res).await.contains("GOOGLE_API_KEY"));
  }

  #[tokio::test]
  async fn catalog_and_example_follow_language() {
    let app = build_router(state_with(None));
    let res = app.clone().oneshot(get("/api/v1/catalog?language=mn")).await.expect("response");
    let v: serde_json::Value = serde_json::from_str(&body_string(res).await).expect("json");
    assert_eq!(v["language"], "mn");
    assert_eq!(v["problemCount"], 10);

    let res = app
      .oneshot(get("/api/v1/example?subject=physics&topic=Mechanics&subtopic=Kinematics"))
      .await
      .expect("response");
    let v: serde_json::Value = serde_json::from_str(&body_string(res).await).expect("json");
    assert!(v["problem"].as_str().unwrap_or_default().contains("72 km/h"));
  }

  #[tokio::test]
  async fn health_reports_generator_presence() {
    let app = build_router(state_with(Some(StubGenerator::new(vec![]))));
    let res = app.oneshot(get("/api/v1/health")).await.expect("response");
    let v: serde_json::Value = serde_json::from_str(&body_string(res).await).expect("json");
    assert_eq!(v["ok"], true);
    assert_eq!(v["generator"], true);
  }
}
