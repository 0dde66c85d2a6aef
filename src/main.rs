//! Problem Forge · similar-problem generator backend
//!
//! - Axum HTTP + WebSocket API behind a single-page form
//! - Builds an instruction from the form, streams Gemini output back, extracts
//!   the generated problems and serves them as a .docx download
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   GOOGLE_API_KEY       : enables Gemini generation if present
//!   GEMINI_BASE_URL      : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL         : default model offered by the form ("gemini-1.5-flash")
//!   PROBLEMS_LANGUAGE    : "en" (default) or "mn"
//!   PROBLEMS_CONFIG_PATH : path to TOML config (generation defaults)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default), "compact" or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod catalog;
mod prompt;
mod extract;
mod docx;
mod gemini;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: generation settings, optional Gemini client, session store.
  let state = Arc::new(AppState::from_env());

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "problem_forge", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "problem_forge", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "problem_forge", "Shutdown signal received");
}
