//! ExamGenius · Exam Generator Backend
//!
//! - Axum HTTP API: generate an exam from teacher input, fetch it, render it for print
//! - Hosted model integration (Gemini or OpenAI-compatible, via environment variables)
//! - Static form page fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   GEMINI_API_KEY   : enables the Gemini generator (API_KEY also accepted)
//!   GEMINI_MODEL     : default "gemini-2.5-flash"
//!   OPENAI_API_KEY   : enables the OpenAI-compatible generator when no Gemini key is set
//!   OPENAI_BASE_URL  : default "https://api.openai.com/v1"
//!   OPENAI_MODEL     : default "gpt-4o-mini"
//!   EXAM_CONFIG_PATH : path to TOML config (prompts + generation settings)
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

mod config;
mod domain;
mod error;
mod gemini;
mod generation;
mod generator;
mod logic;
mod openai;
mod protocol;
mod render;
mod routes;
mod state;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Credential and prompts are read once here and never mutated afterwards.
  let state = Arc::new(AppState::new());

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "examgenius", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "examgenius", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "examgenius", "Shutdown signal received");
}
