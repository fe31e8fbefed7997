//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; texts are logged by length only.

use std::sync::Arc;

use axum::{
  extract::{rejection::JsonRejection, Query, State},
  http::header::CONTENT_TYPE,
  response::{Html, IntoResponse, Response},
  Json,
};
use tracing::{field, info, instrument, Span};

use crate::domain::{ExamDocument, PaperSize};
use crate::error::AppError;
use crate::logic::generate_exam;
use crate::protocol::*;
use crate::render::{render, OutputFormat};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let generator = state.generator.as_ref().map(|g| g.name().to_string()).unwrap_or_else(|| "disabled".into());
  Json(HealthOut { ok: true, generator })
}

/// A body that fails to deserialize is reported as an invalid configuration
/// with the usual JSON error body.
#[instrument(level = "info", skip(state, body), fields(session = field::Empty, source_len = field::Empty))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  body: Result<Json<GenerateIn>, JsonRejection>,
) -> Result<Json<GenerateOut>, AppError> {
  let Json(body) = body?;
  let span = Span::current();
  span.record("session", field::debug(&body.session_id));
  span.record("source_len", body.config.source_material.len());
  let out = generate_exam(state, body.session_id, body.config).await?;
  info!(target: "examgenius", session = %out.session_id, questions = out.document.questions.len(), "HTTP exam generated");
  Ok(Json(GenerateOut { session_id: out.session_id, document: out.document, warnings: out.warnings }))
}

#[instrument(level = "info", skip(state), fields(session = %q.session_id))]
pub async fn http_get_current(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionQuery>,
) -> Result<Json<ExamDocument>, AppError> {
  state.current_document(&q.session_id).map(Json).ok_or(AppError::NoDocument)
}

#[instrument(level = "info", skip(state), fields(session = %q.session_id, paper = ?q.paper, format = ?q.format))]
pub async fn http_get_print(
  State(state): State<Arc<AppState>>,
  Query(q): Query<PrintQuery>,
) -> Result<Response, AppError> {
  let doc = state.current_document(&q.session_id).ok_or(AppError::NoDocument)?;
  Ok(rendered(&doc, q.paper, q.format))
}

/// Stateless render of a client-held document; no model call.
#[instrument(level = "info", skip(doc), fields(paper = ?q.paper, format = ?q.format, questions = doc.questions.len()))]
pub async fn http_post_render(
  Query(q): Query<RenderQuery>,
  Json(doc): Json<ExamDocument>,
) -> Response {
  rendered(&doc, q.paper, q.format)
}

fn rendered(doc: &ExamDocument, paper: PaperSize, format: OutputFormat) -> Response {
  let body = render(doc, paper, format);
  match format {
    OutputFormat::Html => Html(body).into_response(),
    OutputFormat::Text => ([(CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response(),
  }
}
