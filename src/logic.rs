//! Core generation flow shared by the HTTP handlers.
//!
//! submit -> required-field check -> busy flag -> one model call (with timeout)
//! -> strict parse -> merge -> store. A failure leaves the session's previous
//! document untouched.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{ExamConfig, ExamDocument};
use crate::error::{AppError, GenerationError};
use crate::generation::{build_request, content_warnings, merge, parse_generated, validate_config};
use crate::generator::ExamGenerator;
use crate::state::AppState;
use crate::util::trunc_for_log;

#[derive(Debug)]
pub struct GenerateOutcome {
  pub session_id: String,
  pub document: ExamDocument,
  pub warnings: Vec<String>,
}

/// Run one generation for a session. A missing session id gets a fresh one.
///
/// The model call runs in its own task holding the busy flag, so a client that
/// disconnects does not cancel it and cannot start a second one meanwhile.
#[instrument(level = "info", skip(state, cfg), fields(subject = %cfg.subject, mc = cfg.mc_count, essay = cfg.essay_count))]
pub async fn generate_exam(
  state: Arc<AppState>,
  session_id: Option<String>,
  cfg: ExamConfig,
) -> Result<GenerateOutcome, AppError> {
  validate_config(&cfg)?;
  let generator = state.generator.clone().ok_or(AppError::GeneratorUnavailable)?;
  let session_id = session_id
    .filter(|s| !s.trim().is_empty())
    .unwrap_or_else(|| Uuid::new_v4().to_string());

  let guard = state.begin_generation(&session_id)?;

  let task_state = state.clone();
  let task_session = session_id.clone();
  let handle = tokio::spawn(async move {
    let _guard = guard;
    let (document, warnings) = run_generation(&task_state, generator.as_ref(), &cfg).await?;
    task_state.store_document(&task_session, document.clone());
    Ok::<_, GenerationError>((document, warnings))
  });

  let (document, warnings) = match handle.await {
    Ok(Ok(done)) => done,
    Ok(Err(e)) => {
      error!(target: "generation", %session_id, error = %e, "Exam generation failed");
      return Err(e.into());
    }
    Err(join) => {
      error!(target: "generation", %session_id, error = %join, "Exam generation task aborted");
      return Err(GenerationError::Call(format!("generation task aborted: {join}")).into());
    }
  };

  info!(target: "generation", %session_id, questions = document.questions.len(), warnings = warnings.len(), "Exam generated");
  Ok(GenerateOutcome { session_id, document, warnings })
}

/// Build the request, make the single call, and normalize the reply.
#[instrument(level = "debug", skip_all, fields(generator = generator.name()))]
pub async fn run_generation(
  state: &AppState,
  generator: &dyn ExamGenerator,
  cfg: &ExamConfig,
) -> Result<(ExamDocument, Vec<String>), GenerationError> {
  let req = build_request(cfg, &state.prompts, &state.settings);
  let limit = state.settings.timeout();

  let text = timeout(limit, generator.generate(&req))
    .await
    .map_err(|_| GenerationError::Timeout(limit))??;

  let content = parse_generated(&text).map_err(|e| {
    debug!(target: "generation", preview = %trunc_for_log(&text, 200), "Rejected model payload");
    e
  })?;
  let warnings = if state.settings.validate_counts {
    content_warnings(cfg, &content.questions)
  } else {
    Vec::new()
  };
  for w in &warnings {
    warn!(target: "generation", warning = %w, "Generated content mismatch");
  }
  Ok((merge(cfg, content), warnings))
}
