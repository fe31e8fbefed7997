//! The model capability: one request in, raw JSON text out.
//!
//! Providers are picked once at startup from the environment. The credential is
//! handed to the provider here and never read again by business logic.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::GenerationError;
use crate::gemini::Gemini;
use crate::generation::GenerationRequest;
use crate::openai::OpenAI;

#[async_trait]
pub trait ExamGenerator: Send + Sync {
  /// Provider label for logs and the health endpoint.
  fn name(&self) -> &str;

  /// Issue exactly one model call and return its raw text payload.
  async fn generate(&self, req: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Gemini when GEMINI_API_KEY (or API_KEY) is set, otherwise OpenAI when
/// OPENAI_API_KEY is set, otherwise none.
pub fn generator_from_env() -> Option<Arc<dyn ExamGenerator>> {
  if let Some(g) = Gemini::from_env() {
    info!(target: "examgenius", base_url = %g.base_url, model = %g.model, "Gemini generator enabled.");
    return Some(Arc::new(g));
  }
  if let Some(o) = OpenAI::from_env() {
    info!(target: "examgenius", base_url = %o.base_url, model = %o.model, "OpenAI generator enabled.");
    return Some(Arc::new(o));
  }
  None
}

#[cfg(test)]
pub mod stub {
  //! Deterministic generator used by tests.

  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  use tokio::sync::Notify;

  use super::*;

  pub enum Reply {
    Text(String),
    Fail(String),
    /// Never answers until `release` is notified, then returns the text.
    Gate(Arc<Notify>, String),
    Hang,
  }

  pub struct StubGenerator {
    pub reply: Reply,
    pub calls: AtomicUsize,
  }

  impl StubGenerator {
    pub fn new(reply: Reply) -> Self {
      Self { reply, calls: AtomicUsize::new(0) }
    }

    pub fn text(s: &str) -> Self { Self::new(Reply::Text(s.to_string())) }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
  }

  #[async_trait]
  impl ExamGenerator for StubGenerator {
    fn name(&self) -> &str { "stub" }

    async fn generate(&self, _req: &GenerationRequest) -> Result<String, GenerationError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      match &self.reply {
        Reply::Text(s) => Ok(s.clone()),
        Reply::Fail(e) => Err(GenerationError::Call(e.clone())),
        Reply::Gate(notify, s) => {
          notify.notified().await;
          Ok(s.clone())
        }
        Reply::Hang => {
          tokio::time::sleep(Duration::from_secs(3600)).await;
          Err(GenerationError::EmptyResponse)
        }
      }
    }
  }
}
