//! Loading service configuration (prompts + generation settings) from TOML.
//!
//! Every field has a default, so an absent or partial file is fine.
//! See `AppConfig`, `Prompts` and `GenerationSettings` for the expected schema.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub generation: GenerationSettings,
}

/// Prompts sent to the model. `user_template` placeholders:
/// {exam_type} {subject} {grade_level} {difficulty} {source_material} {mc_count} {essay_count}
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub system: String,
  pub user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system: "You are an expert teacher assistant. Create an exam based strictly on the provided reference material. Respond ONLY with JSON matching the given schema.".into(),
      user_template: r#"=== EXAM CONFIGURATION ===
Exam Type: {exam_type}
Subject: {subject}
Grade Level: {grade_level}
Difficulty: {difficulty}
Language: Indonesian (Bahasa Indonesia). Write every title, question, option, answer and explanation ONLY in Indonesian.

=== REFERENCE MATERIAL (SOURCE) ===
"{source_material}"

=== REQUIREMENTS ===
1. Generate exactly {mc_count} Multiple Choice Questions (type "multiple_choice") based strictly on the Reference Material.
2. Generate exactly {essay_count} Essay Questions (type "essay") based strictly on the Reference Material.
3. Only if the material is too short, infer logical questions related to the subject matter.
4. For Multiple Choice, provide exactly 4 options.
5. For Essay, provide a sample answer in correctAnswer and no options.
6. Title should be formal, uppercase and reflect the Exam Type."#.into(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
  pub temperature: f32,
  pub timeout_secs: u64,
  /// Report count/option mismatches as warnings.
  pub validate_counts: bool,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self { temperature: 0.5, timeout_secs: 90, validate_counts: true }
  }
}

impl GenerationSettings {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs.max(1))
  }
}

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Attempt to load `AppConfig` from EXAM_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("EXAM_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "examgenius", %path, "Loaded service config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "examgenius", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "examgenius", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_yields_defaults() {
    let cfg = parse_app_config("").unwrap();
    assert_eq!(cfg.generation.temperature, 0.5);
    assert_eq!(cfg.generation.timeout(), Duration::from_secs(90));
    assert!(cfg.prompts.user_template.contains("{mc_count}"));
  }

  #[test]
  fn partial_override_keeps_other_defaults() {
    let cfg = parse_app_config(
      r#"
      [generation]
      timeout_secs = 15

      [prompts]
      system = "Jawab dalam JSON."
      "#,
    )
    .unwrap();
    assert_eq!(cfg.generation.timeout_secs, 15);
    assert_eq!(cfg.generation.temperature, 0.5);
    assert!(cfg.generation.validate_counts);
    assert_eq!(cfg.prompts.system, "Jawab dalam JSON.");
    assert_eq!(cfg.prompts.user_template, Prompts::default().user_template);
  }

  #[test]
  fn zero_timeout_is_clamped() {
    let s = GenerationSettings { timeout_secs: 0, ..Default::default() };
    assert_eq!(s.timeout(), Duration::from_secs(1));
  }
}
