//! Request building and response normalization for exam generation.
//!
//! Flow: `ExamConfig` -> `build_request` -> (generator call) -> `parse_generated`
//! -> `merge` -> `ExamDocument`. Everything here is pure; the call itself lives
//! behind `crate::generator::ExamGenerator`.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{GenerationSettings, Prompts};
use crate::domain::{ExamConfig, ExamDocument, Question, QuestionKind};
use crate::error::{AppError, GenerationError};
use crate::util::{fill_template, option_label};

pub const MAX_MC_COUNT: u32 = 50;
pub const MAX_ESSAY_COUNT: u32 = 20;
pub const MC_OPTION_COUNT: usize = 4;

/// Everything sent to the model in one call.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
  pub system: String,
  pub prompt: String,
  /// JSON schema (lower-case JSON Schema types) of the expected response.
  pub schema: Value,
  pub temperature: f32,
}

/// Typed, validated generator output.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedContent {
  pub title: String,
  pub questions: Vec<Question>,
}

/// Required-field checks done before any model call.
pub fn validate_config(cfg: &ExamConfig) -> Result<(), AppError> {
  let required = [
    ("schoolName", &cfg.school_name),
    ("subject", &cfg.subject),
    ("gradeLevel", &cfg.grade_level),
    ("sourceMaterial", &cfg.source_material),
  ];
  let missing: Vec<&str> = required
    .iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(k, _)| *k)
    .collect();
  if !missing.is_empty() {
    return Err(AppError::InvalidConfig(format!("required field(s) missing: {}", missing.join(", "))));
  }
  if cfg.mc_count > MAX_MC_COUNT {
    return Err(AppError::InvalidConfig(format!("mcCount must be at most {MAX_MC_COUNT}")));
  }
  if cfg.essay_count > MAX_ESSAY_COUNT {
    return Err(AppError::InvalidConfig(format!("essayCount must be at most {MAX_ESSAY_COUNT}")));
  }
  Ok(())
}

/// Declared response shape. Title and questions are mandatory, as are the
/// per-question id, type, text, answer and points.
pub fn output_schema() -> Value {
  json!({
    "type": "object",
    "properties": {
      "title": {
        "type": "string",
        "description": "A formal uppercase title for the exam (e.g. 'PENILAIAN TENGAH SEMESTER (PTS)')"
      },
      "questions": {
        "type": "array",
        "items": {
          "type": "object",
          "properties": {
            "id": { "type": "integer" },
            "type": {
              "type": "string",
              "enum": ["multiple_choice", "essay"],
              "description": "Must be either 'multiple_choice' or 'essay'"
            },
            "questionText": { "type": "string", "description": "The question stem based on the provided material" },
            "options": {
              "type": "array",
              "items": { "type": "string" },
              "description": "Array of 4 options for multiple choice. Empty for essay."
            },
            "correctAnswer": { "type": "string", "description": "The correct answer text, or a sample answer for essays." },
            "explanation": { "type": "string", "description": "Brief explanation." },
            "points": { "type": "integer", "description": "Suggested points" }
          },
          "required": ["id", "type", "questionText", "correctAnswer", "points"]
        }
      }
    },
    "required": ["title", "questions"]
  })
}

/// Build the single outbound request. Counts are passed through verbatim, and
/// form text reaches the prompt unchanged even when it looks like a placeholder.
pub fn build_request(cfg: &ExamConfig, prompts: &Prompts, settings: &GenerationSettings) -> GenerationRequest {
  let mc = cfg.mc_count.to_string();
  let essay = cfg.essay_count.to_string();
  let prompt = fill_template(
    &prompts.user_template,
    &[
      ("exam_type", cfg.exam_type.as_str()),
      ("subject", cfg.subject.as_str()),
      ("grade_level", cfg.grade_level.as_str()),
      ("difficulty", cfg.difficulty.as_str()),
      ("mc_count", mc.as_str()),
      ("essay_count", essay.as_str()),
      ("source_material", cfg.source_material.as_str()),
    ],
  );
  GenerationRequest {
    system: prompts.system.clone(),
    prompt,
    schema: output_schema(),
    temperature: settings.temperature,
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGenerated {
  title: String,
  questions: Vec<RawQuestion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
  id: i64,
  #[serde(rename = "type")]
  kind: QuestionKind,
  question_text: String,
  #[serde(default)]
  options: Option<Vec<String>>,
  correct_answer: String,
  #[serde(default)]
  explanation: Option<String>,
  points: i64,
}

impl From<RawQuestion> for Question {
  fn from(r: RawQuestion) -> Self {
    let options = match r.kind {
      QuestionKind::MultipleChoice => r.options.unwrap_or_default(),
      QuestionKind::Essay => Vec::new(),
    };
    Question {
      id: r.id,
      kind: r.kind,
      question_text: r.question_text,
      options,
      correct_answer: r.correct_answer,
      explanation: r.explanation.filter(|e| !e.trim().is_empty()),
      points: r.points,
    }
  }
}

/// Strict parse of the raw model text. Any deviation from the declared shape is
/// a `Shape` error; nothing partial is returned.
pub fn parse_generated(text: &str) -> Result<GeneratedContent, GenerationError> {
  let text = text.trim();
  if text.is_empty() {
    return Err(GenerationError::EmptyResponse);
  }
  let raw: RawGenerated = serde_json::from_str(text).map_err(|e| GenerationError::Shape(e.to_string()))?;
  Ok(GeneratedContent {
    title: raw.title,
    questions: raw.questions.into_iter().map(Question::from).collect(),
  })
}

/// Header fields from the form, title and questions from the generator.
pub fn merge(cfg: &ExamConfig, content: GeneratedContent) -> ExamDocument {
  ExamDocument {
    foundation_name: cfg.foundation_name.clone(),
    school_name: cfg.school_name.clone(),
    school_address: cfg.school_address.clone(),
    exam_type: cfg.exam_type.clone(),
    subject: cfg.subject.clone(),
    grade_level: cfg.grade_level.clone(),
    title: content.title,
    questions: content.questions,
  }
}

/// Soft checks on generated content. Only reports; never renumbers, pads or reorders.
pub fn content_warnings(cfg: &ExamConfig, questions: &[Question]) -> Vec<String> {
  let mut warnings = Vec::new();

  let mc = questions.iter().filter(|q| q.kind == QuestionKind::MultipleChoice).count();
  let essay = questions.len() - mc;
  if mc != cfg.mc_count as usize {
    warnings.push(format!("Diminta {} soal pilihan ganda, model menghasilkan {}.", cfg.mc_count, mc));
  }
  if essay != cfg.essay_count as usize {
    warnings.push(format!("Diminta {} soal essay, model menghasilkan {}.", cfg.essay_count, essay));
  }

  let mut seen = HashSet::new();
  for q in questions {
    if !seen.insert(q.id) {
      warnings.push(format!("Nomor soal {} muncul lebih dari sekali.", q.id));
    }
    if q.kind != QuestionKind::MultipleChoice {
      continue;
    }
    if q.options.len() != MC_OPTION_COUNT {
      warnings.push(format!("Soal {} memiliki {} pilihan jawaban (seharusnya {}).", q.id, q.options.len(), MC_OPTION_COUNT));
    }
    if !answer_matches_option(&q.correct_answer, &q.options) {
      warnings.push(format!("Kunci jawaban soal {} tidak cocok dengan pilihan mana pun.", q.id));
    }
  }
  warnings
}

/// True when the answer is one of the option texts, or an option letter
/// such as "B" / "B." / "B. teks".
fn answer_matches_option(answer: &str, options: &[String]) -> bool {
  let answer = answer.trim();
  if options.iter().any(|o| o.trim().eq_ignore_ascii_case(answer)) {
    return true;
  }
  let upper = answer.to_ascii_uppercase();
  (0..options.len()).any(|i| match upper.strip_prefix(option_label(i).as_str()) {
    Some(rest) => rest.is_empty() || rest.starts_with(['.', ')', ' ']),
    None => false,
  })
}
