//! Domain models: exam configuration (form input), questions, and the final exam document.

use serde::{Deserialize, Serialize};

/// Difficulty selected on the form. Serialized exactly as the form sends it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "Easy",
      Difficulty::Medium => "Medium",
      Difficulty::Hard => "Hard",
    }
  }
}

/// Which section a question belongs to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  MultipleChoice,
  Essay,
}

impl QuestionKind {
  /// Label used in the answer key ("PG" = pilihan ganda).
  pub fn abbreviation(&self) -> &'static str {
    match self {
      QuestionKind::MultipleChoice => "PG",
      QuestionKind::Essay => "Essay",
    }
  }
}

/// Parameters entered by the teacher.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExamConfig {
  #[serde(default)] pub foundation_name: String,
  #[serde(default)] pub school_name: String,
  #[serde(default)] pub school_address: String,
  #[serde(default = "default_exam_type")] pub exam_type: String,
  #[serde(default)] pub subject: String,
  #[serde(default)] pub grade_level: String,
  #[serde(default)] pub difficulty: Difficulty,
  #[serde(default)] pub source_material: String,
  #[serde(default)] pub mc_count: u32,
  #[serde(default)] pub essay_count: u32,
}

fn default_exam_type() -> String { "Penilaian Harian (PH)".into() }

/// One generated question. `options` is empty for essays.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: i64,
  #[serde(rename = "type")]
  pub kind: QuestionKind,
  pub question_text: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub options: Vec<String>,
  pub correct_answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
  pub points: i64,
}

/// Final merged document. Header fields always come from the form; title and
/// questions always come from the generator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExamDocument {
  #[serde(default)] pub foundation_name: String,
  #[serde(default)] pub school_name: String,
  #[serde(default)] pub school_address: String,
  #[serde(default)] pub exam_type: String,
  #[serde(default)] pub subject: String,
  #[serde(default)] pub grade_level: String,

  pub title: String,
  pub questions: Vec<Question>,
}

/// Page width used by the printable view. Does not affect content.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaperSize {
  #[default]
  A4,
  F4,
}

impl PaperSize {
  pub fn width_mm(&self) -> u32 {
    match self {
      PaperSize::A4 => 210,
      PaperSize::F4 => 215,
    }
  }

  pub fn height_mm(&self) -> u32 {
    match self {
      PaperSize::A4 => 297,
      PaperSize::F4 => 330,
    }
  }
}
