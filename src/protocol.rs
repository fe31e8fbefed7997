//! Public HTTP request/response DTOs (serde ready).
//! Field names follow the form's camelCase convention.

use serde::{Deserialize, Serialize};

use crate::domain::{ExamConfig, ExamDocument, PaperSize};
use crate::render::OutputFormat;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIn {
    #[serde(default)]
    pub session_id: Option<String>,
    pub config: ExamConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOut {
    pub session_id: String,
    pub document: ExamDocument,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintQuery {
    pub session_id: String,
    #[serde(default)]
    pub paper: PaperSize,
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Deserialize, Default)]
pub struct RenderQuery {
    #[serde(default)]
    pub paper: PaperSize,
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generator: String,
}
