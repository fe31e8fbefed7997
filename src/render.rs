//! Document renderer: turns an `ExamDocument` into a printable layout.
//!
//! `layout` is the deterministic core (partition, numbering, option labels,
//! answer key). `to_html` and `to_text` only serialize that layout.
//!
//! Student numbering restarts at 1 in each section, while the answer key echoes
//! the generator-assigned `id`. The two numbers are not expected to agree.

use serde::{Deserialize, Serialize};

use crate::domain::{ExamDocument, PaperSize, Question, QuestionKind};
use crate::util::{escape_html, option_label};

/// Blank writing lines reserved under each essay prompt.
pub const ESSAY_ANSWER_LINES: usize = 3;

const MC_HEADING: &str = "A. Pilihan Ganda";
const ESSAY_HEADING: &str = "B. Essay";
const KEY_HEADING: &str = "Kunci Jawaban & Pembahasan";
const KEY_SUBHEADING: &str = "(Pegangan Guru)";
const STUDENT_FIELDS: [&str; 3] = ["Nama", "NISN", "Hari/Tgl"];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
  #[default]
  Html,
  Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderField {
  FoundationName,
  SchoolName,
  SchoolAddress,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderLine {
  pub field: HeaderField,
  pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct McItem {
  pub number: usize,
  pub question_text: String,
  pub options: Vec<(String, String)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EssayItem {
  pub number: usize,
  pub question_text: String,
  pub answer_lines: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEntry {
  pub kind: QuestionKind,
  pub id: i64,
  pub answer: String,
  pub explanation: Option<String>,
}

impl KeyEntry {
  pub fn label(&self) -> String {
    format!("{} No. {}.", self.kind.abbreviation(), self.id)
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExamLayout {
  /// Letterhead. Foundation line only when non-empty; the others always.
  pub letterhead: Vec<HeaderLine>,
  pub title: String,
  /// (label, value) rows; rendered even when the value is empty.
  pub meta: Vec<(&'static str, String)>,
  pub multiple_choice: Vec<McItem>,
  pub essay: Vec<EssayItem>,
  pub answer_key: Vec<KeyEntry>,
}

/// Stable partition into (multiple choice, essay), each in original order.
pub fn partition(questions: &[Question]) -> (Vec<&Question>, Vec<&Question>) {
  questions.iter().partition(|q| q.kind == QuestionKind::MultipleChoice)
}

pub fn layout(doc: &ExamDocument) -> ExamLayout {
  let mut letterhead = Vec::with_capacity(3);
  if !doc.foundation_name.is_empty() {
    letterhead.push(HeaderLine { field: HeaderField::FoundationName, text: doc.foundation_name.clone() });
  }
  letterhead.push(HeaderLine { field: HeaderField::SchoolName, text: doc.school_name.clone() });
  letterhead.push(HeaderLine { field: HeaderField::SchoolAddress, text: doc.school_address.clone() });

  let meta = vec![
    ("Jenis Ujian", doc.exam_type.clone()),
    ("Mata Pelajaran", doc.subject.clone()),
    ("Kelas", doc.grade_level.clone()),
  ];

  let (mc, essay) = partition(&doc.questions);

  let multiple_choice = mc
    .iter()
    .enumerate()
    .map(|(idx, q)| McItem {
      number: idx + 1,
      question_text: q.question_text.clone(),
      options: q.options.iter().enumerate().map(|(i, o)| (option_label(i), o.clone())).collect(),
    })
    .collect();

  let essay = essay
    .iter()
    .enumerate()
    .map(|(idx, q)| EssayItem {
      number: idx + 1,
      question_text: q.question_text.clone(),
      answer_lines: ESSAY_ANSWER_LINES,
    })
    .collect();

  let answer_key = doc
    .questions
    .iter()
    .map(|q| KeyEntry {
      kind: q.kind,
      id: q.id,
      answer: q.correct_answer.clone(),
      explanation: q.explanation.clone(),
    })
    .collect();

  ExamLayout {
    letterhead,
    title: doc.title.clone(),
    meta,
    multiple_choice,
    essay,
    answer_key,
  }
}

pub fn render(doc: &ExamDocument, paper: PaperSize, format: OutputFormat) -> String {
  let l = layout(doc);
  match format {
    OutputFormat::Html => to_html(&l, paper),
    OutputFormat::Text => to_text(&l),
  }
}

/// Self-contained printable HTML page. Printing is left to the browser.
pub fn to_html(l: &ExamLayout, paper: PaperSize) -> String {
  let mut out = String::new();
  out.push_str("<!DOCTYPE html>\n<html lang=\"id\">\n<head>\n<meta charset=\"utf-8\">\n");
  out.push_str(&format!("<title>{}</title>\n", escape_html(&l.title)));
  out.push_str(&format!(
    "<style>\n\
     @page {{ size: {w}mm {h}mm; margin: 15mm; }}\n\
     body {{ font-family: 'Times New Roman', serif; margin: 0; background: #e2e8f0; }}\n\
     .paper {{ background: #fff; max-width: {w}mm; min-height: {h}mm; margin: 0 auto; padding: 12mm; box-sizing: border-box; }}\n\
     .letterhead {{ text-align: center; border-bottom: 4px double #1e293b; padding-bottom: 8px; margin-bottom: 16px; }}\n\
     .letterhead .foundation {{ font-weight: bold; text-transform: uppercase; margin: 0; }}\n\
     .letterhead .school {{ font-weight: bold; font-size: 1.5em; text-transform: uppercase; margin: 0; }}\n\
     .letterhead .address {{ font-style: italic; margin: 0; min-height: 1.2em; }}\n\
     h3.title {{ text-align: center; text-transform: uppercase; text-decoration: underline; }}\n\
     .meta td {{ padding: 2px 8px 2px 0; }}\n\
     .question {{ break-inside: avoid; margin-bottom: 12px; }}\n\
     .options {{ list-style: none; padding-left: 24px; margin: 4px 0; }}\n\
     .answer-line {{ border-bottom: 1px dotted #94a3b8; height: 24px; }}\n\
     .answer-key {{ break-before: page; border-top: 2px dashed #94a3b8; margin-top: 24px; padding-top: 24px; }}\n\
     @media print {{ body {{ background: #fff; }} .paper {{ max-width: none; padding: 0; }} }}\n\
     </style>\n",
    w = paper.width_mm(),
    h = paper.height_mm(),
  ));
  out.push_str("</head>\n<body>\n<div id=\"printable-exam\" class=\"paper\">\n");

  out.push_str("<div class=\"letterhead\">\n");
  for line in &l.letterhead {
    let (tag, class) = match line.field {
      HeaderField::FoundationName => ("h2", "foundation"),
      HeaderField::SchoolName => ("h1", "school"),
      HeaderField::SchoolAddress => ("p", "address"),
    };
    out.push_str(&format!("<{tag} class=\"{class}\">{}</{tag}>\n", escape_html(&line.text)));
  }
  out.push_str("</div>\n");

  out.push_str(&format!("<h3 class=\"title\">{}</h3>\n", escape_html(&l.title)));
  out.push_str("<table class=\"meta\">\n");
  let rows = l.meta.len().max(STUDENT_FIELDS.len());
  for i in 0..rows {
    let left = l.meta.get(i)
      .map(|(k, v)| format!("<td>{}</td><td>: {}</td>", k, escape_html(v)))
      .unwrap_or_else(|| "<td></td><td></td>".into());
    let right = STUDENT_FIELDS.get(i)
      .map(|k| format!("<td>{}</td><td>: ..............................</td>", k))
      .unwrap_or_else(|| "<td></td><td></td>".into());
    out.push_str(&format!("<tr>{left}{right}</tr>\n"));
  }
  out.push_str("</table>\n");

  if !l.multiple_choice.is_empty() {
    out.push_str(&format!("<section class=\"multiple-choice\">\n<h4>{}</h4>\n", MC_HEADING));
    for item in &l.multiple_choice {
      out.push_str(&format!(
        "<div class=\"question\"><span class=\"number\">{}.</span> {}\n<ul class=\"options\">\n",
        item.number,
        escape_html(&item.question_text)
      ));
      for (label, text) in &item.options {
        out.push_str(&format!("<li>{}. {}</li>\n", label, escape_html(text)));
      }
      out.push_str("</ul></div>\n");
    }
    out.push_str("</section>\n");
  }

  if !l.essay.is_empty() {
    out.push_str(&format!("<section class=\"essay\">\n<h4>{}</h4>\n", ESSAY_HEADING));
    for item in &l.essay {
      out.push_str(&format!(
        "<div class=\"question\"><span class=\"number\">{}.</span> {}\n",
        item.number,
        escape_html(&item.question_text)
      ));
      for _ in 0..item.answer_lines {
        out.push_str("<div class=\"answer-line\"></div>\n");
      }
      out.push_str("</div>\n");
    }
    out.push_str("</section>\n");
  }

  out.push_str(&format!(
    "<section class=\"answer-key\">\n<h2>{}</h2>\n<p>{}</p>\n",
    KEY_HEADING, KEY_SUBHEADING
  ));
  for entry in &l.answer_key {
    out.push_str(&format!(
      "<div class=\"key-entry\"><strong>{}</strong>\n<div>Jwb: {}</div>\n",
      entry.label(),
      escape_html(&entry.answer)
    ));
    if let Some(exp) = &entry.explanation {
      out.push_str(&format!("<div><em>Ket: {}</em></div>\n", escape_html(exp)));
    }
    out.push_str("</div>\n");
  }
  out.push_str("</section>\n</div>\n</body>\n</html>\n");
  out
}

/// Plain-text rendition of the same layout.
pub fn to_text(l: &ExamLayout) -> String {
  let mut out = String::new();
  for line in &l.letterhead {
    out.push_str(&line.text);
    out.push('\n');
  }
  out.push_str("========================================\n");
  out.push_str(&l.title);
  out.push('\n');
  for (k, v) in &l.meta {
    out.push_str(&format!("{k}: {v}\n"));
  }
  for k in STUDENT_FIELDS {
    out.push_str(&format!("{k}: ..............................\n"));
  }

  if !l.multiple_choice.is_empty() {
    out.push_str(&format!("\n{}\n", MC_HEADING));
    for item in &l.multiple_choice {
      out.push_str(&format!("{}. {}\n", item.number, item.question_text));
      for (label, text) in &item.options {
        out.push_str(&format!("   {}. {}\n", label, text));
      }
    }
  }

  if !l.essay.is_empty() {
    out.push_str(&format!("\n{}\n", ESSAY_HEADING));
    for item in &l.essay {
      out.push_str(&format!("{}. {}\n", item.number, item.question_text));
      for _ in 0..item.answer_lines {
        out.push_str("   ....................................................\n");
      }
    }
  }

  out.push_str(&format!("\n----------------------------------------\n{}\n{}\n", KEY_HEADING, KEY_SUBHEADING));
  for entry in &l.answer_key {
    out.push_str(&format!("{}\n   Jwb: {}\n", entry.label(), entry.answer));
    if let Some(exp) = &entry.explanation {
      out.push_str(&format!("   Ket: {}\n", exp));
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mc(id: i64, text: &str, answer: &str) -> Question {
    Question {
      id,
      kind: QuestionKind::MultipleChoice,
      question_text: text.into(),
      options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
      correct_answer: answer.into(),
      explanation: None,
      points: 10,
    }
  }

  fn essay(id: i64, text: &str) -> Question {
    Question {
      id,
      kind: QuestionKind::Essay,
      question_text: text.into(),
      options: vec![],
      correct_answer: "Jawaban contoh".into(),
      explanation: Some("Lihat paragraf 2".into()),
      points: 20,
    }
  }

  fn doc(questions: Vec<Question>) -> ExamDocument {
    ExamDocument {
      foundation_name: "Yayasan Pendidikan Nusantara".into(),
      school_name: "SMA Nusantara".into(),
      school_address: "Jl. Merdeka No. 1".into(),
      exam_type: "Penilaian Harian (PH)".into(),
      subject: "Biologi".into(),
      grade_level: "XII IPA 1".into(),
      title: "PENILAIAN HARIAN".into(),
      questions,
    }
  }

  #[test]
  fn biology_scenario_numbers_sections_and_key() {
    let d = doc(vec![mc(1, "Q1", "A"), mc(2, "Q2", "B"), essay(3, "Q3")]);
    let l = layout(&d);

    let mc_numbers: Vec<usize> = l.multiple_choice.iter().map(|i| i.number).collect();
    assert_eq!(mc_numbers, vec![1, 2]);
    let essay_numbers: Vec<usize> = l.essay.iter().map(|i| i.number).collect();
    assert_eq!(essay_numbers, vec![1]);
    let key_ids: Vec<i64> = l.answer_key.iter().map(|k| k.id).collect();
    assert_eq!(key_ids, vec![1, 2, 3]);
  }

  #[test]
  fn student_numbers_differ_from_answer_key_ids() {
    // Interleaved kinds with sparse, unsorted ids.
    let d = doc(vec![essay(40, "E1"), mc(7, "M1", "A"), essay(12, "E2"), mc(3, "M2", "C")]);
    let l = layout(&d);

    assert_eq!(l.essay[1].number, 2);
    assert_eq!(l.essay[1].question_text, "E2");
    assert_eq!(l.multiple_choice[0].number, 1);
    assert_eq!(l.multiple_choice[0].question_text, "M1");

    let labels: Vec<String> = l.answer_key.iter().map(|k| k.label()).collect();
    assert_eq!(labels, vec!["Essay No. 40.", "PG No. 7.", "Essay No. 12.", "PG No. 3."]);

    let text = to_text(&l);
    assert!(text.contains("2. E2"));
    assert!(text.contains("Essay No. 12."));
    assert!(!text.contains("Essay No. 2."));
  }

  #[test]
  fn partition_is_stable_and_complete() {
    let qs = vec![essay(5, "a"), mc(1, "b", "A"), mc(9, "c", "B"), essay(2, "d"), mc(4, "e", "C")];
    let (m, e) = partition(&qs);
    assert_eq!(m.iter().map(|q| q.id).collect::<Vec<_>>(), vec![1, 9, 4]);
    assert_eq!(e.iter().map(|q| q.id).collect::<Vec<_>>(), vec![5, 2]);
    assert_eq!(m.len() + e.len(), qs.len());
    for q in &qs {
      let hits = m.iter().chain(e.iter()).filter(|x| std::ptr::eq(**x, q)).count();
      assert_eq!(hits, 1);
    }
  }

  #[test]
  fn options_keep_their_order_and_letters() {
    let mut q = mc(1, "Organel fotosintesis?", "C");
    q.options = vec!["Mitokondria".into(), "Ribosom".into(), "Kloroplas".into(), "Lisosom".into()];
    let l = layout(&doc(vec![q]));
    let opts = &l.multiple_choice[0].options;
    assert_eq!(opts[0], ("A".to_string(), "Mitokondria".to_string()));
    assert_eq!(opts[2], ("C".to_string(), "Kloroplas".to_string()));
    assert_eq!(opts[3], ("D".to_string(), "Lisosom".to_string()));
  }

  #[test]
  fn oversized_option_lists_keep_distinct_labels() {
    let mut q = mc(1, "Pilih satu", "A");
    q.options = (0..28).map(|i| format!("opsi {i}")).collect();
    let l = layout(&doc(vec![q]));
    let labels: Vec<&str> = l.multiple_choice[0].options.iter().map(|(label, _)| label.as_str()).collect();
    assert_eq!(&labels[24..], &["Y", "Z", "AA", "AB"]);
    let text = to_text(&l);
    assert!(text.contains("AA. opsi 26"));
    assert!(text.contains("AB. opsi 27"));
  }

  #[test]
  fn empty_sections_are_omitted() {
    let only_essays = render(&doc(vec![essay(1, "E")]), PaperSize::A4, OutputFormat::Html);
    assert!(!only_essays.contains(MC_HEADING));
    assert!(only_essays.contains(ESSAY_HEADING));
    assert!(only_essays.contains(KEY_HEADING));

    let nothing = render(&doc(vec![]), PaperSize::A4, OutputFormat::Text);
    assert!(!nothing.contains(MC_HEADING));
    assert!(!nothing.contains(ESSAY_HEADING));
    assert!(nothing.contains(KEY_HEADING));
  }

  #[test]
  fn essays_reserve_answer_lines() {
    let html = render(&doc(vec![essay(1, "E1"), essay(2, "E2")]), PaperSize::A4, OutputFormat::Html);
    assert_eq!(html.matches("class=\"answer-line\"").count(), 2 * ESSAY_ANSWER_LINES);
  }

  #[test]
  fn foundation_line_absent_but_blank_address_kept() {
    let mut d = doc(vec![]);
    d.foundation_name.clear();
    d.school_address.clear();
    let l = layout(&d);

    assert!(l.letterhead.iter().all(|h| h.field != HeaderField::FoundationName));
    let address = l.letterhead.iter().find(|h| h.field == HeaderField::SchoolAddress).unwrap();
    assert_eq!(address.text, "");

    let html = to_html(&l, PaperSize::A4);
    assert!(!html.contains("class=\"foundation\""));
    assert!(html.contains("<p class=\"address\"></p>"));

    let text = to_text(&l);
    assert!(text.starts_with("SMA Nusantara\n\n===="));
  }

  #[test]
  fn empty_meta_fields_still_render() {
    let mut d = doc(vec![]);
    d.grade_level.clear();
    let text = render(&d, PaperSize::A4, OutputFormat::Text);
    assert!(text.contains("Kelas: \n"));
  }

  #[test]
  fn rendering_is_deterministic() {
    let d = doc(vec![mc(1, "Q1", "A"), essay(2, "Q2")]);
    assert_eq!(render(&d, PaperSize::F4, OutputFormat::Html), render(&d, PaperSize::F4, OutputFormat::Html));
    assert_eq!(layout(&d), layout(&d));
  }

  #[test]
  fn paper_size_only_changes_page_geometry() {
    let d = doc(vec![mc(1, "Q1", "A"), essay(2, "Q2")]);
    let a4 = render(&d, PaperSize::A4, OutputFormat::Html);
    let f4 = render(&d, PaperSize::F4, OutputFormat::Html);
    assert!(a4.contains("max-width: 210mm"));
    assert!(f4.contains("max-width: 215mm"));
    let body = |s: &str| s.split("</head>").nth(1).unwrap_or_default().to_string();
    assert_eq!(body(&a4), body(&f4));
  }

  #[test]
  fn model_text_is_escaped() {
    let mut q = mc(1, "Manakah <script>alert(1)</script>?", "A");
    q.options[0] = "a & b".into();
    let html = render(&doc(vec![q]), PaperSize::A4, OutputFormat::Html);
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("A. a &amp; b"));
  }

  #[test]
  fn key_shows_explanations_when_present() {
    let text = render(&doc(vec![mc(1, "Q1", "A"), essay(2, "Q2")]), PaperSize::A4, OutputFormat::Text);
    assert!(text.contains("PG No. 1.\n   Jwb: A\n"));
    assert!(text.contains("Essay No. 2.\n   Jwb: Jawaban contoh\n   Ket: Lihat paragraf 2\n"));
    assert_eq!(text.matches("Ket:").count(), 1);
  }
}
