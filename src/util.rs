//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// The template is scanned once; substituted values are copied as-is and never
/// scanned for placeholders themselves. Unknown `{...}` tokens are kept literally.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let value = after
      .find('}')
      .and_then(|close| pairs.iter().find(|(k, _)| *k == &after[..close]).map(|(_, v)| (close, *v)));
    match value {
      Some((close, v)) => {
        out.push_str(v);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Log-safe truncation for large strings (char-boundary aware).
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} bytes total)", head, s.len())
  }
}

/// Minimal HTML escaping for text nodes and attribute values.
pub fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(ch),
    }
  }
  out
}

/// Option label for a zero-based index: 0 -> "A", 1 -> "B", ... 25 -> "Z".
/// Past Z the labels continue as AA, AB, ... so they stay distinct.
pub fn option_label(idx: usize) -> String {
  let mut n = idx + 1;
  let mut rev = Vec::new();
  while n > 0 {
    n -= 1;
    rev.push((b'A' + (n % 26) as u8) as char);
    n /= 26;
  }
  rev.iter().rev().collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_every_occurrence() {
    let out = fill_template("{a} dan {a} lalu {b}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x dan x lalu y");
  }

  #[test]
  fn substituted_values_are_not_rescanned() {
    let out = fill_template("{a} / {b}", &[("a", "pakai {b}"), ("b", "y")]);
    assert_eq!(out, "pakai {b} / y");
  }

  #[test]
  fn unknown_and_unclosed_braces_are_kept() {
    let out = fill_template("{x} {a} {", &[("a", "1")]);
    assert_eq!(out, "{x} 1 {");
    assert_eq!(fill_template("{{a}}", &[("a", "1")]), "{1}");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    let s = "fotosintésis";
    assert_eq!(trunc_for_log(s, 100), s);
    assert!(trunc_for_log(s, 8).starts_with("fotosint"));
  }

  #[test]
  fn escapes_markup() {
    assert_eq!(escape_html("<b>\"A\" & 'B'</b>"), "&lt;b&gt;&quot;A&quot; &amp; &#39;B&#39;&lt;/b&gt;");
  }

  #[test]
  fn labels_are_consecutive_capitals() {
    let labels: String = (0..4).map(option_label).collect();
    assert_eq!(labels, "ABCD");
  }

  #[test]
  fn labels_stay_distinct_past_z() {
    let labels: Vec<String> = (0..28).map(option_label).collect();
    assert_eq!(labels[25], "Z");
    assert_eq!(labels[26], "AA");
    assert_eq!(labels[27], "AB");
    let mut unique = labels.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), labels.len());
    assert_eq!(option_label(26 * 27), "AAA");
  }
}
