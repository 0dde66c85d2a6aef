//! Best-effort extraction of problem statements from free-form model output.
//!
//! First pass: every non-blank line is matched against `LineRule`s in priority
//! order and the first match decides what happens to it. Only when that pass
//! yields nothing does the looser fallback pass run over the whole text.
//! Neither pass can fail; the worst case is an empty list.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::Language;
use crate::prompt::{vocabulary, Vocabulary};

/// `1.`, `12.` … with any trailing whitespace.
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s*").expect("static regex"));
/// Numbered line with at least one whitespace after the dot.
static NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s+").expect("static regex"));

/// Characters dropped after the problem marker (colon, dashes, spaces).
const MARKER_TAIL: &[char] = &[':', '-', '–', '—', ' '];
/// Characters trimmed from both ends of a line in the fallback pass.
const BULLET_CHARS: &[char] = &[' ', '-', '*', '\t'];
const BOLD: &str = "**";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineRule {
  /// Line carries the bold problem marker.
  Marked,
  /// Plain numbered line, no bold anywhere, not a topic annotation.
  Numbered,
}

const RULES: [LineRule; 2] = [LineRule::Marked, LineRule::Numbered];

impl LineRule {
  /// Returns Some(outcome) if the rule claims the line. A claimed line may
  /// still produce nothing (empty remainder after the marker).
  fn apply(self, line: &str, vocab: &Vocabulary) -> Option<Option<String>> {
    match self {
      LineRule::Marked => {
        if !line.contains(vocab.problem_marker) {
          return None;
        }
        let unnumbered = LEADING_NUMBER.replace(line, "");
        let after = unnumbered
          .split_once(vocab.problem_marker)
          .map(|(_, rest)| rest)
          .unwrap_or_default();
        let cleaned = after.trim().trim_start_matches(MARKER_TAIL).trim();
        Some((!cleaned.is_empty()).then(|| cleaned.to_string()))
      }
      LineRule::Numbered => {
        if !NUMBERED_ITEM.is_match(line)
          || line.contains(BOLD)
          || line.to_lowercase().starts_with(vocab.topic_word)
        {
          return None;
        }
        Some(Some(NUMBERED_ITEM.replace(line, "").trim().to_string()))
      }
    }
  }
}

/// Extract problems from output written against the English markers.
#[cfg(test)]
pub fn extract_problems(text: &str) -> Vec<String> {
  extract_problems_in(Language::En, text)
}

/// Extract problems using the marker vocabulary of `language`.
pub fn extract_problems_in(language: Language, text: &str) -> Vec<String> {
  let vocab = vocabulary(language);
  let structured = structured_pass(text, vocab);
  if structured.is_empty() {
    fallback_pass(text, vocab)
  } else {
    structured
  }
}

fn structured_pass(text: &str, vocab: &Vocabulary) -> Vec<String> {
  let mut problems = Vec::new();
  for raw in text.lines() {
    let line = raw.trim();
    if line.is_empty() {
      continue;
    }
    let claimed = RULES.iter().find_map(|rule| rule.apply(line, vocab));
    if let Some(Some(problem)) = claimed {
      problems.push(problem);
    }
  }
  problems
}

/// Keeps every line that is not blank and not a topic/solution annotation.
/// Stray lines (an echoed instruction, a heading) are kept as well.
fn fallback_pass(text: &str, vocab: &Vocabulary) -> Vec<String> {
  text
    .lines()
    .map(|raw| raw.trim_matches(BULLET_CHARS))
    .filter(|line| !line.is_empty())
    .filter(|line| {
      let lower = line.to_lowercase();
      !lower.starts_with(vocab.topic_word)
        && !lower.starts_with(vocab.solution_word)
    })
    .map(str::to_string)
    .collect()
}
