//! Domain models: subject, language, and the generation request built from the form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of problems the form asks for when the client does not say.
pub const DEFAULT_PROBLEM_COUNT: u32 = 10;

/// Which subject the generated problems belong to.
/// Selects the role-framing preamble of the instruction.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
  Physics,
  Math,
}
impl Default for Subject {
  fn default() -> Self { Subject::Physics }
}

/// Language of the instruction, of the marker vocabulary and of the catalog.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Language {
  En,
  Mn,
}
impl Default for Language {
  fn default() -> Self { Language::En }
}

impl Language {
  /// Accepts "en"/"english" and "mn"/"mongolian" (case-insensitive).
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "en" | "english" => Some(Language::En),
      "mn" | "mongolian" => Some(Language::Mn),
      _ => None,
    }
  }
}

impl std::fmt::Display for Language {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self { Language::En => "en", Language::Mn => "mn" })
  }
}

/// Everything the form supplies for one generation.
/// Created fresh per user action and dropped after use.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
  pub subject: Subject,
  pub topic: String,
  pub subtopic: String,
  pub source_problem: String,
  #[serde(default = "default_count")]
  pub count: u32,
  #[serde(default)]
  pub include_solutions: bool,
  #[serde(default = "default_temperature")]
  pub temperature: f32,
  #[serde(default)]
  pub model_name: String,
  #[serde(default)]
  pub language: Language,
}

fn default_count() -> u32 { DEFAULT_PROBLEM_COUNT }
fn default_temperature() -> f32 { 0.7 }

/// Precondition violations caught before an instruction is built.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
  #[error("source problem is empty")]
  EmptySourceProblem,
  #[error("problem count must be at least 1")]
  ZeroCount,
  #[error("temperature {0} is outside [0, 1]")]
  TemperatureOutOfRange(f32),
  #[error("model name is empty")]
  MissingModel,
}

impl GenerationRequest {
  pub fn validate(&self) -> Result<(), RequestError> {
    if self.source_problem.trim().is_empty() {
      return Err(RequestError::EmptySourceProblem);
    }
    if self.count == 0 {
      return Err(RequestError::ZeroCount);
    }
    if !(0.0..=1.0).contains(&self.temperature) {
      return Err(RequestError::TemperatureOutOfRange(self.temperature));
    }
    if self.model_name.trim().is_empty() {
      return Err(RequestError::MissingModel);
    }
    Ok(())
  }
}

#[cfg(test)]
pub(crate) fn sample_request() -> GenerationRequest {
  GenerationRequest {
    subject: Subject::Math,
    topic: "Algebra".into(),
    subtopic: "Equations".into(),
    source_problem: "Solve x^2 - 5x + 6 = 0.".into(),
    count: 10,
    include_solutions: false,
    temperature: 0.7,
    model_name: "gemini-1.5-flash".into(),
    language: Language::En,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_source_problem_is_rejected() {
    let mut req = sample_request();
    req.source_problem = "  \n\t ".into();
    assert_eq!(req.validate(), Err(RequestError::EmptySourceProblem));
  }

  #[test]
  fn count_and_temperature_are_checked() {
    let mut req = sample_request();
    req.count = 0;
    assert_eq!(req.validate(), Err(RequestError::ZeroCount));

    let mut req = sample_request();
    req.temperature = 1.5;
    assert_eq!(req.validate(), Err(RequestError::TemperatureOutOfRange(1.5)));

    assert!(sample_request().validate().is_ok());
  }

  #[test]
  fn request_deserializes_with_form_defaults() {
    let req: GenerationRequest = serde_json::from_str(
      r#"{"subject":"physics","topic":"Mechanics","subtopic":"Kinematics","sourceProblem":"A car stops."}"#,
    ).expect("request");
    assert_eq!(req.count, DEFAULT_PROBLEM_COUNT);
    assert!(!req.include_solutions);
    assert_eq!(req.language, Language::En);
    assert!(req.model_name.is_empty());
  }

  #[test]
  fn language_parses_codes_and_names() {
    assert_eq!(Language::parse("MN"), Some(Language::Mn));
    assert_eq!(Language::parse(" english "), Some(Language::En));
    assert_eq!(Language::parse("fr"), None);
  }
}
