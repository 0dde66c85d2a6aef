//! Loading generation settings from the environment and an optional TOML file.
//!
//! TOML schema (all keys optional):
//!
//! ```toml
//! [generation]
//! models = ["gemini-1.5-flash", "gemini-1.5-pro"]
//! default_model = "gemini-1.5-flash"
//! temperature = 0.7
//! max_output_tokens = 4096
//! problem_count = 10
//! language = "mn"
//! request_timeout_secs = 120
//! session_ttl_secs = 3600
//! ```

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{Language, DEFAULT_PROBLEM_COUNT};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub generation: GenerationSettings,
}

/// Defaults offered by the form and limits passed to the model.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
  pub models: Vec<String>,
  pub default_model: String,
  pub temperature: f32,
  pub max_output_tokens: u32,
  pub problem_count: u32,
  pub language: Language,
  pub request_timeout_secs: u64,
  /// Idle sessions older than this are evicted.
  pub session_ttl_secs: u64,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self {
      models: vec!["gemini-1.5-flash".into(), "gemini-1.5-pro".into()],
      default_model: DEFAULT_MODEL.into(),
      temperature: 0.7,
      max_output_tokens: 4096,
      problem_count: DEFAULT_PROBLEM_COUNT,
      language: Language::En,
      request_timeout_secs: 120,
      session_ttl_secs: 3600,
    }
  }
}

impl AppConfig {
  /// Parse a TOML document. Missing sections fall back to defaults.
  pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
    let mut cfg: AppConfig = toml::from_str(s)?;
    cfg.generation.normalize();
    Ok(cfg)
  }

  /// Config from PROBLEMS_CONFIG_PATH (if set and readable), then env overrides.
  /// IO and parse errors are logged and defaults are used instead.
  pub fn load_from_env() -> Self {
    let mut cfg = load_file_from_env().unwrap_or_default();

    if let Ok(model) = std::env::var("GEMINI_MODEL") {
      if !model.trim().is_empty() {
        cfg.generation.default_model = model.trim().to_string();
      }
    }
    if let Ok(lang) = std::env::var("PROBLEMS_LANGUAGE") {
      match Language::parse(&lang) {
        Some(l) => cfg.generation.language = l,
        None => warn!(target: "problem_forge", %lang, "Unknown PROBLEMS_LANGUAGE; keeping configured language"),
      }
    }
    cfg.generation.normalize();
    cfg
  }
}

impl GenerationSettings {
  /// Keep the default model selectable and the numbers in range.
  fn normalize(&mut self) {
    if self.default_model.trim().is_empty() {
      self.default_model = DEFAULT_MODEL.into();
    }
    if !self.models.contains(&self.default_model) {
      self.models.insert(0, self.default_model.clone());
    }
    self.temperature = self.temperature.clamp(0.0, 1.0);
    self.problem_count = self.problem_count.max(1);
    self.max_output_tokens = self.max_output_tokens.max(1);
    self.session_ttl_secs = self.session_ttl_secs.max(1);
  }
}

fn load_file_from_env() -> Option<AppConfig> {
  let path = std::env::var("PROBLEMS_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match AppConfig::from_toml_str(&s) {
      Ok(cfg) => {
        info!(target: "problem_forge", %path, "Loaded generation config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "problem_forge", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "problem_forge", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_gives_defaults() {
    let cfg = AppConfig::from_toml_str("").expect("toml");
    assert_eq!(cfg.generation.default_model, DEFAULT_MODEL);
    assert_eq!(cfg.generation.problem_count, 10);
    assert_eq!(cfg.generation.max_output_tokens, 4096);
    assert_eq!(cfg.generation.language, Language::En);
    assert_eq!(cfg.generation.session_ttl_secs, 3600);
  }

  #[test]
  fn partial_section_overrides_and_normalizes() {
    let cfg = AppConfig::from_toml_str(
      "[generation]\ndefault_model = \"gemini-2.0-flash\"\ntemperature = 3.0\nproblem_count = 0\nlanguage = \"mn\"\nsession_ttl_secs = 0\n",
    ).expect("toml");
    let g = cfg.generation;
    assert_eq!(g.models[0], "gemini-2.0-flash");
    assert!(g.models.contains(&"gemini-1.5-pro".to_string()));
    assert_eq!(g.temperature, 1.0);
    assert_eq!(g.problem_count, 1);
    assert_eq!(g.language, Language::Mn);
    assert_eq!(g.session_ttl_secs, 1);
  }

  #[test]
  fn malformed_document_is_an_error() {
    assert!(AppConfig::from_toml_str("[generation\nx=").is_err());
  }
}
