//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::catalog::{self, SUBJECTS};
use crate::config::GenerationSettings;
use crate::domain::{GenerationRequest, Language, Subject};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Generate {
        #[serde(rename = "sessionId", default)]
        session_id: Option<String>,
        request: GenerationRequest,
    },
    Clear {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    /// Generation accepted for this session; fragments follow.
    Started {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Chunk {
        text: String,
    },
    Done {
        problems: Vec<String>,
    },
    Failed {
        message: String,
    },
    Cleared {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct LanguageQuery {
    pub language: Option<String>,
}

#[derive(Serialize)]
pub struct TopicOut {
    pub topic: &'static str,
    pub subtopics: &'static [&'static str],
}

#[derive(Serialize)]
pub struct SubjectOut {
    pub subject: Subject,
    pub name: &'static str,
    pub topics: Vec<TopicOut>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOut {
    pub language: Language,
    pub subjects: Vec<SubjectOut>,
    pub models: Vec<String>,
    pub default_model: String,
    pub temperature: f32,
    pub problem_count: u32,
}

/// Whole vocabulary for one language plus the form defaults.
pub fn catalog_out(language: Language, settings: &GenerationSettings) -> CatalogOut {
    CatalogOut {
        language,
        subjects: SUBJECTS
            .iter()
            .map(|&subject| SubjectOut {
                subject,
                name: catalog::subject_name(language, subject),
                topics: catalog::topics(language, subject)
                    .iter()
                    .map(|t| TopicOut { topic: t.topic, subtopics: t.subtopics })
                    .collect(),
            })
            .collect(),
        models: settings.models.clone(),
        default_model: settings.default_model.clone(),
        temperature: settings.temperature,
        problem_count: settings.problem_count,
    }
}

#[derive(Debug, Deserialize)]
pub struct ExampleQuery {
    pub language: Option<String>,
    pub subject: Subject,
    pub topic: String,
    pub subtopic: String,
}
#[derive(Serialize)]
pub struct ExampleOut {
    pub problem: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub request: GenerationRequest,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Serialize)]
pub struct ProblemsOut {
    pub problems: Vec<String>,
    pub generated: bool,
}

#[derive(Debug, Deserialize)]
pub struct ClearIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}
#[derive(Serialize)]
pub struct ClearOut {
    pub cleared: bool,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generator: bool,
}
