//! Query answer types.

use super::Document;
use serde::{Deserialize, Serialize};

/// Outcome of a natural-language query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// At least one passage matched.
    Answered,
    /// The backend answered but nothing matched.
    NoResults,
    /// The backend could not be reached; the answer is a placeholder.
    ServiceUnavailable,
}

impl AnswerStatus {
    /// Returns the status as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::NoResults => "no_results",
            Self::ServiceUnavailable => "service_unavailable",
        }
    }
}

/// Answer returned by a [`QueryAgent`](crate::storage::QueryAgent).
///
/// `answer` is the retrieved context, best match first. Composing a final
/// natural-language reply from it is the job of the downstream chat layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// Outcome of the query.
    pub status: AnswerStatus,
    /// Answer text.
    pub answer: String,
    /// Documents the answer was drawn from, best match first.
    pub sources: Vec<Document>,
}

impl QueryAnswer {
    /// Builds an answer from ranked source documents.
    #[must_use]
    pub fn from_sources(sources: Vec<Document>) -> Self {
        if sources.is_empty() {
            return Self {
                status: AnswerStatus::NoResults,
                answer: "No matching documents were found.".to_string(),
                sources,
            };
        }

        let answer = sources
            .iter()
            .map(|doc| doc.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        Self {
            status: AnswerStatus::Answered,
            answer,
            sources,
        }
    }

    /// The neutral answer returned while a backend is unavailable.
    #[must_use]
    pub fn unavailable(backend: &str) -> Self {
        Self {
            status: AnswerStatus::ServiceUnavailable,
            answer: format!("Service unavailable: the {backend} backend could not be reached."),
            sources: Vec::new(),
        }
    }

    /// Returns true if the answer came from the backend.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status != AnswerStatus::ServiceUnavailable
    }
}
