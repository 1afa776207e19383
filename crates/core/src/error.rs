use std::fmt;
use thiserror::Error;

/// External collaborator a request was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Embedding,
    Generation,
    VectorStore,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embedding => "embedding service",
            Self::Generation => "generation service",
            Self::VectorStore => "vector store",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum RagError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{stage}: expected {expected} items, got {actual}")]
    CountMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("embedding dimension {actual} does not match expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector store returned no neighbors for the query")]
    EmptyRetrieval,

    #[error("{service} returned {status}: {body}")]
    Transport {
        service: Service,
        status: u16,
        body: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {service}: {details}")]
    Deserialization { service: Service, details: String },

    #[error("could not extract text from {path}: {reason}")]
    Extraction { path: String, reason: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl RagError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::CountMismatch { .. }
                | Self::DimensionMismatch { .. }
                | Self::EmptyRetrieval
        )
    }

    /// The external service that produced this error, if any.
    pub fn service(&self) -> Option<Service> {
        match self {
            Self::Transport { service, .. } | Self::Deserialization { service, .. } => {
                Some(*service)
            }
            _ => None,
        }
    }

    /// Text shown to an end user when the answer flow fails.
    pub fn answer_diagnostic(&self) -> String {
        format!("Error getting answer: {self}")
    }
}

pub type Result<T, E = RagError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_names_service_status_and_body() {
        let error = RagError::Transport {
            service: Service::VectorStore,
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(error.to_string(), "vector store returned 500: boom");
        assert_eq!(error.service(), Some(Service::VectorStore));
        assert!(!error.is_validation());
    }

    #[test]
    fn answer_diagnostic_prefixes_message() {
        let error = RagError::EmptyRetrieval;
        assert_eq!(
            error.answer_diagnostic(),
            "Error getting answer: vector store returned no neighbors for the query"
        );
    }

    #[test]
    fn count_mismatch_is_validation() {
        let error = RagError::CountMismatch {
            stage: "embedding batch",
            expected: 3,
            actual: 2,
        };
        assert!(error.is_validation());
        assert_eq!(
            error.to_string(),
            "embedding batch: expected 3 items, got 2"
        );
    }
}
