//! Draft engine errors and their classification.

use std::fmt;

/// Result type for engine calls.
pub type EngineResult<T> = Result<T, EngineError>;

/// What kind of failure the engine reported.
///
/// The session branches on this, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// No template matched the query at all
    NoMatch,
    /// The best match scored below the engine's confidence threshold
    LowConfidence,
    /// The addressed template or draft instance does not exist
    NotFound,
    /// The engine could not be reached
    Unavailable,
    /// Anything else
    Other,
}

impl EngineErrorKind {
    /// Whether this failure should redirect a query into the web fallback.
    pub fn triggers_web_fallback(self) -> bool {
        matches!(self, Self::NoMatch | Self::LowConfidence)
    }

    /// Parse a structured error code sent by the engine.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "NO_MATCH" | "NO_TEMPLATE" => Some(Self::NoMatch),
            "LOW_CONFIDENCE" => Some(Self::LowConfidence),
            "NOT_FOUND" => Some(Self::NotFound),
            _ => None,
        }
    }

    /// Classify an engine that only returns prose.
    ///
    /// Engines without structured codes report a failed match as
    /// "No suitable template found (confidence < 0.6)...".
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("confidence < 0.6") {
            Self::LowConfidence
        } else if lower.contains("no suitable template") {
            Self::NoMatch
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoMatch => "no match",
            Self::LowConfidence => "low confidence",
            Self::NotFound => "not found",
            Self::Unavailable => "unavailable",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Error types for draft engine calls.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The request never produced a response.
    #[error("Could not reach the draft engine: {0}")]
    Transport(#[from] reqwest::Error),

    /// The engine answered with a failure status.
    #[error("{message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Failure kind, from a structured code or the message
        kind: EngineErrorKind,
        /// The engine's `detail` text
        message: String,
    },

    /// The engine answered with a body we could not read.
    #[error("Unexpected engine response: {0}")]
    Decode(String),
}

impl EngineError {
    /// Build an API error from status, optional structured code, and detail text.
    pub fn api(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = code.and_then(EngineErrorKind::from_code).unwrap_or_else(|| {
            match EngineErrorKind::from_message(&message) {
                EngineErrorKind::Other if status == 404 => EngineErrorKind::NotFound,
                EngineErrorKind::Other if status == 502 || status == 503 => {
                    EngineErrorKind::Unavailable
                }
                kind => kind,
            }
        });
        Self::Api { status, kind, message }
    }

    /// Build an error of an explicit kind, e.g. from an in-process engine.
    pub fn with_kind(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        let status = match kind {
            EngineErrorKind::NoMatch | EngineErrorKind::LowConfidence | EngineErrorKind::NotFound => 404,
            EngineErrorKind::Unavailable => 503,
            EngineErrorKind::Other => 500,
        };
        Self::Api { status, kind, message: message.into() }
    }

    /// The classified kind of this failure.
    pub fn kind(&self) -> EngineErrorKind {
        match self {
            Self::Transport(_) => EngineErrorKind::Unavailable,
            Self::Api { kind, .. } => *kind,
            Self::Decode(_) => EngineErrorKind::Other,
        }
    }
}
