use serde::Serialize;
use thiserror::Error;

/// Failure raised by a capability provider (a Google Cloud adapter or a fake).
///
/// Messages are surfaced to the agent verbatim, so every variant renders the
/// upstream explanation rather than a generic summary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Ambient credentials could not be obtained or were rejected locally.
    #[error("Could not load the default credentials: {0}")]
    Credentials(String),

    /// The remote API answered with a non-success status.
    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("Failed to reach {service}: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// A caller-supplied name could not be placed in a request URL.
    #[error("Invalid resource reference for {service}: {message}")]
    InvalidReference {
        service: &'static str,
        message: String,
    },

    /// The response arrived but did not have the expected shape.
    #[error("Unexpected response from {service}: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

/// Classification of every failure the dispatcher can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ValidationError,
    MissingProjectError,
    AuthenticationError,
    ProviderError,
    UnknownToolError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::MissingProjectError => "missing_project",
            ErrorKind::AuthenticationError => "authentication_error",
            ErrorKind::ProviderError => "provider_error",
            ErrorKind::UnknownToolError => "unknown_tool",
        }
    }
}

/// Lowercase fragments that identify missing or invalid ambient credentials
/// in provider error text.
pub const AUTHENTICATION_ERROR_MARKERS: [&str; 7] = [
    "could not load the default credentials",
    "could not load default credentials",
    "application default credentials",
    "invalid authentication credentials",
    "reauthentication",
    "invalid_grant",
    "unauthenticated",
];

/// Classify a provider failure message.
///
/// This is a substring heuristic over [`AUTHENTICATION_ERROR_MARKERS`]:
/// anything that matches is an `AuthenticationError`, everything else is a
/// plain `ProviderError`.
pub fn classify_provider_error(message: &str) -> ErrorKind {
    let lowered = message.to_ascii_lowercase();
    if AUTHENTICATION_ERROR_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        ErrorKind::AuthenticationError
    } else {
        ErrorKind::ProviderError
    }
}
