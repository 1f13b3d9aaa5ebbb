use thiserror::Error;

/// Errors raised by the emission pipeline and its collaborators.
///
/// Local failures (`Validation`, `Structural`, `Deadline`, `Conflict`) are
/// detected before any remote call. `Transport` is retryable; `Rejection`
/// carries the authority's verdict and is never retried automatically.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NfeError {
    /// Missing or malformed input data, caught before generation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A generated document failed the required-element checks.
    #[error("structural check failed: {0}")]
    Structural(String),

    /// No usable certificate for the tenant, or the signing service failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Network-level failure talking to SEFAZ (timeout, connection, HTTP).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The authority returned a non-success status code.
    #[error("rejected by SEFAZ: {code} - {reason}")]
    Rejection { code: u16, reason: String },

    /// An event was attempted outside its regulatory time window.
    #[error("deadline exceeded: {0}")]
    Deadline(String),

    /// Duplicate number, overlapping range, or event sequence limit.
    #[error("conflict: {0}")]
    Conflict(String),

    /// XML generation or parsing error.
    #[error("XML error: {0}")]
    Xml(String),
}

/// A single validation issue with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dot-separated path to the invalid field (e.g. "recipient.address.cep").
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Join a list of issues into a single `NfeError::Validation`.
pub fn validation_error(issues: &[ValidationIssue]) -> NfeError {
    let msg = issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    NfeError::Validation(msg)
}
