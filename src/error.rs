use thiserror::Error;

use crate::types::MetricKind;

/// Failures raised while turning command output into series points.
///
/// The "no resources" sentinel is never one of these; it is the normal empty path.
#[derive(Debug, Error)]
pub enum MeteringError {
    /// The expected header token never appeared; the CLI output format changed.
    #[error("header marker `{header}` not found in command output")]
    HeaderNotFound { header: String },

    #[error("malformed {kind} value `{token}`: {reason}")]
    MalformedValue {
        kind: MetricKind,
        token: String,
        reason: String,
    },

    #[error("truncated record: expected {expected} tokens, found {found}")]
    TruncatedRecord { expected: usize, found: usize },

    #[error("command failed: {0}")]
    CommandFailed(String),

    /// Transmission to the metrics store failed; buffered points were kept.
    #[error("write to metrics store failed: {0}")]
    WriteFailed(String),
}

impl MeteringError {
    pub(crate) fn malformed(kind: MetricKind, token: &str, reason: impl Into<String>) -> Self {
        MeteringError::MalformedValue {
            kind,
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}
