use thiserror::Error;

/// C2 fetch errors (distilled spec §7).
#[derive(Debug, Error, Clone)]
pub enum FetchError {
    /// Network failure, 5xx, undersized/malformed body, or timeout — recoverable
    /// by retrying the same request.
    #[error("transient fetch failure: {reason}")]
    Transient { reason: String },

    /// 4xx, malformed URL, or repeated magic-byte failure after exhausting
    /// retries — not recoverable by retrying the same request.
    #[error("permanent fetch failure: {reason}")]
    Permanent { reason: String },
}

/// One offset attempted by the fallback resolver (C3) and how it ended.
#[derive(Debug, Clone)]
pub struct OffsetAttempt {
    pub offset_minutes: i64,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    FetchFailed(FetchError),
    Duplicate { hash: String },
}

/// C3 resolution errors (distilled spec §7): every offset in the layer's
/// schedule was exhausted without yielding an acceptable image.
#[derive(Debug, Error, Clone)]
pub enum ResolveError {
    #[error("resolve failed after {} attempted offsets", .attempted.len())]
    ResolveFailure { attempted: Vec<OffsetAttempt> },

    #[error("every offset returned a known duplicate ({} attempts)", .attempted.len())]
    DuplicateExhausted { attempted: Vec<OffsetAttempt> },
}

impl ResolveError {
    pub fn attempted(&self) -> &[OffsetAttempt] {
        match self {
            ResolveError::ResolveFailure { attempted } => attempted,
            ResolveError::DuplicateExhausted { attempted } => attempted,
        }
    }
}
