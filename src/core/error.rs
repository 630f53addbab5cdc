use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

/// Why a single section could not be fetched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection, DNS or body transfer failure
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the adapter timeout
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("upstream rejected request ({status}): {message}")]
    Upstream4xx { status: u16, message: String },

    #[error("upstream failed ({status}): {message}")]
    Upstream5xx { status: u16, message: String },

    /// Body was not the expected JSON shape
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureReason {
    Network,
    Timeout,
    Upstream4xx,
    Upstream5xx,
    Parse,
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FailureReason::Network => "network",
                FailureReason::Timeout => "timeout",
                FailureReason::Upstream4xx => "upstream-4xx",
                FailureReason::Upstream5xx => "upstream-5xx",
                FailureReason::Parse => "parse",
            }
        )
    }
}

impl FetchError {
    pub fn reason(&self) -> FailureReason {
        match self {
            FetchError::Network(_) => FailureReason::Network,
            FetchError::Timeout(_) => FailureReason::Timeout,
            FetchError::Upstream4xx { .. } => FailureReason::Upstream4xx,
            FetchError::Upstream5xx { .. } => FailureReason::Upstream5xx,
            FetchError::Parse(_) => FailureReason::Parse,
        }
    }

    /// Transient failures may succeed on the next manual or scheduled
    /// refresh. The rest point at configuration or contract problems.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.reason(),
            FailureReason::Network | FailureReason::Timeout | FailureReason::Upstream5xx
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// Every failure was network, timeout or upstream-5xx
    Transient,
    /// At least one failure was upstream-4xx or parse
    Contract,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FailureKind::Transient => "transient",
                FailureKind::Contract => "configuration/contract",
            }
        )
    }
}

impl FailureKind {
    pub fn classify<'a>(errors: impl IntoIterator<Item = &'a FetchError>) -> Self {
        if errors.into_iter().all(FetchError::is_transient) {
            FailureKind::Transient
        } else {
            FailureKind::Contract
        }
    }
}

/// Snapshot level error surfaced to the rendering layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefreshError {
    #[error("all {sections} sections failed to load ({kind} failure)")]
    AllSectionsFailed { sections: usize, kind: FailureKind },
}

impl RefreshError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RefreshError::AllSectionsFailed { kind, .. } => *kind,
        }
    }
}
