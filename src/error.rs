//! Error types.
//!
//! None of these escape a running session: they are logged and degrade to
//! "skip this finding", "discard this response" or "stop linting".

use thiserror::Error;

use crate::document::SnapshotVersion;

#[derive(Debug, Error)]
pub enum LintError {
    /// Range outside the linted text, or `start > end`.
    #[error("finding '{rule_id}' has malformed range {start}..{end} (text length {len})")]
    MalformedFinding {
        rule_id: String,
        start: i64,
        end: i64,
        len: usize,
    },

    /// Response tag older than the latest dispatched request.
    #[error("lint result {id} is stale (latest request is {latest})")]
    StaleResponse { id: u64, latest: u64 },

    /// Neither an exact nor a normalized-prefix match exists for the offset.
    #[error("offset {offset} has no matching position")]
    UnresolvableOffset { offset: usize },

    /// The worker channel is closed.
    #[error("lint worker is unavailable")]
    WorkerUnavailable,

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("malformed worker message: {0}")]
    Protocol(#[from] serde_json::Error),
}

/// Failures reported by a host's decoration primitive.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("decorations computed for {computed:?} but the document is at {current:?}")]
    SnapshotMismatch {
        computed: SnapshotVersion,
        current: SnapshotVersion,
    },

    #[error("host rejected decorations: {0}")]
    Rejected(String),
}
