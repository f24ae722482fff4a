//! Sequence tags for lint requests.
//!
//! Every dispatched request gets a tag one greater than the previous one. A
//! result is applied only if its tag is the latest issued; anything older
//! answers text the document no longer has.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::document::DocumentSnapshot;
use crate::error::LintError;

use super::resolver::TextSource;

/// What a request was computed from.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    /// Snapshot the findings will be resolved against.
    pub snapshot: Arc<DocumentSnapshot>,
    /// The text sent to the worker.
    pub text: Arc<str>,
    pub source: TextSource,
}

#[derive(Debug, Default)]
pub struct RequestLedger {
    latest: u64,
    pending: BTreeMap<u64, RequestRecord>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new request and return its tag.
    pub fn issue(&mut self, record: RequestRecord) -> u64 {
        self.latest += 1;
        self.pending.insert(self.latest, record);
        self.latest
    }

    /// The most recently issued tag, or 0 if none.
    pub fn latest(&self) -> u64 {
        self.latest
    }

    /// The latest request, if its result has not arrived yet.
    pub fn in_flight(&self) -> Option<&RequestRecord> {
        self.pending.get(&self.latest)
    }

    /// Retarget the in-flight request at `snapshot`. Only valid when the
    /// text of `snapshot` is the text that was sent.
    pub fn rebase(&mut self, snapshot: Arc<DocumentSnapshot>) -> bool {
        match self.pending.get_mut(&self.latest) {
            Some(record) => {
                record.snapshot = snapshot;
                true
            }
            None => false,
        }
    }

    /// Take the record for a result tagged `id`.
    ///
    /// Pending entries up to and including `id` are forgotten either way,
    /// since no later result can make them current again. Tags that were
    /// never issued or already answered leave the ledger untouched.
    pub fn accept(&mut self, id: u64) -> Result<RequestRecord, LintError> {
        if !self.pending.contains_key(&id) {
            return Err(LintError::StaleResponse {
                id,
                latest: self.latest,
            });
        }

        let newer = self.pending.split_off(&(id.saturating_add(1)));
        let mut answered = std::mem::replace(&mut self.pending, newer);
        let record = answered.remove(&id);

        match record {
            Some(record) if id == self.latest => Ok(record),
            _ => Err(LintError::StaleResponse {
                id,
                latest: self.latest,
            }),
        }
    }

    /// Number of requests without a result.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
