//! In-process channel between a session and its lint worker.
//!
//! The session never constructs its worker: callers create a pair with
//! [`channel`], hand the [`WorkerChannel`] to the session and drive the
//! [`WorkerEndpoint`] from whatever runs the lint engine (a task, a thread
//! bridging to a subprocess, a test).

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::LintError;

use super::protocol::{LintRequest, LintResponse, LintResult, WorkerMessage, WorkerRequest};

/// Session side of the worker connection.
#[derive(Debug)]
pub struct WorkerChannel {
    requests: mpsc::UnboundedSender<WorkerRequest>,
    messages: mpsc::UnboundedReceiver<WorkerMessage>,
}

impl WorkerChannel {
    pub fn send(&self, request: WorkerRequest) -> Result<(), LintError> {
        self.requests
            .send(request)
            .map_err(|_| LintError::WorkerUnavailable)
    }

    /// Next message from the worker, or `None` once the endpoint is gone.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        self.messages.recv().await
    }
}

/// Worker side of the connection.
#[derive(Debug)]
pub struct WorkerEndpoint {
    requests: mpsc::UnboundedReceiver<WorkerRequest>,
    messages: mpsc::UnboundedSender<WorkerMessage>,
}

impl WorkerEndpoint {
    /// Next lint request, or `None` once the session has shut down.
    pub async fn recv(&mut self) -> Option<LintRequest> {
        match self.requests.recv().await? {
            WorkerRequest::Lint(request) => Some(request),
        }
    }

    pub fn send(&self, message: WorkerMessage) -> Result<(), LintError> {
        self.messages
            .send(message)
            .map_err(|_| LintError::WorkerUnavailable)
    }

    /// Send the result for request `id`.
    pub fn reply(&self, id: u64, result: LintResult) -> Result<(), LintError> {
        self.send(WorkerMessage::LintResult(LintResponse { id, result }))
    }

    /// Answer every request with `lint` until the session goes away.
    pub async fn serve<F>(mut self, mut lint: F)
    where
        F: FnMut(&LintRequest) -> LintResult,
    {
        while let Some(request) = self.recv().await {
            let result = lint(&request);
            if self.reply(request.id, result).is_err() {
                break;
            }
        }
        debug!("lint worker stopped");
    }
}

/// Create a connected session/worker pair.
pub fn channel() -> (WorkerChannel, WorkerEndpoint) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (message_tx, message_rx) = mpsc::unbounded_channel();
    (
        WorkerChannel {
            requests: request_tx,
            messages: message_rx,
        },
        WorkerEndpoint {
            requests: request_rx,
            messages: message_tx,
        },
    )
}
