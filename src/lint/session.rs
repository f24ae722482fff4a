//! The per-document lint loop.
//!
//! A [`LintSession`] runs as a tokio task owning the dispatcher, the request
//! ledger and the worker channel. Hosts talk to it through a
//! [`SessionHandle`]; all state changes happen on the session task, so no
//! locking is needed around the dispatcher or the ledger.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::document::{DocumentSnapshot, PositionMap};
use crate::error::LintError;
use crate::host::DocumentHost;
use crate::settings::Settings;

use super::decorations::{apply, decorate, DecorationSet};
use super::dispatcher::{DispatchState, Dispatcher, TimerOutcome};
use super::finding::Finding;
use super::ledger::{RequestLedger, RequestRecord};
use super::protocol::{LintRequest, LintResponse, WorkerMessage, WorkerRequest};
use super::resolver::TextSource;
use super::worker::WorkerChannel;

#[derive(Debug)]
enum HostEvent {
    Changed,
    CompositionEnded,
    Shutdown,
}

/// Findings of the last accepted result, kept for unchanged-text reuse.
#[derive(Debug)]
struct LastLint {
    text: Arc<str>,
    source: TextSource,
    findings: Vec<Finding>,
}

/// Host-facing side of a running session. Cheap to clone.
///
/// The session stops when [`SessionHandle::shutdown`] is called or when
/// every handle has been dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<HostEvent>,
    state: watch::Receiver<DispatchState>,
}

impl SessionHandle {
    /// The host committed a document mutation.
    pub fn notify_change(&self) {
        let _ = self.events.send(HostEvent::Changed);
    }

    /// A composition (IME) session ended.
    pub fn notify_composition_end(&self) {
        let _ = self.events.send(HostEvent::CompositionEnded);
    }

    /// Dispatcher state after the session's last step: `Idle`,
    /// `PendingEdit` or `Disabled`.
    pub fn state(&self) -> DispatchState {
        *self.state.borrow()
    }

    /// Ask the session to stop. Pending timers and in-flight results are
    /// dropped; decorations stay as last applied.
    pub fn shutdown(&self) {
        let _ = self.events.send(HostEvent::Shutdown);
    }

    pub fn is_stopped(&self) -> bool {
        self.events.is_closed()
    }

    /// Resolves once the session task has exited.
    pub async fn stopped(&self) {
        self.events.closed().await;
    }
}

pub struct LintSession<H: DocumentHost> {
    host: Arc<H>,
    worker: WorkerChannel,
    settings: Settings,
    dispatcher: Dispatcher,
    ledger: RequestLedger,
    last: Option<LastLint>,
    events: mpsc::UnboundedReceiver<HostEvent>,
    state: watch::Sender<DispatchState>,
}

impl<H: DocumentHost> LintSession<H> {
    /// Start a session for `host` on the current tokio runtime.
    pub fn spawn(host: Arc<H>, worker: WorkerChannel, settings: Settings) -> SessionHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(DispatchState::Idle);

        let session = Self {
            host,
            worker,
            dispatcher: Dispatcher::new(settings.quiet_period()),
            settings,
            ledger: RequestLedger::new(),
            last: None,
            events: events_rx,
            state: state_tx,
        };
        tokio::spawn(session.run());

        SessionHandle {
            events: events_tx,
            state: state_rx,
        }
    }

    async fn run(mut self) {
        loop {
            let deadline = self.dispatcher.deadline();
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(HostEvent::Changed) => self.on_change(),
                    Some(HostEvent::CompositionEnded) => {
                        self.dispatcher.on_composition_end(Instant::now());
                    }
                    Some(HostEvent::Shutdown) | None => break,
                },
                message = self.worker.recv(), if !self.dispatcher.is_disabled() => match message {
                    Some(message) => self.on_message(message),
                    None => self.disable(LintError::WorkerUnavailable),
                },
                () = wait_until(deadline) => self.on_timer(),
            }
            self.publish();
        }
        debug!(pending = self.ledger.pending(), "lint session stopped");
    }

    fn on_change(&mut self) {
        let composing = self.host.is_composing();
        self.dispatcher.on_mutation(Instant::now(), composing);
        trace!(composing, "document changed");
    }

    fn on_timer(&mut self) {
        match self
            .dispatcher
            .on_timer(Instant::now(), self.host.is_composing())
        {
            TimerOutcome::Fire => {
                self.dispatch();
                self.dispatcher.finish_dispatch();
            }
            outcome => trace!(?outcome, "debounce timer"),
        }
    }

    fn dispatch(&mut self) {
        let snapshot = self.host.snapshot();
        let (text, source) = self.linted_text(&snapshot);

        if self.settings.lint.skip_blank && text.trim().is_empty() {
            debug!(version = ?snapshot.version(), "document is blank; clearing decorations");
            self.commit(DecorationSet::empty(snapshot.version()));
            return;
        }
        if self.settings.lint.skip_unchanged && self.reuse_previous(&snapshot, &text, source) {
            return;
        }

        let text: Arc<str> = Arc::from(text);
        let id = self.ledger.issue(RequestRecord {
            snapshot,
            text: Arc::clone(&text),
            source,
        });
        let request = LintRequest {
            id,
            text: text.to_string(),
            file_extension: self.settings.lint.file_extension.clone(),
        };
        match self.worker.send(WorkerRequest::Lint(request)) {
            Ok(()) => debug!(id, "lint request sent"),
            Err(err) => self.disable(err),
        }
    }

    /// The text to send for `snapshot` and which form it is.
    fn linted_text(&self, snapshot: &DocumentSnapshot) -> (String, TextSource) {
        if self.settings.lint.source == TextSource::Serialized {
            if let Some(text) = self.host.serialize(snapshot) {
                return (text, TextSource::Serialized);
            }
            debug!("host has no serialized form; linting plain text");
        }
        let map = PositionMap::build(snapshot, self.settings.lint.encoding);
        (map.into_text(), TextSource::Plain)
    }

    /// Avoid a worker round-trip when `text` is what was last sent.
    fn reuse_previous(
        &mut self,
        snapshot: &Arc<DocumentSnapshot>,
        text: &str,
        source: TextSource,
    ) -> bool {
        if let Some(record) = self.ledger.in_flight() {
            if record.source != source || &*record.text != text {
                return false;
            }
            self.ledger.rebase(Arc::clone(snapshot));
            debug!(id = self.ledger.latest(), "text unchanged; retargeting in-flight request");
            return true;
        }

        let Some(last) = &self.last else {
            return false;
        };
        if last.source != source || &*last.text != text {
            return false;
        }
        debug!(version = ?snapshot.version(), "text unchanged; reusing previous findings");
        let set = decorate(
            snapshot,
            &last.text,
            source,
            &last.findings,
            self.settings.decorate_options(),
        );
        self.commit(set);
        true
    }

    fn on_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Ack { metadata } => trace!(%metadata, "worker acknowledged request"),
            WorkerMessage::LintResult(response) => self.on_result(response),
        }
    }

    fn on_result(&mut self, response: LintResponse) {
        let record = match self.ledger.accept(response.id) {
            Ok(record) => record,
            Err(err) => {
                debug!(%err, "discarding lint result");
                return;
            }
        };

        let findings: Vec<Finding> = response
            .result
            .messages
            .into_iter()
            .map(Finding::from)
            .collect();
        let current = self.host.snapshot().version();
        let requested = record.snapshot.version();

        if current != requested {
            debug!(
                id = response.id,
                ?requested,
                ?current,
                "document changed while linting; discarding result"
            );
        } else {
            let set = decorate(
                &record.snapshot,
                &record.text,
                record.source,
                &findings,
                self.settings.decorate_options(),
            );
            self.commit(set);
        }

        self.last = Some(LastLint {
            text: record.text,
            source: record.source,
            findings,
        });
    }

    fn commit(&self, set: DecorationSet) {
        let version = set.version();
        let count = set.len();
        match apply(&*self.host, set) {
            Ok(()) => debug!(?version, count, "decorations applied"),
            Err(err) => warn!(%err, "decorations rejected"),
        }
    }

    fn disable(&mut self, err: LintError) {
        if !self.dispatcher.is_disabled() {
            warn!(%err, "linting disabled");
        }
        self.dispatcher.disable();
    }

    fn publish(&self) {
        let state = self.dispatcher.state();
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}

/// Sleep until `deadline`, or forever when there is none.
fn wait_until(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
