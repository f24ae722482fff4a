//! Lint decorations for tree-shaped rich-text documents.
//!
//! Lint engines work on flat text and report character ranges; rich-text
//! editors address content by positions inside a node tree. This crate
//! bridges the two: it flattens a [`DocumentSnapshot`] into a
//! [`PositionMap`], resolves reported ranges back to structured positions,
//! and drives the debounced "edit, lint, decorate" loop against any host
//! implementing [`DocumentHost`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tower_lsp::lsp_types::Url;
use tracing::debug;

mod document;
mod error;
pub mod host;
pub mod lint;
mod lsp;
pub mod settings;

pub use document::{
    DocumentSnapshot, EntryKind, LineIndex, MapEntry, Node, NodeId, NodeKind, OffsetEncoding,
    PositionMap, SnapshotVersion, StructuredPosition,
};
pub use error::{HostError, LintError};
pub use host::{DocumentHost, MemoryHost};
pub use lint::{
    apply, decorate, resolve, resolve_end, resolve_range, Confidence, DecorateOptions, Decoration,
    DecorationSet, DispatchState, Finding, LintSession, OverlapPolicy, Resolution, ResolvedRange,
    SessionHandle, Severity, TextSource, WorkerChannel, WorkerEndpoint,
};
pub use lsp::to_diagnostics;
pub use settings::{discover_settings, load_settings, Settings};

/// One lint session per open document.
///
/// A host with several editor instances registers each under its document
/// URI; opening a URI that already has a session replaces and stops the old
/// one.
pub struct LintService {
    sessions: DashMap<Url, SessionHandle>,
    settings: Settings,
    settings_dir: Option<PathBuf>,
}

impl LintService {
    pub fn new(settings: Settings) -> Self {
        Self {
            sessions: DashMap::new(),
            settings,
            settings_dir: None,
        }
    }

    /// Create a service configured from the nearest `lintmark.toml`.
    pub fn discover(start_dir: &Path) -> Self {
        let (settings, settings_dir) = discover_settings(start_dir);
        Self {
            settings_dir: Some(settings_dir),
            ..Self::new(settings)
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Directory the settings were discovered in, if any.
    pub fn settings_dir(&self) -> Option<&Path> {
        self.settings_dir.as_deref()
    }

    /// Start linting `host` under `uri`. Must be called within a tokio
    /// runtime.
    pub fn open<H: DocumentHost>(
        &self,
        uri: Url,
        host: Arc<H>,
        worker: WorkerChannel,
    ) -> SessionHandle {
        let handle = LintSession::spawn(host, worker, self.settings.clone());
        if let Some(previous) = self.sessions.insert(uri.clone(), handle.clone()) {
            debug!(%uri, "replacing lint session");
            previous.shutdown();
        }
        handle
    }

    pub fn get(&self, uri: &Url) -> Option<SessionHandle> {
        self.sessions.get(uri).map(|entry| entry.value().clone())
    }

    /// Stop and forget the session for `uri`.
    pub fn close(&self, uri: &Url) {
        if let Some((_, handle)) = self.sessions.remove(uri) {
            handle.shutdown();
        }
    }

    pub fn shutdown_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().shutdown();
        }
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
