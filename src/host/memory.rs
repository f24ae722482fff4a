//! In-memory host with a small markdown serializer.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::document::{DocumentSnapshot, Node, NodeKind, SnapshotVersion};
use crate::error::HostError;
use crate::lint::DecorationSet;

use super::DocumentHost;

#[derive(Debug)]
struct HostState {
    snapshot: Arc<DocumentSnapshot>,
    composing: bool,
    decorations: DecorationSet,
    commits: usize,
}

/// A host whose document lives in memory.
///
/// Edits replace the whole tree and bump the snapshot version. Decorations
/// are kept as last committed; this host does not map them through edits.
#[derive(Debug)]
pub struct MemoryHost {
    state: Mutex<HostState>,
}

impl MemoryHost {
    pub fn new(root: Node) -> Self {
        let version = SnapshotVersion(1);
        Self {
            state: Mutex::new(HostState {
                snapshot: Arc::new(DocumentSnapshot::new(version, root)),
                composing: false,
                decorations: DecorationSet::empty(version),
                commits: 0,
            }),
        }
    }

    /// A host holding plain paragraphs; see [`DocumentSnapshot::paragraphs`].
    pub fn with_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> Self {
        let snapshot = DocumentSnapshot::paragraphs(SnapshotVersion(1), paragraphs);
        Self::new(snapshot.root().clone())
    }

    /// Commit a new tree and return its version.
    pub fn edit(&self, root: Node) -> SnapshotVersion {
        let mut state = self.state.lock();
        let version = state.snapshot.version().next();
        state.snapshot = Arc::new(DocumentSnapshot::new(version, root));
        version
    }

    /// Commit new paragraphs and return the new version.
    pub fn edit_paragraphs<S: AsRef<str>>(&self, paragraphs: &[S]) -> SnapshotVersion {
        let snapshot = DocumentSnapshot::paragraphs(SnapshotVersion(0), paragraphs);
        self.edit(snapshot.root().clone())
    }

    pub fn set_composing(&self, composing: bool) {
        self.state.lock().composing = composing;
    }

    /// The active decoration set.
    pub fn decorations(&self) -> DecorationSet {
        self.state.lock().decorations.clone()
    }

    /// Number of accepted decoration replacements.
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }
}

impl DocumentHost for MemoryHost {
    fn snapshot(&self) -> Arc<DocumentSnapshot> {
        Arc::clone(&self.state.lock().snapshot)
    }

    fn serialize(&self, snapshot: &DocumentSnapshot) -> Option<String> {
        let mut writer = MarkdownWriter::default();
        writer.node(snapshot.root());
        Some(writer.out)
    }

    fn is_composing(&self) -> bool {
        self.state.lock().composing
    }

    fn replace_decorations(&self, set: DecorationSet) -> Result<(), HostError> {
        let mut state = self.state.lock();
        let current = state.snapshot.version();
        if set.version() != current {
            return Err(HostError::SnapshotMismatch {
                computed: set.version(),
                current,
            });
        }
        state.decorations = set;
        state.commits += 1;
        Ok(())
    }
}

#[derive(Default)]
struct MarkdownWriter {
    out: String,
    /// Nothing written since the current block opened.
    fresh: bool,
}

impl MarkdownWriter {
    fn node(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Text(text) => self.write(text),
            NodeKind::Inline { placeholder, .. } => {
                if let Some(ch) = placeholder {
                    self.write(ch.encode_utf8(&mut [0; 4]));
                }
            }
            NodeKind::Container {
                tag,
                block: true,
                children,
            } => {
                if !self.out.is_empty() && !self.fresh {
                    self.out.push_str("\n\n");
                }
                self.out.push_str(block_prefix(tag));
                self.fresh = true;
                for child in children {
                    self.node(child);
                }
            }
            NodeKind::Container {
                tag,
                block: false,
                children,
            } => {
                let mark = inline_mark(tag);
                self.write(mark);
                for child in children {
                    self.node(child);
                }
                self.write(mark);
            }
        }
    }

    fn write(&mut self, text: &str) {
        if !text.is_empty() {
            self.out.push_str(text);
            self.fresh = false;
        }
    }
}

fn block_prefix(tag: &str) -> &'static str {
    match tag {
        "h1" => "# ",
        "h2" => "## ",
        "h3" => "### ",
        "h4" => "#### ",
        "h5" => "##### ",
        "h6" => "###### ",
        "blockquote" => "> ",
        "li" => "- ",
        _ => "",
    }
}

fn inline_mark(tag: &str) -> &'static str {
    match tag {
        "strong" => "**",
        "em" => "*",
        "code" => "`",
        _ => "",
    }
}
