//! Read-only view of a host's tree-shaped rich-text document.
//!
//! Hosts build a [`DocumentSnapshot`] from their native model on every
//! committed mutation. The snapshot is immutable and shared behind an `Arc`,
//! so a lint request can keep the exact tree it was computed from.

/// Host-assigned identity of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Monotonic version the host bumps on every committed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SnapshotVersion(pub u64);

impl SnapshotVersion {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// An address inside the structured document.
///
/// The meaning of `offset` depends on the node it points into:
/// - text leaf: units inside the leaf's text
/// - container: child index (0 is immediately before the first content)
/// - inline node: 0 before the node, 1 after it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructuredPosition {
    pub node: NodeId,
    pub offset: usize,
}

impl StructuredPosition {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// What a node holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A text leaf.
    Text(String),
    /// An element with ordered children. `block` marks paragraph-like
    /// boundaries that the flat projection separates with a newline.
    Container {
        tag: String,
        block: bool,
        children: Vec<Node>,
    },
    /// A childless inline node such as a hard break or an image. It
    /// contributes `placeholder` to the flat text, or nothing when `None`.
    Inline {
        tag: String,
        placeholder: Option<char>,
    },
}

/// A node of the structured document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl Node {
    pub fn text(id: u64, text: impl Into<String>) -> Self {
        Self {
            id: NodeId(id),
            kind: NodeKind::Text(text.into()),
        }
    }

    /// A block container (paragraph, heading, list item, ...).
    pub fn block(id: u64, tag: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            id: NodeId(id),
            kind: NodeKind::Container {
                tag: tag.into(),
                block: true,
                children,
            },
        }
    }

    /// An inline container (strong, emphasis, link, ...). Also used for the
    /// document root.
    pub fn inline(id: u64, tag: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            id: NodeId(id),
            kind: NodeKind::Container {
                tag: tag.into(),
                block: false,
                children,
            },
        }
    }

    /// A hard line break inside a block.
    pub fn hard_break(id: u64) -> Self {
        Self {
            id: NodeId(id),
            kind: NodeKind::Inline {
                tag: "br".to_string(),
                placeholder: Some('\n'),
            },
        }
    }

    /// An embedded object that occupies one character of flat text.
    pub fn embed(id: u64, tag: impl Into<String>) -> Self {
        Self {
            id: NodeId(id),
            kind: NodeKind::Inline {
                tag: tag.into(),
                placeholder: Some('\u{FFFC}'),
            },
        }
    }

    /// An inline node that contributes no flat text.
    pub fn textless(id: u64, tag: impl Into<String>) -> Self {
        Self {
            id: NodeId(id),
            kind: NodeKind::Inline {
                tag: tag.into(),
                placeholder: None,
            },
        }
    }

    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Container { children, .. } => children,
            _ => &[],
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Container { tag, .. } | NodeKind::Inline { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Container { block: true, .. })
    }

    /// Depth-first search for a node by id.
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }
}

/// One immutable version of the host document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    version: SnapshotVersion,
    root: Node,
}

impl DocumentSnapshot {
    pub fn new(version: SnapshotVersion, root: Node) -> Self {
        Self { version, root }
    }

    /// Build a document of plain paragraphs, one text leaf each.
    ///
    /// Ids are assigned deterministically: the root is `0`, paragraph `i` is
    /// `2i + 1` and its text leaf is `2i + 2`. Empty strings produce empty
    /// paragraphs.
    pub fn paragraphs<S: AsRef<str>>(version: SnapshotVersion, paragraphs: &[S]) -> Self {
        let children = paragraphs
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let id = 2 * i as u64 + 1;
                let text = text.as_ref();
                let content = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![Node::text(id + 1, text)]
                };
                Node::block(id, "p", content)
            })
            .collect();
        Self::new(version, Node::inline(0, "doc", children))
    }

    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.root.find(id)
    }
}
