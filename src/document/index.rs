//! Offset index between the flat text projection and structured positions.
//!
//! A [`PositionMap`] is the product of one depth-first walk over one
//! [`DocumentSnapshot`]. It records, for every unit of flat text the lint
//! engine sees, which structured position produced it. Maps are cheap to
//! rebuild and are never reused across snapshots.

use std::collections::HashMap;

use super::text::OffsetEncoding;
use super::tree::{DocumentSnapshot, Node, NodeId, NodeKind, SnapshotVersion, StructuredPosition};

/// Where a flat character came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A character of a text leaf.
    Char,
    /// A newline synthesized at a block boundary, or for an empty block.
    Separator,
    /// The placeholder character of an inline node.
    Placeholder,
}

/// One character of the flat projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    /// Flat offset of the character's first unit.
    pub flat: usize,
    /// Units the character occupies.
    pub width: usize,
    pub ch: char,
    pub pos: StructuredPosition,
    pub kind: EntryKind,
}

impl MapEntry {
    /// Flat offset one past this character.
    pub fn end(&self) -> usize {
        self.flat + self.width
    }

    /// Structured position immediately after this character.
    ///
    /// Separators have no extent of their own, so the position after one is
    /// the block start it already points to.
    pub fn after(&self) -> StructuredPosition {
        match self.kind {
            EntryKind::Char => StructuredPosition::new(self.pos.node, self.pos.offset + self.width),
            EntryKind::Separator => self.pos,
            EntryKind::Placeholder => StructuredPosition::new(self.pos.node, 1),
        }
    }
}

/// Ordered flat-offset → structured-position pairs for one snapshot.
#[derive(Debug, Clone)]
pub struct PositionMap {
    version: SnapshotVersion,
    encoding: OffsetEncoding,
    entries: Vec<MapEntry>,
    text: String,
    len: usize,
    /// Largest valid offset per node.
    extents: HashMap<NodeId, usize>,
    end: StructuredPosition,
}

impl PositionMap {
    /// Walk `snapshot` in document order and record every flat character.
    pub fn build(snapshot: &DocumentSnapshot, encoding: OffsetEncoding) -> Self {
        let mut builder = Builder {
            encoding,
            entries: Vec::new(),
            text: String::new(),
            len: 0,
            extents: HashMap::new(),
        };
        builder.visit(snapshot.root());

        let end = builder
            .entries
            .last()
            .map(MapEntry::after)
            .unwrap_or(StructuredPosition::new(snapshot.root().id, 0));

        Self {
            version: snapshot.version(),
            encoding,
            entries: builder.entries,
            text: builder.text,
            len: builder.len,
            extents: builder.extents,
            end,
        }
    }

    /// Snapshot this map was built from.
    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    pub fn encoding(&self) -> OffsetEncoding {
        self.encoding
    }

    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    /// The flat projection.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Length of the flat projection in units.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position one past the last mapped character.
    pub fn end(&self) -> StructuredPosition {
        self.end
    }

    /// Index of the entry starting exactly at `flat`, or the insertion point.
    pub fn search(&self, flat: usize) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&flat, |entry| entry.flat)
    }

    /// Exact lookup of the position recorded for `flat`.
    pub fn position_of(&self, flat: usize) -> Option<StructuredPosition> {
        self.search(flat).ok().map(|i| self.entries[i].pos)
    }

    /// Largest valid offset inside `node`, if the node was visited.
    pub fn extent(&self, node: NodeId) -> Option<usize> {
        self.extents.get(&node).copied()
    }

    /// Whether `pos` addresses a valid location in the snapshot.
    pub fn contains(&self, pos: StructuredPosition) -> bool {
        self.extent(pos.node).is_some_and(|extent| pos.offset <= extent)
    }
}

struct Builder {
    encoding: OffsetEncoding,
    entries: Vec<MapEntry>,
    text: String,
    len: usize,
    extents: HashMap<NodeId, usize>,
}

impl Builder {
    fn push(&mut self, ch: char, pos: StructuredPosition, kind: EntryKind) {
        let width = self.encoding.width(ch);
        self.entries.push(MapEntry {
            flat: self.len,
            width,
            ch,
            pos,
            kind,
        });
        self.text.push(ch);
        self.len += width;
    }

    fn visit(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Text(text) => {
                self.extents.insert(node.id, self.encoding.len(text));
                let mut offset = 0;
                for ch in text.chars() {
                    self.push(ch, StructuredPosition::new(node.id, offset), EntryKind::Char);
                    offset += self.encoding.width(ch);
                }
            }
            NodeKind::Container {
                block, children, ..
            } => {
                self.extents.insert(node.id, children.len());
                let start = StructuredPosition::new(node.id, 0);

                if *block && !self.text.is_empty() && !self.text.ends_with('\n') {
                    self.push('\n', start, EntryKind::Separator);
                }

                let before = self.entries.len();
                for child in children {
                    self.visit(child);
                }

                // An empty block is still one line of flat text.
                if *block && self.entries.len() == before {
                    self.push('\n', start, EntryKind::Separator);
                }
            }
            NodeKind::Inline { placeholder, .. } => {
                self.extents
                    .insert(node.id, usize::from(placeholder.is_some()));
                if let Some(ch) = placeholder {
                    self.push(*ch, StructuredPosition::new(node.id, 0), EntryKind::Placeholder);
                }
            }
        }
    }
}
