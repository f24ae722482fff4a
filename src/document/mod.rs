//! Structured document model and text utilities.
//!
//! This module provides:
//! - `DocumentSnapshot` and `Node`, the read-only tree view hosts hand over
//! - `PositionMap`, the flat offset <-> structured position index
//! - `LineIndex` and `OffsetEncoding` for line/column and unit conversion

mod index;
mod text;
mod tree;

pub use index::{EntryKind, MapEntry, PositionMap};
pub use text::{LineIndex, OffsetEncoding};
pub use tree::{DocumentSnapshot, Node, NodeId, NodeKind, SnapshotVersion, StructuredPosition};
