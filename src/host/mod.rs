//! Capabilities the subsystem needs from a host editor.
//!
//! Each rich-text framework gets one adapter implementing [`DocumentHost`].
//! The host keeps exclusive ownership of its document: the session only reads
//! snapshots and proposes decoration replacements through
//! [`DocumentHost::replace_decorations`]. Change notification flows the other
//! way, by the host calling [`crate::SessionHandle::notify_change`] after each
//! committed mutation.

mod memory;

use std::sync::Arc;

use crate::document::DocumentSnapshot;
use crate::error::HostError;
use crate::lint::DecorationSet;

pub use memory::MemoryHost;

pub trait DocumentHost: Send + Sync + 'static {
    /// The current committed document.
    fn snapshot(&self) -> Arc<DocumentSnapshot>;

    /// A serialized textual form of `snapshot` (markdown and the like), if
    /// the host has one.
    fn serialize(&self, _snapshot: &DocumentSnapshot) -> Option<String> {
        None
    }

    /// Whether a composition (IME) session is in progress.
    fn is_composing(&self) -> bool;

    /// Atomically replace every active decoration with `set`.
    ///
    /// Implementations must reject a set whose version is not the current
    /// snapshot's.
    fn replace_decorations(&self, set: DecorationSet) -> Result<(), HostError>;
}
