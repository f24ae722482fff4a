//! LSP interop for hosts that edit a flat text document.
//!
//! This module provides conversion of lint findings into LSP diagnostics.

mod diagnostics;

pub use diagnostics::to_diagnostics;
