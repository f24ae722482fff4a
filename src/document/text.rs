//! Text utilities for offset and position conversion.
//!
//! Lint engines running on JavaScript report offsets in UTF-16 code units,
//! while Rust strings are indexed by bytes. Every flat offset in this crate is
//! expressed in one [`OffsetEncoding`], chosen per session.

use serde::Deserialize;
use tower_lsp::lsp_types::Position;

/// Unit in which flat offsets and in-leaf offsets are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OffsetEncoding {
    /// UTF-16 code units (JavaScript string indices).
    #[default]
    Utf16,
    /// Unicode scalar values (Rust `char`s).
    #[serde(alias = "codepoint")]
    CodePoint,
}

impl OffsetEncoding {
    /// Number of units `c` occupies.
    pub fn width(self, c: char) -> usize {
        match self {
            OffsetEncoding::Utf16 => c.len_utf16(),
            OffsetEncoding::CodePoint => 1,
        }
    }

    /// Length of `text` in units.
    pub fn len(self, text: &str) -> usize {
        match self {
            OffsetEncoding::Utf16 => text.encode_utf16().count(),
            OffsetEncoding::CodePoint => text.chars().count(),
        }
    }

    /// Byte index of the unit `offset` in `text`.
    ///
    /// An offset inside a multi-unit character rounds down to the start of
    /// that character. Returns `None` past the end of `text`.
    pub fn byte_index(self, text: &str, offset: usize) -> Option<usize> {
        let mut units = 0;
        for (i, c) in text.char_indices() {
            let width = self.width(c);
            if units + width > offset {
                return Some(i);
            }
            units += width;
        }
        (units == offset).then_some(text.len())
    }
}

/// Pre-computed line index over the text that was sent to the lint engine.
///
/// Used to turn `line`/`column` locators into flat offsets when a finding has
/// no usable range, and to produce LSP positions (UTF-16 columns).
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset where each line starts.
    line_starts: Vec<usize>,
    source: String,
    encoding: OffsetEncoding,
}

impl LineIndex {
    /// Build a line index from source text.
    pub fn new(source: String, encoding: OffsetEncoding) -> Self {
        let mut line_starts = vec![0];

        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }

        Self {
            line_starts,
            source,
            encoding,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn encoding(&self) -> OffsetEncoding {
        self.encoding
    }

    /// Length of the source in units.
    pub fn len(&self) -> usize {
        self.encoding.len(&self.source)
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Byte index for a unit offset, clamped to the end of the source.
    fn byte_of(&self, offset: usize) -> usize {
        self.encoding
            .byte_index(&self.source, offset)
            .unwrap_or(self.source.len())
    }

    /// Convert a unit offset to an LSP position (UTF-16 column).
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let byte = self.byte_of(offset);
        let line = match self.line_starts.binary_search(&byte) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };

        let line_start = self.line_starts[line];
        let col: usize = self.source[line_start..byte]
            .chars()
            .map(char::len_utf16)
            .sum();

        Position::new(line as u32, col as u32)
    }

    /// Convert a zero-based line and a column counted in this index's units to
    /// a unit offset.
    ///
    /// Columns past the end of the line clamp to the line end. Returns `None`
    /// if the line does not exist.
    pub fn position_to_offset(&self, line: u32, column: u32) -> Option<usize> {
        let line = line as usize;
        let line_start = *self.line_starts.get(line)?;
        let line_end = self
            .line_starts
            .get(line + 1)
            .map(|&end| end.saturating_sub(1)) // Exclude newline
            .unwrap_or(self.source.len());

        let mut col = 0;
        let mut byte = line_end;
        for (i, c) in self.source[line_start..line_end].char_indices() {
            if col >= column as usize {
                byte = line_start + i;
                break;
            }
            col += self.encoding.width(c);
        }

        Some(self.encoding.len(&self.source[..byte]))
    }

    /// Convert a unit span to an LSP range.
    pub fn span_to_range(&self, span: &std::ops::Range<usize>) -> tower_lsp::lsp_types::Range {
        let start = self.offset_to_position(span.start);
        let end = self.offset_to_position(span.end);
        tower_lsp::lsp_types::Range::new(start, end)
    }
}
