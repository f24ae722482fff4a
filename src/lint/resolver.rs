//! Resolution of flat offsets into structured positions.
//!
//! Resolution never fails. When an exact answer is impossible it returns a
//! best-effort position and says so through [`Confidence`]:
//!
//! - `Exact`: the offset is a key of the [`PositionMap`].
//! - `Interpolated`: the offset falls inside a multi-unit character and was
//!   interpolated between the bracketing entries.
//! - `Approximate`: the linted text was a serialized form (e.g. markdown) and
//!   the offset was aligned through normalized prefixes. This is lossy: inline
//!   markup characters cannot be told apart from content, so a prefix that
//!   contains markup never matches and the offset falls back to clamping.
//! - `Clamped`: the offset was outside the map, or no alignment was found.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::document::{MapEntry, PositionMap, StructuredPosition};
use crate::error::LintError;

/// Which text was sent to the lint engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextSource {
    /// The plain projection the position map is built from.
    #[default]
    Plain,
    /// The host's serialized form (markdown and the like).
    Serialized,
}

/// How trustworthy a resolved position is. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    Exact,
    Interpolated,
    Approximate,
    Clamped,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Exact => "exact",
            Confidence::Interpolated => "interpolated",
            Confidence::Approximate => "approximate",
            Confidence::Clamped => "clamped",
        }
    }
}

/// A resolved position together with its offset in the plain projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub position: StructuredPosition,
    pub flat: usize,
    pub confidence: Confidence,
}

impl Resolution {
    fn degrade(mut self, confidence: Confidence) -> Self {
        self.confidence = self.confidence.max(confidence);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: Resolution,
    pub end: Resolution,
}

impl ResolvedRange {
    /// Worst confidence of the two ends.
    pub fn confidence(&self) -> Confidence {
        self.start.confidence.max(self.end.confidence)
    }

    /// Range in the plain projection.
    pub fn flat(&self) -> Range<usize> {
        self.start.flat..self.end.flat
    }
}

/// Which neighbour wins when an offset sits on a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Affinity {
    /// Position of the character starting at the offset.
    Forward,
    /// Position just after the character ending at the offset.
    Backward,
}

/// Resolve a flat offset to the position of the character that starts there.
///
/// Offsets before the start clamp to the first entry; offsets past the end
/// clamp to the position one past the last entry.
pub fn resolve(map: &PositionMap, target: i64) -> Resolution {
    match usize::try_from(target) {
        Ok(target) => locate(map, target, Affinity::Forward),
        Err(_) => clamp_start(map),
    }
}

/// Resolve a flat offset used as the exclusive end of a range.
///
/// Unlike [`resolve`], an end that coincides with a block boundary stays at
/// the end of the preceding content instead of moving into the next block.
pub fn resolve_end(map: &PositionMap, target: i64) -> Resolution {
    match usize::try_from(target) {
        Ok(target) => locate(map, target, Affinity::Backward),
        Err(_) => clamp_start(map),
    }
}

/// Resolve a validated range of `linted`, the text the lint engine saw.
pub fn resolve_range(
    map: &PositionMap,
    linted: &str,
    source: TextSource,
    range: Range<usize>,
) -> ResolvedRange {
    let direct = source == TextSource::Plain || linted == map.text();

    let start = if direct {
        locate(map, range.start, Affinity::Forward)
    } else {
        locate_serialized(map, linted, range.start, Affinity::Forward)
    };

    if range.is_empty() {
        return ResolvedRange { start, end: start };
    }

    let mut end = if direct {
        locate(map, range.end, Affinity::Backward)
    } else {
        locate_serialized(map, linted, range.end, Affinity::Backward)
    };
    if end.flat < start.flat {
        end = Resolution {
            confidence: end.confidence.max(start.confidence),
            ..start
        };
    }

    ResolvedRange { start, end }
}

fn clamp_start(map: &PositionMap) -> Resolution {
    let position = map.entries().first().map_or(map.end(), |entry| entry.pos);
    Resolution {
        position,
        flat: 0,
        confidence: Confidence::Clamped,
    }
}

fn locate(map: &PositionMap, target: usize, affinity: Affinity) -> Resolution {
    let entries = map.entries();
    let len = map.len();

    if target >= len {
        return Resolution {
            position: map.end(),
            flat: len,
            confidence: if target == len {
                Confidence::Exact
            } else {
                Confidence::Clamped
            },
        };
    }

    match affinity {
        Affinity::Forward => match map.search(target) {
            Ok(i) => Resolution {
                position: entries[i].pos,
                flat: target,
                confidence: Confidence::Exact,
            },
            // entries[0].flat == 0 <= target, so i >= 1
            Err(i) => interpolate(map, i - 1, target),
        },
        Affinity::Backward => {
            if target == 0 {
                return Resolution {
                    position: entries[0].pos,
                    flat: 0,
                    confidence: Confidence::Exact,
                };
            }
            let i = match map.search(target - 1) {
                Ok(i) => i,
                Err(i) => i - 1,
            };
            let entry = &entries[i];
            if entry.end() == target {
                Resolution {
                    position: entry.after(),
                    flat: target,
                    confidence: Confidence::Exact,
                }
            } else {
                interpolate(map, i, target)
            }
        }
    }
}

/// Interpolate between `entries[i]` and the entry (or end) after it.
///
/// Within one node the structured offset is scaled linearly and rounded to
/// the nearest integer, ties going to the earlier entry. Across nodes the
/// nearer entry wins, ties again going to the earlier one.
fn interpolate(map: &PositionMap, i: usize, target: usize) -> Resolution {
    let before: &MapEntry = &map.entries()[i];
    let (next_flat, next_pos) = map
        .entries()
        .get(i + 1)
        .map_or((map.len(), map.end()), |entry| (entry.flat, entry.pos));

    let step = target - before.flat;
    let span = next_flat - before.flat;

    let position = if before.pos.node == next_pos.node && next_pos.offset >= before.pos.offset {
        let delta = next_pos.offset - before.pos.offset;
        StructuredPosition::new(
            before.pos.node,
            before.pos.offset + round_half_down(step * delta, span),
        )
    } else if step <= span - step {
        before.pos
    } else {
        next_pos
    };

    Resolution {
        position,
        flat: target,
        confidence: Confidence::Interpolated,
    }
}

/// `num / den` rounded to nearest, exact halves rounding down.
fn round_half_down(num: usize, den: usize) -> usize {
    (2 * num + den - 1) / (2 * den)
}

static NEWLINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").unwrap());

/// Collapse runs of newlines and trim newlines at both edges.
pub fn normalize(text: &str) -> String {
    NEWLINE_RUNS
        .replace_all(text, "\n")
        .trim_matches('\n')
        .to_string()
}

/// Length of the shortest plain prefix whose normalized form is `normalized`.
///
/// Single pass over the map: plain characters are appended to a virtual
/// normalized buffer and compared against `normalized` as they are committed.
pub fn matching_prefix(map: &PositionMap, normalized: &str) -> Option<usize> {
    let mut expected = normalized.chars().peekable();
    if expected.peek().is_none() {
        return Some(0);
    }

    let mut started = false;
    let mut pending_newline = false;
    for entry in map.entries() {
        if entry.ch == '\n' {
            pending_newline = started;
            continue;
        }
        if pending_newline {
            if expected.next() != Some('\n') {
                return None;
            }
            pending_newline = false;
        }
        if expected.next() != Some(entry.ch) {
            return None;
        }
        started = true;
        if expected.peek().is_none() {
            return Some(entry.end());
        }
    }

    None
}

fn locate_serialized(
    map: &PositionMap,
    serialized: &str,
    target: usize,
    affinity: Affinity,
) -> Resolution {
    let prefix = map
        .encoding()
        .byte_index(serialized, target)
        .map(|byte| &serialized[..byte]);

    let aligned = prefix.and_then(|prefix| {
        let plain = matching_prefix(map, &normalize(prefix))?;
        // A start after a line break belongs to the next line's content.
        let plain = if affinity == Affinity::Forward && prefix.ends_with('\n') {
            skip_newlines(map, plain)
        } else {
            plain
        };
        Some(plain)
    });

    match aligned {
        Some(plain) => locate(map, plain, affinity).degrade(Confidence::Approximate),
        None => {
            debug!(
                error = %LintError::UnresolvableOffset { offset: target },
                "serialized offset has no plain counterpart; clamping"
            );
            locate(map, target.min(map.len()), affinity).degrade(Confidence::Clamped)
        }
    }
}

fn skip_newlines(map: &PositionMap, mut flat: usize) -> usize {
    while let Ok(i) = map.search(flat) {
        let entry = &map.entries()[i];
        if entry.ch != '\n' {
            break;
        }
        flat = entry.end();
    }
    flat
}
