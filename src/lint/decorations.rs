//! Decoration sets built from resolved findings.
//!
//! A [`DecorationSet`] is always computed against one snapshot and replaces
//! the host's previous set wholesale; sets are never patched incrementally.

use std::ops::Range;

use serde::Deserialize;
use tracing::warn;

use crate::document::{
    DocumentSnapshot, LineIndex, OffsetEncoding, PositionMap, SnapshotVersion, StructuredPosition,
};
use crate::error::LintError;
use crate::host::DocumentHost;

use super::finding::{Finding, Severity};
use super::resolver::{resolve, resolve_end, resolve_range, Confidence, ResolvedRange, TextSource};

/// What to do with findings whose ranges overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Every finding gets its own marker.
    #[default]
    Allow,
    /// For hosts that cannot overlap markers: the later finding in iteration
    /// order owns the overlapping span.
    LaterWins,
}

/// One visual marker with its tooltip metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub start: StructuredPosition,
    pub end: StructuredPosition,
    /// Range in the plain projection of the snapshot.
    pub flat: Range<usize>,
    pub rule_id: String,
    pub message: String,
    pub severity: Severity,
    pub confidence: Confidence,
}

impl Decoration {
    /// Remove `other` from this marker, leaving zero, one or two pieces.
    /// An empty `other` covers no characters and removes nothing.
    fn subtract(self, other: &Range<usize>, map: &PositionMap) -> Vec<Decoration> {
        if other.is_empty() {
            return vec![self];
        }
        let overlaps = other.start < self.flat.end && self.flat.start < other.end;
        let engulfed_point =
            self.flat.is_empty() && other.start < self.flat.start && self.flat.start < other.end;
        if !overlaps && !engulfed_point {
            return vec![self];
        }

        let mut pieces = Vec::with_capacity(2);
        if self.flat.start < other.start {
            pieces.push(self.piece(self.flat.start..other.start, map));
        }
        if other.end < self.flat.end {
            pieces.push(self.piece(other.end..self.flat.end, map));
        }
        pieces
    }

    fn piece(&self, flat: Range<usize>, map: &PositionMap) -> Decoration {
        let start = if flat.start == self.flat.start {
            self.start
        } else {
            resolve(map, flat.start as i64).position
        };
        let end = if flat.end == self.flat.end {
            self.end
        } else {
            resolve_end(map, flat.end as i64).position
        };
        Decoration {
            start,
            end,
            flat,
            ..self.clone()
        }
    }
}

/// A finding paired with its resolved range.
#[derive(Debug, Clone)]
pub struct ResolvedFinding<'a> {
    pub finding: &'a Finding,
    pub range: ResolvedRange,
}

/// The complete marker set for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationSet {
    version: SnapshotVersion,
    decorations: Vec<Decoration>,
}

impl DecorationSet {
    pub fn empty(version: SnapshotVersion) -> Self {
        Self {
            version,
            decorations: Vec::new(),
        }
    }

    /// Build a set from resolved findings against `map`'s snapshot.
    ///
    /// Markers whose endpoints fall outside the snapshot's address space are
    /// dropped.
    pub fn build(
        map: &PositionMap,
        resolved: Vec<ResolvedFinding<'_>>,
        policy: OverlapPolicy,
    ) -> Self {
        let candidates = resolved.into_iter().filter_map(|item| {
            let decoration = Decoration {
                start: item.range.start.position,
                end: item.range.end.position,
                flat: item.range.flat(),
                rule_id: item.finding.rule_id.clone(),
                message: item.finding.message.clone(),
                severity: item.finding.severity,
                confidence: item.range.confidence(),
            };
            if map.contains(decoration.start) && map.contains(decoration.end) {
                Some(decoration)
            } else {
                warn!(
                    rule_id = %decoration.rule_id,
                    start = ?decoration.start,
                    end = ?decoration.end,
                    "dropping decoration outside the document"
                );
                None
            }
        });

        let decorations = match policy {
            OverlapPolicy::Allow => candidates.collect(),
            OverlapPolicy::LaterWins => {
                let mut kept: Vec<Decoration> = Vec::new();
                for decoration in candidates {
                    let mut next = Vec::with_capacity(kept.len() + 1);
                    for earlier in kept {
                        next.extend(earlier.subtract(&decoration.flat, map));
                    }
                    next.push(decoration);
                    kept = next;
                }
                kept.sort_by_key(|d| (d.flat.start, d.flat.end));
                kept
            }
        };

        Self {
            version: map.version(),
            decorations,
        }
    }

    /// Snapshot the set was computed against.
    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter()
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }
}

/// Options for [`decorate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecorateOptions {
    pub encoding: OffsetEncoding,
    pub overlap: OverlapPolicy,
}

/// Resolve `findings` reported on `linted` into a decoration set for
/// `snapshot`.
///
/// Malformed findings are logged and skipped; the rest are still decorated.
pub fn decorate(
    snapshot: &DocumentSnapshot,
    linted: &str,
    source: TextSource,
    findings: &[Finding],
    options: DecorateOptions,
) -> DecorationSet {
    let map = PositionMap::build(snapshot, options.encoding);
    let index = LineIndex::new(linted.to_string(), options.encoding);

    let resolved = findings
        .iter()
        .filter_map(|finding| match finding.flat_range(&index) {
            Ok(range) => Some(ResolvedFinding {
                finding,
                range: resolve_range(&map, linted, source, range),
            }),
            Err(err) => {
                warn!(%err, "skipping finding");
                None
            }
        })
        .collect();

    DecorationSet::build(&map, resolved, options.overlap)
}

/// Replace the host's markers with `set` in one transaction.
pub fn apply<H: DocumentHost + ?Sized>(host: &H, set: DecorationSet) -> Result<(), LintError> {
    host.replace_decorations(set)?;
    Ok(())
}
