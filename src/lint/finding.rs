//! Findings reported by the lint engine.

use std::ops::Range;

use crate::document::LineIndex;
use crate::error::LintError;

use super::protocol::{LintMessage, Loc};

/// Severity of a finding, as reported by textlint-style engines
/// (`1` warning, `2` error, anything else informational).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn from_level(level: i64) -> Self {
        match level {
            2 => Severity::Error,
            1 => Severity::Warning,
            _ => Severity::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// One lint result item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub rule_id: String,
    pub message: String,
    pub severity: Severity,
    /// Half-open flat range in the linted text; authoritative when present.
    pub range: Option<(i64, i64)>,
    /// 1-based line and column, the fallback locator.
    pub line: u32,
    pub column: u32,
    pub loc: Option<Loc>,
}

impl Finding {
    pub fn new(rule_id: impl Into<String>, message: impl Into<String>, range: Range<i64>) -> Self {
        Self {
            rule_id: rule_id.into(),
            message: message.into(),
            severity: Severity::Error,
            range: Some((range.start, range.end)),
            line: 0,
            column: 0,
            loc: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Validated flat range in the units of `index`.
    ///
    /// Uses `range` when present, otherwise `loc`, otherwise `line`/`column`.
    pub fn flat_range(&self, index: &LineIndex) -> Result<Range<usize>, LintError> {
        let (start, end) = match self.range {
            Some(range) => range,
            None => self.locate(index).ok_or_else(|| self.malformed(-1, -1, index))?,
        };

        let len = index.len();
        if start < 0 || end < start || end as u64 > len as u64 {
            return Err(self.malformed(start, end, index));
        }

        Ok(start as usize..end as usize)
    }

    fn locate(&self, index: &LineIndex) -> Option<(i64, i64)> {
        if let Some(loc) = self.loc {
            let start = index.position_to_offset(loc.start.line.checked_sub(1)?, loc.start.column)?;
            let end = index.position_to_offset(loc.end.line.checked_sub(1)?, loc.end.column)?;
            return Some((start as i64, end.max(start) as i64));
        }

        let start =
            index.position_to_offset(self.line.checked_sub(1)?, self.column.checked_sub(1)?)?;
        let end = (start + 1).min(index.len()).max(start);
        Some((start as i64, end as i64))
    }

    fn malformed(&self, start: i64, end: i64, index: &LineIndex) -> LintError {
        LintError::MalformedFinding {
            rule_id: self.rule_id.clone(),
            start,
            end,
            len: index.len(),
        }
    }
}

impl From<LintMessage> for Finding {
    fn from(message: LintMessage) -> Self {
        Self {
            rule_id: message.rule_id,
            message: message.message,
            severity: Severity::from_level(message.severity),
            range: message.range.map(|[start, end]| (start, end)),
            line: message.line,
            column: message.column,
            loc: message.loc,
        }
    }
}
