//! Diagnostics conversion from lint findings to LSP diagnostics.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};
use tracing::debug;

use crate::document::LineIndex;
use crate::lint::{Finding, Severity};

fn severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Info => DiagnosticSeverity::INFORMATION,
    }
}

/// Convert findings reported on the text of `line_index` to LSP diagnostics.
///
/// Findings with malformed ranges are skipped.
pub fn to_diagnostics(findings: &[Finding], line_index: &LineIndex) -> Vec<Diagnostic> {
    findings
        .iter()
        .filter_map(|finding| {
            let span = match finding.flat_range(line_index) {
                Ok(span) => span,
                Err(err) => {
                    debug!(%err, "no diagnostic for finding");
                    return None;
                }
            };
            Some(Diagnostic {
                range: line_index.span_to_range(&span),
                severity: Some(severity(finding.severity)),
                code: Some(NumberOrString::String(finding.rule_id.clone())),
                code_description: None,
                source: Some("textlint".to_string()),
                message: finding.message.clone(),
                related_information: None,
                tags: None,
                data: None,
            })
        })
        .collect()
}
