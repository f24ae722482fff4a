//! Wire format exchanged with the lint worker.
//!
//! Messages are JSON objects discriminated by `command`. Every request carries
//! an `id` the worker echoes back in its result, which is how stale results
//! are recognized.

use serde::{Deserialize, Serialize};

use crate::error::LintError;

/// A request to lint one version of the document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintRequest {
    pub id: u64,
    pub text: String,
    pub file_extension: String,
}

/// Messages sent to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum WorkerRequest {
    #[serde(rename = "lint")]
    Lint(LintRequest),
}

impl WorkerRequest {
    pub fn to_json(&self) -> Result<String, LintError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Messages received from the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum WorkerMessage {
    /// Acknowledgement of a request; carries no findings.
    #[serde(rename = "lint")]
    Ack {
        #[serde(default)]
        metadata: serde_json::Value,
    },
    #[serde(rename = "lint:result")]
    LintResult(LintResponse),
}

impl WorkerMessage {
    pub fn from_json(json: &str) -> Result<Self, LintError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintResponse {
    /// The `id` of the request this result answers.
    pub id: u64,
    pub result: LintResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintResult {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub messages: Vec<LintMessage>,
}

/// One finding as reported by the lint engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintMessage {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub rule_id: String,
    pub message: String,
    #[serde(default)]
    pub severity: i64,
    /// 1-based line.
    #[serde(default)]
    pub line: u32,
    /// 1-based column.
    #[serde(default)]
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    /// Half-open flat range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<[i64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Loc>,
}

/// Start/end locator; lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loc {
    pub start: LineColumn,
    pub end: LineColumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineColumn {
    pub line: u32,
    pub column: u32,
}
