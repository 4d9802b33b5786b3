//! Ordered extraction rules for provider-specific response shapes.
//!
//! The same logical value turns up under different field names depending on
//! the provider and API revision: the generated PDF may be
//! `resultFileString`, `base64FileString` or `content`; a document id may
//! sit at the top level or inside a `data` envelope. Each candidate location
//! is an [`ExtractionRule`], a named JSON pointer. A rule set is applied in
//! priority order and the first rule yielding a non-empty value wins.

use serde_json::Value;

/// One candidate location for a value inside a JSON response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRule {
    /// Human-readable name used in logs and errors.
    pub name: &'static str,
    /// RFC 6901 pointer into the response body.
    pub pointer: &'static str,
}

impl ExtractionRule {
    pub const fn new(name: &'static str, pointer: &'static str) -> Self {
        Self { name, pointer }
    }

    /// The value at this rule's location, if it is a non-empty string or a
    /// number (rendered as a string).
    pub fn apply(&self, body: &Value) -> Option<String> {
        match body.pointer(self.pointer)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A match produced by [`first_match`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub rule: &'static str,
    pub value: String,
}

/// Apply `rules` in order and return the first hit.
pub fn first_match(rules: &[ExtractionRule], body: &Value) -> Option<Extracted> {
    rules.iter().find_map(|rule| {
        rule.apply(body).map(|value| Extracted {
            rule: rule.name,
            value,
        })
    })
}

/// Names of every rule, for "expected one of …" diagnostics.
pub fn describe(rules: &[ExtractionRule]) -> String {
    rules
        .iter()
        .map(|r| r.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Base64 PDF in a generation response.
pub const GENERATED_ARTIFACT: &[ExtractionRule] = &[
    ExtractionRule::new("resultFileString", "/resultFileString"),
    ExtractionRule::new("base64FileString", "/base64FileString"),
    ExtractionRule::new("fileContent", "/fileContent"),
    ExtractionRule::new("content", "/content"),
    ExtractionRule::new("data", "/data"),
];

/// Document id in an upload response.
pub const UPLOADED_DOCUMENT: &[ExtractionRule] = &[
    ExtractionRule::new("documentId", "/documentId"),
    ExtractionRule::new("id", "/id"),
    ExtractionRule::new("document.id", "/document/id"),
    ExtractionRule::new("data.documentId", "/data/documentId"),
];

/// Task id in a protect response.
pub const PROTECTION_TASK: &[ExtractionRule] = &[
    ExtractionRule::new("taskId", "/taskId"),
    ExtractionRule::new("id", "/id"),
    ExtractionRule::new("task.id", "/task/id"),
    ExtractionRule::new("data.taskId", "/data/taskId"),
];

/// Status word in a task-status response.
pub const TASK_STATUS: &[ExtractionRule] = &[
    ExtractionRule::new("status", "/status"),
    ExtractionRule::new("state", "/state"),
    ExtractionRule::new("task.status", "/task/status"),
];

/// Result document id in a finished task-status response.
pub const TASK_RESULT: &[ExtractionRule] = &[
    ExtractionRule::new("resultDocumentId", "/resultDocumentId"),
    ExtractionRule::new("result.documentId", "/result/documentId"),
    ExtractionRule::new("resultDocument.id", "/resultDocument/id"),
    ExtractionRule::new("documentId", "/documentId"),
];

/// Explanation attached to a failed task.
pub const TASK_FAILURE_DETAIL: &[ExtractionRule] = &[
    ExtractionRule::new("error.message", "/error/message"),
    ExtractionRule::new("message", "/message"),
    ExtractionRule::new("error", "/error"),
];
