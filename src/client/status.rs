//! Task-status normalisation.
//!
//! The processing surface reports task state as a free-form string and the
//! vocabulary is not documented exhaustively: `COMPLETED`, `success` and
//! `done` have all been seen for the same outcome. [`StatusVocabulary`]
//! keeps the mapping as data so new synonyms are one `with_*` call away.

use super::DocumentHandle;
use std::collections::HashMap;

/// Normalised state of an asynchronous task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// A word the vocabulary does not know. Treated as still in progress.
    Unknown,
}

impl TaskStatus {
    /// `Succeeded` and `Failed` are final; everything else keeps polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

/// Mapping from raw status words to [`TaskStatus`].
///
/// Lookup is case-insensitive, ignores surrounding whitespace and treats
/// `-`, `_` and spaces alike, so `In-Progress`, `IN_PROGRESS` and
/// `in progress` are one entry.
#[derive(Debug, Clone)]
pub struct StatusVocabulary {
    words: HashMap<String, TaskStatus>,
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        let mut vocab = Self {
            words: HashMap::new(),
        };
        for word in ["success", "succeeded", "completed", "complete", "done"] {
            vocab.insert(word, TaskStatus::Succeeded);
        }
        for word in ["failed", "failure", "error"] {
            vocab.insert(word, TaskStatus::Failed);
        }
        for word in ["running", "processing", "in_progress"] {
            vocab.insert(word, TaskStatus::Running);
        }
        for word in ["pending", "queued", "submitted", "not_started"] {
            vocab.insert(word, TaskStatus::Pending);
        }
        vocab
    }
}

impl StatusVocabulary {
    /// Add (or remap) a synonym.
    pub fn with_word(mut self, word: &str, status: TaskStatus) -> Self {
        self.insert(word, status);
        self
    }

    fn insert(&mut self, word: &str, status: TaskStatus) {
        self.words.insert(canonical(word), status);
    }

    /// Normalise a raw status word.
    pub fn classify(&self, raw: &str) -> TaskStatus {
        self.words
            .get(&canonical(raw))
            .copied()
            .unwrap_or(TaskStatus::Unknown)
    }
}

fn canonical(word: &str) -> String {
    word.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// One answer from the task-status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub status: TaskStatus,
    /// Raw status word as the service sent it.
    pub raw_status: String,
    /// Present whenever `status` is `Succeeded`.
    pub result: Option<DocumentHandle>,
    /// Service-provided explanation, mostly on failure.
    pub detail: Option<String>,
}
