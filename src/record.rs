//! Record shapes accepted in a corpus.
//!
//! A corpus line is either a canonical question/answer pair or a legacy
//! conversation made of role-tagged turns. [`decode_line`] is the single
//! place where the shape of a line is decided.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A question/answer pair in the target shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
}

impl QaRecord {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Both fields carry text.
    pub fn is_complete(&self) -> bool {
        !self.question.is_empty() && !self.answer.is_empty()
    }

    /// Serialize as one compact JSON line (without the trailing newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One turn of a conversation record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl Turn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Legacy multi-turn record: `{"messages": [{"role": ..., "content": ...}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Turn>,
}

impl Conversation {
    /// Derive a canonical record from the last user turn and the last
    /// assistant turn. A later matching turn always replaces an earlier one,
    /// even when its content is empty.
    ///
    /// Returns `None` when either side ends up empty.
    pub fn to_record(&self) -> Option<QaRecord> {
        let mut question = "";
        let mut answer = "";

        for turn in &self.messages {
            match turn.role.as_str() {
                "user" => question = turn.content.as_str(),
                "assistant" => answer = turn.content.as_str(),
                _ => {}
            }
        }

        let record = QaRecord::new(question, answer);
        record.is_complete().then_some(record)
    }
}

/// Result of the shape decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Canonical(QaRecord),
    Conversation(Conversation),
}

/// Why a line produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineIssue {
    /// The line is not valid JSON.
    InvalidJson(String),
    /// The shape was recognized but a question or answer is empty or not text.
    MissingField,
    /// Neither the canonical nor the conversation shape.
    UnrecognizedShape,
}

impl fmt::Display for LineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineIssue::InvalidJson(e) => write!(f, "invalid JSON: {}", e),
            LineIssue::MissingField => write!(f, "missing question or answer"),
            LineIssue::UnrecognizedShape => write!(f, "unrecognized record shape"),
        }
    }
}

/// Decode one line.
///
/// An object with a `messages` key is a conversation; otherwise an object
/// with both `question` and `answer` keys is canonical. Anything else is
/// [`LineIssue::UnrecognizedShape`].
pub fn decode_line(line: &str) -> Result<Decoded, LineIssue> {
    let value: Value =
        serde_json::from_str(line.trim()).map_err(|e| LineIssue::InvalidJson(e.to_string()))?;

    // Derived struct impls also accept JSON arrays; only objects count.
    let Some(object) = value.as_object() else {
        return Err(LineIssue::UnrecognizedShape);
    };

    if object.contains_key("messages") {
        return Conversation::deserialize(&value)
            .map(Decoded::Conversation)
            .map_err(|_| LineIssue::UnrecognizedShape);
    }

    if object.contains_key("question") && object.contains_key("answer") {
        // Both keys present but not both text.
        return QaRecord::deserialize(&value)
            .map(Decoded::Canonical)
            .map_err(|_| LineIssue::MissingField);
    }

    Err(LineIssue::UnrecognizedShape)
}

/// Decode a line all the way to a complete canonical record.
pub fn decode_record(line: &str) -> Result<QaRecord, LineIssue> {
    let record = match decode_line(line)? {
        Decoded::Canonical(record) => Some(record),
        Decoded::Conversation(conversation) => conversation.to_record(),
    };

    record
        .filter(QaRecord::is_complete)
        .ok_or(LineIssue::MissingField)
}
