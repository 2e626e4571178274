//! Conversation history and the call audit log.
//!
//! Both structures are append-only: entries are never reordered, replaced or
//! removed for the lifetime of a call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exchange unit in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered conversation history that drives assistant prompts.
#[derive(Debug, Clone, Default)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Owned copy handed to in-flight assistant work.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }
}

/// Lifecycle and transcript events recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallEvent {
    Init,
    Ready,
    Transcript,
    ToolSelected,
    CallEnded,
}

/// One audit log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLogEntry {
    /// RFC 3339 timestamp of when the entry was appended.
    pub timestamp: String,
    pub event: CallEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl CallLogEntry {
    pub fn new(event: CallEvent, meta: Option<Value>) -> Self {
        Self {
            timestamp: now_rfc3339(),
            event,
            meta,
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::UNIX_EPOCH.to_string())
}

/// Append-only audit trail of one call.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Vec<CallLogEntry>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: CallEvent, meta: Option<Value>) {
        self.entries.push(CallLogEntry::new(event, meta));
    }

    pub fn entries(&self) -> &[CallLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, event: CallEvent) -> usize {
        self.entries.iter().filter(|e| e.event == event).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_serialization_shape() {
        let entry = CallLogEntry::new(CallEvent::ToolSelected, Some(json!({"tool": "endCall"})));
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["event"], "TOOL_SELECTED");
        assert_eq!(value["meta"]["tool"], "endCall");
        assert!(OffsetDateTime::parse(value["timestamp"].as_str().unwrap(), &Rfc3339).is_ok());
    }

    #[test]
    fn test_entry_without_meta_omits_field() {
        let entry = CallLogEntry::new(CallEvent::Ready, None);
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("meta").is_none());
    }

    #[test]
    fn test_call_log_is_append_only_ordered() {
        let mut log = CallLog::new();
        log.append(CallEvent::Init, None);
        log.append(CallEvent::Ready, None);
        log.append(CallEvent::CallEnded, None);

        let events: Vec<CallEvent> = log.entries().iter().map(|e| e.event).collect();
        assert_eq!(
            events,
            vec![CallEvent::Init, CallEvent::Ready, CallEvent::CallEnded]
        );
        assert_eq!(log.count(CallEvent::CallEnded), 1);
    }

    #[test]
    fn test_turn_role_serialization() {
        let value = serde_json::to_value(Turn::user("hi")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));
    }
}
