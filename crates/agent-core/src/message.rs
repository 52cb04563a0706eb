//! Conversation Messages
//!
//! Canonical message format shared by the decision loop and every provider
//! adapter. Providers translate to and from this shape; nothing outside
//! `agent-runtime` ever sees a wire format.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool results fed back to the model
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-issued identifier, unique within one assistant turn
    pub id: String,

    /// Requested tool name (may not be registered)
    pub name: String,

    /// Untyped parameter mapping, validated only by the tool itself
    #[serde(default)]
    pub input: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// Prose emitted between tool calls
///
/// `position` is the number of tool calls the model had emitted before this
/// text, so the original interleaving can be rebuilt on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub position: usize,
    pub text: String,
}

impl TextBlock {
    pub fn new(position: usize, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
        }
    }
}

/// Feedback for one previously issued tool call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultEntry {
    pub tool_call_id: String,
    pub content: String,
}

impl ToolResultEntry {
    pub fn new(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
        /// Emission order of the prose, when the provider reported one
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        text_blocks: Vec<TextBlock>,
    },
    Tool {
        results: Vec<ToolResultEntry>,
    },
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create a text-only assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            text: Some(text.into()),
            tool_calls: Vec::new(),
            text_blocks: Vec::new(),
        }
    }

    /// Create an assistant turn that requested tools
    pub fn assistant_with_tools(text: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            text: text.filter(|t| !t.is_empty()),
            tool_calls,
            text_blocks: Vec::new(),
        }
    }

    /// Attach the emitted order of text and tool calls to an assistant turn
    #[must_use]
    pub fn with_text_blocks(mut self, blocks: Vec<TextBlock>) -> Self {
        if let Self::Assistant { text_blocks, .. } = &mut self {
            *text_blocks = blocks;
        }
        self
    }

    /// Create a tool result message
    pub fn tool_results(results: Vec<ToolResultEntry>) -> Self {
        Self::Tool { results }
    }

    pub const fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Free text carried by the message, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::System { content } | Self::User { content } => Some(content),
            Self::Assistant { text, .. } => text.as_deref(),
            Self::Tool { .. } => None,
        }
    }

    /// Tool calls requested by an assistant turn (empty otherwise)
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Conversation history for one agent run
///
/// Append-only. The only structural rule it enforces is the one providers
/// validate: a tool message answers exactly the calls of the assistant
/// message right before it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation from the caller's request
    pub fn from_user(message: impl Into<String>) -> Self {
        let mut conv = Self::new();
        conv.push(Message::user(message));
        conv
    }

    /// Add a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a tool message answering the previous assistant turn
    pub fn push_tool_results(&mut self, results: Vec<ToolResultEntry>) -> Result<()> {
        let Some(previous) = self.messages.last() else {
            return Err(AgentError::Protocol(
                "tool results with no preceding assistant message".into(),
            ));
        };
        check_pairing(previous, &results)?;
        self.messages.push(Message::tool_results(results));
        Ok(())
    }

    /// Check the call-id correspondence across the whole history
    pub fn verify_tool_pairing(&self) -> Result<()> {
        for (idx, message) in self.messages.iter().enumerate() {
            if let Message::Tool { results } = message {
                let previous = idx
                    .checked_sub(1)
                    .and_then(|i| self.messages.get(i))
                    .ok_or_else(|| {
                        AgentError::Protocol("conversation starts with a tool message".into())
                    })?;
                check_pairing(previous, results)?;
            }
        }
        Ok(())
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn check_pairing(previous: &Message, results: &[ToolResultEntry]) -> Result<()> {
    let Message::Assistant { tool_calls, .. } = previous else {
        return Err(AgentError::Protocol(format!(
            "tool results must follow an assistant message, found {}",
            previous.role()
        )));
    };

    let issued: HashSet<&str> = tool_calls.iter().map(|c| c.id.as_str()).collect();
    let answered: HashSet<&str> = results.iter().map(|r| r.tool_call_id.as_str()).collect();

    if answered.len() != results.len() {
        return Err(AgentError::Protocol("duplicate tool_call_id in tool message".into()));
    }
    if let Some(stray) = answered.difference(&issued).next() {
        return Err(AgentError::Protocol(format!(
            "tool result for unknown call id '{stray}'"
        )));
    }
    if let Some(missing) = issued.difference(&answered).next() {
        return Err(AgentError::Protocol(format!(
            "no tool result for call id '{missing}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assistant_calling(ids: &[&str]) -> Message {
        Message::assistant_with_tools(
            Some("checking".into()),
            ids.iter()
                .map(|id| ToolCall::new(*id, "file_read", json!({})))
                .collect(),
        )
    }

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.text(), Some("Hello"));
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn test_empty_assistant_text_is_dropped() {
        let msg = Message::assistant_with_tools(Some(String::new()), Vec::new());
        assert_eq!(msg.text(), None);
    }

    #[test]
    fn test_role_tagged_serialization() {
        let msg = Message::tool_results(vec![ToolResultEntry::new("call_1", "ok")]);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["results"][0]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_text_blocks_only_on_assistant_turns() {
        let blocks = vec![TextBlock::new(0, "first"), TextBlock::new(1, "then")];
        let msg = assistant_calling(&["a", "b"]).with_text_blocks(blocks.clone());
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["text_blocks"][1], json!({ "position": 1, "text": "then" }));
        assert_eq!(serde_json::from_value::<Message>(value).unwrap(), msg);

        let plain = serde_json::to_value(assistant_calling(&["a"])).unwrap();
        assert!(plain.get("text_blocks").is_none());

        assert_eq!(Message::user("hi").with_text_blocks(blocks), Message::user("hi"));
    }

    #[test]
    fn test_tool_results_pair_with_previous_assistant() {
        let mut conv = Conversation::from_user("read a.txt and b.txt");
        conv.push(assistant_calling(&["a", "b"]));
        conv.push_tool_results(vec![
            ToolResultEntry::new("b", "B"),
            ToolResultEntry::new("a", "A"),
        ])
        .unwrap();

        assert_eq!(conv.len(), 3);
        assert!(conv.verify_tool_pairing().is_ok());
    }

    #[test]
    fn test_tool_results_reject_missing_or_stray_ids() {
        let mut conv = Conversation::from_user("hi");
        conv.push(assistant_calling(&["a", "b"]));

        let missing = conv.push_tool_results(vec![ToolResultEntry::new("a", "A")]);
        assert!(matches!(missing, Err(AgentError::Protocol(_))));

        let stray = conv.push_tool_results(vec![
            ToolResultEntry::new("a", "A"),
            ToolResultEntry::new("b", "B"),
            ToolResultEntry::new("c", "C"),
        ]);
        assert!(matches!(stray, Err(AgentError::Protocol(_))));
        assert_eq!(conv.len(), 2);
    }

    #[test]
    fn test_tool_results_must_follow_assistant() {
        let mut conv = Conversation::from_user("hi");
        let result = conv.push_tool_results(vec![ToolResultEntry::new("a", "A")]);
        assert!(result.is_err());

        let mut empty = Conversation::new();
        assert!(empty.push_tool_results(Vec::new()).is_err());
    }

    #[test]
    fn test_verify_detects_broken_history() {
        let mut conv = Conversation::from_user("hi");
        conv.push(assistant_calling(&["a"]));
        conv.push(Message::tool_results(vec![ToolResultEntry::new("z", "?")]));
        assert!(conv.verify_tool_pairing().is_err());
    }
}
