//! Contract with the embedded chat widget runtime
//!
//! The widget itself (transcript rendering, composer, threads) is owned by a
//! third-party runtime. This module describes what the orchestrator needs from
//! it and what it delivers back:
//! - registration check and message injection (`ChatWidget`)
//! - client tool invocations and their results
//! - the assistant "response" event payload

pub mod readiness;
pub mod signal;

pub use readiness::{ReadinessGate, ReadinessState, ScriptSignal};
pub use signal::{Signal, Subscription};

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Controllable widget instance, as seen by the orchestrator
#[async_trait]
pub trait ChatWidget: Send + Sync {
    /// Whether the runtime has registered itself with the host
    fn is_registered(&self) -> bool;

    /// Inject a user message into the current conversation
    async fn send_message(&self, text: &str) -> Result<()>;
}

/// A tool invocation the widget delegates to the client
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ClientToolCall {
    pub name: String,
    #[serde(default)]
    pub params: Value,
}

impl ClientToolCall {
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// String parameter, with non-string scalars stringified and absent values empty
    pub fn param_str(&self, key: &str) -> String {
        match self.params.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Result returned to the widget for a client tool call
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolResult {
    pub success: bool,
}

impl ToolResult {
    pub fn ok() -> Self {
        Self { success: true }
    }

    pub fn failed() -> Self {
        Self { success: false }
    }
}

/// Text payload of a content block
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TextValue {
    pub value: String,
}

/// One block of message content
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

/// Message carried by the widget's "response" event
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AssistantMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl AssistantMessage {
    /// Build an assistant message with a single text block
    pub fn text_reply(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: vec![ContentBlock::Text {
                text: TextValue { value: text.into() },
            }],
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }

    /// All text blocks joined by newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.value.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
