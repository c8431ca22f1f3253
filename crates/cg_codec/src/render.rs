//! Provider-tagged rendering structures.
//!
//! One tagged variant per provider replaces the duck-typed
//! `{anthropic?, openai?, gemini?}` record: a codec renders a block for one
//! provider at a time and a compiler only ever sees its own variant.

use serde::{Deserialize, Serialize};

/// Conversation role shared by the chat-shaped providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Anthropic message content: plain text or a tool result entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContent {
    Text { text: String },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

/// A rendered Anthropic entry: either a system block (assembled into the
/// separate `system[]` array) or a conversation message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnthropicRendered {
    System { text: String, cacheable: bool },
    Message { role: ChatRole, content: AnthropicContent },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenAiRole {
    System,
    User,
    Assistant,
    Tool,
}

/// OpenAI renders everything as one inline message list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiMessage {
    pub role: OpenAiRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeminiRole {
    User,
    Model,
}

/// A rendered Gemini entry: system-instruction text or a content entry with
/// text parts (the compiler merges adjacent same-role entries).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeminiRendered {
    System(String),
    Content { role: GeminiRole, parts: Vec<String> },
}

/// Provider-tagged rendering of one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendered {
    Anthropic(AnthropicRendered),
    OpenAi(OpenAiMessage),
    Gemini(GeminiRendered),
}
