//! `conversation-history` — a run of prior turns.
//!
//! Payload: `{messages: [{role: user|assistant, content: string|structured,
//! ...}], summary?}`. Canonicalization drops the per-message volatile keys
//! `timestamp` and `messageId`; any other message field (e.g. `error`)
//! survives.

use serde_json::{json, Map, Value};

use cg_core::{Block, BlockKind, Provider};

use crate::contract::{optional_str, Codec};
use crate::render::{
    AnthropicContent, AnthropicRendered, ChatRole, GeminiRendered, GeminiRole,
    OpenAiMessage, OpenAiRole, Rendered,
};
use crate::{CodecError, CodecResult};

const ID: &str = "conversation-history";

/// Per-message keys excluded from canonical content.
const VOLATILE_KEYS: [&str; 2] = ["timestamp", "messageId"];

pub struct ConversationHistory;

fn messages(payload: &Value) -> CodecResult<&Vec<Value>> {
    payload
        .get("messages")
        .and_then(Value::as_array)
        .ok_or(CodecError::Validation {
            codec: ID,
            field: "messages",
            msg: "required array field missing".into(),
        })
}

fn message_role(msg: &Value) -> CodecResult<ChatRole> {
    match msg.get("role").and_then(Value::as_str) {
        Some("user") => Ok(ChatRole::User),
        Some("assistant") => Ok(ChatRole::Assistant),
        _ => Err(CodecError::Validation {
            codec: ID,
            field: "messages.role",
            msg: "role must be 'user' or 'assistant'".into(),
        }),
    }
}

fn content_text(msg: &Value) -> CodecResult<String> {
    match msg.get("content") {
        Some(Value::String(s)) => Ok(s.clone()),
        // Structured content renders as its compact canonical form.
        Some(v) if !v.is_null() => Ok(cg_canon::canonicalize_value(v).to_string()),
        _ => Err(CodecError::Validation {
            codec: ID,
            field: "messages.content",
            msg: "required content missing".into(),
        }),
    }
}

impl Codec for ConversationHistory {
    fn codec_id(&self) -> &'static str {
        ID
    }

    fn version(&self) -> &'static str {
        "1"
    }

    fn kinds(&self) -> Option<&'static [BlockKind]> {
        Some(&[BlockKind::History])
    }

    fn validate(&self, payload: &Value) -> CodecResult<Value> {
        self.canonicalize(payload)
    }

    fn canonicalize(&self, payload: &Value) -> CodecResult<Value> {
        let mut canonical_messages = Vec::new();
        for msg in messages(payload)? {
            message_role(msg)?;
            content_text(msg)?;
            let obj = msg.as_object().ok_or(CodecError::Validation {
                codec: ID,
                field: "messages",
                msg: "each message must be an object".into(),
            })?;
            let mut out = Map::new();
            for (k, v) in obj {
                if !VOLATILE_KEYS.contains(&k.as_str()) {
                    out.insert(k.clone(), cg_canon::canonicalize_value(v));
                }
            }
            canonical_messages.push(Value::Object(out));
        }
        let mut root = Map::new();
        root.insert("messages".into(), Value::Array(canonical_messages));
        if let Some(summary) = optional_str(payload, ID, "summary")? {
            root.insert("summary".into(), Value::String(summary.to_string()));
        }
        Ok(Value::Object(root))
    }

    fn render(&self, block: &Block, provider: Provider) -> CodecResult<Vec<Rendered>> {
        let msgs = messages(&block.payload)?;
        let mut out = Vec::with_capacity(msgs.len() + 1);

        // A summarized block may carry no verbatim messages.
        if msgs.is_empty() {
            if let Some(summary) = block.payload.get("summary").and_then(Value::as_str) {
                let text = format!("[History summary] {summary}");
                out.push(render_text(provider, ChatRole::User, text));
            }
            return Ok(out);
        }

        for msg in msgs {
            let role = message_role(msg)?;
            let text = content_text(msg)?;
            out.push(render_text(provider, role, text));
        }
        Ok(out)
    }
}

fn render_text(provider: Provider, role: ChatRole, text: String) -> Rendered {
    match provider {
        Provider::Anthropic => Rendered::Anthropic(AnthropicRendered::Message {
            role,
            content: AnthropicContent::Text { text },
        }),
        Provider::Openai => Rendered::OpenAi(OpenAiMessage {
            role: match role {
                ChatRole::User => OpenAiRole::User,
                ChatRole::Assistant => OpenAiRole::Assistant,
            },
            content: text,
            tool_call_id: None,
        }),
        Provider::Gemini => Rendered::Gemini(GeminiRendered::Content {
            role: match role {
                ChatRole::User => GeminiRole::User,
                ChatRole::Assistant => GeminiRole::Model,
            },
            parts: vec![text],
        }),
    }
}
