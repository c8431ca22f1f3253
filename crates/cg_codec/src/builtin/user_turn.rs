//! `user-turn` — the live user message, always last in kind order.
//!
//! Payload: `{text}`, kept verbatim.

use serde_json::{json, Value};

use cg_core::{Block, BlockKind, Provider};

use crate::contract::{require_str, Codec};
use crate::render::{
    AnthropicContent, AnthropicRendered, ChatRole, GeminiRendered, GeminiRole,
    OpenAiMessage, OpenAiRole, Rendered,
};
use crate::CodecResult;

const ID: &str = "user-turn";

pub struct UserTurn;

impl Codec for UserTurn {
    fn codec_id(&self) -> &'static str {
        ID
    }

    fn version(&self) -> &'static str {
        "1"
    }

    fn kinds(&self) -> Option<&'static [BlockKind]> {
        Some(&[BlockKind::Turn])
    }

    fn validate(&self, payload: &Value) -> CodecResult<Value> {
        self.canonicalize(payload)
    }

    fn canonicalize(&self, payload: &Value) -> CodecResult<Value> {
        let text = require_str(payload, ID, "text")?;
        Ok(json!({ "text": text }))
    }

    fn render(&self, block: &Block, provider: Provider) -> CodecResult<Vec<Rendered>> {
        let text = require_str(&block.payload, ID, "text")?.to_string();
        Ok(vec![match provider {
            Provider::Anthropic => Rendered::Anthropic(AnthropicRendered::Message {
                role: ChatRole::User,
                content: AnthropicContent::Text { text },
            }),
            Provider::Openai => Rendered::OpenAi(OpenAiMessage {
                role: OpenAiRole::User,
                content: text,
                tool_call_id: None,
            }),
            Provider::Gemini => Rendered::Gemini(GeminiRendered::Content {
                role: GeminiRole::User,
                parts: vec![text],
            }),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_kept_verbatim() {
        let v = UserTurn.canonicalize(&json!({ "text": "  spaced  " })).unwrap();
        assert_eq!(v, json!({ "text": "  spaced  " }));
    }
}
