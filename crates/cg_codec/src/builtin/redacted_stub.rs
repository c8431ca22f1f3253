//! `redacted-stub` — stands in for a block removed by sensitivity filtering.
//!
//! Payload: `{originalBlockHash, reason, placeholder?}`; the placeholder
//! defaults to `"[REDACTED]"`. Valid for any block kind: the stub keeps the
//! original's position in the view, only its content is gone.

use serde_json::{json, Value};

use cg_core::{Block, BlockHash, BlockKind, Provider};

use crate::contract::{optional_str, require_str, Codec};
use crate::render::{
    AnthropicContent, AnthropicRendered, ChatRole, GeminiRendered, GeminiRole,
    OpenAiMessage, OpenAiRole, Rendered,
};
use crate::{CodecError, CodecResult};

const ID: &str = "redacted-stub";

pub const DEFAULT_PLACEHOLDER: &str = "[REDACTED]";

pub struct RedactedStub;

fn parse(payload: &Value) -> CodecResult<(String, String, String)> {
    let original = require_str(payload, ID, "originalBlockHash")?;
    if original.parse::<BlockHash>().is_err() {
        return Err(CodecError::Validation {
            codec: ID,
            field: "originalBlockHash",
            msg: "expected lowercase 64-hex".into(),
        });
    }
    let reason = require_str(payload, ID, "reason")?.to_string();
    let placeholder = optional_str(payload, ID, "placeholder")?
        .unwrap_or(DEFAULT_PLACEHOLDER)
        .to_string();
    Ok((original.to_string(), reason, placeholder))
}

impl Codec for RedactedStub {
    fn codec_id(&self) -> &'static str {
        ID
    }

    fn version(&self) -> &'static str {
        "1"
    }

    fn validate(&self, payload: &Value) -> CodecResult<Value> {
        self.canonicalize(payload)
    }

    fn canonicalize(&self, payload: &Value) -> CodecResult<Value> {
        let (original, reason, placeholder) = parse(payload)?;
        Ok(json!({
            "originalBlockHash": original,
            "placeholder": placeholder,
            "reason": reason,
        }))
    }

    fn render(&self, block: &Block, provider: Provider) -> CodecResult<Vec<Rendered>> {
        let (_, _, placeholder) = parse(&block.payload)?;
        // A redacted pinned block still belongs in the system channel.
        let pinned = block.meta.kind == BlockKind::Pinned;
        Ok(vec![match provider {
            Provider::Anthropic if pinned => Rendered::Anthropic(AnthropicRendered::System {
                text: placeholder,
                cacheable: false,
            }),
            Provider::Anthropic => Rendered::Anthropic(AnthropicRendered::Message {
                role: ChatRole::User,
                content: AnthropicContent::Text { text: placeholder },
            }),
            Provider::Openai => Rendered::OpenAi(OpenAiMessage {
                role: if pinned {
                    OpenAiRole::System
                } else {
                    OpenAiRole::User
                },
                content: placeholder,
                tool_call_id: None,
            }),
            Provider::Gemini if pinned => {
                Rendered::Gemini(GeminiRendered::System(placeholder))
            }
            Provider::Gemini => Rendered::Gemini(GeminiRendered::Content {
                role: GeminiRole::User,
                parts: vec![placeholder],
            }),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_defaults() {
        let v = RedactedStub
            .canonicalize(&json!({
                "originalBlockHash": "a".repeat(64),
                "reason": "Sensitivity level 'restricted' exceeds maximum 'public'"
            }))
            .unwrap();
        assert_eq!(v.get("placeholder").unwrap(), DEFAULT_PLACEHOLDER);
    }

    #[test]
    fn bad_hash_is_rejected() {
        let err = RedactedStub
            .validate(&json!({ "originalBlockHash": "nope", "reason": "r" }))
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::Validation { field: "originalBlockHash", .. }
        ));
    }
}
