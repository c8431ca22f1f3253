//! `unsafe-text` — free text escape hatch, any kind.
//!
//! Payload: `{text, role?}`; text trimmed, role defaults to `user`.

use serde_json::{json, Value};

use cg_core::{Block, Provider};

use crate::contract::{optional_str, require_str, Codec};
use crate::render::{
    AnthropicContent, AnthropicRendered, ChatRole, GeminiRendered, GeminiRole,
    OpenAiMessage, OpenAiRole, Rendered,
};
use crate::{CodecError, CodecResult};

const ID: &str = "unsafe-text";

pub struct UnsafeText;

fn parse(payload: &Value) -> CodecResult<(String, ChatRole)> {
    let text = require_str(payload, ID, "text")?.trim().to_string();
    let role = match optional_str(payload, ID, "role")? {
        None | Some("user") => ChatRole::User,
        Some("assistant") => ChatRole::Assistant,
        Some(_) => {
            return Err(CodecError::Validation {
                codec: ID,
                field: "role",
                msg: "role must be 'user' or 'assistant'".into(),
            })
        }
    };
    Ok((text, role))
}

impl Codec for UnsafeText {
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
        let (text, role) = parse(payload)?;
        Ok(json!({
            "role": match role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            },
            "text": text,
        }))
    }

    fn render(&self, block: &Block, provider: Provider) -> CodecResult<Vec<Rendered>> {
        let (text, role) = parse(&block.payload)?;
        Ok(vec![match provider {
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
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_to_user_and_text_is_trimmed() {
        let v = UnsafeText.canonicalize(&json!({ "text": " hi " })).unwrap();
        assert_eq!(v, json!({ "role": "user", "text": "hi" }));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = UnsafeText
            .validate(&json!({ "text": "x", "role": "system" }))
            .unwrap_err();
        assert!(matches!(err, CodecError::Validation { field: "role", .. }));
    }
}
