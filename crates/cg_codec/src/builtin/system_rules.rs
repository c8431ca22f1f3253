//! `system-rules` — pinned system directives.
//!
//! Payload: `{text, priority?, cacheable?}`. Canonicalization trims `text`
//! and substitutes defaults `priority = 0`, `cacheable = false`.

use serde_json::{json, Value};

use cg_core::{Block, BlockKind, Provider};

use crate::contract::{optional_bool, require_str, Codec};
use crate::render::{AnthropicRendered, GeminiRendered, OpenAiMessage, OpenAiRole, Rendered};
use crate::{CodecError, CodecResult};

const ID: &str = "system-rules";

pub struct SystemRules;

fn parse(payload: &Value) -> CodecResult<(String, i64, bool)> {
    let text = require_str(payload, ID, "text")?.trim().to_string();
    let priority = match payload.get("priority") {
        None | Some(Value::Null) => 0,
        Some(v) => v.as_i64().ok_or(CodecError::Validation {
            codec: ID,
            field: "priority",
            msg: "expected an integer".into(),
        })?,
    };
    let cacheable = optional_bool(payload, ID, "cacheable")?;
    Ok((text, priority, cacheable))
}

impl Codec for SystemRules {
    fn codec_id(&self) -> &'static str {
        ID
    }

    fn version(&self) -> &'static str {
        "1"
    }

    fn kinds(&self) -> Option<&'static [BlockKind]> {
        Some(&[BlockKind::Pinned])
    }

    fn validate(&self, payload: &Value) -> CodecResult<Value> {
        self.canonicalize(payload)
    }

    fn canonicalize(&self, payload: &Value) -> CodecResult<Value> {
        let (text, priority, cacheable) = parse(payload)?;
        Ok(json!({
            "cacheable": cacheable,
            "priority": priority,
            "text": text,
        }))
    }

    fn render(&self, block: &Block, provider: Provider) -> CodecResult<Vec<Rendered>> {
        let (text, _, cacheable) = parse(&block.payload)?;
        Ok(vec![match provider {
            Provider::Anthropic => {
                Rendered::Anthropic(AnthropicRendered::System { text, cacheable })
            }
            Provider::Openai => Rendered::OpenAi(OpenAiMessage {
                role: OpenAiRole::System,
                content: text,
                tool_call_id: None,
            }),
            Provider::Gemini => Rendered::Gemini(GeminiRendered::System(text)),
        }])
    }
}
