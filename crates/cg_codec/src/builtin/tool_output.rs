//! `tool-output` — the result of one tool invocation.
//!
//! Payload: `{toolName, toolCallId, output: {success: true, result} |
//! {success: false, error} | string, durationMs?, _truncated?}`.
//!
//! `durationMs` is strictly content-irrelevant: it is dropped by
//! canonicalization (so it never reaches the hash) and never exposed through
//! rendering. The string form of `output` is the truncated-successor shape
//! produced by compaction.

use serde_json::{Map, Value};

use cg_core::{Block, BlockKind, Provider};

use crate::contract::{require_str, Codec};
use crate::render::{
    AnthropicContent, AnthropicRendered, ChatRole, GeminiRendered, GeminiRole,
    OpenAiMessage, OpenAiRole, Rendered,
};
use crate::{CodecError, CodecResult};

const ID: &str = "tool-output";

pub struct ToolOutput;

fn validate_output(output: &Value) -> CodecResult<()> {
    match output {
        Value::String(_) => Ok(()),
        Value::Object(obj) => match obj.get("success") {
            Some(Value::Bool(true)) => obj.get("result").map(|_| ()).ok_or(
                CodecError::Validation {
                    codec: ID,
                    field: "output.result",
                    msg: "successful output requires 'result'".into(),
                },
            ),
            Some(Value::Bool(false)) => obj.get("error").map(|_| ()).ok_or(
                CodecError::Validation {
                    codec: ID,
                    field: "output.error",
                    msg: "failed output requires 'error'".into(),
                },
            ),
            _ => Err(CodecError::Validation {
                codec: ID,
                field: "output.success",
                msg: "required boolean field missing".into(),
            }),
        },
        _ => Err(CodecError::Validation {
            codec: ID,
            field: "output",
            msg: "expected an object or a string".into(),
        }),
    }
}

/// Flatten the output into display text and an error flag.
fn output_text(output: &Value) -> (String, bool) {
    match output {
        Value::String(s) => (s.clone(), false),
        Value::Object(obj) => {
            let is_error = obj.get("success") == Some(&Value::Bool(false));
            let body = if is_error {
                obj.get("error")
            } else {
                obj.get("result")
            };
            let text = match body {
                Some(Value::String(s)) => s.clone(),
                Some(v) => cg_canon::canonicalize_value(v).to_string(),
                None => String::new(),
            };
            (text, is_error)
        }
        _ => (String::new(), false),
    }
}

impl Codec for ToolOutput {
    fn codec_id(&self) -> &'static str {
        ID
    }

    fn version(&self) -> &'static str {
        "1"
    }

    fn kinds(&self) -> Option<&'static [BlockKind]> {
        Some(&[BlockKind::ToolOutput])
    }

    fn validate(&self, payload: &Value) -> CodecResult<Value> {
        self.canonicalize(payload)
    }

    fn canonicalize(&self, payload: &Value) -> CodecResult<Value> {
        require_str(payload, ID, "toolName")?;
        require_str(payload, ID, "toolCallId")?;
        let output = payload.get("output").ok_or(CodecError::Validation {
            codec: ID,
            field: "output",
            msg: "required field missing".into(),
        })?;
        validate_output(output)?;

        let obj = payload.as_object().expect("field access implies object");
        let mut out = Map::new();
        for (k, v) in obj {
            if k != "durationMs" {
                out.insert(k.clone(), cg_canon::canonicalize_value(v));
            }
        }
        Ok(Value::Object(out))
    }

    fn render(&self, block: &Block, provider: Provider) -> CodecResult<Vec<Rendered>> {
        let tool_name = require_str(&block.payload, ID, "toolName")?.to_string();
        let tool_call_id = require_str(&block.payload, ID, "toolCallId")?.to_string();
        let output = block.payload.get("output").ok_or(CodecError::Validation {
            codec: ID,
            field: "output",
            msg: "required field missing".into(),
        })?;
        let (text, is_error) = output_text(output);

        Ok(vec![match provider {
            Provider::Anthropic => Rendered::Anthropic(AnthropicRendered::Message {
                role: ChatRole::User,
                content: AnthropicContent::ToolResult {
                    tool_use_id: tool_call_id,
                    content: text,
                    is_error,
                },
            }),
            Provider::Openai => Rendered::OpenAi(OpenAiMessage {
                role: OpenAiRole::Tool,
                content: text,
                tool_call_id: Some(tool_call_id),
            }),
            Provider::Gemini => Rendered::Gemini(GeminiRendered::Content {
                role: GeminiRole::User,
                parts: vec![format!("Tool {tool_name} result: {text}")],
            }),
        }])
    }
}
