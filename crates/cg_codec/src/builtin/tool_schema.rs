//! `tool-schema` — a reference block describing one callable tool.
//!
//! Payload: `{name, description, inputSchema, cacheable?}`. The schema is
//! recursively key-sorted; default `cacheable = false`.

use serde_json::{json, Value};

use cg_core::{Block, BlockKind, Provider};

use crate::contract::{optional_bool, require_str, Codec};
use crate::render::{
    AnthropicContent, AnthropicRendered, ChatRole, GeminiRendered, GeminiRole,
    OpenAiMessage, OpenAiRole, Rendered,
};
use crate::{CodecError, CodecResult};

const ID: &str = "tool-schema";

pub struct ToolSchema;

fn parse(payload: &Value) -> CodecResult<(String, String, Value, bool)> {
    let name = require_str(payload, ID, "name")?.to_string();
    let description = require_str(payload, ID, "description")?.to_string();
    let schema = payload
        .get("inputSchema")
        .filter(|v| v.is_object())
        .ok_or(CodecError::Validation {
            codec: ID,
            field: "inputSchema",
            msg: "required object field missing".into(),
        })?;
    let cacheable = optional_bool(payload, ID, "cacheable")?;
    Ok((
        name,
        description,
        cg_canon::canonicalize_value(schema),
        cacheable,
    ))
}

fn describe(name: &str, description: &str, schema: &Value) -> String {
    format!("Tool: {name}\n{description}\nInput schema: {schema}")
}

impl Codec for ToolSchema {
    fn codec_id(&self) -> &'static str {
        ID
    }

    fn version(&self) -> &'static str {
        "1"
    }

    fn kinds(&self) -> Option<&'static [BlockKind]> {
        Some(&[BlockKind::Reference])
    }

    fn validate(&self, payload: &Value) -> CodecResult<Value> {
        self.canonicalize(payload)
    }

    fn canonicalize(&self, payload: &Value) -> CodecResult<Value> {
        let (name, description, schema, cacheable) = parse(payload)?;
        Ok(json!({
            "cacheable": cacheable,
            "description": description,
            "inputSchema": schema,
            "name": name,
        }))
    }

    fn render(&self, block: &Block, provider: Provider) -> CodecResult<Vec<Rendered>> {
        let (name, description, schema, _) = parse(&block.payload)?;
        let text = describe(&name, &description, &schema);
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
