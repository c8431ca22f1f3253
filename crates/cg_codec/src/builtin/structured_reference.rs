//! `structured-reference` — titled reference material.
//!
//! Payload: `{title, content, sourceUrl?, mimeType?, cacheable?}`. The title
//! is trimmed; the content is kept verbatim; absent optional fields are
//! omitted from the canonical form. Accepted as reference material or as an
//! ingested memory (fork results land here).

use serde_json::{json, Map, Value};

use cg_core::{Block, BlockKind, Provider};

use crate::contract::{optional_bool, optional_str, require_str, Codec};
use crate::render::{
    AnthropicContent, AnthropicRendered, ChatRole, GeminiRendered, GeminiRole,
    OpenAiMessage, OpenAiRole, Rendered,
};
use crate::CodecResult;

const ID: &str = "structured-reference";

pub struct StructuredReference;

struct Parsed {
    title: String,
    content: String,
    source_url: Option<String>,
    mime_type: Option<String>,
    cacheable: bool,
}

fn parse(payload: &Value) -> CodecResult<Parsed> {
    Ok(Parsed {
        title: require_str(payload, ID, "title")?.trim().to_string(),
        content: require_str(payload, ID, "content")?.to_string(),
        source_url: optional_str(payload, ID, "sourceUrl")?.map(str::to_string),
        mime_type: optional_str(payload, ID, "mimeType")?.map(str::to_string),
        cacheable: optional_bool(payload, ID, "cacheable")?,
    })
}

impl Codec for StructuredReference {
    fn codec_id(&self) -> &'static str {
        ID
    }

    fn version(&self) -> &'static str {
        "1"
    }

    fn kinds(&self) -> Option<&'static [BlockKind]> {
        Some(&[BlockKind::Reference, BlockKind::Memory])
    }

    fn validate(&self, payload: &Value) -> CodecResult<Value> {
        self.canonicalize(payload)
    }

    fn canonicalize(&self, payload: &Value) -> CodecResult<Value> {
        let p = parse(payload)?;
        let mut map = Map::new();
        map.insert("cacheable".into(), Value::Bool(p.cacheable));
        map.insert("content".into(), Value::String(p.content));
        if let Some(mime) = p.mime_type {
            map.insert("mimeType".into(), Value::String(mime));
        }
        if let Some(url) = p.source_url {
            map.insert("sourceUrl".into(), Value::String(url));
        }
        map.insert("title".into(), Value::String(p.title));
        Ok(Value::Object(map))
    }

    fn render(&self, block: &Block, provider: Provider) -> CodecResult<Vec<Rendered>> {
        let p = parse(&block.payload)?;
        let mut text = format!("Reference: {}\n{}", p.title, p.content);
        if let Some(url) = &p.source_url {
            text.push_str(&format!("\nSource: {url}"));
        }
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
