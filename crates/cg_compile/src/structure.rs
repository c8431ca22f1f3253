//! Compiled-context data model and diagnostics.
//! Pure data, deterministic ordering only; mappers live in the per-provider
//! modules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cg_codec::{AnthropicContent, ChatRole, GeminiRole, OpenAiMessage};
use cg_core::{Block, BlockKind, Provider};

// -------------------- Diagnostics --------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One compiler finding. `position` is the index the finding refers to
/// (system entry or message index); `-1` means "no position".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub position: i64,
}

// -------------------- Cache selection (Anthropic) --------------------

/// Selector for the cache breakpoint. Every non-null field must match the
/// block (for `tag`, the block's tag set must contain the value). Only
/// pinned blocks are considered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSelector {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<BlockKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CacheSelector {
    pub fn matches(&self, block: &Block) -> bool {
        if let Some(kind) = self.kind {
            if block.meta.kind != kind {
                return false;
            }
        }
        if let Some(codec_id) = &self.codec_id {
            if &block.meta.codec_id != codec_id {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !block.meta.tags.contains(tag) {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if block.meta.source.as_deref() != Some(source.as_str()) {
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// Anthropic cache breakpoint; ignored by the other providers.
    pub cache: Option<CacheSelector>,
    /// Unix seconds, caller-supplied.
    pub compiled_at: u64,
    /// Echoed into compiled metadata by callers that ran a compaction pass.
    pub compacted: bool,
}

// -------------------- Provider-native output shapes --------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub cache_type: String,
}

impl CacheControl {
    pub fn ephemeral() -> Self {
        Self {
            cache_type: "ephemeral".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnthropicSystemEntry {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: ChatRole,
    pub content: Vec<AnthropicContent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiContent {
    pub role: GeminiRole,
    pub parts: Vec<String>,
}

/// Provider-tagged compiled message structure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum CompiledMessages {
    Anthropic {
        system: Vec<AnthropicSystemEntry>,
        messages: Vec<AnthropicMessage>,
    },
    Openai {
        messages: Vec<OpenAiMessage>,
    },
    Gemini {
        #[serde(skip_serializing_if = "Option::is_none")]
        system_instruction: Option<String>,
        contents: Vec<GeminiContent>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledMeta {
    pub compiled_at: u64,
    pub context_window: u64,
    pub completion_reserve: u64,
    pub available_tokens: u64,
    pub overflowed: bool,
    pub compacted: bool,
    pub truncated: bool,
    pub tokens_by_kind: BTreeMap<BlockKind, u64>,
}

/// Result of compilation. `excluded_blocks` lists, in view order, the blocks
/// whose codec produced no rendering for the target provider.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledContext {
    pub provider: Provider,
    pub model_id: String,
    pub messages: CompiledMessages,
    pub estimated_tokens: u64,
    pub blocks: Vec<Block>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded_blocks: Vec<Block>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    pub meta: CompiledMeta,
}

/// What a provider assembler hands back to the dispatcher.
pub(crate) struct Assembled {
    pub messages: CompiledMessages,
    pub excluded_blocks: Vec<Block>,
    pub diagnostics: Vec<Diagnostic>,
}
