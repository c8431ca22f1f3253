//! Declarative engine configuration: provider, budgets, and strategies.
//!
//! The policy is advisory configuration carried by callers; the view enforces
//! only the single `max_tokens` budget, and compilers read the window/reserve
//! split to report `available_tokens` and overflow in compiled metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::kind::{BlockKind, Sensitivity};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Anthropic,
    Openai,
    Gemini,
}

impl Provider {
    pub const fn as_str(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::Openai => "openai",
            Provider::Gemini => "gemini",
        }
    }

    /// Default context window in tokens.
    pub const fn default_context_window(self) -> u64 {
        match self {
            Provider::Anthropic => 200_000,
            Provider::Openai => 128_000,
            Provider::Gemini => 1_048_576,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowStrategy {
    /// Raise an overflow error when the budget cannot be met.
    Error,
    /// Drop trailing blocks at the budget boundary.
    Truncate,
    /// Truncate, and flag that a compaction pass is expected to follow.
    Compact,
}

impl Default for OverflowStrategy {
    fn default() -> Self {
        OverflowStrategy::Truncate
    }
}

/// Advisory per-kind budget hints for higher-level schedulers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindPriority {
    pub kind: BlockKind,
    pub min_tokens: u64,
    pub max_tokens: u64,
    pub truncatable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompactionPolicy {
    pub prune_tool_outputs: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tool_output_age: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tool_outputs_per_kind: Option<usize>,
    pub summarize_history: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_history_messages: Option<usize>,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            prune_tool_outputs: true,
            max_tool_output_age: None,
            max_tool_outputs_per_kind: None,
            summarize_history: false,
            max_history_messages: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SensitivityPolicy {
    pub max_sensitivity: Sensitivity,
    pub redact_restricted: bool,
}

impl Default for SensitivityPolicy {
    fn default() -> Self {
        Self {
            max_sensitivity: Sensitivity::Public,
            redact_restricted: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankKey {
    Purpose,
    UserMention,
    Recency,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentPurpose {
    Evidence,
    Input,
    Context,
    Artifact,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttachmentSelection {
    pub rank_by: Vec<RankKey>,
    pub purpose_priority: BTreeMap<AttachmentPurpose, i32>,
}

impl Default for AttachmentSelection {
    fn default() -> Self {
        Self {
            rank_by: vec![RankKey::Purpose, RankKey::UserMention, RankKey::Recency],
            purpose_priority: BTreeMap::from([
                (AttachmentPurpose::Evidence, 3),
                (AttachmentPurpose::Input, 2),
                (AttachmentPurpose::Context, 1),
                (AttachmentPurpose::Artifact, 0),
            ]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttachmentPolicy {
    pub max_tokens_total: u64,
    pub selection_strategy: AttachmentSelection,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_tokens_total: 20_000,
            selection_strategy: AttachmentSelection::default(),
        }
    }
}

/// Caller-facing engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub provider: Provider,
    pub model_id: String,
    pub context_window: u64,
    pub completion_reserve: u64,
    #[serde(default)]
    pub overflow_strategy: OverflowStrategy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kind_priorities: Vec<KindPriority>,
    #[serde(default)]
    pub compaction: CompactionPolicy,
    #[serde(default)]
    pub sensitivity: SensitivityPolicy,
    #[serde(default)]
    pub attachments: AttachmentPolicy,
}

impl Policy {
    /// Policy with provider defaults for the window and a modest reserve.
    pub fn for_model(provider: Provider, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            context_window: provider.default_context_window(),
            completion_reserve: 4_096,
            overflow_strategy: OverflowStrategy::default(),
            kind_priorities: Vec::new(),
            compaction: CompactionPolicy::default(),
            sensitivity: SensitivityPolicy::default(),
            attachments: AttachmentPolicy::default(),
        }
    }

    /// Tokens left for context after the completion reserve.
    pub fn available_tokens(&self) -> u64 {
        self.context_window.saturating_sub(self.completion_reserve)
    }

    /// Sanity checks surfaced to the caller before any compilation.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.model_id.is_empty() {
            return Err(CoreError::InvalidPolicy("modelId must be non-empty"));
        }
        if self.context_window == 0 {
            return Err(CoreError::InvalidPolicy("contextWindow must be positive"));
        }
        if self.completion_reserve >= self.context_window {
            return Err(CoreError::InvalidPolicy(
                "completionReserve must be smaller than contextWindow",
            ));
        }
        for p in &self.kind_priorities {
            if p.min_tokens > p.max_tokens {
                return Err(CoreError::InvalidPolicy(
                    "kindPriorities: minTokens must not exceed maxTokens",
                ));
            }
        }
        Ok(())
    }
}
