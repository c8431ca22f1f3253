//! Capability traits consumed by the engine.
//!
//! Implementations live outside the core (object stores, provider APIs,
//! databases); the core only ever sees these synchronous contracts and calls
//! them at well-defined points. Timestamps are supplied by callers so the
//! core stays clock-free.

use core::fmt;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::{Block, BlockHash};
use crate::kind::Sensitivity;
use crate::query::Query;

// ---------------- Attachment resolution ----------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveLevel {
    MetadataOnly,
    Extract,
    Full,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAttachment {
    pub meta: Value,
    pub parts: Vec<Value>,
    pub derived_blocks: Vec<Block>,
    pub snapshot_hash: Option<BlockHash>,
    pub resolver_version: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveError(pub String);

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attachment resolution failed: {}", self.0)
    }
}

impl std::error::Error for ResolveError {}

pub trait AttachmentResolver {
    fn resolve(
        &self,
        attachment: &AttachmentRef,
        level: ResolveLevel,
    ) -> Result<ResolvedAttachment, ResolveError>;
}

// ---------------- Summarization ----------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SummarizeOptions {
    pub target_tokens: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryOutput {
    pub summary: String,
    /// Hashes of the blocks the summary was drawn from.
    pub provenance: Vec<BlockHash>,
    pub usage: Usage,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SummarizeError {
    /// The summarizer refuses non-public input.
    Sensitivity { hash: BlockHash, level: Sensitivity },
    Failed(String),
}

impl fmt::Display for SummarizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummarizeError::Sensitivity { hash, level } => write!(
                f,
                "sensitivity violation: block {hash} is '{level}', summarizer requires public"
            ),
            SummarizeError::Failed(msg) => write!(f, "summarization failed: {msg}"),
        }
    }
}

impl std::error::Error for SummarizeError {}

/// Fork-facing summarizer: schema-directed, sensitivity-checked.
pub trait Summarizer {
    fn summarize(
        &self,
        blocks: &[Block],
        schema: &Value,
        options: &SummarizeOptions,
    ) -> Result<SummaryOutput, SummarizeError>;
}

/// Compactor-facing summarizer: collapses a history prefix into one history
/// block near `target_tokens`. Deliberately distinct from [`Summarizer`].
pub trait HistorySummarizer {
    fn summarize_history(
        &self,
        blocks: &[Block],
        target_tokens: u64,
    ) -> Result<Block, SummarizeError>;
}

// ---------------- Memory store ----------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub entries: u64,
    pub expired_evicted: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreError(pub String);

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Persistent block store. TTL bookkeeping runs inside each operation (no
/// background clock), which is why every entry point takes `now`.
pub trait MemoryStore {
    fn save(&mut self, block: Block, ttl_seconds: Option<u64>, now: u64)
        -> Result<(), StoreError>;
    fn load(&mut self, hash: &BlockHash, now: u64) -> Result<Option<Block>, StoreError>;
    fn query(&mut self, query: &Query, now: u64) -> Result<Vec<Block>, StoreError>;
    fn delete(&mut self, hash: &BlockHash, now: u64) -> Result<bool, StoreError>;
    fn delete_many(&mut self, hashes: &BTreeSet<BlockHash>, now: u64)
        -> Result<usize, StoreError>;
    fn exists(&mut self, hash: &BlockHash, now: u64) -> Result<bool, StoreError>;
    fn get_stats(&self) -> StoreStats;
    fn clear(&mut self);
}
