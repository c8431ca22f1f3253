//! Block, metadata, and the content-addressing hash newtype.
//!
//! Metadata splits into a **stable** subset `{kind, sensitivity, codecId,
//! codecVersion}` that participates in hashing, and volatile fields
//! (`createdAt`, `source`, `tags`) that do not — blocks added at different
//! times with identical content collide to the same hash.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CoreError;
use crate::kind::{BlockKind, Sensitivity};

fn is_lower_hex_64(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Lowercase 64-hex SHA-256 digest identifying a block (or a view prefix).
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(String);

impl BlockHash {
    /// Wrap a digest the caller already knows to be lowercase 64-hex.
    /// Hash producers in `cg_canon` use this; everyone else should parse.
    pub fn from_hex_unchecked(hex: String) -> Self {
        debug_assert!(is_lower_hex_64(&hex), "BlockHash must be lowercase 64-hex");
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlockHash {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_lower_hex_64(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::InvalidHex)
        }
    }
}

/// Full block metadata. Wire keys are camelCase: the hash preimage depends on
/// them, so they are part of the engine's stable contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMeta {
    pub kind: BlockKind,
    pub sensitivity: Sensitivity,
    pub codec_id: String,
    pub codec_version: String,
    /// Unix seconds; volatile (excluded from hashing).
    pub created_at: u64,
    /// Volatile provenance label, e.g. `"session:abc"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Volatile tag set.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl BlockMeta {
    /// Project the hashing subset.
    pub fn stable(&self) -> StableMeta {
        StableMeta {
            kind: self.kind,
            sensitivity: self.sensitivity,
            codec_id: self.codec_id.clone(),
            codec_version: self.codec_version.clone(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// The subset of metadata that participates in the block hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StableMeta {
    pub kind: BlockKind,
    pub sensitivity: Sensitivity,
    pub codec_id: String,
    pub codec_version: String,
}

/// Content-addressed unit of context. The payload is codec-canonical JSON;
/// the graph and views treat it as opaque.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub block_hash: BlockHash,
    pub meta: BlockMeta,
    pub payload: Value,
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        self.meta.kind
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.meta.sensitivity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_hash_parse_rejects_bad_input() {
        let ok = "a".repeat(64);
        assert!(ok.parse::<BlockHash>().is_ok());
        assert!("ABCD".parse::<BlockHash>().is_err());
        assert!("g".repeat(64).parse::<BlockHash>().is_err());
        assert!("a".repeat(63).parse::<BlockHash>().is_err());
    }

    #[test]
    fn stable_meta_drops_volatile_fields() {
        let meta = BlockMeta {
            kind: BlockKind::Pinned,
            sensitivity: Sensitivity::Public,
            codec_id: "system-rules".into(),
            codec_version: "1".into(),
            created_at: 1_700_000_000,
            source: Some("session:x".into()),
            tags: BTreeSet::from(["a".to_string()]),
        };
        let stable = meta.stable();
        let v = serde_json::to_value(&stable).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "kind": "pinned",
                "sensitivity": "public",
                "codecId": "system-rules",
                "codecVersion": "1",
            })
        );
    }
}
