//! Codec registry and the block builder that goes through it.
//!
//! The registry is a plain value: construct one (usually `with_builtins`),
//! register custom codecs, and pass references wherever codec lookup is
//! needed. Double registration is an error; lookup of an unknown id is an
//! error carrying the id.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde_json::Value;

use cg_canon::compute_block_hash;
use cg_core::{Block, BlockKind, BlockMeta, Sensitivity, StableMeta};

use crate::builtin;
use crate::contract::Codec;
use crate::{CodecError, CodecResult};

#[derive(Default)]
pub struct CodecRegistry {
    codecs: BTreeMap<String, Box<dyn Codec>>,
}

/// Everything needed to mint a block through the registry.
#[derive(Clone, Debug)]
pub struct BlockSpec {
    pub kind: BlockKind,
    pub sensitivity: Sensitivity,
    pub codec_id: String,
    pub payload: Value,
    pub created_at: u64,
    pub source: Option<String>,
    pub tags: BTreeSet<String>,
}

impl BlockSpec {
    pub fn new(kind: BlockKind, codec_id: impl Into<String>, payload: Value) -> Self {
        Self {
            kind,
            sensitivity: Sensitivity::Public,
            codec_id: codec_id.into(),
            payload,
            created_at: 0,
            source: None,
            tags: BTreeSet::new(),
        }
    }

    pub fn sensitivity(mut self, s: Sensitivity) -> Self {
        self.sensitivity = s;
        self
    }

    pub fn created_at(mut self, at: u64) -> Self {
        self.created_at = at;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

impl CodecRegistry {
    /// Empty registry (custom-codec-only setups).
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in codecs.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        for codec in builtin::all() {
            reg.register(codec).expect("builtin ids are unique");
        }
        reg
    }

    pub fn register(&mut self, codec: Box<dyn Codec>) -> CodecResult<()> {
        let id = codec.codec_id().to_string();
        if self.codecs.contains_key(&id) {
            return Err(CodecError::DuplicateCodec(id));
        }
        self.codecs.insert(id, codec);
        Ok(())
    }

    pub fn get(&self, codec_id: &str) -> CodecResult<&dyn Codec> {
        self.codecs
            .get(codec_id)
            .map(|c| c.as_ref())
            .ok_or_else(|| CodecError::UnknownCodec(codec_id.to_string()))
    }

    pub fn contains(&self, codec_id: &str) -> bool {
        self.codecs.contains_key(codec_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }

    /// Validate, canonicalize, and hash a payload into a finished block.
    pub fn make_block(&self, spec: BlockSpec) -> CodecResult<Block> {
        let codec = self.get(&spec.codec_id)?;
        if let Some(kinds) = codec.kinds() {
            if !kinds.contains(&spec.kind) {
                return Err(CodecError::KindMismatch {
                    codec: codec.codec_id(),
                    kind: spec.kind.to_string(),
                });
            }
        }
        let payload = codec.validate(&spec.payload)?;
        let meta = BlockMeta {
            kind: spec.kind,
            sensitivity: spec.sensitivity,
            codec_id: codec.codec_id().to_string(),
            codec_version: codec.version().to_string(),
            created_at: spec.created_at,
            source: spec.source,
            tags: spec.tags,
        };
        let stable = StableMeta {
            kind: meta.kind,
            sensitivity: meta.sensitivity,
            codec_id: meta.codec_id.clone(),
            codec_version: meta.codec_version.clone(),
        };
        let block_hash = compute_block_hash(&stable, &payload)?;
        Ok(Block {
            block_hash,
            meta,
            payload,
        })
    }
}
