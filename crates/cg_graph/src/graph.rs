//! The block graph: hash-keyed block store plus derivation/reference edges.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use cg_core::{Block, BlockHash, Query};

static EMPTY_PARENTS: &[BlockHash] = &[];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub block_count: usize,
    pub derivation_edge_count: usize,
    pub reference_edge_count: usize,
}

/// Single-owner mutable graph. Blocks are value objects: a hash collision
/// means identical canonical content, so `add_block` is a no-op on an
/// existing hash and the first write of edges wins.
#[derive(Clone, Debug, Default)]
pub struct ContextGraph {
    blocks: BTreeMap<BlockHash, Block>,
    derived_from: BTreeMap<BlockHash, Vec<BlockHash>>,
    references: BTreeMap<BlockHash, BTreeSet<BlockHash>>,
}

impl ContextGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block with optional provenance/citation edges. Returns `true`
    /// when the block was new. Re-adding an existing hash leaves both the
    /// block and its previously recorded edges untouched.
    pub fn add_block(
        &mut self,
        block: Block,
        derived_from: Vec<BlockHash>,
        references: Vec<BlockHash>,
    ) -> bool {
        let hash = block.block_hash.clone();
        if self.blocks.contains_key(&hash) {
            return false;
        }
        if !derived_from.is_empty() {
            self.derived_from.insert(hash.clone(), derived_from);
        }
        if !references.is_empty() {
            self.references
                .insert(hash.clone(), references.into_iter().collect());
        }
        self.blocks.insert(hash, block);
        true
    }

    /// Remove a block and its outgoing edges. Inbound references held by
    /// other blocks are not rewritten; queries tolerate the dangling hashes.
    pub fn remove_block(&mut self, hash: &BlockHash) -> bool {
        let existed = self.blocks.remove(hash).is_some();
        if existed {
            self.derived_from.remove(hash);
            self.references.remove(hash);
        }
        existed
    }

    pub fn get_block(&self, hash: &BlockHash) -> Option<&Block> {
        self.blocks.get(hash)
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.blocks.contains_key(hash)
    }

    /// Provenance parents (empty if none recorded).
    pub fn get_derived_from(&self, hash: &BlockHash) -> &[BlockHash] {
        self.derived_from
            .get(hash)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_PARENTS)
    }

    /// Outbound citations (empty if none recorded).
    pub fn get_references(&self, hash: &BlockHash) -> Vec<BlockHash> {
        self.references
            .get(hash)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Filter only: ordering of the result is NOT guaranteed. Callers that
    /// need deterministic order materialize a view.
    pub fn select(&self, query: &Query) -> Vec<&Block> {
        let empty_refs = BTreeSet::new();
        self.blocks
            .values()
            .filter(|b| {
                let parents = self.get_derived_from(&b.block_hash);
                let refs = self.references.get(&b.block_hash).unwrap_or(&empty_refs);
                query.matches(b, parents, refs)
            })
            .collect()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            block_count: self.blocks.len(),
            derivation_edge_count: self.derived_from.values().map(Vec::len).sum(),
            reference_edge_count: self.references.values().map(BTreeSet::len).sum(),
        }
    }
}
