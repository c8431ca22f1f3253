//! In-memory reference implementation of the `MemoryStore` capability.
//!
//! TTL bookkeeping runs on each operation, not on a background clock: every
//! entry point sweeps expired entries for the supplied `now` before touching
//! the data.

use std::collections::{BTreeMap, BTreeSet};

use cg_core::caps::{MemoryStore, StoreError, StoreStats};
use cg_core::{Block, BlockHash, Query};

#[derive(Clone, Debug)]
struct Entry {
    block: Block,
    /// Unix seconds; `None` means the entry never expires.
    expires_at: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    entries: BTreeMap<BlockHash, Entry>,
    expired_evicted: u64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep(&mut self, now: u64) {
        let expired: Vec<BlockHash> = self
            .entries
            .iter()
            .filter(|(_, e)| matches!(e.expires_at, Some(at) if at <= now))
            .map(|(h, _)| h.clone())
            .collect();
        for hash in expired {
            self.entries.remove(&hash);
            self.expired_evicted += 1;
        }
    }
}

impl MemoryStore for InMemoryStore {
    fn save(
        &mut self,
        block: Block,
        ttl_seconds: Option<u64>,
        now: u64,
    ) -> Result<(), StoreError> {
        self.sweep(now);
        let expires_at = ttl_seconds.map(|ttl| now.saturating_add(ttl));
        self.entries
            .insert(block.block_hash.clone(), Entry { block, expires_at });
        Ok(())
    }

    fn load(&mut self, hash: &BlockHash, now: u64) -> Result<Option<Block>, StoreError> {
        self.sweep(now);
        Ok(self.entries.get(hash).map(|e| e.block.clone()))
    }

    fn query(&mut self, query: &Query, now: u64) -> Result<Vec<Block>, StoreError> {
        self.sweep(now);
        // The store keeps no edges; edge criteria see empty sets.
        let empty = BTreeSet::new();
        Ok(self
            .entries
            .values()
            .filter(|e| query.matches(&e.block, &[], &empty))
            .map(|e| e.block.clone())
            .collect())
    }

    fn delete(&mut self, hash: &BlockHash, now: u64) -> Result<bool, StoreError> {
        self.sweep(now);
        Ok(self.entries.remove(hash).is_some())
    }

    fn delete_many(
        &mut self,
        hashes: &BTreeSet<BlockHash>,
        now: u64,
    ) -> Result<usize, StoreError> {
        self.sweep(now);
        let mut removed = 0;
        for hash in hashes {
            if self.entries.remove(hash).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn exists(&mut self, hash: &BlockHash, now: u64) -> Result<bool, StoreError> {
        self.sweep(now);
        Ok(self.entries.contains_key(hash))
    }

    fn get_stats(&self) -> StoreStats {
        StoreStats {
            entries: self.entries.len() as u64,
            expired_evicted: self.expired_evicted,
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_codec::{BlockSpec, CodecRegistry};
    use cg_core::BlockKind;
    use serde_json::json;

    fn block(text: &str) -> Block {
        CodecRegistry::with_builtins()
            .make_block(BlockSpec::new(
                BlockKind::Memory,
                "unsafe-text",
                json!({ "text": text }),
            ))
            .unwrap()
    }

    #[test]
    fn ttl_expires_on_next_operation() {
        let mut store = InMemoryStore::new();
        let b = block("short lived");
        let hash = b.block_hash.clone();
        store.save(b, Some(10), 100).unwrap();
        assert!(store.exists(&hash, 105).unwrap());
        // At now == expiry the sweep evicts.
        assert!(!store.exists(&hash, 110).unwrap());
        assert_eq!(store.get_stats().expired_evicted, 1);
        assert_eq!(store.get_stats().entries, 0);
    }

    #[test]
    fn query_filters_stored_blocks() {
        let mut store = InMemoryStore::new();
        store.save(block("a"), None, 0).unwrap();
        store.save(block("b"), None, 0).unwrap();
        let q = Query {
            kinds: Some(std::iter::once(BlockKind::Memory).collect()),
            ..Query::default()
        };
        assert_eq!(store.query(&q, 1).unwrap().len(), 2);
        assert!(store.query(&Query::impossible(), 1).unwrap().is_empty());
    }

    #[test]
    fn delete_many_counts_removals() {
        let mut store = InMemoryStore::new();
        let a = block("a");
        let b = block("b");
        let hashes: BTreeSet<BlockHash> =
            [a.block_hash.clone(), b.block_hash.clone()].into_iter().collect();
        store.save(a, None, 0).unwrap();
        store.save(b, None, 0).unwrap();
        assert_eq!(store.delete_many(&hashes, 1).unwrap(), 2);
        assert_eq!(store.delete_many(&hashes, 2).unwrap(), 0);
    }
}
