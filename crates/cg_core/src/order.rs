//! Stable ordering helpers over block sequences.
//!
//! The canonical sort key is `(kind order, block hash)` — lexicographic hash
//! as tiebreaker, so a materialized sequence is independent of insertion
//! order and identical across runs.

use core::cmp::Ordering;

use crate::block::Block;
use crate::errors::CoreError;
use crate::kind::BlockKind;

/// Compare two blocks by `(kind order, block hash)`.
pub fn cmp_blocks(a: &Block, b: &Block) -> Ordering {
    match BlockKind::compare(a.meta.kind, b.meta.kind) {
        Ordering::Equal => a.block_hash.cmp(&b.block_hash),
        o => o,
    }
}

/// Sort blocks into canonical order. Idempotent: `sort ∘ sort == sort`.
pub fn sort_stable(blocks: &mut [Block]) {
    blocks.sort_by(cmp_blocks);
}

/// Verify a sequence respects the canonical kind order. Returns the first
/// offending index on failure.
pub fn validate_ordered(blocks: &[Block]) -> Result<(), CoreError> {
    for (i, pair) in blocks.windows(2).enumerate() {
        if pair[0].meta.kind.order() > pair[1].meta.kind.order() {
            return Err(CoreError::KindOrder { index: i + 1 });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockHash, BlockMeta};
    use crate::kind::Sensitivity;
    use std::collections::BTreeSet;

    fn block(kind: BlockKind, hash_byte: char) -> Block {
        let hex: String = std::iter::repeat(hash_byte).take(64).collect();
        Block {
            block_hash: BlockHash::from_hex_unchecked(hex),
            meta: BlockMeta {
                kind,
                sensitivity: Sensitivity::Public,
                codec_id: "unsafe-text".into(),
                codec_version: "1".into(),
                created_at: 0,
                source: None,
                tags: BTreeSet::new(),
            },
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn sort_orders_by_kind_then_hash() {
        let mut blocks = vec![
            block(BlockKind::History, 'b'),
            block(BlockKind::Pinned, 'f'),
            block(BlockKind::History, 'a'),
            block(BlockKind::Memory, 'c'),
        ];
        sort_stable(&mut blocks);
        let kinds: Vec<BlockKind> = blocks.iter().map(|b| b.meta.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Pinned,
                BlockKind::Memory,
                BlockKind::History,
                BlockKind::History
            ]
        );
        // hash tiebreak inside the history run
        assert!(blocks[2].block_hash < blocks[3].block_hash);
        assert!(validate_ordered(&blocks).is_ok());
    }

    #[test]
    fn sort_is_idempotent() {
        let mut a = vec![
            block(BlockKind::Turn, 'a'),
            block(BlockKind::Pinned, 'b'),
            block(BlockKind::State, 'c'),
        ];
        sort_stable(&mut a);
        let once = a.clone();
        sort_stable(&mut a);
        assert_eq!(a, once);
    }

    #[test]
    fn validate_reports_first_violation() {
        let blocks = vec![block(BlockKind::Turn, 'a'), block(BlockKind::Pinned, 'b')];
        assert_eq!(
            validate_ordered(&blocks),
            Err(CoreError::KindOrder { index: 1 })
        );
    }
}
