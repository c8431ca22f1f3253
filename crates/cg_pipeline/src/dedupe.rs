//! dedupe step: keep the first occurrence of each block hash.
//!
//! Duplicates are exact content copies (hashes are content addresses), so
//! this step is never lossy. Idempotent: `dedupe ∘ dedupe == dedupe`.

use std::collections::BTreeSet;

use cg_core::Block;

use crate::compact::StepOutcome;

pub(crate) fn run(blocks: Vec<Block>) -> StepOutcome {
    let mut seen = BTreeSet::new();
    let mut kept = Vec::with_capacity(blocks.len());
    let mut removed = Vec::new();

    for block in blocks {
        if seen.insert(block.block_hash.clone()) {
            kept.push(block);
        } else {
            removed.push(block);
        }
    }

    let description = format!("removed {} duplicate block(s)", removed.len());
    StepOutcome {
        blocks: kept,
        removed,
        replaced: 0,
        derivations: Vec::new(),
        lossy: false,
        description,
    }
}
