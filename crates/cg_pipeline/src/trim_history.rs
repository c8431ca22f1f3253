//! history_trim step: keep the most recent history blocks.
//!
//! Among history blocks ordered by `created_at`, the last
//! `keep_recent_messages` survive. With `keep_error_messages`, an older
//! block also survives when any of its `payload.messages[i].error` values is
//! truthy (truthy = not absent/null/false/0/"").

use std::collections::BTreeSet;

use serde_json::Value;

use cg_core::{Block, BlockKind};

use crate::compact::{is_truthy, CompactionConfig, StepOutcome};

fn has_error_message(block: &Block) -> bool {
    block
        .payload
        .get("messages")
        .and_then(Value::as_array)
        .map(|msgs| msgs.iter().any(|m| is_truthy(m.get("error"))))
        .unwrap_or(false)
}

pub(crate) fn run(blocks: Vec<Block>, config: &CompactionConfig) -> StepOutcome {
    let mut history: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.meta.kind == BlockKind::History)
        .map(|(i, _)| i)
        .collect();
    history.sort_by_key(|&i| (blocks[i].meta.created_at, i));

    let keep_from = history.len().saturating_sub(config.keep_recent_messages);
    let mut drop_indices: BTreeSet<usize> = history[..keep_from]
        .iter()
        .copied()
        .filter(|&i| !(config.keep_error_messages && has_error_message(&blocks[i])))
        .collect();

    let mut kept = Vec::with_capacity(blocks.len());
    let mut removed = Vec::new();
    for (i, block) in blocks.into_iter().enumerate() {
        if drop_indices.remove(&i) {
            removed.push(block);
        } else {
            kept.push(block);
        }
    }

    let lossy = !removed.is_empty();
    let description = format!(
        "kept the {} most recent history block(s), removed {}",
        config.keep_recent_messages,
        removed.len()
    );
    StepOutcome {
        blocks: kept,
        removed,
        replaced: 0,
        derivations: Vec::new(),
        lossy,
        description,
    }
}
