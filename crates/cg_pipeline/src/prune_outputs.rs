//! tool_output_prune step.
//!
//! Tool outputs are partitioned by codec id (the tool identity). Within each
//! partition only the most recent `max_outputs_per_tool` survive; surviving
//! long string outputs are replaced by truncated successors that keep the
//! tail, unless the output is an error and `preserve_error_tail` holds.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use cg_core::{Block, BlockKind};

use crate::compact::{is_truthy, make_successor, CompactionConfig, StepOutcome};
use crate::report::CompactionStep;
use crate::PipelineResult;

/// A tool output counts as an error when `payload.error` is truthy,
/// `payload.status == "error"`, or the tagged output reports failure.
fn is_error_output(payload: &Value) -> bool {
    if is_truthy(payload.get("error")) {
        return true;
    }
    if payload.get("status").and_then(Value::as_str) == Some("error") {
        return true;
    }
    matches!(
        payload.get("output").and_then(|o| o.get("success")),
        Some(Value::Bool(false))
    )
}

/// Truncate a string output to its last `max_chars` characters.
fn truncate_tail(s: &str, max_chars: usize) -> Option<String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_chars {
        return None;
    }
    let cut = chars.len() - max_chars;
    let tail: String = chars[cut..].iter().collect();
    Some(format!("... [truncated {cut} chars] ...\n{tail}"))
}

pub(crate) fn run(blocks: Vec<Block>, config: &CompactionConfig) -> PipelineResult<StepOutcome> {
    // Partition tool outputs by codec id, remembering list positions.
    let mut partitions: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, block) in blocks.iter().enumerate() {
        if block.meta.kind == BlockKind::ToolOutput {
            partitions
                .entry(block.meta.codec_id.clone())
                .or_default()
                .push(i);
        }
    }

    // Within each partition keep the last N by created_at.
    let mut drop_indices: BTreeSet<usize> = BTreeSet::new();
    for indices in partitions.values() {
        let mut by_age: Vec<usize> = indices.clone();
        by_age.sort_by_key(|&i| (blocks[i].meta.created_at, i));
        let keep_from = by_age.len().saturating_sub(config.max_outputs_per_tool);
        drop_indices.extend(&by_age[..keep_from]);
    }

    let mut kept = Vec::with_capacity(blocks.len());
    let mut removed = Vec::new();
    let mut derivations = Vec::new();
    let mut replaced = 0usize;

    for (i, block) in blocks.into_iter().enumerate() {
        if drop_indices.contains(&i) {
            removed.push(block);
            continue;
        }
        if block.meta.kind != BlockKind::ToolOutput {
            kept.push(block);
            continue;
        }

        let truncatable = !is_error_output(&block.payload) || !config.preserve_error_tail;
        let tail = block
            .payload
            .get("output")
            .and_then(Value::as_str)
            .filter(|_| truncatable)
            .and_then(|s| truncate_tail(s, config.max_raw_tail_chars));

        match tail {
            Some(new_output) => {
                let mut payload = block.payload.clone();
                let obj = payload
                    .as_object_mut()
                    .expect("tool output payloads are objects");
                obj.insert("output".into(), Value::String(new_output));
                obj.insert("_truncated".into(), Value::Bool(true));

                let successor =
                    make_successor(&block, payload, CompactionStep::ToolOutputPrune)?;
                derivations.push((
                    successor.block_hash.clone(),
                    vec![block.block_hash.clone()],
                ));
                removed.push(block);
                kept.push(successor);
                replaced += 1;
            }
            None => kept.push(block),
        }
    }

    let lossy = !removed.is_empty();
    let description = format!(
        "kept at most {} output(s) per tool, truncated {replaced} long output(s)",
        config.max_outputs_per_tool
    );
    Ok(StepOutcome {
        blocks: kept,
        removed,
        replaced,
        derivations,
        lossy,
        description,
    })
}
