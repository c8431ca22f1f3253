//! summarize_history step.
//!
//! With a summarizer configured and enough history present, the most recent
//! ten history blocks stay verbatim and the older prefix is collapsed into a
//! single summarizer-produced history block targeted at 30 % of the prefix's
//! estimated tokens. The successor carries full provenance (derivation
//! parents, method and version tags) and a recomputed hash.

use cg_core::caps::HistorySummarizer;
use cg_core::{Block, BlockKind, HeuristicEstimator, TokenEstimator};

use crate::compact::{make_successor, CompactionConfig, StepOutcome};
use crate::report::CompactionStep;
use crate::PipelineResult;

/// History blocks retained verbatim at the end of the sequence.
const RETAIN_RECENT: usize = 10;

/// Target share of the prefix's estimated tokens.
const TARGET_RATIO_PCT: u64 = 30;

pub(crate) fn run(
    blocks: Vec<Block>,
    config: &CompactionConfig,
    estimator: &dyn TokenEstimator,
    summarizer: Option<&dyn HistorySummarizer>,
) -> PipelineResult<StepOutcome> {
    let Some(summarizer) = summarizer else {
        return Ok(StepOutcome::unchanged(blocks, "no summarizer configured"));
    };

    let mut history: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.meta.kind == BlockKind::History)
        .map(|(i, _)| i)
        .collect();
    if history.len() < config.min_messages {
        return Ok(StepOutcome::unchanged(
            blocks,
            format!("below minimum of {} history block(s)", config.min_messages),
        ));
    }
    history.sort_by_key(|&i| (blocks[i].meta.created_at, i));

    let prefix_len = history.len().saturating_sub(RETAIN_RECENT);
    if prefix_len == 0 {
        return Ok(StepOutcome::unchanged(blocks, "history fits the retained window"));
    }
    let prefix_indices: std::collections::BTreeSet<usize> =
        history[..prefix_len].iter().copied().collect();
    let prefix: Vec<Block> = prefix_indices.iter().map(|&i| blocks[i].clone()).collect();

    let prefix_tokens = match estimator.estimate(&prefix) {
        Ok(est) => est.tokens,
        Err(err) => {
            tracing::warn!(error = %err, "estimator unavailable for summary target, degrading to heuristic");
            HeuristicEstimator
                .estimate(&prefix)
                .expect("heuristic estimation is infallible")
                .tokens
        }
    };
    let target_tokens = prefix_tokens * TARGET_RATIO_PCT / 100;

    let draft = summarizer.summarize_history(&prefix, target_tokens)?;
    // The successor must be a history block regardless of what the
    // summarizer handed back, and its provenance points at the summarized
    // originals, not at the summarizer; the stamp also rehashes it.
    let mut base = draft.clone();
    base.meta.kind = BlockKind::History;
    if let Some(src) = prefix[0].meta.source.clone() {
        base.meta.source = Some(src);
    }
    let mut successor = make_successor(
        &base,
        draft.payload.clone(),
        CompactionStep::SummarizeHistory,
    )?;
    successor.meta.tags.insert("method:summarize".into());
    successor.meta.tags.insert("summarizer:v1".into());
    // Tag additions change nothing content-addressed (tags are volatile).

    let parents: Vec<_> = prefix.iter().map(|b| b.block_hash.clone()).collect();
    let insert_at = *prefix_indices.iter().next().expect("prefix is non-empty");

    let mut kept = Vec::with_capacity(blocks.len() - prefix_len + 1);
    let mut removed = Vec::new();
    for (i, block) in blocks.into_iter().enumerate() {
        if i == insert_at {
            kept.push(successor.clone());
        }
        if prefix_indices.contains(&i) {
            removed.push(block);
        } else {
            kept.push(block);
        }
    }

    let description = format!(
        "summarized {prefix_len} history block(s) targeting {target_tokens} token(s)"
    );
    Ok(StepOutcome {
        blocks: kept,
        removed,
        replaced: 1,
        derivations: vec![(successor.block_hash, parents)],
        lossy: true,
        description,
    })
}
