//! Compaction orchestrator: runs the configured steps in order over a view's
//! block list and assembles the aggregate report.
//!
//! The input view and its graph are never mutated; the outcome is a fresh
//! block list, the removed blocks, the derivation edges for successor
//! blocks, and the report. Any step failure aborts the whole compaction.

use serde_json::Value;

use cg_canon::{canonicalize_value, compute_block_hash};
use cg_core::caps::HistorySummarizer;
use cg_core::{Block, BlockHash, HeuristicEstimator, TokenEstimator};
use cg_graph::{ContextGraph, View};

use crate::report::{CompactionReport, CompactionStep, StepReport};
use crate::{dedupe, prune_outputs, summarize, trim_history, PipelineResult};

#[derive(Clone, Debug)]
pub struct CompactionConfig {
    /// Steps run in the order listed.
    pub steps: Vec<CompactionStep>,
    /// tool_output_prune: outputs kept per tool identity (codec id).
    pub max_outputs_per_tool: usize,
    /// tool_output_prune: string outputs longer than this are truncated to
    /// their tail.
    pub max_raw_tail_chars: usize,
    /// tool_output_prune: error outputs keep their full text.
    pub preserve_error_tail: bool,
    /// history_trim: most recent history blocks kept verbatim.
    pub keep_recent_messages: usize,
    /// history_trim: older blocks whose messages carry a truthy `error`
    /// survive the trim.
    pub keep_error_messages: bool,
    /// summarize_history: minimum history blocks before summarizing.
    pub min_messages: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            steps: vec![
                CompactionStep::Dedupe,
                CompactionStep::ToolOutputPrune,
                CompactionStep::HistoryTrim,
            ],
            max_outputs_per_tool: 3,
            max_raw_tail_chars: 500,
            preserve_error_tail: true,
            keep_recent_messages: 20,
            keep_error_messages: false,
            min_messages: 5,
        }
    }
}

/// Result of a compaction run.
#[derive(Clone, Debug)]
pub struct CompactionOutcome {
    /// Surviving blocks, in the input order (successors in place).
    pub blocks: Vec<Block>,
    /// Blocks dropped by any step.
    pub removed_blocks: Vec<Block>,
    /// `(successor hash, parent hashes)` for every replacement block.
    pub derivations: Vec<(BlockHash, Vec<BlockHash>)>,
    pub report: CompactionReport,
}

impl CompactionOutcome {
    /// Insert successor blocks and their derivation edges into a graph.
    /// Idempotent, like `add_block` itself.
    pub fn apply_to_graph(&self, graph: &mut ContextGraph) {
        for (hash, parents) in &self.derivations {
            if let Some(block) = self.blocks.iter().find(|b| &b.block_hash == hash) {
                graph.add_block(block.clone(), parents.clone(), vec![]);
            }
        }
    }
}

/// What one step hands back to the orchestrator.
pub(crate) struct StepOutcome {
    pub blocks: Vec<Block>,
    pub removed: Vec<Block>,
    pub replaced: usize,
    pub derivations: Vec<(BlockHash, Vec<BlockHash>)>,
    pub lossy: bool,
    pub description: String,
}

impl StepOutcome {
    /// A step that changed nothing.
    pub fn unchanged(blocks: Vec<Block>, description: impl Into<String>) -> Self {
        Self {
            blocks,
            removed: Vec::new(),
            replaced: 0,
            derivations: Vec::new(),
            lossy: false,
            description: description.into(),
        }
    }
}

fn estimate_tokens(estimator: &dyn TokenEstimator, blocks: &[Block]) -> u64 {
    match estimator.estimate(blocks) {
        Ok(est) => est.tokens,
        Err(err) => {
            tracing::warn!(error = %err, "estimator unavailable during compaction, degrading to heuristic");
            HeuristicEstimator
                .estimate(blocks)
                .expect("heuristic estimation is infallible")
                .tokens
        }
    }
}

/// Build a compacted successor from an original block: recompute the hash
/// from the new payload and stamp the provenance marker.
///
/// Provenance law: `meta.source` gains the `:compacted` suffix, `meta.tags`
/// gains `compacted:<step>`, and the hash is recomputed — content addresses
/// are never preserved across a payload change.
pub(crate) fn make_successor(
    original: &Block,
    new_payload: Value,
    step: CompactionStep,
) -> PipelineResult<Block> {
    let mut meta = original.meta.clone();
    let base = meta
        .source
        .clone()
        .unwrap_or_else(|| meta.codec_id.clone());
    meta.source = Some(format!("{base}:compacted"));
    meta.tags.insert(step.provenance_tag());

    let payload = canonicalize_value(&new_payload);
    let block_hash = compute_block_hash(&meta.stable(), &payload)?;
    Ok(Block {
        block_hash,
        meta,
        payload,
    })
}

pub fn compact_view(
    view: &View,
    config: &CompactionConfig,
    estimator: &dyn TokenEstimator,
    summarizer: Option<&dyn HistorySummarizer>,
) -> PipelineResult<CompactionOutcome> {
    let mut blocks: Vec<Block> = view.blocks().to_vec();
    let before_tokens = estimate_tokens(estimator, &blocks);

    let mut removed_blocks = Vec::new();
    let mut derivations = Vec::new();
    let mut step_reports = Vec::new();
    let mut steps_applied = Vec::new();

    for &step in &config.steps {
        let step_before = estimate_tokens(estimator, &blocks);
        let outcome = match step {
            CompactionStep::Dedupe => dedupe::run(blocks),
            CompactionStep::ToolOutputPrune => prune_outputs::run(blocks, config)?,
            CompactionStep::HistoryTrim => trim_history::run(blocks, config),
            CompactionStep::SummarizeHistory => {
                summarize::run(blocks, config, estimator, summarizer)?
            }
        };
        let step_after = estimate_tokens(estimator, &outcome.blocks);

        step_reports.push(StepReport {
            step,
            blocks_removed: outcome.removed.len(),
            blocks_replaced: outcome.replaced,
            tokens_saved: step_before.saturating_sub(step_after),
            lossy: outcome.lossy,
            description: outcome.description,
        });
        steps_applied.push(step);

        blocks = outcome.blocks;
        removed_blocks.extend(outcome.removed);
        derivations.extend(outcome.derivations);
    }

    let after_tokens = estimate_tokens(estimator, &blocks);
    Ok(CompactionOutcome {
        blocks,
        removed_blocks,
        derivations,
        report: CompactionReport {
            before_tokens,
            after_tokens,
            saved_tokens: before_tokens.saturating_sub(after_tokens),
            steps_applied,
            step_reports,
        },
    })
}

/// JSON-level truthiness shared by prune and trim: a value counts as truthy
/// unless it is absent, `null`, `false`, `0`, or `""`.
pub(crate) fn is_truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
